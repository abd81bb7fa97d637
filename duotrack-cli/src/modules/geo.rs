use duotrack_core::geo::{Category, Coordinates};
use structopt::StructOpt;

use crate::run_impl_enum;

/// Location lookups, as the place form does them.
#[derive(StructOpt)]
pub enum Geo {
    /// Suggestions for a partial address, nearest first
    Search { query: Vec<String> },
    Reverse { at: Coordinates },
    /// Places of a category around `--at`, or around the current location
    Nearby {
        category: Category,
        #[structopt(long)]
        at: Option<Coordinates>,
        #[structopt(long)]
        radius: Option<u32>,
    },
    /// Current location
    Locate,
    /// Coordinates a place would be saved with
    Resolve { input: Vec<String> },
}

run_impl_enum!(Geo, self, ctx, ser, {
    match self {
        Self::Search { query } => {
            let suggestions = ctx.suggester()?.suggest(&query.join(" ")).await?;
            erased_serde::serialize(&suggestions.unwrap_or_default(), ser)?;
        }
        Self::Reverse { at } => {
            erased_serde::serialize(&ctx.suggester()?.reverse(*at).await?, ser)?;
        }
        Self::Nearby {
            category,
            at,
            radius,
        } => {
            let suggester = match radius {
                Some(radius) => {
                    let mut config = ctx.config.clone();
                    config.nearby_radius_m = *radius;
                    duotrack::suggest::LocationSuggester::from_config(&config)?
                }
                None => ctx.suggester()?,
            };
            let found = match at {
                Some(at) => suggester.nearby_at(*at, *category).await?,
                None => suggester.nearby(*category).await?,
            };
            erased_serde::serialize(&found, ser)?;
        }
        Self::Locate => {
            erased_serde::serialize(&ctx.suggester()?.locate().await?, ser)?;
        }
        Self::Resolve { input } => {
            erased_serde::serialize(&ctx.suggester()?.resolve(&input.join(" ")).await?, ser)?;
        }
    }
});
