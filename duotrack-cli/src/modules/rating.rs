use std::str::FromStr;

use duotrack_core::{
    rating::{average, cycle, format_average, stars, FillState},
    Rating, StarIndex,
};
use serde::Serialize;
use structopt::StructOpt;

use crate::run_impl_enum;

/// Star arithmetic without touching the store.
#[derive(StructOpt)]
pub enum RatingCommand {
    /// Rating after tapping a star
    Cycle {
        #[structopt(long)]
        star: StarIndex,
        #[structopt(long)]
        current: Option<Rating>,
    },
    /// Fill state of the five stars
    Stars { rating: Option<Rating> },
    /// Average of the given ratings; `-` is a missing rating
    Average { ratings: Vec<Slot> },
}

/// One user's rating slot on the command line.
pub struct Slot(Option<Rating>);

impl FromStr for Slot {
    type Err = duotrack_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "-" => Ok(Self(None)),
            s => Ok(Self(Some(s.parse()?))),
        }
    }
}

#[derive(Serialize)]
struct Shown {
    rating: Option<Rating>,
    stars: Vec<FillState>,
}

#[derive(Serialize)]
struct Averaged {
    average: Option<f64>,
    text: Option<String>,
}

run_impl_enum!(RatingCommand, self, _ctx, ser, {
    match self {
        Self::Cycle { star, current } => {
            let rating = cycle(*current, *star);
            erased_serde::serialize(
                &Shown {
                    rating,
                    stars: stars(rating),
                },
                ser,
            )?;
        }
        Self::Stars { rating } => {
            erased_serde::serialize(
                &Shown {
                    rating: *rating,
                    stars: stars(*rating),
                },
                ser,
            )?;
        }
        Self::Average { ratings } => {
            let avg = average(ratings.iter().map(|s| s.0));
            erased_serde::serialize(
                &Averaged {
                    average: avg,
                    text: avg.map(format_average),
                },
                ser,
            )?;
        }
    }
});
