use std::path::PathBuf;

use crate::{
    modules::{geo::Geo, item::ItemCommand, rating::RatingCommand},
    run_impl_enum,
};
use clap::AppSettings;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(
    name = "duotrack",
    global_settings = &[AppSettings::ColoredHelp, AppSettings::VersionlessSubcommands]
)]
pub struct Options {
    /// Config file; defaults to $DUOTRACK_CONFIG, then the platform config directory
    #[structopt(long, parse(from_os_str))]
    pub config: Option<PathBuf>,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    Rating(RatingCommand),
    Item(ItemCommand),
    Geo(Geo),
}

run_impl_enum!(Command, self, ctx, ser, {
    match self {
        Self::Rating(r) => r.run(ctx, ser).await?,
        Self::Item(i) => i.run(ctx, ser).await?,
        Self::Geo(g) => g.run(ctx, ser).await?,
    }
});
