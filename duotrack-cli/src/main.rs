pub(crate) mod common;
mod options;

mod modules {
    pub mod geo;
    pub mod item;
    pub mod rating;
}

use std::io::stdout;

use erased_serde::Serializer;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use crate::common::{Context, Run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opt = options::Options::from_args();
    let ctx = Context::load(opt.config.as_deref())?;

    opt.command
        .run(
            &ctx,
            &mut <dyn Serializer>::erase(&mut serde_json::Serializer::pretty(stdout())),
        )
        .await?;

    println!();
    Ok(())
}
