use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use duotrack::{config::Config, store::FileStore, suggest::LocationSuggester};
use duotrack_core::Notice;
use erased_serde::Serializer;
use tracing::debug;

/// What every command gets besides its own arguments.
pub struct Context {
    pub config: Config,
}

impl Context {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Ok(Self {
            config: Config::load(path)?,
        })
    }

    pub async fn store(&self) -> anyhow::Result<Arc<FileStore>> {
        let path = self.config.data_path();
        debug!("store at {}", path.display());
        Ok(Arc::new(FileStore::open(path).await?))
    }

    pub fn suggester(&self) -> anyhow::Result<LocationSuggester> {
        Ok(LocationSuggester::from_config(&self.config)?)
    }
}

/// Panel writes report a [`Notice`], which is a message and nothing else.
pub fn notice(n: Notice) -> anyhow::Error {
    anyhow::anyhow!("{}", n)
}

#[async_trait]
pub trait Run {
    async fn run(
        &self,
        ctx: &Context,
        serializer: &mut (dyn Serializer + Send),
    ) -> anyhow::Result<()>;
}

#[macro_export]
macro_rules! run_impl_enum {
    ($i:ident, $self:ident, $ctx:ident, $ser:ident, $b:block) => {
        #[async_trait::async_trait]
        impl $crate::common::Run for $i {
            async fn run(
                &$self,
                $ctx: &$crate::common::Context,
                $ser: &mut (dyn erased_serde::Serializer + Send),
            ) -> anyhow::Result<()> {
                $b;

                Ok(())
            }
        }
    }
}

#[macro_export]
macro_rules! run_impl_struct {
    ($i:ident, $b:ident) => {
        #[async_trait::async_trait]
        impl $crate::common::Run for $i {
            async fn run(
                &self,
                ctx: &$crate::common::Context,
                serializer: &mut (dyn erased_serde::Serializer + Send),
            ) -> anyhow::Result<()> {
                self.$b.run(ctx, serializer).await
            }
        }
    };
}

#[cfg(test)]
pub(crate) mod test_util {
    use structopt::StructOpt;

    use super::{Context, Run};
    use crate::options::Options;

    /// Parse `args` like the binary does and return what the command printed.
    pub async fn run_args(ctx: &Context, args: &[&str]) -> anyhow::Result<serde_json::Value> {
        let opt = Options::from_iter_safe(std::iter::once("duotrack").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        {
            let mut json = serde_json::Serializer::new(&mut out);
            opt.command
                .run(ctx, &mut <dyn erased_serde::Serializer>::erase(&mut json))
                .await?;
        }
        Ok(serde_json::from_slice(&out)?)
    }
}
