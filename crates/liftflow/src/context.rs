use anyhow::{Context as _, bail};
use liftflow_cloud::{CloudProvider, StateManager};
use liftflow_core::Project;
use liftflow_gamelift::{PROVIDER_NAME, ProviderConfig};
use std::path::Path;

/// Loaded manifest plus the state file next to it
pub struct Context {
    pub project: Project,
    pub state: StateManager,
}

impl Context {
    pub fn load(manifest: Option<&Path>) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().context("cannot read the current directory")?;
        let project = liftflow_core::load_project(&cwd, manifest)?;
        let state = StateManager::new(project.root());
        Ok(Self { project, state })
    }

    pub fn provider_config(&self) -> anyhow::Result<ProviderConfig> {
        let block = &self.project.manifest.provider;
        if block.name != PROVIDER_NAME {
            bail!(
                "unsupported provider `{}` (only `{}` is available)",
                block.name,
                PROVIDER_NAME
            );
        }
        Ok(ProviderConfig::from_value(&block.config)?)
    }

    /// Provider backed by the AWS SDK
    #[cfg(feature = "aws")]
    pub async fn connect(&self) -> anyhow::Result<Box<dyn CloudProvider>> {
        let config = self.provider_config()?;
        tracing::debug!(region = ?config.region, profile = ?config.profile, "Connecting to GameLift");
        let provider = liftflow_gamelift::GameLiftProvider::from_config(config).await;
        Ok(Box::new(provider))
    }

    #[cfg(not(feature = "aws"))]
    pub async fn connect(&self) -> anyhow::Result<Box<dyn CloudProvider>> {
        self.provider_config()?;
        bail!("this build of lift has no AWS support; rebuild with the `aws` feature")
    }
}
