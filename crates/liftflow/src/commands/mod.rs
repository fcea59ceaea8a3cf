pub mod apply;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod show;
pub mod validate;

use colored::Colorize;
use liftflow_cloud::{CloudProvider, GlobalState, ProviderState, StateManager};

/// Load the state file and read every tracked resource back from the provider
async fn refreshed(
    provider: &dyn CloudProvider,
    state: &StateManager,
) -> anyhow::Result<(GlobalState, ProviderState)> {
    let global = state.load().await?;
    let tracked = global.provider_state(provider.name());
    if !tracked.is_empty() {
        println!(
            "{}",
            format!(
                "Refreshing {} resource(s) from {}...",
                tracked.len(),
                provider.display_name()
            )
            .blue()
        );
    }
    let current = provider.refresh(&tracked).await?;
    Ok((global, current))
}
