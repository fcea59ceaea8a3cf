use crate::output;
use colored::Colorize;
use liftflow_cloud::{CloudProvider, StateManager};

/// Re-read tracked resources and drop the ones that no longer exist
pub async fn handle(provider: &dyn CloudProvider, state: &StateManager) -> anyhow::Result<()> {
    let lock = state.acquire_lock().await?;
    let (mut global, current) = super::refreshed(provider, state).await?;
    let before = global.provider_state(provider.name()).len();
    let dropped = before.saturating_sub(current.len());

    output::print_state(&current);
    global.replace_provider_state(provider.name(), current);
    state.save(&global).await?;
    lock.release().await?;

    if dropped > 0 {
        println!(
            "{}",
            format!("{} resource(s) no longer exist and were removed from state", dropped).yellow()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::apply;
    use crate::commands::testing::{MANIFEST, manifest, provider};
    use liftflow_gamelift::PROVIDER_NAME;
    use tempfile::TempDir;

    #[tokio::test(start_paused = true)]
    async fn test_refresh_forgets_deleted_fleet() {
        let dir = TempDir::new().unwrap();
        let state = StateManager::new(dir.path());
        let provider = provider();
        apply::handle(&provider, &manifest(MANIFEST), &state, true)
            .await
            .unwrap();

        let fleet_id = provider.api().fleet_ids().await.remove(0);
        provider.api().forget_fleet(&fleet_id).await;

        handle(&provider, &state).await.unwrap();
        assert!(state
            .load()
            .await
            .unwrap()
            .provider_state(PROVIDER_NAME)
            .is_empty());
    }
}
