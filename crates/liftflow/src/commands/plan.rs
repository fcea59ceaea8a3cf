use crate::output;
use liftflow_cloud::{CloudProvider, Plan, StateManager};
use liftflow_core::Manifest;

pub async fn handle(
    provider: &dyn CloudProvider,
    manifest: &Manifest,
    state: &StateManager,
) -> anyhow::Result<Plan> {
    let (_, current) = super::refreshed(provider, state).await?;
    let plan = provider.plan(&manifest.resources, &current).await?;
    output::print_plan(&plan);
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{MANIFEST, manifest, provider};
    use liftflow_cloud::ActionType;
    use tempfile::TempDir;

    #[tokio::test(start_paused = true)]
    async fn test_plan_does_not_touch_remote_or_state() {
        let dir = TempDir::new().unwrap();
        let state = StateManager::new(dir.path());
        let provider = provider();

        let plan = handle(&provider, &manifest(MANIFEST), &state).await.unwrap();

        assert_eq!(plan.actions_by_type(ActionType::Create).len(), 2);
        assert!(provider.api().fleet_ids().await.is_empty());
        assert!(!state.state_path().exists());
    }
}
