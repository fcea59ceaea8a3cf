use crate::output;
use anyhow::bail;
use colored::Colorize;
use liftflow_cloud::{CloudProvider, StateManager};
use liftflow_core::Manifest;
use tracing::info;

/// Refresh, plan and (with `yes`) apply; state is saved even when some actions fail
pub async fn handle(
    provider: &dyn CloudProvider,
    manifest: &Manifest,
    state: &StateManager,
    yes: bool,
) -> anyhow::Result<()> {
    let lock = state.acquire_lock().await?;

    let (mut global, mut current) = super::refreshed(provider, state).await?;
    let plan = provider.plan(&manifest.resources, &current).await?;
    output::print_plan(&plan);

    if !plan.has_changes {
        global.replace_provider_state(provider.name(), current);
        state.save(&global).await?;
        lock.release().await?;
        return Ok(());
    }

    if !yes {
        println!();
        println!("{}", "Run again with --yes to apply these changes.".yellow());
        lock.release().await?;
        return Ok(());
    }

    println!();
    println!("{}", "Applying changes...".blue().bold());
    info!(project = %manifest.project, "Applying plan");
    let result = provider.apply(&plan, &mut current).await?;

    global.replace_provider_state(provider.name(), current);
    state.save(&global).await?;
    lock.release().await?;

    output::print_apply_result(&result);
    if !result.is_success() {
        bail!("{} action(s) failed", result.failed.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{MANIFEST, manifest, provider};
    use liftflow_gamelift::PROVIDER_NAME;
    use tempfile::TempDir;

    #[tokio::test(start_paused = true)]
    async fn test_apply_requires_yes() {
        let dir = TempDir::new().unwrap();
        let state = StateManager::new(dir.path());
        let provider = provider();

        handle(&provider, &manifest(MANIFEST), &state, false)
            .await
            .unwrap();

        assert!(provider.api().fleet_ids().await.is_empty());
        assert!(state.load().await.unwrap().resources.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_records_state() {
        let dir = TempDir::new().unwrap();
        let state = StateManager::new(dir.path());
        let provider = provider();

        handle(&provider, &manifest(MANIFEST), &state, true)
            .await
            .unwrap();

        let global = state.load().await.unwrap();
        let tracked = global.provider_state(PROVIDER_NAME);
        assert_eq!(tracked.len(), 2);
        assert!(tracked.get("fleet:arena").is_some());
        assert!(tracked.get("scaling_policy:keep-headroom").is_some());

        // second run converges without calling create again
        handle(&provider, &manifest(MANIFEST), &state, true)
            .await
            .unwrap();
        assert_eq!(provider.api().call_count("CreateFleet").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_releases_lock_on_error() {
        let dir = TempDir::new().unwrap();
        let state = StateManager::new(dir.path());
        let provider = provider();
        let broken = manifest(
            r#"
            scaling_policy "orphan" {
                fleet "missing"
                metric-name "ActiveInstances"
                policy-type "TargetBased"
                target-configuration target-value=1.0
            }
            "#,
        );

        assert!(handle(&provider, &broken, &state, true).await.is_err());
        // lock was dropped, a new one can be taken
        state.acquire_lock().await.unwrap().release().await.unwrap();
    }
}
