use crate::output;
use anyhow::bail;
use colored::Colorize;
use liftflow_cloud::{CloudProvider, StateManager};

/// Destroy one tracked resource (`type:name`) or everything in state
pub async fn handle(
    provider: &dyn CloudProvider,
    state: &StateManager,
    target: Option<&str>,
    yes: bool,
) -> anyhow::Result<()> {
    let lock = state.acquire_lock().await?;
    let mut global = state.load().await?;
    let mut current = global.provider_state(provider.name());

    if current.is_empty() {
        println!("{}", "Nothing to destroy.".dimmed());
        lock.release().await?;
        return Ok(());
    }

    let doomed: Vec<String> = match target {
        Some(key) => {
            if current.get(key).is_none() {
                bail!("{} is not tracked in state", key);
            }
            vec![key.to_string()]
        }
        None => current.iter().map(|(key, _)| key.clone()).collect(),
    };

    println!("{}", "Resources to destroy:".bold());
    for key in &doomed {
        println!("  {} {}", "-".red().bold(), key.cyan());
    }

    if !yes {
        println!();
        println!("{}", "Run again with --yes to destroy them.".yellow());
        lock.release().await?;
        return Ok(());
    }

    println!();
    let outcome = match target {
        Some(key) => provider
            .destroy(&mut current, key)
            .await
            .map(|()| println!("  {} destroyed {}", "✓".green(), key)),
        None => provider.destroy_all(&mut current).await.map(|result| {
            output::print_apply_result(&result);
            if !result.is_success() {
                println!("{}", "Some resources were not destroyed.".red());
            }
        }),
    };

    global.replace_provider_state(provider.name(), current);
    state.save(&global).await?;
    lock.release().await?;
    outcome?;

    let remaining = global.provider_state(provider.name());
    if target.is_none() && !remaining.is_empty() {
        bail!("{} resource(s) remain in state", remaining.len());
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
    async fn test_destroy_target_then_all() {
        let dir = TempDir::new().unwrap();
        let state = StateManager::new(dir.path());
        let provider = provider();
        apply::handle(&provider, &manifest(MANIFEST), &state, true)
            .await
            .unwrap();

        handle(&provider, &state, Some("scaling_policy:keep-headroom"), true)
            .await
            .unwrap();
        let tracked = state.load().await.unwrap().provider_state(PROVIDER_NAME);
        assert_eq!(tracked.len(), 1);
        assert!(tracked.get("fleet:arena").is_some());

        handle(&provider, &state, None, true).await.unwrap();
        assert!(state.load().await.unwrap().resources.is_empty());
        assert!(provider.api().fleet_ids().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_without_yes_keeps_everything() {
        let dir = TempDir::new().unwrap();
        let state = StateManager::new(dir.path());
        let provider = provider();
        apply::handle(&provider, &manifest(MANIFEST), &state, true)
            .await
            .unwrap();

        handle(&provider, &state, None, false).await.unwrap();
        assert_eq!(state.load().await.unwrap().resources.len(), 2);
        assert_eq!(provider.api().fleet_ids().await.len(), 1);
    }

    #[tokio::test]
    async fn test_destroy_unknown_target() {
        let dir = TempDir::new().unwrap();
        let state = StateManager::new(dir.path());
        let provider = provider();
        let mut global = state.load().await.unwrap();
        global.set_resource(
            "gamelift:fleet:arena".to_string(),
            liftflow_cloud::ResourceState::new("fleet-1", "fleet"),
        );
        state.save(&global).await.unwrap();

        let err = handle(&provider, &state, Some("fleet:other"), true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not tracked"));
    }
}
