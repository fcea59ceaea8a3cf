use anyhow::bail;
use colored::Colorize;
use liftflow_cloud::{CloudProvider, StateManager};
use liftflow_core::Manifest;

/// Start tracking an existing remote resource under a manifest name
pub async fn handle(
    provider: &dyn CloudProvider,
    manifest: &Manifest,
    state: &StateManager,
    resource_type: &str,
    name: &str,
    remote_id: &str,
) -> anyhow::Result<()> {
    let key = format!("{}:{}", resource_type, name);

    let lock = state.acquire_lock().await?;
    let mut global = state.load().await?;
    let mut current = global.provider_state(provider.name());

    if let Some(existing) = current.get(&key) {
        bail!("{} is already tracked as {}", key, existing.id);
    }
    if manifest.resources.get(resource_type, name).is_none() {
        println!(
            "{} {} is not declared in the manifest; the next apply will delete it",
            "warning:".yellow().bold(),
            key
        );
    }

    let resource = provider.import(resource_type, name, remote_id).await?;
    println!(
        "{} Imported {} ({})",
        "✓".green(),
        key.cyan(),
        resource.id
    );
    current.add(key, resource);

    global.replace_provider_state(provider.name(), current);
    state.save(&global).await?;
    lock.release().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{MANIFEST, manifest, provider};
    use crate::commands::plan;
    use liftflow_gamelift::FleetSpec;
    use liftflow_gamelift::PROVIDER_NAME;
    use tempfile::TempDir;

    #[tokio::test(start_paused = true)]
    async fn test_import_adopts_existing_fleet() {
        let dir = TempDir::new().unwrap();
        let state = StateManager::new(dir.path());
        let provider = provider();
        let manifest = manifest(MANIFEST);

        let spec: FleetSpec = manifest
            .resources
            .get("fleet", "arena")
            .unwrap()
            .parse()
            .unwrap();
        let fleet_id = provider
            .api()
            .insert_fleet(&FleetSpec {
                name: "arena".to_string(),
                ..spec
            })
            .await;

        handle(&provider, &manifest, &state, "fleet", "arena", &fleet_id)
            .await
            .unwrap();

        let tracked = state.load().await.unwrap().provider_state(PROVIDER_NAME);
        assert_eq!(tracked.get("fleet:arena").unwrap().id, fleet_id);

        // the adopted fleet matches; only the policy is left to create
        let plan = plan::handle(&provider, &manifest, &state).await.unwrap();
        assert_eq!(plan.summary().create, 1);
        assert_eq!(plan.summary().update, 0);
        assert_eq!(plan.summary().no_change, 1);

        let err = handle(&provider, &manifest, &state, "fleet", "arena", &fleet_id)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already tracked"));
    }
}
