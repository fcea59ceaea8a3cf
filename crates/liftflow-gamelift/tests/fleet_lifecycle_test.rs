//! End-to-end lifecycle against the in-memory GameLift, with state persisted to disk

use liftflow_cloud::{
    ActionType, CloudProvider, GlobalState, ResourceConfig, ResourceSet, StateManager,
};
use liftflow_gamelift::model::{Fleet, FleetStatus, IpPermission, IpProtocol};
use liftflow_gamelift::testing::FakeGameLift;
use liftflow_gamelift::{GameLiftProvider, PROVIDER_NAME, ProviderConfig};
use serde_json::json;
use tempfile::TempDir;

fn manifest(ports: serde_json::Value, build: &str) -> ResourceSet {
    let mut set = ResourceSet::new();
    set.add(ResourceConfig::new(
        "fleet",
        "arena",
        PROVIDER_NAME,
        json!({
            "build_id": build,
            "ec2_instance_type": "c5.large",
            "ec2_inbound_permission": ports,
            "runtime_configuration": {
                "server_process": [
                    { "launch_path": "/local/game/server", "concurrent_executions": 4 }
                ]
            },
        }),
    ))
    .unwrap();
    set.add(ResourceConfig::new(
        "scaling_policy",
        "keep-headroom",
        PROVIDER_NAME,
        json!({
            "fleet": "arena",
            "metric_name": "PercentAvailableGameSessions",
            "policy_type": "TargetBased",
            "target_configuration": { "target_value": 20.0 },
        }),
    ))
    .unwrap();
    set
}

async fn converge(
    provider: &GameLiftProvider<FakeGameLift>,
    manager: &StateManager,
    desired: &ResourceSet,
) -> liftflow_cloud::Plan {
    let mut global = manager.load().await.unwrap();
    let current = provider
        .refresh(&global.provider_state(PROVIDER_NAME))
        .await
        .unwrap();
    let plan = provider.plan(desired, &current).await.unwrap();

    let mut state = current;
    let result = provider.apply(&plan, &mut state).await.unwrap();
    assert!(result.is_success(), "apply failed: {:?}", result.failed);

    global.replace_provider_state(PROVIDER_NAME, state);
    manager.save(&global).await.unwrap();
    plan
}

#[tokio::test(start_paused = true)]
async fn test_fleet_lifecycle() {
    let dir = TempDir::new().unwrap();
    let manager = StateManager::new(dir.path());
    let provider = GameLiftProvider::new(
        FakeGameLift::new()
            .with_auth_failures(2)
            .with_activation(vec![
                FleetStatus::Downloading,
                FleetStatus::Building,
                FleetStatus::Activating,
                FleetStatus::Active,
            ]),
        ProviderConfig::default(),
    );

    // create
    let v1 = manifest(
        json!([
            { "from_port": 7777, "to_port": 7777, "ip_range": "0.0.0.0/0", "protocol": "UDP" },
            { "from_port": 8080, "to_port": 8080, "ip_range": "10.0.0.0/8", "protocol": "TCP" }
        ]),
        "build-1",
    );
    let plan = converge(&provider, &manager, &v1).await;
    assert_eq!(plan.summary().create, 2);
    assert_eq!(provider.api().call_count("CreateFleet").await, 3);

    let global: GlobalState = manager.load().await.unwrap();
    let fleet_state = global.get_resource("gamelift:fleet:arena").unwrap();
    let fleet_id = fleet_state.id.clone();
    assert!(global.get_resource("gamelift:scaling_policy:keep-headroom").is_some());

    // converged: nothing to do
    let plan = converge(&provider, &manager, &v1).await;
    assert!(!plan.has_changes);

    // drop the TCP rule, open a UDP range
    let v2 = manifest(
        json!([
            { "from_port": 7777, "to_port": 7777, "ip_range": "0.0.0.0/0", "protocol": "UDP" },
            { "from_port": 9000, "to_port": 9010, "ip_range": "0.0.0.0/0", "protocol": "UDP" }
        ]),
        "build-1",
    );
    let plan = converge(&provider, &manager, &v2).await;
    let update = plan.action_for("fleet:arena").unwrap();
    assert_eq!(update.action_type, ActionType::Update);
    assert_eq!(
        update.detail::<Vec<String>>("changes").unwrap(),
        vec![
            "revoke TCP 8080-8080 from 10.0.0.0/8".to_string(),
            "authorize UDP 9000-9010 from 0.0.0.0/0".to_string(),
        ]
    );

    let mut ports = provider.api().port_settings(&fleet_id).await;
    ports.sort();
    assert_eq!(
        ports,
        vec![
            IpPermission::new(7777, 7777, "0.0.0.0/0", IpProtocol::Udp),
            IpPermission::new(9000, 9010, "0.0.0.0/0", IpProtocol::Udp),
        ]
    );

    let global = manager.load().await.unwrap();
    let stored: Fleet = global
        .get_resource("gamelift:fleet:arena")
        .unwrap()
        .attributes_as()
        .unwrap();
    assert_eq!(stored.ec2_inbound_permissions.len(), 2);

    // destroy everything
    let mut state = global.provider_state(PROVIDER_NAME);
    let result = provider.destroy_all(&mut state).await.unwrap();
    assert!(result.is_success());
    assert!(state.is_empty());
    assert!(provider.api().fleet_ids().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fleet_deleted_out_of_band_is_recreated() {
    let dir = TempDir::new().unwrap();
    let manager = StateManager::new(dir.path());
    let provider = GameLiftProvider::new(FakeGameLift::new(), ProviderConfig::default());
    let desired = manifest(json!([]), "build-1");

    converge(&provider, &manager, &desired).await;
    let old_id = manager
        .load()
        .await
        .unwrap()
        .get_resource("gamelift:fleet:arena")
        .unwrap()
        .id
        .clone();

    provider.api().forget_fleet(&old_id).await;

    let plan = converge(&provider, &manager, &desired).await;
    assert_eq!(plan.summary().create, 2);

    let new_id = manager
        .load()
        .await
        .unwrap()
        .get_resource("gamelift:fleet:arena")
        .unwrap()
        .id
        .clone();
    assert_ne!(old_id, new_id);
}
