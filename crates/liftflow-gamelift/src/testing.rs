//! In-memory GameLift for tests
//!
//! `FakeGameLift` keeps fleets and scaling policies in memory and replays
//! scripted status sequences, so lifecycle code can be driven through
//! activation, deletion conflicts and IAM propagation failures without AWS.
//! Combine with `#[tokio::test(start_paused = true)]` to skip real sleeps.

use crate::api::GameLiftApi;
use crate::error::{GameLiftError, INVALID_REQUEST, NOT_FOUND, Result};
use crate::model::{
    FleetAttributes, FleetAttributesUpdate, FleetEvent, FleetSpec, FleetStatus, IpPermission,
    ResourceCreationLimitPolicy, RuntimeConfiguration, ScalingPolicy, ScalingPolicySpec,
    ScalingStatus,
};
use crate::ports::PortSettingsDelta;
use async_trait::async_trait;
use liftflow_cloud::SetDiff;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::Mutex;

const ARN_PREFIX: &str = "arn:aws:gamelift:us-west-2:123456789012:fleet/";

// Values the service reports for runtime fields left out of a request
pub const DEFAULT_ACTIVATION_TIMEOUT_SECONDS: u32 = 600;
pub const DEFAULT_MAX_CONCURRENT_ACTIVATIONS: u32 = i32::MAX as u32;

fn with_service_defaults(runtime: &RuntimeConfiguration) -> RuntimeConfiguration {
    RuntimeConfiguration {
        game_session_activation_timeout_seconds: Some(
            runtime
                .game_session_activation_timeout_seconds
                .unwrap_or(DEFAULT_ACTIVATION_TIMEOUT_SECONDS),
        ),
        max_concurrent_game_session_activations: Some(
            runtime
                .max_concurrent_game_session_activations
                .unwrap_or(DEFAULT_MAX_CONCURRENT_ACTIVATIONS),
        ),
        server_processes: runtime.server_processes.clone(),
    }
}

fn limit_policy_with_defaults(
    policy: Option<ResourceCreationLimitPolicy>,
) -> Option<ResourceCreationLimitPolicy> {
    policy.map(|p| ResourceCreationLimitPolicy {
        new_game_sessions_per_creator: Some(p.new_game_sessions_per_creator.unwrap_or(0)),
        policy_period_in_minutes: Some(p.policy_period_in_minutes.unwrap_or(0)),
    })
}

#[derive(Debug)]
struct FakeFleet {
    attributes: FleetAttributes,
    ports: Vec<IpPermission>,
    runtime: Option<RuntimeConfiguration>,
    tags: BTreeMap<String, String>,
    pending: VecDeque<FleetStatus>,
    deleting: bool,
    events: Vec<FleetEvent>,
}

#[derive(Debug)]
struct FakePolicy {
    policy: ScalingPolicy,
    pending: VecDeque<ScalingStatus>,
    deleting: bool,
}

#[derive(Debug)]
struct FakeState {
    fleets: BTreeMap<String, FakeFleet>,
    policies: BTreeMap<(String, String), FakePolicy>,
    next_id: u32,
    calls: Vec<String>,
    auth_failures: u32,
    delete_conflicts: u32,
    activation: Vec<FleetStatus>,
    termination: Vec<FleetStatus>,
    policy_activation: Vec<ScalingStatus>,
    untaggable: bool,
}

/// Scriptable in-memory implementation of [`GameLiftApi`]
#[derive(Debug)]
pub struct FakeGameLift {
    state: Mutex<FakeState>,
}

impl Default for FakeGameLift {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGameLift {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                fleets: BTreeMap::new(),
                policies: BTreeMap::new(),
                next_id: 0,
                calls: Vec::new(),
                auth_failures: 0,
                delete_conflicts: 0,
                activation: vec![FleetStatus::Activating, FleetStatus::Active],
                termination: vec![FleetStatus::Deleting],
                policy_activation: vec![ScalingStatus::Active],
                untaggable: false,
            }),
        }
    }

    /// Statuses a new fleet reports on successive describes; the last one sticks
    pub fn with_activation(mut self, statuses: Vec<FleetStatus>) -> Self {
        self.state.get_mut().activation = statuses;
        self
    }

    /// Statuses a deleted fleet reports before it disappears
    pub fn with_termination(mut self, statuses: Vec<FleetStatus>) -> Self {
        self.state.get_mut().termination = statuses;
        self
    }

    /// Fail the next `n` CreateFleet calls as if the IAM role had not propagated
    pub fn with_auth_failures(mut self, n: u32) -> Self {
        self.state.get_mut().auth_failures = n;
        self
    }

    /// Reject the next `n` DeleteFleet calls because the fleet is still busy
    pub fn with_delete_conflicts(mut self, n: u32) -> Self {
        self.state.get_mut().delete_conflicts = n;
        self
    }

    pub fn with_policy_activation(mut self, statuses: Vec<ScalingStatus>) -> Self {
        self.state.get_mut().policy_activation = statuses;
        self
    }

    /// Make tag listing fail with the "not in a taggable state" error
    pub fn untaggable(mut self) -> Self {
        self.state.get_mut().untaggable = true;
        self
    }

    /// Names of every API operation called so far, in order
    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| *c == operation)
            .count()
    }

    pub async fn fleet_ids(&self) -> Vec<String> {
        self.state.lock().await.fleets.keys().cloned().collect()
    }

    pub async fn fleet_status(&self, fleet_id: &str) -> Option<FleetStatus> {
        self.state
            .lock()
            .await
            .fleets
            .get(fleet_id)
            .map(|f| f.attributes.status.clone())
    }

    pub async fn port_settings(&self, fleet_id: &str) -> Vec<IpPermission> {
        self.state
            .lock()
            .await
            .fleets
            .get(fleet_id)
            .map(|f| f.ports.clone())
            .unwrap_or_default()
    }

    /// Names of the scaling policies attached to a fleet
    pub async fn policy_names(&self, fleet_id: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .policies
            .keys()
            .filter(|(fleet, _)| fleet == fleet_id)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Insert an already-active fleet, bypassing CreateFleet
    pub async fn insert_fleet(&self, spec: &FleetSpec) -> String {
        let mut state = self.state.lock().await;
        let mut fleet = state.new_fleet(spec);
        fleet.attributes.status = FleetStatus::Active;
        let id = fleet.attributes.fleet_id.clone();
        state.fleets.insert(id.clone(), fleet);
        id
    }

    /// Overwrite the current status of a fleet and clear its script
    pub async fn set_fleet_status(&self, fleet_id: &str, status: FleetStatus) {
        if let Some(fleet) = self.state.lock().await.fleets.get_mut(fleet_id) {
            fleet.attributes.status = status;
            fleet.pending.clear();
        }
    }

    /// Remove a fleet out of band, as if someone deleted it in the console
    pub async fn forget_fleet(&self, fleet_id: &str) {
        let mut state = self.state.lock().await;
        state.fleets.remove(fleet_id);
        state.policies.retain(|(fleet, _), _| fleet != fleet_id);
    }
}

impl FakeState {
    fn record(&mut self, operation: &str) {
        self.calls.push(operation.to_string());
    }

    fn new_fleet(&mut self, spec: &FleetSpec) -> FakeFleet {
        self.next_id += 1;
        let fleet_id = format!("fleet-{:04}", self.next_id);
        FakeFleet {
            attributes: FleetAttributes {
                fleet_arn: Some(format!("{}{}", ARN_PREFIX, fleet_id)),
                fleet_id,
                name: spec.name.clone(),
                description: spec.description.clone(),
                build_id: Some(spec.build_id.clone()),
                build_arn: Some(format!(
                    "arn:aws:gamelift:us-west-2:123456789012:build/{}",
                    spec.build_id
                )),
                fleet_type: Some(spec.fleet_type),
                instance_type: Some(spec.ec2_instance_type.clone()),
                instance_role_arn: spec.instance_role_arn.clone(),
                status: FleetStatus::New,
                log_paths: Vec::new(),
                metric_groups: if spec.metric_groups.is_empty() {
                    vec!["default".to_string()]
                } else {
                    spec.metric_groups.clone()
                },
                operating_system: Some("AMAZON_LINUX_2".to_string()),
                new_game_session_protection_policy: Some(spec.new_game_session_protection_policy),
                resource_creation_limit_policy: limit_policy_with_defaults(
                    spec.resource_creation_limit_policy,
                ),
                certificate_type: Some(spec.certificate_type),
            },
            ports: spec.ec2_inbound_permissions.clone(),
            runtime: spec.runtime_configuration.as_ref().map(with_service_defaults),
            tags: spec.tags.clone(),
            pending: VecDeque::new(),
            deleting: false,
            events: Vec::new(),
        }
    }

    fn fleet_mut(&mut self, operation: &str, fleet_id: &str) -> Result<&mut FakeFleet> {
        self.fleets.get_mut(fleet_id).ok_or_else(|| {
            GameLiftError::api(operation, NOT_FOUND, format!("Fleet {} not found.", fleet_id))
        })
    }

    fn fleet_by_arn_mut(&mut self, operation: &str, arn: &str) -> Result<&mut FakeFleet> {
        self.fleets
            .values_mut()
            .find(|f| f.attributes.fleet_arn.as_deref() == Some(arn))
            .ok_or_else(|| {
                GameLiftError::api(operation, NOT_FOUND, format!("Resource {} not found.", arn))
            })
    }
}

#[async_trait]
impl GameLiftApi for FakeGameLift {
    async fn create_fleet(&self, spec: &FleetSpec) -> Result<FleetAttributes> {
        let mut state = self.state.lock().await;
        state.record("CreateFleet");

        if state.auth_failures > 0 {
            state.auth_failures -= 1;
            return Err(GameLiftError::api(
                "CreateFleet",
                INVALID_REQUEST,
                "GameLift is not authorized to perform: iam:PassRole on resource: game-server-role",
            ));
        }

        let mut fleet = state.new_fleet(spec);
        fleet.pending = state.activation.iter().cloned().collect();
        let attributes = fleet.attributes.clone();
        state.fleets.insert(attributes.fleet_id.clone(), fleet);
        Ok(attributes)
    }

    async fn describe_fleet(&self, fleet_id: &str) -> Result<Option<FleetAttributes>> {
        let mut state = self.state.lock().await;
        state.record("DescribeFleetAttributes");

        let Some(fleet) = state.fleets.get_mut(fleet_id) else {
            return Ok(None);
        };
        if let Some(next) = fleet.pending.pop_front() {
            if next == FleetStatus::Error {
                fleet.events.insert(
                    0,
                    FleetEvent {
                        event_code: "FLEET_ACTIVATION_FAILED_NO_INSTANCES".to_string(),
                        message: Some(format!(
                            "Fleet {} failed to activate: server process exited with code 1",
                            fleet_id
                        )),
                    },
                );
            }
            fleet.attributes.status = next;
        } else if fleet.deleting {
            state.fleets.remove(fleet_id);
            state.policies.retain(|(fleet, _), _| fleet != fleet_id);
            return Ok(None);
        }
        Ok(Some(fleet.attributes.clone()))
    }

    async fn describe_fleet_port_settings(&self, fleet_id: &str) -> Result<Vec<IpPermission>> {
        let mut state = self.state.lock().await;
        state.record("DescribeFleetPortSettings");
        Ok(state
            .fleet_mut("DescribeFleetPortSettings", fleet_id)?
            .ports
            .clone())
    }

    async fn describe_runtime_configuration(
        &self,
        fleet_id: &str,
    ) -> Result<Option<RuntimeConfiguration>> {
        let mut state = self.state.lock().await;
        state.record("DescribeRuntimeConfiguration");
        Ok(state
            .fleet_mut("DescribeRuntimeConfiguration", fleet_id)?
            .runtime
            .clone())
    }

    async fn describe_fleet_events(&self, fleet_id: &str, limit: usize) -> Result<Vec<FleetEvent>> {
        let mut state = self.state.lock().await;
        state.record("DescribeFleetEvents");
        let fleet = state.fleet_mut("DescribeFleetEvents", fleet_id)?;
        Ok(fleet.events.iter().take(limit).cloned().collect())
    }

    async fn update_fleet_attributes(
        &self,
        fleet_id: &str,
        update: &FleetAttributesUpdate,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("UpdateFleetAttributes");
        if update.description.as_deref() == Some("") {
            return Err(GameLiftError::api(
                "UpdateFleetAttributes",
                "ValidationException",
                "1 validation error detected: Value '' at 'description' failed to satisfy \
                 constraint: Member must have length greater than or equal to 1",
            ));
        }
        let fleet = state.fleet_mut("UpdateFleetAttributes", fleet_id)?;
        fleet.attributes.name = update.name.clone();
        fleet.attributes.description = update.description.clone();
        fleet.attributes.metric_groups = update.metric_groups.clone();
        fleet.attributes.new_game_session_protection_policy =
            Some(update.new_game_session_protection_policy);
        fleet.attributes.resource_creation_limit_policy =
            limit_policy_with_defaults(update.resource_creation_limit_policy);
        Ok(())
    }

    async fn update_fleet_port_settings(
        &self,
        fleet_id: &str,
        delta: &PortSettingsDelta,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("UpdateFleetPortSettings");
        let fleet = state.fleet_mut("UpdateFleetPortSettings", fleet_id)?;
        fleet.ports = SetDiff::from(delta).apply_to(&fleet.ports).into_iter().collect();
        Ok(())
    }

    async fn update_runtime_configuration(
        &self,
        fleet_id: &str,
        runtime: &RuntimeConfiguration,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("UpdateRuntimeConfiguration");
        state.fleet_mut("UpdateRuntimeConfiguration", fleet_id)?.runtime =
            Some(with_service_defaults(runtime));
        Ok(())
    }

    async fn delete_fleet(&self, fleet_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("DeleteFleet");

        let conflict = state.delete_conflicts > 0;
        if conflict {
            state.delete_conflicts -= 1;
        }
        let termination: VecDeque<FleetStatus> = state.termination.iter().cloned().collect();

        let fleet = state.fleet_mut("DeleteFleet", fleet_id)?;
        if conflict {
            return Err(GameLiftError::api(
                "DeleteFleet",
                INVALID_REQUEST,
                format!(
                    "Cannot delete fleet {} that is in status of {}.",
                    fleet_id, fleet.attributes.status
                ),
            ));
        }
        fleet.attributes.status = FleetStatus::Deleting;
        fleet.pending = termination;
        fleet.deleting = true;
        Ok(())
    }

    async fn list_fleets(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        state.record("ListFleets");
        Ok(state.fleets.keys().cloned().collect())
    }

    async fn list_tags(&self, arn: &str) -> Result<BTreeMap<String, String>> {
        let mut state = self.state.lock().await;
        state.record("ListTagsForResource");
        if state.untaggable {
            return Err(GameLiftError::api(
                "ListTagsForResource",
                INVALID_REQUEST,
                format!("Resource {} is not in a taggable state", arn),
            ));
        }
        Ok(state.fleet_by_arn_mut("ListTagsForResource", arn)?.tags.clone())
    }

    async fn tag_resource(&self, arn: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("TagResource");
        let fleet = state.fleet_by_arn_mut("TagResource", arn)?;
        fleet
            .tags
            .extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("UntagResource");
        let fleet = state.fleet_by_arn_mut("UntagResource", arn)?;
        for key in keys {
            fleet.tags.remove(key);
        }
        Ok(())
    }

    async fn put_scaling_policy(&self, fleet_id: &str, spec: &ScalingPolicySpec) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("PutScalingPolicy");
        let fleet_arn = state
            .fleet_mut("PutScalingPolicy", fleet_id)?
            .attributes
            .fleet_arn
            .clone();
        let pending = state.policy_activation.iter().cloned().collect();

        let policy = ScalingPolicy {
            fleet_id: fleet_id.to_string(),
            fleet_arn,
            name: spec.name.clone(),
            status: ScalingStatus::UpdateRequested,
            metric_name: Some(spec.metric_name),
            policy_type: Some(spec.policy_type),
            scaling_adjustment: spec.scaling_adjustment,
            scaling_adjustment_type: spec.scaling_adjustment_type,
            threshold: spec.threshold,
            comparison_operator: spec.comparison_operator,
            evaluation_periods: spec.evaluation_periods,
            target_configuration: spec.target_configuration,
        };
        state.policies.insert(
            (fleet_id.to_string(), spec.name.clone()),
            FakePolicy {
                policy,
                pending,
                deleting: false,
            },
        );
        Ok(())
    }

    async fn describe_scaling_policies(&self, fleet_id: &str) -> Result<Vec<ScalingPolicy>> {
        let mut state = self.state.lock().await;
        state.record("DescribeScalingPolicies");
        state.fleet_mut("DescribeScalingPolicies", fleet_id)?;

        let mut found = Vec::new();
        let mut gone = Vec::new();
        for (key, entry) in state.policies.iter_mut() {
            if key.0 != fleet_id {
                continue;
            }
            if let Some(next) = entry.pending.pop_front() {
                entry.policy.status = next;
            } else if entry.deleting {
                gone.push(key.clone());
                continue;
            }
            found.push(entry.policy.clone());
        }
        for key in gone {
            state.policies.remove(&key);
        }
        Ok(found)
    }

    async fn delete_scaling_policy(&self, fleet_id: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("DeleteScalingPolicy");
        let key = (fleet_id.to_string(), name.to_string());
        match state.policies.get_mut(&key) {
            Some(entry) => {
                entry.policy.status = ScalingStatus::DeleteRequested;
                entry.pending.clear();
                entry.deleting = true;
                Ok(())
            }
            None => Err(GameLiftError::api(
                "DeleteScalingPolicy",
                NOT_FOUND,
                format!("Scaling policy {} not found for fleet {}.", name, fleet_id),
            )),
        }
    }
}
