//! `CloudProvider` implementation for Amazon GameLift

use crate::api::GameLiftApi;
use crate::config::ProviderConfig;
use crate::error::GameLiftError;
use crate::fleet;
use crate::model::{
    Fleet, FleetAttributes, FleetSpec, FleetStatus, ScalingPolicy, ScalingPolicySpec,
};
use crate::scaling_policy;
use async_trait::async_trait;
use liftflow_cloud::{
    Action, ActionType, ApplyResult, AuthStatus, CloudError, CloudProvider, Plan, ProviderState,
    ResourceConfig, ResourceSet, ResourceState, Result,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{error, info, warn};

pub const PROVIDER_NAME: &str = "gamelift";

/// GameLift provider managing fleets and their scaling policies
///
/// Fleets are applied before the policies that reference them and deleted
/// after them. A policy names its fleet either by manifest name (`fleet`),
/// resolved to the fleet id recorded in state when applied, or directly by
/// `fleet_id`.
pub struct GameLiftProvider<A> {
    api: A,
    config: ProviderConfig,
}

impl<A: GameLiftApi> GameLiftProvider<A> {
    pub fn new(api: A, config: ProviderConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[cfg(feature = "aws-sdk")]
impl GameLiftProvider<crate::sdk::SdkGameLift> {
    /// Provider backed by the AWS SDK, using the default credential chain
    pub async fn from_config(config: ProviderConfig) -> Self {
        let api = crate::sdk::SdkGameLift::new(&config).await;
        Self::new(api, config)
    }
}

fn state_key(resource_type: &str, name: &str) -> String {
    format!("{}:{}", resource_type, name)
}

/// Prefix validation errors with the resource key
fn invalid(key: &str, err: GameLiftError) -> CloudError {
    match err {
        GameLiftError::InvalidConfig(msg) => CloudError::InvalidConfig(format!("{}: {}", key, msg)),
        other => other.into(),
    }
}

fn parse_fleet(resource: &ResourceConfig) -> Result<FleetSpec> {
    let mut spec: FleetSpec = resource.parse()?;
    if spec.name.is_empty() {
        spec.name = resource.id.clone();
    }
    spec.validate().map_err(|e| invalid(&resource.key(), e))?;
    Ok(spec)
}

fn parse_policy(resource: &ResourceConfig) -> Result<ScalingPolicySpec> {
    let mut spec: ScalingPolicySpec = resource.parse()?;
    if spec.name.is_empty() {
        spec.name = resource.id.clone();
    }
    spec.validate().map_err(|e| invalid(&resource.key(), e))?;
    Ok(spec)
}

/// Typed and validated view of a manifest's GameLift resources
#[derive(Debug, Clone, Default)]
pub struct Desired {
    pub fleets: BTreeMap<String, FleetSpec>,
    pub policies: BTreeMap<String, ScalingPolicySpec>,
}

/// Parse every resource and check cross references without calling the API
pub fn parse_desired(desired: &ResourceSet) -> Result<Desired> {
    let mut parsed = Desired::default();

    for resource in desired.iter() {
        match resource.resource_type.as_str() {
            fleet::RESOURCE_TYPE => {
                parsed
                    .fleets
                    .insert(resource.id.clone(), parse_fleet(resource)?);
            }
            scaling_policy::RESOURCE_TYPE => {
                parsed
                    .policies
                    .insert(resource.id.clone(), parse_policy(resource)?);
            }
            other => return Err(CloudError::UnsupportedResource(other.to_string())),
        }
    }

    for (name, spec) in &parsed.policies {
        if let Some(fleet_name) = &spec.fleet
            && !parsed.fleets.contains_key(fleet_name)
        {
            return Err(CloudError::InvalidConfig(format!(
                "{}: references undeclared fleet {}",
                state_key(scaling_policy::RESOURCE_TYPE, name),
                fleet_name
            )));
        }
    }

    Ok(parsed)
}

fn config_detail<T: serde::de::DeserializeOwned>(action: &Action) -> Result<T> {
    action.detail("config").ok_or_else(|| {
        CloudError::InvalidConfig(format!("action {} has no usable config", action.id))
    })
}

fn remote_id(action: &Action) -> Result<String> {
    action.detail("remote_id").ok_or_else(|| {
        CloudError::StateError(format!("action {} has no remote id", action.id))
    })
}

/// Store `fresh` under `key`, keeping the original creation time
fn record(state: &mut ProviderState, key: String, mut fresh: ResourceState) {
    if let Some(previous) = state.get(&key) {
        fresh.created_at = previous.created_at;
    }
    state.add(key, fresh);
}

fn changed_action(
    resource_type: &str,
    name: &str,
    replace: bool,
    changes: Vec<String>,
) -> (ActionType, String) {
    if replace {
        (
            ActionType::Replace,
            format!("replace {} {} ({})", resource_type, name, changes.join(", ")),
        )
    } else if changes.is_empty() {
        (
            ActionType::NoOp,
            format!("{} {} is up to date", resource_type, name),
        )
    } else {
        (
            ActionType::Update,
            format!("update {} {} ({})", resource_type, name, changes.join(", ")),
        )
    }
}

impl<A: GameLiftApi> GameLiftProvider<A> {
    fn plan_fleets(
        &self,
        desired: &BTreeMap<String, FleetSpec>,
        current: &ProviderState,
    ) -> Result<(Vec<Action>, Vec<Action>)> {
        let mut deletes = Vec::new();
        let mut changes = Vec::new();

        for (name, spec) in desired {
            let key = state_key(fleet::RESOURCE_TYPE, name);
            let action = match current.get(&key) {
                None => Action::new(
                    ActionType::Create,
                    fleet::RESOURCE_TYPE,
                    name,
                    format!("create fleet {} ({})", name, spec.ec2_instance_type),
                ),
                Some(state) => {
                    let remote: Fleet = state.attributes_as()?;
                    let diff = fleet::diff(spec, &remote);
                    let (action_type, description) = changed_action(
                        fleet::RESOURCE_TYPE,
                        name,
                        diff.requires_replacement(),
                        diff.describe(),
                    );
                    Action::new(action_type, fleet::RESOURCE_TYPE, name, description)
                        .with_detail("remote_id", json!(state.id))
                        .with_detail("changes", json!(diff.describe()))
                }
            };
            changes.push(action.with_detail("config", serde_json::to_value(spec)?));
        }

        for (key, state) in current.iter() {
            if state.resource_type != fleet::RESOURCE_TYPE {
                continue;
            }
            let name = key.split_once(':').map(|(_, n)| n).unwrap_or(key);
            if !desired.contains_key(name) {
                deletes.push(
                    Action::new(
                        ActionType::Delete,
                        fleet::RESOURCE_TYPE,
                        name,
                        format!("delete fleet {} ({})", name, state.id),
                    )
                    .with_detail("remote_id", json!(state.id)),
                );
            }
        }

        Ok((deletes, changes))
    }

    fn plan_policies(
        &self,
        desired: &BTreeMap<String, ScalingPolicySpec>,
        fleet_actions: &[Action],
        current: &ProviderState,
    ) -> Result<(Vec<Action>, Vec<Action>)> {
        let mut deletes = Vec::new();
        let mut changes = Vec::new();

        for (name, spec) in desired {
            let key = state_key(scaling_policy::RESOURCE_TYPE, name);

            // A new or recreated fleet has no id yet and drops its policies
            let (fleet_id, fleet_recreated) = match (&spec.fleet, &spec.fleet_id) {
                (Some(fleet_name), _) => {
                    let fleet_key = state_key(fleet::RESOURCE_TYPE, fleet_name);
                    let recreated = fleet_actions.iter().any(|a| {
                        a.resource_key() == fleet_key
                            && matches!(a.action_type, ActionType::Create | ActionType::Replace)
                    });
                    let id = current.get(&fleet_key).map(|s| s.id.clone());
                    (if recreated { None } else { id }, recreated)
                }
                (None, Some(id)) => (Some(id.clone()), false),
                (None, None) => {
                    return Err(CloudError::InvalidConfig(format!(
                        "{}: needs fleet or fleet_id",
                        key
                    )));
                }
            };

            let action = match current.get(&key) {
                None => Action::new(
                    ActionType::Create,
                    scaling_policy::RESOURCE_TYPE,
                    name,
                    format!("create scaling policy {} ({})", name, spec.metric_name),
                ),
                Some(state) => {
                    let remote: ScalingPolicy = state.attributes_as()?;
                    let (replace, fields) = match &fleet_id {
                        Some(id) if !fleet_recreated => {
                            let diff = scaling_policy::diff(spec, id, &remote);
                            let mut fields: Vec<String> =
                                diff.fields.iter().map(|f| f.to_string()).collect();
                            if diff.replace {
                                fields.insert(0, "fleet or name (forces replacement)".to_string());
                            }
                            (diff.replace, fields)
                        }
                        _ => (true, vec!["fleet (forces replacement)".to_string()]),
                    };
                    let (action_type, description) =
                        changed_action(scaling_policy::RESOURCE_TYPE, name, replace, fields.clone());
                    Action::new(action_type, scaling_policy::RESOURCE_TYPE, name, description)
                        .with_detail("remote_id", json!(state.id))
                        .with_detail("changes", json!(fields))
                }
            };
            changes.push(action.with_detail("config", serde_json::to_value(spec)?));
        }

        for (key, state) in current.iter() {
            if state.resource_type != scaling_policy::RESOURCE_TYPE {
                continue;
            }
            let name = key.split_once(':').map(|(_, n)| n).unwrap_or(key);
            if !desired.contains_key(name) {
                deletes.push(
                    Action::new(
                        ActionType::Delete,
                        scaling_policy::RESOURCE_TYPE,
                        name,
                        format!("delete scaling policy {} ({})", name, state.id),
                    )
                    .with_detail("remote_id", json!(state.id)),
                );
            }
        }

        Ok((deletes, changes))
    }

    /// Create a fleet and track it in state as soon as it has an id.
    ///
    /// A fleet that fails to activate stays tracked with status Error, so the
    /// next plan replaces it rather than creating a second fleet.
    async fn create_fleet(
        &self,
        key: &str,
        spec: &FleetSpec,
        state: &mut ProviderState,
    ) -> Result<Fleet> {
        let created = fleet::start_create(&self.api, &self.config, spec).await?;
        record(state, key.to_string(), fleet::pending_state(&created)?);

        match fleet::wait_created(&self.api, &self.config, &created.fleet_id).await {
            Ok(active) => {
                record(state, key.to_string(), fleet::to_resource_state(&active)?);
                Ok(active)
            }
            Err(e) => {
                warn!(
                    "Fleet {} ({}) did not become ACTIVE, keeping it in state",
                    spec.name, created.fleet_id
                );
                let failed = FleetAttributes {
                    status: FleetStatus::Error,
                    ..created
                };
                record(state, key.to_string(), fleet::pending_state(&failed)?);
                Err(e.into())
            }
        }
    }

    async fn apply_fleet(&self, action: &Action, state: &mut ProviderState) -> Result<String> {
        let key = action.resource_key();
        match action.action_type {
            ActionType::Create => {
                let spec: FleetSpec = config_detail(action)?;
                let created = self.create_fleet(&key, &spec, state).await?;
                Ok(format!("created fleet {} ({})", spec.name, created.id()))
            }
            ActionType::Update => {
                let spec: FleetSpec = config_detail(action)?;
                let id = remote_id(action)?;
                let current = fleet::read(&self.api, &id)
                    .await?
                    .ok_or_else(|| CloudError::ResourceNotFound(id.clone()))?;
                let updated = fleet::update(&self.api, &spec, &current).await?;
                record(state, key, fleet::to_resource_state(&updated)?);
                Ok(format!("updated fleet {} ({})", spec.name, id))
            }
            ActionType::Replace => {
                let spec: FleetSpec = config_detail(action)?;
                let old_id = remote_id(action)?;
                fleet::delete(&self.api, &self.config, &old_id).await?;
                state.remove(&key);
                let created = self.create_fleet(&key, &spec, state).await?;
                Ok(format!(
                    "replaced fleet {} ({} -> {})",
                    spec.name,
                    old_id,
                    created.id()
                ))
            }
            ActionType::Delete => {
                let id = remote_id(action)?;
                fleet::delete(&self.api, &self.config, &id).await?;
                state.remove(&key);
                Ok(format!("deleted fleet {} ({})", action.resource_id, id))
            }
            ActionType::NoOp => Ok(String::new()),
        }
    }

    /// Fleet id a policy attaches to, looked up in state for manifest references
    fn resolve_fleet_id(&self, spec: &ScalingPolicySpec, state: &ProviderState) -> Result<String> {
        if let Some(id) = &spec.fleet_id {
            return Ok(id.clone());
        }
        let name = spec.fleet.as_deref().unwrap_or_default();
        state
            .get(&state_key(fleet::RESOURCE_TYPE, name))
            .map(|s| s.id.clone())
            .ok_or_else(|| {
                CloudError::StateError(format!(
                    "scaling policy {} references fleet {} which is not in state",
                    spec.name, name
                ))
            })
    }

    async fn apply_policy(&self, action: &Action, state: &mut ProviderState) -> Result<String> {
        let key = action.resource_key();
        match action.action_type {
            ActionType::Create | ActionType::Update => {
                let spec: ScalingPolicySpec = config_detail(action)?;
                let fleet_id = self.resolve_fleet_id(&spec, state)?;
                let policy = scaling_policy::put(&self.api, &self.config, &fleet_id, &spec).await?;
                record(state, key, scaling_policy::to_resource_state(&policy)?);
                Ok(format!(
                    "{} scaling policy {} on fleet {}",
                    if action.action_type == ActionType::Create { "created" } else { "updated" },
                    spec.name,
                    fleet_id
                ))
            }
            ActionType::Replace => {
                let spec: ScalingPolicySpec = config_detail(action)?;
                let old_id = remote_id(action)?;
                let (old_fleet, old_name) = scaling_policy::parse_policy_id(&old_id)?;
                scaling_policy::delete(&self.api, &self.config, old_fleet, old_name).await?;
                state.remove(&key);

                let fleet_id = self.resolve_fleet_id(&spec, state)?;
                let policy = scaling_policy::put(&self.api, &self.config, &fleet_id, &spec).await?;
                state.add(key, scaling_policy::to_resource_state(&policy)?);
                Ok(format!(
                    "replaced scaling policy {} ({} -> {})",
                    spec.name,
                    old_id,
                    scaling_policy::policy_id(&fleet_id, &spec.name)
                ))
            }
            ActionType::Delete => {
                let id = remote_id(action)?;
                let (fleet_id, name) = scaling_policy::parse_policy_id(&id)?;
                scaling_policy::delete(&self.api, &self.config, fleet_id, name).await?;
                state.remove(&key);
                Ok(format!("deleted scaling policy {} ({})", action.resource_id, id))
            }
            ActionType::NoOp => Ok(String::new()),
        }
    }

    async fn destroy_resource(&self, resource: &ResourceState) -> Result<()> {
        match resource.resource_type.as_str() {
            fleet::RESOURCE_TYPE => fleet::delete(&self.api, &self.config, &resource.id).await?,
            scaling_policy::RESOURCE_TYPE => {
                let (fleet_id, name) = scaling_policy::parse_policy_id(&resource.id)?;
                scaling_policy::delete(&self.api, &self.config, fleet_id, name).await?
            }
            other => return Err(CloudError::UnsupportedResource(other.to_string())),
        }
        Ok(())
    }

    /// Keys of tracked policies attached to `fleet_id`
    fn policies_of(state: &ProviderState, fleet_id: &str) -> Vec<String> {
        state
            .iter()
            .filter(|(_, r)| {
                r.resource_type == scaling_policy::RESOURCE_TYPE
                    && r.get_attribute::<String>("fleet_id").as_deref() == Some(fleet_id)
            })
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl<A: GameLiftApi> CloudProvider for GameLiftProvider<A> {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "Amazon GameLift"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        match self.api.list_fleets().await {
            Ok(fleets) => {
                let region = self.config.region.as_deref().unwrap_or("default region");
                Ok(AuthStatus::ok(format!(
                    "{} ({} fleets visible)",
                    region,
                    fleets.len()
                )))
            }
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn refresh(&self, current: &ProviderState) -> Result<ProviderState> {
        let mut refreshed = ProviderState::new();

        for (key, resource) in current.iter() {
            let fresh = match resource.resource_type.as_str() {
                fleet::RESOURCE_TYPE => match fleet::read(&self.api, &resource.id).await? {
                    Some(remote) => Some(fleet::to_resource_state(&remote)?),
                    None => None,
                },
                scaling_policy::RESOURCE_TYPE => {
                    let (fleet_id, name) = scaling_policy::parse_policy_id(&resource.id)?;
                    match scaling_policy::read(&self.api, fleet_id, name).await? {
                        Some(remote) => Some(scaling_policy::to_resource_state(&remote)?),
                        None => None,
                    }
                }
                other => {
                    warn!("Unknown resource type {} in state, keeping {}", other, key);
                    Some(resource.clone())
                }
            };

            match fresh {
                Some(mut fresh) => {
                    fresh.created_at = resource.created_at;
                    refreshed.add(key.clone(), fresh);
                }
                None => warn!(
                    "{} ({}) no longer exists, removing from state",
                    key, resource.id
                ),
            }
        }

        Ok(refreshed)
    }

    async fn plan(&self, desired: &ResourceSet, current: &ProviderState) -> Result<Plan> {
        let Desired { fleets, policies } = parse_desired(desired)?;

        let (fleet_deletes, fleet_changes) = self.plan_fleets(&fleets, current)?;
        let (policy_deletes, policy_changes) =
            self.plan_policies(&policies, &fleet_changes, current)?;

        let actions: Vec<Action> = policy_deletes
            .into_iter()
            .chain(fleet_deletes)
            .chain(fleet_changes)
            .chain(policy_changes)
            .collect();

        let plan = Plan::new(actions);
        info!("Planned: {}", plan.summary());
        Ok(plan)
    }

    async fn apply(&self, plan: &Plan, state: &mut ProviderState) -> Result<ApplyResult> {
        let mut result = ApplyResult::new();
        let start = Instant::now();

        for action in &plan.actions {
            if action.action_type == ActionType::NoOp {
                continue;
            }
            info!("Applying {}", action.id);

            let outcome = match action.resource_type.as_str() {
                fleet::RESOURCE_TYPE => self.apply_fleet(action, state).await,
                scaling_policy::RESOURCE_TYPE => self.apply_policy(action, state).await,
                other => Err(CloudError::UnsupportedResource(other.to_string())),
            };

            match outcome {
                Ok(message) => result.add_success(action.id.clone(), message),
                Err(e) => {
                    error!("{} failed: {}", action.id, e);
                    result.add_failure(action.id.clone(), e.to_string());
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn import(
        &self,
        resource_type: &str,
        name: &str,
        remote_id: &str,
    ) -> Result<ResourceState> {
        info!("Importing {} {} from {}", resource_type, name, remote_id);
        match resource_type {
            fleet::RESOURCE_TYPE => {
                let remote = fleet::import(&self.api, remote_id).await?;
                Ok(fleet::to_resource_state(&remote)?)
            }
            scaling_policy::RESOURCE_TYPE => {
                let remote = scaling_policy::import(&self.api, remote_id).await?;
                Ok(scaling_policy::to_resource_state(&remote)?)
            }
            other => Err(CloudError::UnsupportedResource(other.to_string())),
        }
    }

    async fn destroy(&self, state: &mut ProviderState, resource_key: &str) -> Result<()> {
        let resource = state
            .get(resource_key)
            .cloned()
            .ok_or_else(|| CloudError::ResourceNotFound(resource_key.to_string()))?;

        if resource.resource_type == fleet::RESOURCE_TYPE {
            for policy_key in Self::policies_of(state, &resource.id) {
                if let Some(policy) = state.get(&policy_key).cloned() {
                    self.destroy_resource(&policy).await?;
                    state.remove(&policy_key);
                }
            }
        }

        self.destroy_resource(&resource).await?;
        state.remove(resource_key);
        info!("Destroyed {} ({})", resource_key, resource.id);
        Ok(())
    }

    async fn destroy_all(&self, state: &mut ProviderState) -> Result<ApplyResult> {
        let mut result = ApplyResult::new();
        let start = Instant::now();

        let mut keys: Vec<(String, String)> = state
            .iter()
            .map(|(k, r)| (k.clone(), r.resource_type.clone()))
            .collect();
        // policies first, their fleets would take them down anyway
        keys.sort_by_key(|(_, t)| t != scaling_policy::RESOURCE_TYPE);

        for (key, _) in keys {
            let Some(resource) = state.get(&key).cloned() else {
                continue;
            };
            let action_id = format!("{}-{}", ActionType::Delete, key);
            match self.destroy_resource(&resource).await {
                Ok(()) => {
                    state.remove(&key);
                    result.add_success(action_id, format!("deleted {} ({})", key, resource.id));
                }
                Err(e) => {
                    error!("Failed to delete {}: {}", key, e);
                    result.add_failure(action_id, e.to_string());
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }
}
