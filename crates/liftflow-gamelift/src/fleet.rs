//! Fleet lifecycle: create, read, diff, update, delete, import

use crate::api::GameLiftApi;
use crate::config::ProviderConfig;
use crate::error::{GameLiftError, INVALID_REQUEST, Result};
use crate::model::{
    Fleet, FleetAttributes, FleetAttributesUpdate, FleetSpec, FleetStatus,
    ResourceCreationLimitPolicy, RuntimeConfiguration,
};
use crate::ports::{PortSettingsDelta, diff_port_settings};
use crate::tags::{TagDelta, diff_tags};
use liftflow_cloud::{
    PollStatus, ResourceState, ResourceStatus, WaitConfig, retry_until, wait_until,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Resource type name in manifests and state
pub const RESOURCE_TYPE: &str = "fleet";

const NOT_AUTHORIZED: &str = "GameLift is not authorized to perform";
const NOT_TAGGABLE: &str = "is not in a taggable state";
const FAILURE_EVENTS: usize = 5;

/// Everything that differs between a fleet spec and the remote fleet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetChanges {
    /// Changed fields that can only be applied by recreating the fleet
    pub replace_fields: Vec<&'static str>,
    /// Changed fields sent with UpdateFleetAttributes
    pub attribute_fields: Vec<&'static str>,
    pub ports: PortSettingsDelta,
    pub runtime_configuration: bool,
    pub tags: TagDelta,
}

impl FleetChanges {
    pub fn is_empty(&self) -> bool {
        self.replace_fields.is_empty()
            && self.attribute_fields.is_empty()
            && self.ports.is_empty()
            && !self.runtime_configuration
            && self.tags.is_empty()
    }

    pub fn requires_replacement(&self) -> bool {
        !self.replace_fields.is_empty()
    }

    /// Human-readable change list for plan output
    pub fn describe(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .replace_fields
            .iter()
            .map(|f| format!("{} (forces replacement)", f))
            .collect();
        lines.extend(self.attribute_fields.iter().map(|f| f.to_string()));
        for rule in &self.ports.revocations {
            lines.push(format!("revoke {}", rule));
        }
        for rule in &self.ports.authorizations {
            lines.push(format!("authorize {}", rule));
        }
        if self.runtime_configuration {
            lines.push("runtime_configuration".to_string());
        }
        for (key, value) in &self.tags.upsert {
            lines.push(format!("tag {}={}", key, value));
        }
        for key in &self.tags.remove {
            lines.push(format!("untag {}", key));
        }
        lines
    }
}

/// Compare a spec against the remote fleet.
///
/// Spec fields the service fills in when left unset (metric groups, creation
/// limit policy, runtime configuration) are only compared when set. A fleet
/// in ERROR never recovers, so it always needs replacing.
pub fn diff(spec: &FleetSpec, fleet: &Fleet) -> FleetChanges {
    let remote = &fleet.attributes;
    let mut changes = FleetChanges::default();

    if remote.status == FleetStatus::Error {
        changes.replace_fields.push("status");
    }

    if remote.build_id.as_deref() != Some(spec.build_id.as_str()) {
        changes.replace_fields.push("build_id");
    }
    if remote.instance_type.as_deref() != Some(spec.ec2_instance_type.as_str()) {
        changes.replace_fields.push("ec2_instance_type");
    }
    if remote.fleet_type.unwrap_or_default() != spec.fleet_type {
        changes.replace_fields.push("fleet_type");
    }
    if remote.instance_role_arn != spec.instance_role_arn {
        changes.replace_fields.push("instance_role_arn");
    }
    if remote.certificate_type.unwrap_or_default() != spec.certificate_type {
        changes.replace_fields.push("certificate_type");
    }

    if remote.name != spec.name {
        changes.attribute_fields.push("name");
    }
    if remote.description.as_deref().filter(|d| !d.is_empty()) != spec.description.as_deref() {
        changes.attribute_fields.push("description");
    }
    if !spec.metric_groups.is_empty() && remote.metric_groups != spec.metric_groups {
        changes.attribute_fields.push("metric_groups");
    }
    if remote.new_game_session_protection_policy.unwrap_or_default()
        != spec.new_game_session_protection_policy
    {
        changes
            .attribute_fields
            .push("new_game_session_protection_policy");
    }
    if spec.resource_creation_limit_policy.as_ref().is_some_and(|desired| {
        !limit_policy_matches(desired, remote.resource_creation_limit_policy.as_ref())
    }) {
        changes
            .attribute_fields
            .push("resource_creation_limit_policy");
    }

    changes.ports = diff_port_settings(&fleet.ec2_inbound_permissions, &spec.ec2_inbound_permissions);
    changes.runtime_configuration = spec
        .runtime_configuration
        .as_ref()
        .is_some_and(|desired| !runtime_matches(desired, fleet.runtime_configuration.as_ref()));
    changes.tags = diff_tags(&fleet.tags, &spec.tags);

    changes
}

/// `None` in the desired value leaves the service default alone
fn optional_matches<T: PartialEq>(desired: Option<T>, remote: Option<T>) -> bool {
    desired.is_none() || desired == remote
}

fn limit_policy_matches(
    desired: &ResourceCreationLimitPolicy,
    remote: Option<&ResourceCreationLimitPolicy>,
) -> bool {
    let remote = remote.copied().unwrap_or_default();
    optional_matches(
        desired.new_game_sessions_per_creator,
        remote.new_game_sessions_per_creator,
    ) && optional_matches(desired.policy_period_in_minutes, remote.policy_period_in_minutes)
}

/// Server processes always take part; the activation limits only when set.
fn runtime_matches(desired: &RuntimeConfiguration, remote: Option<&RuntimeConfiguration>) -> bool {
    let Some(remote) = remote else {
        return false;
    };
    desired.server_processes == remote.server_processes
        && optional_matches(
            desired.game_session_activation_timeout_seconds,
            remote.game_session_activation_timeout_seconds,
        )
        && optional_matches(
            desired.max_concurrent_game_session_activations,
            remote.max_concurrent_game_session_activations,
        )
}

/// Send CreateFleet, retrying while the instance role propagates.
///
/// Returns as soon as the service has assigned a fleet id. The fleet is still
/// activating; follow up with [`wait_created`].
pub async fn start_create<A>(
    api: &A,
    config: &ProviderConfig,
    spec: &FleetSpec,
) -> Result<FleetAttributes>
where
    A: GameLiftApi + ?Sized,
{
    info!("Creating GameLift fleet {}", spec.name);

    let created = retry_until(
        "CreateFleet",
        &config.retry,
        config.timeouts.iam_propagation,
        |e: &GameLiftError| e.message_contains(INVALID_REQUEST, NOT_AUTHORIZED),
        move || api.create_fleet(spec),
    )
    .await?;

    info!("Created fleet {} ({})", spec.name, created.fleet_id);
    Ok(created)
}

/// Wait for a new fleet to become ACTIVE and read it back
pub async fn wait_created<A>(api: &A, config: &ProviderConfig, fleet_id: &str) -> Result<Fleet>
where
    A: GameLiftApi + ?Sized,
{
    info!("Waiting for fleet {} to become ACTIVE", fleet_id);
    wait_active(api, config, fleet_id).await?;
    read(api, fleet_id)
        .await?
        .ok_or_else(|| GameLiftError::FleetNotFound(fleet_id.to_string()))
}

/// Read the full fleet; `None` when it no longer exists
pub async fn read<A>(api: &A, fleet_id: &str) -> Result<Option<Fleet>>
where
    A: GameLiftApi + ?Sized,
{
    debug!("Describing fleet {}", fleet_id);

    let attributes = match api.describe_fleet(fleet_id).await {
        Ok(Some(attributes)) => attributes,
        Ok(None) => return Ok(None),
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e),
    };

    let ec2_inbound_permissions = api.describe_fleet_port_settings(fleet_id).await?;
    let runtime_configuration = api.describe_runtime_configuration(fleet_id).await?;

    let tags = match attributes.fleet_arn.as_deref() {
        Some(arn) => match api.list_tags(arn).await {
            Ok(tags) => tags,
            Err(e) if e.message_contains(INVALID_REQUEST, NOT_TAGGABLE) => {
                debug!("Fleet {} is not taggable yet, skipping tags", fleet_id);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        },
        None => BTreeMap::new(),
    };

    Ok(Some(Fleet {
        attributes,
        ec2_inbound_permissions,
        runtime_configuration,
        tags,
    }))
}

/// Apply in-place changes to an existing fleet and read it back
pub async fn update<A>(api: &A, spec: &FleetSpec, fleet: &Fleet) -> Result<Fleet>
where
    A: GameLiftApi + ?Sized,
{
    let fleet_id = fleet.id();
    let changes = diff(spec, fleet);

    if changes.requires_replacement() {
        return Err(GameLiftError::InvalidConfig(format!(
            "fleet {} cannot be updated in place, changed: {}",
            fleet_id,
            changes.replace_fields.join(", ")
        )));
    }

    if !changes.attribute_fields.is_empty() {
        info!(
            "Updating attributes of fleet {}: {}",
            fleet_id,
            changes.attribute_fields.join(", ")
        );
        let mut update = FleetAttributesUpdate::from(spec);
        if update.metric_groups.is_empty() {
            update.metric_groups = fleet.attributes.metric_groups.clone();
        }
        if update.resource_creation_limit_policy.is_none() {
            update.resource_creation_limit_policy = fleet.attributes.resource_creation_limit_policy;
        }
        api.update_fleet_attributes(fleet_id, &update).await?;
    }

    if !changes.ports.is_empty() {
        info!(
            "Updating port settings of fleet {}: {} to authorize, {} to revoke",
            fleet_id,
            changes.ports.authorizations.len(),
            changes.ports.revocations.len()
        );
        api.update_fleet_port_settings(fleet_id, &changes.ports).await?;
    }

    if changes.runtime_configuration {
        if let Some(runtime) = &spec.runtime_configuration {
            info!("Updating runtime configuration of fleet {}", fleet_id);
            api.update_runtime_configuration(fleet_id, runtime).await?;
        }
    }

    if !changes.tags.is_empty() {
        apply_tags(api, fleet, &changes.tags).await?;
    }

    read(api, fleet_id)
        .await?
        .ok_or_else(|| GameLiftError::FleetNotFound(fleet_id.to_string()))
}

async fn apply_tags<A>(api: &A, fleet: &Fleet, delta: &TagDelta) -> Result<()>
where
    A: GameLiftApi + ?Sized,
{
    let Some(arn) = fleet.arn() else {
        warn!("Fleet {} has no ARN, skipping tag update", fleet.id());
        return Ok(());
    };
    if !delta.remove.is_empty() {
        debug!("Removing tags {:?} from {}", delta.remove, arn);
        api.untag_resource(arn, &delta.remove).await?;
    }
    if !delta.upsert.is_empty() {
        debug!("Tagging {} with {} tags", arn, delta.upsert.len());
        api.tag_resource(arn, &delta.upsert).await?;
    }
    Ok(())
}

/// Delete a fleet and wait until it is gone.
///
/// A fleet that does not exist counts as deleted.
pub async fn delete<A>(api: &A, config: &ProviderConfig, fleet_id: &str) -> Result<()>
where
    A: GameLiftApi + ?Sized,
{
    info!("Deleting GameLift fleet {}", fleet_id);

    // GameLift refuses to delete fleets that are still activating or retrying
    // a broken launch path; this can last close to an hour.
    let conflict = format!("Cannot delete fleet {} that is in status of ", fleet_id);
    let result = retry_until(
        "DeleteFleet",
        &config.retry,
        config.timeouts.fleet_delete_conflict,
        |e: &GameLiftError| e.message_contains(INVALID_REQUEST, &conflict),
        move || api.delete_fleet(fleet_id),
    )
    .await;

    match result {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            info!("Fleet {} is already gone", fleet_id);
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    wait_terminated(api, config, fleet_id).await
}

/// Read an existing fleet for adoption into state
pub async fn import<A>(api: &A, fleet_id: &str) -> Result<Fleet>
where
    A: GameLiftApi + ?Sized,
{
    read(api, fleet_id)
        .await?
        .ok_or_else(|| GameLiftError::FleetNotFound(fleet_id.to_string()))
}

/// Poll until the fleet is ACTIVE.
///
/// ERROR fails the wait with the most recent fleet event attached.
pub async fn wait_active<A>(
    api: &A,
    config: &ProviderConfig,
    fleet_id: &str,
) -> Result<FleetAttributes>
where
    A: GameLiftApi + ?Sized,
{
    let wait = WaitConfig::new(config.poll_interval, config.timeouts.fleet_create);
    let attributes = wait_until(fleet_id, &wait, move || activation_status(api, fleet_id)).await?;
    Ok(attributes)
}

/// Poll until the fleet is TERMINATED or no longer listed
pub async fn wait_terminated<A>(api: &A, config: &ProviderConfig, fleet_id: &str) -> Result<()>
where
    A: GameLiftApi + ?Sized,
{
    let wait = WaitConfig::new(config.poll_interval, config.timeouts.fleet_delete);
    wait_until(fleet_id, &wait, move || termination_status(api, fleet_id)).await?;
    info!("Fleet {} terminated", fleet_id);
    Ok(())
}

async fn activation_status<A>(
    api: &A,
    fleet_id: &str,
) -> liftflow_cloud::Result<PollStatus<FleetAttributes>>
where
    A: GameLiftApi + ?Sized,
{
    let Some(attributes) = api.describe_fleet(fleet_id).await? else {
        // Newly created fleets can be briefly invisible to Describe calls
        return Ok(PollStatus::Pending(FleetStatus::NotFound.to_string()));
    };

    match &attributes.status {
        FleetStatus::Active => Ok(PollStatus::Ready(attributes)),
        FleetStatus::New
        | FleetStatus::Downloading
        | FleetStatus::Validating
        | FleetStatus::Building
        | FleetStatus::Activating => Ok(PollStatus::Pending(attributes.status.to_string())),
        other => {
            let mut reason = format!("fleet entered status {}", other);
            if let Some(event) = latest_failure(api, fleet_id).await {
                reason.push_str(": ");
                reason.push_str(&event);
            }
            Ok(PollStatus::Failed(reason))
        }
    }
}

async fn termination_status<A>(api: &A, fleet_id: &str) -> liftflow_cloud::Result<PollStatus<()>>
where
    A: GameLiftApi + ?Sized,
{
    let attributes = match api.describe_fleet(fleet_id).await {
        Ok(Some(attributes)) => attributes,
        Ok(None) => return Ok(PollStatus::Ready(())),
        Err(e) if e.is_not_found() => return Ok(PollStatus::Ready(())),
        Err(e) => return Err(e.into()),
    };

    match &attributes.status {
        FleetStatus::Terminated | FleetStatus::NotFound => Ok(PollStatus::Ready(())),
        FleetStatus::Active | FleetStatus::Deleting | FleetStatus::Error => {
            Ok(PollStatus::Pending(attributes.status.to_string()))
        }
        other => Ok(PollStatus::Failed(format!(
            "fleet entered status {} while deleting",
            other
        ))),
    }
}

async fn latest_failure<A>(api: &A, fleet_id: &str) -> Option<String>
where
    A: GameLiftApi + ?Sized,
{
    match api.describe_fleet_events(fleet_id, FAILURE_EVENTS).await {
        Ok(events) => events.into_iter().find_map(|event| {
            event
                .message
                .map(|message| format!("{} ({})", message, event.event_code))
        }),
        Err(e) => {
            debug!("Could not read events of fleet {}: {}", fleet_id, e);
            None
        }
    }
}

/// Map a fleet status onto the generic resource status
pub fn resource_status(status: &FleetStatus) -> ResourceStatus {
    match status {
        FleetStatus::Active => ResourceStatus::Active,
        FleetStatus::New
        | FleetStatus::Downloading
        | FleetStatus::Validating
        | FleetStatus::Building
        | FleetStatus::Activating => ResourceStatus::Creating,
        FleetStatus::Deleting | FleetStatus::Terminated => ResourceStatus::Deleting,
        FleetStatus::Error => ResourceStatus::Error,
        FleetStatus::NotFound | FleetStatus::Other(_) => ResourceStatus::Unknown,
    }
}

/// State entry for a fleet known only from its CreateFleet response
pub fn pending_state(attributes: &FleetAttributes) -> Result<ResourceState> {
    to_resource_state(&Fleet {
        attributes: attributes.clone(),
        ec2_inbound_permissions: Vec::new(),
        runtime_configuration: None,
        tags: BTreeMap::new(),
    })
}

/// State entry for a fleet; the fleet id is the remote identity
pub fn to_resource_state(fleet: &Fleet) -> Result<ResourceState> {
    Ok(ResourceState::new(fleet.id(), RESOURCE_TYPE)
        .with_status(resource_status(&fleet.attributes.status))
        .with_attributes_from(fleet)?)
}
