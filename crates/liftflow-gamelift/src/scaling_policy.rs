//! Fleet scaling policies
//!
//! A policy is identified by its fleet and name, stored as `<fleet_id>/<name>`.
//! Creation and in-place updates both go through PutScalingPolicy.

use crate::api::GameLiftApi;
use crate::config::ProviderConfig;
use crate::error::{GameLiftError, Result};
use crate::model::{ScalingPolicy, ScalingPolicySpec, ScalingStatus};
use liftflow_cloud::{PollStatus, ResourceState, ResourceStatus, WaitConfig, wait_until};
use tracing::{debug, info};

pub const RESOURCE_TYPE: &str = "scaling_policy";

pub fn policy_id(fleet_id: &str, name: &str) -> String {
    format!("{}/{}", fleet_id, name)
}

/// Split a `<fleet_id>/<name>` identity
pub fn parse_policy_id(id: &str) -> Result<(&str, &str)> {
    match id.split_once('/') {
        Some((fleet_id, name)) if !fleet_id.is_empty() && !name.is_empty() => Ok((fleet_id, name)),
        _ => Err(GameLiftError::InvalidConfig(format!(
            "scaling policy id '{}' must look like <fleet_id>/<name>",
            id
        ))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyChanges {
    /// Fleet or name changed; the old policy must be deleted
    pub replace: bool,
    pub fields: Vec<&'static str>,
}

impl PolicyChanges {
    pub fn is_empty(&self) -> bool {
        !self.replace && self.fields.is_empty()
    }
}

/// Compare a spec, already resolved to `fleet_id`, against the remote policy
pub fn diff(spec: &ScalingPolicySpec, fleet_id: &str, policy: &ScalingPolicy) -> PolicyChanges {
    let mut changes = PolicyChanges {
        replace: policy.fleet_id != fleet_id || policy.name != spec.name,
        fields: Vec::new(),
    };

    if policy.metric_name != Some(spec.metric_name) {
        changes.fields.push("metric_name");
    }
    if policy.policy_type.unwrap_or_default() != spec.policy_type {
        changes.fields.push("policy_type");
    }
    if policy.scaling_adjustment != spec.scaling_adjustment {
        changes.fields.push("scaling_adjustment");
    }
    if policy.scaling_adjustment_type != spec.scaling_adjustment_type {
        changes.fields.push("scaling_adjustment_type");
    }
    if policy.threshold != spec.threshold {
        changes.fields.push("threshold");
    }
    if policy.comparison_operator != spec.comparison_operator {
        changes.fields.push("comparison_operator");
    }
    if policy.evaluation_periods != spec.evaluation_periods {
        changes.fields.push("evaluation_periods");
    }
    if policy.target_configuration != spec.target_configuration {
        changes.fields.push("target_configuration");
    }
    changes
}

/// Create or overwrite a policy and wait until it is ACTIVE
pub async fn put<A>(
    api: &A,
    config: &ProviderConfig,
    fleet_id: &str,
    spec: &ScalingPolicySpec,
) -> Result<ScalingPolicy>
where
    A: GameLiftApi + ?Sized,
{
    info!("Putting scaling policy {} on fleet {}", spec.name, fleet_id);
    api.put_scaling_policy(fleet_id, spec).await?;

    let id = policy_id(fleet_id, &spec.name);
    let wait = WaitConfig::new(config.poll_interval, config.timeouts.scaling_policy);
    let name = spec.name.as_str();
    let policy = wait_until(&id, &wait, move || activation_status(api, fleet_id, name)).await?;
    Ok(policy)
}

/// Look a policy up by name; `None` when the policy or its fleet is gone
pub async fn read<A>(api: &A, fleet_id: &str, name: &str) -> Result<Option<ScalingPolicy>>
where
    A: GameLiftApi + ?Sized,
{
    debug!("Describing scaling policy {}/{}", fleet_id, name);
    match api.describe_scaling_policies(fleet_id).await {
        Ok(policies) => Ok(policies.into_iter().find(|p| p.name == name)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Delete a policy and wait until it is gone; a missing policy counts as deleted
pub async fn delete<A>(api: &A, config: &ProviderConfig, fleet_id: &str, name: &str) -> Result<()>
where
    A: GameLiftApi + ?Sized,
{
    info!("Deleting scaling policy {} from fleet {}", name, fleet_id);
    match api.delete_scaling_policy(fleet_id, name).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            info!("Scaling policy {}/{} is already gone", fleet_id, name);
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    let id = policy_id(fleet_id, name);
    let wait = WaitConfig::new(config.poll_interval, config.timeouts.scaling_policy);
    wait_until(&id, &wait, move || deletion_status(api, fleet_id, name)).await?;
    Ok(())
}

/// Read an existing policy for adoption into state
pub async fn import<A>(api: &A, id: &str) -> Result<ScalingPolicy>
where
    A: GameLiftApi + ?Sized,
{
    let (fleet_id, name) = parse_policy_id(id)?;
    read(api, fleet_id, name)
        .await?
        .ok_or_else(|| GameLiftError::ScalingPolicyNotFound(id.to_string()))
}

async fn activation_status<A>(
    api: &A,
    fleet_id: &str,
    name: &str,
) -> liftflow_cloud::Result<PollStatus<ScalingPolicy>>
where
    A: GameLiftApi + ?Sized,
{
    let Some(policy) = read(api, fleet_id, name).await? else {
        return Ok(PollStatus::Pending("NOT_FOUND".to_string()));
    };
    match &policy.status {
        ScalingStatus::Active => Ok(PollStatus::Ready(policy)),
        ScalingStatus::UpdateRequested | ScalingStatus::Updating => {
            Ok(PollStatus::Pending(policy.status.to_string()))
        }
        other => Ok(PollStatus::Failed(format!(
            "scaling policy entered status {}",
            other
        ))),
    }
}

async fn deletion_status<A>(
    api: &A,
    fleet_id: &str,
    name: &str,
) -> liftflow_cloud::Result<PollStatus<()>>
where
    A: GameLiftApi + ?Sized,
{
    match read(api, fleet_id, name).await? {
        None => Ok(PollStatus::Ready(())),
        Some(policy) => match &policy.status {
            ScalingStatus::Deleted => Ok(PollStatus::Ready(())),
            ScalingStatus::Error => Ok(PollStatus::Failed(
                "scaling policy entered status ERROR while deleting".to_string(),
            )),
            other => Ok(PollStatus::Pending(other.to_string())),
        },
    }
}

pub fn resource_status(status: &ScalingStatus) -> ResourceStatus {
    match status {
        ScalingStatus::Active => ResourceStatus::Active,
        ScalingStatus::UpdateRequested | ScalingStatus::Updating => ResourceStatus::Updating,
        ScalingStatus::DeleteRequested | ScalingStatus::Deleting | ScalingStatus::Deleted => {
            ResourceStatus::Deleting
        }
        ScalingStatus::Error => ResourceStatus::Error,
        ScalingStatus::Other(_) => ResourceStatus::Unknown,
    }
}

pub fn to_resource_state(policy: &ScalingPolicy) -> Result<ResourceState> {
    Ok(
        ResourceState::new(policy_id(&policy.fleet_id, &policy.name), RESOURCE_TYPE)
            .with_status(resource_status(&policy.status))
            .with_attributes_from(policy)?,
    )
}
