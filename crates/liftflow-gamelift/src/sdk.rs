//! `GameLiftApi` backed by aws-sdk-gamelift

use crate::api::GameLiftApi;
use crate::config::ProviderConfig;
use crate::error::{GameLiftError, Result};
use crate::model::{
    CertificateType, FleetAttributes, FleetAttributesUpdate, FleetEvent, FleetSpec, FleetStatus,
    IpPermission, ResourceCreationLimitPolicy, RuntimeConfiguration, ScalingPolicy,
    ScalingPolicySpec, ScalingStatus, ServerProcess, TargetConfiguration,
};
use crate::ports::PortSettingsDelta;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_gamelift::Client;
use aws_sdk_gamelift::config::Region;
use aws_sdk_gamelift::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_gamelift::types as sdk;
use std::collections::BTreeMap;
use std::str::FromStr;

/// GameLift client using the default AWS credential chain
#[derive(Debug, Clone)]
pub struct SdkGameLift {
    client: Client,
}

impl SdkGameLift {
    pub async fn new(config: &ProviderConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &config.endpoint_url {
            tracing::debug!("Using GameLift endpoint override {}", endpoint);
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        Self {
            client: Client::new(&sdk_config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn api_error<E, R>(operation: &str, err: SdkError<E, R>) -> GameLiftError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().unwrap_or("Unknown").to_string();
    let message = match err.message() {
        Some(message) => message.to_string(),
        None => DisplayErrorContext(&err).to_string(),
    };
    GameLiftError::api(operation, code, message)
}

fn build_error(what: &str, err: aws_sdk_gamelift::error::BuildError) -> GameLiftError {
    GameLiftError::InvalidConfig(format!("{}: {}", what, err))
}

fn to_i32(field: &str, value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| GameLiftError::InvalidConfig(format!("{} is out of range: {}", field, value)))
}

fn from_i32<T: TryFrom<i32>>(operation: &str, field: &str, value: i32) -> Result<T> {
    T::try_from(value).map_err(|_| {
        GameLiftError::UnexpectedResponse(format!("{}: {} out of range: {}", operation, field, value))
    })
}

/// Parse a service enum into a model enum; unknown values become `None`
fn known<T: FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.parse().ok())
}

fn sdk_permission(permission: &IpPermission) -> Result<sdk::IpPermission> {
    Ok(sdk::IpPermission::builder()
        .from_port(i32::from(permission.from_port))
        .to_port(i32::from(permission.to_port))
        .ip_range(&permission.ip_range)
        .protocol(sdk::IpProtocol::from(permission.protocol.as_str()))
        .build())
}

fn sdk_permissions(permissions: &[IpPermission]) -> Result<Vec<sdk::IpPermission>> {
    permissions.iter().map(sdk_permission).collect()
}

fn model_permission(permission: &sdk::IpPermission) -> Result<IpPermission> {
    const OP: &str = "DescribeFleetPortSettings";
    Ok(IpPermission {
        from_port: from_i32(OP, "from_port", permission.from_port())?,
        to_port: from_i32(OP, "to_port", permission.to_port())?,
        ip_range: permission.ip_range().to_string(),
        protocol: permission.protocol().as_str().parse()?,
    })
}

fn sdk_runtime(runtime: &RuntimeConfiguration) -> Result<sdk::RuntimeConfiguration> {
    let processes = runtime
        .server_processes
        .iter()
        .map(|p| -> Result<sdk::ServerProcess> {
            Ok(sdk::ServerProcess::builder()
                .launch_path(&p.launch_path)
                .set_parameters(p.parameters.clone())
                .concurrent_executions(to_i32("concurrent_executions", p.concurrent_executions)?)
                .build())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(sdk::RuntimeConfiguration::builder()
        .set_server_processes(Some(processes))
        .set_game_session_activation_timeout_seconds(
            runtime
                .game_session_activation_timeout_seconds
                .map(|v| to_i32("game_session_activation_timeout_seconds", v))
                .transpose()?,
        )
        .set_max_concurrent_game_session_activations(
            runtime
                .max_concurrent_game_session_activations
                .map(|v| to_i32("max_concurrent_game_session_activations", v))
                .transpose()?,
        )
        .build())
}

fn model_runtime(runtime: &sdk::RuntimeConfiguration) -> Result<RuntimeConfiguration> {
    const OP: &str = "DescribeRuntimeConfiguration";
    let server_processes = runtime
        .server_processes()
        .iter()
        .map(|p| -> Result<ServerProcess> {
            Ok(ServerProcess {
                launch_path: p.launch_path().to_string(),
                parameters: p.parameters().filter(|s| !s.is_empty()).map(str::to_string),
                concurrent_executions: from_i32(OP, "concurrent_executions", p.concurrent_executions())?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RuntimeConfiguration {
        game_session_activation_timeout_seconds: runtime
            .game_session_activation_timeout_seconds()
            .map(|v| from_i32(OP, "game_session_activation_timeout_seconds", v))
            .transpose()?,
        max_concurrent_game_session_activations: runtime
            .max_concurrent_game_session_activations()
            .map(|v| from_i32(OP, "max_concurrent_game_session_activations", v))
            .transpose()?,
        server_processes,
    })
}

fn sdk_limit_policy(policy: &ResourceCreationLimitPolicy) -> Result<sdk::ResourceCreationLimitPolicy> {
    Ok(sdk::ResourceCreationLimitPolicy::builder()
        .set_new_game_sessions_per_creator(
            policy
                .new_game_sessions_per_creator
                .map(|v| to_i32("new_game_sessions_per_creator", v))
                .transpose()?,
        )
        .set_policy_period_in_minutes(
            policy
                .policy_period_in_minutes
                .map(|v| to_i32("policy_period_in_minutes", v))
                .transpose()?,
        )
        .build())
}

fn model_limit_policy(policy: &sdk::ResourceCreationLimitPolicy) -> ResourceCreationLimitPolicy {
    ResourceCreationLimitPolicy {
        new_game_sessions_per_creator: policy
            .new_game_sessions_per_creator()
            .and_then(|v| u32::try_from(v).ok()),
        policy_period_in_minutes: policy
            .policy_period_in_minutes()
            .and_then(|v| u32::try_from(v).ok()),
    }
}

fn sdk_tags(tags: &BTreeMap<String, String>) -> Result<Vec<sdk::Tag>> {
    tags.iter()
        .map(|(k, v)| {
            Ok(sdk::Tag::builder()
                .key(k)
                .value(v)
                .build())
        })
        .collect()
}

fn model_attributes(attributes: &sdk::FleetAttributes) -> Result<FleetAttributes> {
    let fleet_id = attributes
        .fleet_id()
        .ok_or_else(|| GameLiftError::UnexpectedResponse("fleet without FleetId".to_string()))?;

    Ok(FleetAttributes {
        fleet_id: fleet_id.to_string(),
        fleet_arn: attributes.fleet_arn().map(str::to_string),
        name: attributes.name().unwrap_or_default().to_string(),
        description: attributes.description().map(str::to_string),
        build_id: attributes.build_id().map(str::to_string),
        build_arn: attributes.build_arn().map(str::to_string),
        fleet_type: known(attributes.fleet_type().map(|t| t.as_str())),
        instance_type: attributes.instance_type().map(|t| t.as_str().to_string()),
        instance_role_arn: attributes.instance_role_arn().map(str::to_string),
        status: attributes
            .status()
            .map(|s| FleetStatus::from(s.as_str()))
            .unwrap_or(FleetStatus::New),
        log_paths: attributes.log_paths().to_vec(),
        metric_groups: attributes.metric_groups().to_vec(),
        operating_system: attributes.operating_system().map(|o| o.as_str().to_string()),
        new_game_session_protection_policy: known(
            attributes
                .new_game_session_protection_policy()
                .map(|p| p.as_str()),
        ),
        resource_creation_limit_policy: attributes
            .resource_creation_limit_policy()
            .map(model_limit_policy),
        certificate_type: attributes
            .certificate_configuration()
            .and_then(|c| c.certificate_type().and_then(|t| t.as_str().parse::<CertificateType>().ok())),
    })
}

fn model_policy(policy: &sdk::ScalingPolicy) -> ScalingPolicy {
    ScalingPolicy {
        fleet_id: policy.fleet_id().unwrap_or_default().to_string(),
        fleet_arn: policy.fleet_arn().map(str::to_string),
        name: policy.name().unwrap_or_default().to_string(),
        status: policy
            .status()
            .map(|s| ScalingStatus::from(s.as_str()))
            .unwrap_or(ScalingStatus::Other("UNKNOWN".to_string())),
        metric_name: known(policy.metric_name().map(|m| m.as_str())),
        policy_type: known(policy.policy_type().map(|p| p.as_str())),
        scaling_adjustment: policy
            .scaling_adjustment_type()
            .and_then(|_| policy.scaling_adjustment()),
        scaling_adjustment_type: known(policy.scaling_adjustment_type().map(|t| t.as_str())),
        threshold: policy
            .comparison_operator()
            .and_then(|_| policy.threshold()),
        comparison_operator: known(policy.comparison_operator().map(|c| c.as_str())),
        evaluation_periods: policy
            .evaluation_periods()
            .and_then(|v| u32::try_from(v).ok()),
        target_configuration: policy.target_configuration().map(|t| TargetConfiguration {
            target_value: t.target_value(),
        }),
    }
}

#[async_trait]
impl GameLiftApi for SdkGameLift {
    async fn create_fleet(&self, spec: &FleetSpec) -> Result<FleetAttributes> {
        const OP: &str = "CreateFleet";

        let certificate = sdk::CertificateConfiguration::builder()
            .certificate_type(sdk::CertificateType::from(spec.certificate_type.as_str()))
            .build();

        let mut request = self
            .client
            .create_fleet()
            .name(&spec.name)
            .build_id(&spec.build_id)
            .ec2_instance_type(sdk::Ec2InstanceType::from(spec.ec2_instance_type.as_str()))
            .set_description(spec.description.clone())
            .fleet_type(sdk::FleetType::from(spec.fleet_type.as_str()))
            .set_instance_role_arn(spec.instance_role_arn.clone())
            .new_game_session_protection_policy(sdk::ProtectionPolicy::from(
                spec.new_game_session_protection_policy.as_str(),
            ))
            .certificate_configuration(certificate);

        if !spec.metric_groups.is_empty() {
            request = request.set_metric_groups(Some(spec.metric_groups.clone()));
        }
        if !spec.ec2_inbound_permissions.is_empty() {
            request =
                request.set_ec2_inbound_permissions(Some(sdk_permissions(&spec.ec2_inbound_permissions)?));
        }
        if let Some(policy) = &spec.resource_creation_limit_policy {
            request = request.resource_creation_limit_policy(sdk_limit_policy(policy)?);
        }
        if let Some(runtime) = &spec.runtime_configuration {
            request = request.runtime_configuration(sdk_runtime(runtime)?);
        }
        if !spec.tags.is_empty() {
            request = request.set_tags(Some(sdk_tags(&spec.tags)?));
        }

        let output = request.send().await.map_err(|e| api_error(OP, e))?;
        let attributes = output
            .fleet_attributes()
            .ok_or_else(|| GameLiftError::UnexpectedResponse(OP.to_string()))?;
        model_attributes(attributes)
    }

    async fn describe_fleet(&self, fleet_id: &str) -> Result<Option<FleetAttributes>> {
        const OP: &str = "DescribeFleetAttributes";
        let output = match self
            .client
            .describe_fleet_attributes()
            .fleet_ids(fleet_id)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let err = api_error(OP, e);
                if err.is_not_found() {
                    return Ok(None);
                }
                return Err(err);
            }
        };

        output
            .fleet_attributes()
            .iter()
            .find(|a| a.fleet_id() == Some(fleet_id))
            .map(model_attributes)
            .transpose()
    }

    async fn describe_fleet_port_settings(&self, fleet_id: &str) -> Result<Vec<IpPermission>> {
        let output = self
            .client
            .describe_fleet_port_settings()
            .fleet_id(fleet_id)
            .send()
            .await
            .map_err(|e| api_error("DescribeFleetPortSettings", e))?;
        output
            .inbound_permissions()
            .iter()
            .map(model_permission)
            .collect()
    }

    async fn describe_runtime_configuration(
        &self,
        fleet_id: &str,
    ) -> Result<Option<RuntimeConfiguration>> {
        let output = self
            .client
            .describe_runtime_configuration()
            .fleet_id(fleet_id)
            .send()
            .await
            .map_err(|e| api_error("DescribeRuntimeConfiguration", e))?;
        output.runtime_configuration().map(model_runtime).transpose()
    }

    async fn describe_fleet_events(&self, fleet_id: &str, limit: usize) -> Result<Vec<FleetEvent>> {
        let output = self
            .client
            .describe_fleet_events()
            .fleet_id(fleet_id)
            .limit(i32::try_from(limit).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|e| api_error("DescribeFleetEvents", e))?;

        let mut events: Vec<&sdk::Event> = output.events().iter().collect();
        events.sort_by_key(|e| std::cmp::Reverse(e.event_time().map(|t| t.secs())));
        Ok(events
            .into_iter()
            .take(limit)
            .map(|e| FleetEvent {
                event_code: e
                    .event_code()
                    .map(|c| c.as_str().to_string())
                    .unwrap_or_default(),
                message: e.message().map(str::to_string),
            })
            .collect())
    }

    async fn update_fleet_attributes(
        &self,
        fleet_id: &str,
        update: &FleetAttributesUpdate,
    ) -> Result<()> {
        let mut request = self
            .client
            .update_fleet_attributes()
            .fleet_id(fleet_id)
            .name(&update.name)
            .set_description(update.description.clone())
            .set_metric_groups(Some(update.metric_groups.clone()))
            .new_game_session_protection_policy(sdk::ProtectionPolicy::from(
                update.new_game_session_protection_policy.as_str(),
            ));
        if let Some(policy) = &update.resource_creation_limit_policy {
            request = request.resource_creation_limit_policy(sdk_limit_policy(policy)?);
        }
        request
            .send()
            .await
            .map_err(|e| api_error("UpdateFleetAttributes", e))?;
        Ok(())
    }

    async fn update_fleet_port_settings(
        &self,
        fleet_id: &str,
        delta: &PortSettingsDelta,
    ) -> Result<()> {
        let mut request = self.client.update_fleet_port_settings().fleet_id(fleet_id);
        if !delta.authorizations.is_empty() {
            request = request
                .set_inbound_permission_authorizations(Some(sdk_permissions(&delta.authorizations)?));
        }
        if !delta.revocations.is_empty() {
            request =
                request.set_inbound_permission_revocations(Some(sdk_permissions(&delta.revocations)?));
        }
        request
            .send()
            .await
            .map_err(|e| api_error("UpdateFleetPortSettings", e))?;
        Ok(())
    }

    async fn update_runtime_configuration(
        &self,
        fleet_id: &str,
        runtime: &RuntimeConfiguration,
    ) -> Result<()> {
        self.client
            .update_runtime_configuration()
            .fleet_id(fleet_id)
            .runtime_configuration(sdk_runtime(runtime)?)
            .send()
            .await
            .map_err(|e| api_error("UpdateRuntimeConfiguration", e))?;
        Ok(())
    }

    async fn delete_fleet(&self, fleet_id: &str) -> Result<()> {
        self.client
            .delete_fleet()
            .fleet_id(fleet_id)
            .send()
            .await
            .map_err(|e| api_error("DeleteFleet", e))?;
        Ok(())
    }

    async fn list_fleets(&self) -> Result<Vec<String>> {
        let mut fleet_ids = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .client
                .list_fleets()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| api_error("ListFleets", e))?;
            fleet_ids.extend(output.fleet_ids().iter().cloned());
            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(fleet_ids)
    }

    async fn list_tags(&self, arn: &str) -> Result<BTreeMap<String, String>> {
        let output = self
            .client
            .list_tags_for_resource()
            .resource_arn(arn)
            .send()
            .await
            .map_err(|e| api_error("ListTagsForResource", e))?;
        Ok(output
            .tags()
            .iter()
            .map(|t| (t.key().to_string(), t.value().to_string()))
            .collect())
    }

    async fn tag_resource(&self, arn: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        self.client
            .tag_resource()
            .resource_arn(arn)
            .set_tags(Some(sdk_tags(tags)?))
            .send()
            .await
            .map_err(|e| api_error("TagResource", e))?;
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<()> {
        self.client
            .untag_resource()
            .resource_arn(arn)
            .set_tag_keys(Some(keys.to_vec()))
            .send()
            .await
            .map_err(|e| api_error("UntagResource", e))?;
        Ok(())
    }

    async fn put_scaling_policy(&self, fleet_id: &str, spec: &ScalingPolicySpec) -> Result<()> {
        let target = spec
            .target_configuration
            .map(|t| {
                sdk::TargetConfiguration::builder()
                    .target_value(t.target_value)
                    .build()
            });
        let evaluation_periods = spec
            .evaluation_periods
            .map(|v| to_i32("evaluation_periods", v))
            .transpose()?;

        self.client
            .put_scaling_policy()
            .fleet_id(fleet_id)
            .name(&spec.name)
            .metric_name(sdk::MetricName::from(spec.metric_name.as_str()))
            .policy_type(sdk::PolicyType::from(spec.policy_type.as_str()))
            .set_scaling_adjustment(spec.scaling_adjustment)
            .set_scaling_adjustment_type(
                spec.scaling_adjustment_type
                    .map(|t| sdk::ScalingAdjustmentType::from(t.as_str())),
            )
            .set_threshold(spec.threshold)
            .set_comparison_operator(
                spec.comparison_operator
                    .map(|c| sdk::ComparisonOperatorType::from(c.as_str())),
            )
            .set_evaluation_periods(evaluation_periods)
            .set_target_configuration(target)
            .send()
            .await
            .map_err(|e| api_error("PutScalingPolicy", e))?;
        Ok(())
    }

    async fn describe_scaling_policies(&self, fleet_id: &str) -> Result<Vec<ScalingPolicy>> {
        let mut policies = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .client
                .describe_scaling_policies()
                .fleet_id(fleet_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| api_error("DescribeScalingPolicies", e))?;
            policies.extend(output.scaling_policies().iter().map(model_policy));
            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(policies)
    }

    async fn delete_scaling_policy(&self, fleet_id: &str, name: &str) -> Result<()> {
        self.client
            .delete_scaling_policy()
            .fleet_id(fleet_id)
            .name(name)
            .send()
            .await
            .map_err(|e| api_error("DeleteScalingPolicy", e))?;
        Ok(())
    }
}
