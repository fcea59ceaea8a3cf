//! GameLift resource models
//!
//! `*Spec` types are the desired configuration deserialized from the
//! manifest. The remaining types mirror what the API reports back and are
//! stored as resource attributes in the state file.

use crate::error::{GameLiftError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::str::FromStr;

const MAX_INBOUND_PERMISSIONS: usize = 50;
const MAX_SERVER_PROCESSES: usize = 50;
const MAX_PORT: u16 = 60000;
const MAX_TEXT_LEN: usize = 1024;
const MAX_METRIC_GROUP_LEN: usize = 255;

/// Closed string enums as they appear on the wire. Parsing is case-insensitive
/// so manifests may write `udp` or `on_demand`.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = GameLiftError;

            fn from_str(s: &str) -> Result<Self> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        GameLiftError::InvalidConfig(format!(
                            "invalid {} '{}', expected one of: {}",
                            stringify!($name),
                            s,
                            $name::ALL
                                .iter()
                                .map(|v| v.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        ))
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

wire_enum!(
    /// Network protocol of an inbound permission
    IpProtocol { Tcp => "TCP", Udp => "UDP" }
);

wire_enum!(
    /// Billing model of fleet instances
    FleetType { OnDemand => "ON_DEMAND", Spot => "SPOT" }
);

wire_enum!(
    /// Protection applied to newly created game sessions
    ProtectionPolicy { NoProtection => "NoProtection", FullProtection => "FullProtection" }
);

wire_enum!(
    /// TLS certificate generation for fleet instances
    CertificateType { Disabled => "DISABLED", Generated => "GENERATED" }
);

wire_enum!(
    PolicyType { RuleBased => "RuleBased", TargetBased => "TargetBased" }
);

wire_enum!(
    ScalingAdjustmentType {
        ChangeInCapacity => "ChangeInCapacity",
        ExactCapacity => "ExactCapacity",
        PercentChangeInCapacity => "PercentChangeInCapacity",
    }
);

wire_enum!(
    ComparisonOperator {
        GreaterThanOrEqualToThreshold => "GreaterThanOrEqualToThreshold",
        GreaterThanThreshold => "GreaterThanThreshold",
        LessThanThreshold => "LessThanThreshold",
        LessThanOrEqualToThreshold => "LessThanOrEqualToThreshold",
    }
);

wire_enum!(
    /// Fleet metric a scaling policy watches
    MetricName {
        ActivatingGameSessions => "ActivatingGameSessions",
        ActiveGameSessions => "ActiveGameSessions",
        ActiveInstances => "ActiveInstances",
        AvailableGameSessions => "AvailableGameSessions",
        AvailablePlayerSessions => "AvailablePlayerSessions",
        ConcurrentActivatableGameSessions => "ConcurrentActivatableGameSessions",
        CurrentPlayerSessions => "CurrentPlayerSessions",
        IdleInstances => "IdleInstances",
        PercentAvailableGameSessions => "PercentAvailableGameSessions",
        PercentIdleInstances => "PercentIdleInstances",
        QueueDepth => "QueueDepth",
        WaitTime => "WaitTime",
    }
);

impl Default for FleetType {
    fn default() -> Self {
        FleetType::OnDemand
    }
}

impl Default for ProtectionPolicy {
    fn default() -> Self {
        ProtectionPolicy::NoProtection
    }
}

impl Default for CertificateType {
    fn default() -> Self {
        CertificateType::Disabled
    }
}

impl Default for PolicyType {
    fn default() -> Self {
        PolicyType::RuleBased
    }
}

/// Lifecycle status of a fleet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FleetStatus {
    New,
    Downloading,
    Validating,
    Building,
    Activating,
    Active,
    Deleting,
    Error,
    Terminated,
    NotFound,
    /// A status this build does not know about yet
    Other(String),
}

impl FleetStatus {
    pub fn as_str(&self) -> &str {
        match self {
            FleetStatus::New => "NEW",
            FleetStatus::Downloading => "DOWNLOADING",
            FleetStatus::Validating => "VALIDATING",
            FleetStatus::Building => "BUILDING",
            FleetStatus::Activating => "ACTIVATING",
            FleetStatus::Active => "ACTIVE",
            FleetStatus::Deleting => "DELETING",
            FleetStatus::Error => "ERROR",
            FleetStatus::Terminated => "TERMINATED",
            FleetStatus::NotFound => "NOT_FOUND",
            FleetStatus::Other(s) => s,
        }
    }
}

impl From<&str> for FleetStatus {
    fn from(s: &str) -> Self {
        match s {
            "NEW" => FleetStatus::New,
            "DOWNLOADING" => FleetStatus::Downloading,
            "VALIDATING" => FleetStatus::Validating,
            "BUILDING" => FleetStatus::Building,
            "ACTIVATING" => FleetStatus::Activating,
            "ACTIVE" => FleetStatus::Active,
            "DELETING" => FleetStatus::Deleting,
            "ERROR" => FleetStatus::Error,
            "TERMINATED" => FleetStatus::Terminated,
            "NOT_FOUND" => FleetStatus::NotFound,
            other => FleetStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for FleetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FleetStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FleetStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(FleetStatus::from(s.as_str()))
    }
}

/// Lifecycle status of a scaling policy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalingStatus {
    Active,
    UpdateRequested,
    Updating,
    DeleteRequested,
    Deleting,
    Deleted,
    Error,
    Other(String),
}

impl ScalingStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ScalingStatus::Active => "ACTIVE",
            ScalingStatus::UpdateRequested => "UPDATE_REQUESTED",
            ScalingStatus::Updating => "UPDATING",
            ScalingStatus::DeleteRequested => "DELETE_REQUESTED",
            ScalingStatus::Deleting => "DELETING",
            ScalingStatus::Deleted => "DELETED",
            ScalingStatus::Error => "ERROR",
            ScalingStatus::Other(s) => s,
        }
    }
}

impl From<&str> for ScalingStatus {
    fn from(s: &str) -> Self {
        match s {
            "ACTIVE" => ScalingStatus::Active,
            "UPDATE_REQUESTED" => ScalingStatus::UpdateRequested,
            "UPDATING" => ScalingStatus::Updating,
            "DELETE_REQUESTED" => ScalingStatus::DeleteRequested,
            "DELETING" => ScalingStatus::Deleting,
            "DELETED" => ScalingStatus::Deleted,
            "ERROR" => ScalingStatus::Error,
            other => ScalingStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ScalingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ScalingStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ScalingStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ScalingStatus::from(s.as_str()))
    }
}

/// Inbound port range opened on fleet instances
///
/// Two permissions are the same rule only if every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IpPermission {
    pub from_port: u16,
    pub to_port: u16,
    pub ip_range: String,
    pub protocol: IpProtocol,
}

impl IpPermission {
    pub fn new(from_port: u16, to_port: u16, ip_range: impl Into<String>, protocol: IpProtocol) -> Self {
        Self {
            from_port,
            to_port,
            ip_range: ip_range.into(),
            protocol,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.from_port == 0 || self.to_port > MAX_PORT || self.from_port > self.to_port {
            return Err(GameLiftError::InvalidConfig(format!(
                "invalid port range {}-{} (ports must be within 1-{} and from_port <= to_port)",
                self.from_port, self.to_port, MAX_PORT
            )));
        }

        let net: ipnet::IpNet = self.ip_range.parse().map_err(|_| {
            GameLiftError::InvalidConfig(format!("ip_range '{}' is not a CIDR block", self.ip_range))
        })?;
        if net.addr() != net.network() {
            return Err(GameLiftError::InvalidConfig(format!(
                "ip_range '{}' is not a network address (did you mean {}?)",
                self.ip_range,
                net.trunc()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for IpPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-{} from {}",
            self.protocol, self.from_port, self.to_port, self.ip_range
        )
    }
}

/// One server executable launched on every instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerProcess {
    pub launch_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    pub concurrent_executions: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_session_activation_timeout_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_game_session_activations: Option<u32>,
    #[serde(default, rename = "server_process")]
    pub server_processes: Vec<ServerProcess>,
}

impl RuntimeConfiguration {
    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.game_session_activation_timeout_seconds {
            if !(1..=600).contains(&t) {
                return Err(GameLiftError::InvalidConfig(format!(
                    "game_session_activation_timeout_seconds must be within 1-600, got {}",
                    t
                )));
            }
        }
        if self.max_concurrent_game_session_activations == Some(0) {
            return Err(GameLiftError::InvalidConfig(
                "max_concurrent_game_session_activations must be at least 1".to_string(),
            ));
        }
        if self.server_processes.len() > MAX_SERVER_PROCESSES {
            return Err(GameLiftError::InvalidConfig(format!(
                "at most {} server_process entries are allowed",
                MAX_SERVER_PROCESSES
            )));
        }
        for process in &self.server_processes {
            check_text("launch_path", &process.launch_path, MAX_TEXT_LEN)?;
            if let Some(parameters) = &process.parameters {
                check_text("parameters", parameters, MAX_TEXT_LEN)?;
            }
            if process.concurrent_executions == 0 {
                return Err(GameLiftError::InvalidConfig(format!(
                    "concurrent_executions for {} must be at least 1",
                    process.launch_path
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceCreationLimitPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_game_sessions_per_creator: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_period_in_minutes: Option<u32>,
}

/// Desired fleet configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetSpec {
    /// Remote fleet name; defaults to the manifest resource name
    #[serde(default)]
    pub name: String,
    pub build_id: String,
    pub ec2_instance_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fleet_type: FleetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_role_arn: Option<String>,
    /// Empty means "leave whatever the service assigned"
    #[serde(default)]
    pub metric_groups: Vec<String>,
    #[serde(default)]
    pub new_game_session_protection_policy: ProtectionPolicy,
    #[serde(default, rename = "ec2_inbound_permission")]
    pub ec2_inbound_permissions: Vec<IpPermission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_creation_limit_policy: Option<ResourceCreationLimitPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_configuration: Option<RuntimeConfiguration>,
    #[serde(default)]
    pub certificate_type: CertificateType,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl FleetSpec {
    pub fn validate(&self) -> Result<()> {
        check_text("name", &self.name, MAX_TEXT_LEN)?;
        if self.build_id.is_empty() {
            return Err(GameLiftError::InvalidConfig("build_id is required".to_string()));
        }
        if self.ec2_instance_type.is_empty() {
            return Err(GameLiftError::InvalidConfig(
                "ec2_instance_type is required".to_string(),
            ));
        }
        if let Some(description) = &self.description {
            check_text("description", description, MAX_TEXT_LEN)?;
        }
        if let Some(arn) = &self.instance_role_arn {
            if !arn.starts_with("arn:") {
                return Err(GameLiftError::InvalidConfig(format!(
                    "instance_role_arn '{}' is not an ARN",
                    arn
                )));
            }
        }
        for group in &self.metric_groups {
            check_text("metric_groups", group, MAX_METRIC_GROUP_LEN)?;
        }
        if self.ec2_inbound_permissions.len() > MAX_INBOUND_PERMISSIONS {
            return Err(GameLiftError::InvalidConfig(format!(
                "at most {} ec2_inbound_permission entries are allowed",
                MAX_INBOUND_PERMISSIONS
            )));
        }
        for permission in &self.ec2_inbound_permissions {
            permission.validate()?;
        }
        if let Some(runtime) = &self.runtime_configuration {
            runtime.validate()?;
        }
        Ok(())
    }
}

/// Fleet record as reported by DescribeFleetAttributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetAttributes {
    pub fleet_id: String,
    #[serde(default)]
    pub fleet_arn: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub build_id: Option<String>,
    #[serde(default)]
    pub build_arn: Option<String>,
    #[serde(default)]
    pub fleet_type: Option<FleetType>,
    #[serde(default)]
    pub instance_type: Option<String>,
    #[serde(default)]
    pub instance_role_arn: Option<String>,
    pub status: FleetStatus,
    #[serde(default)]
    pub log_paths: Vec<String>,
    #[serde(default)]
    pub metric_groups: Vec<String>,
    #[serde(default)]
    pub operating_system: Option<String>,
    #[serde(default)]
    pub new_game_session_protection_policy: Option<ProtectionPolicy>,
    #[serde(default)]
    pub resource_creation_limit_policy: Option<ResourceCreationLimitPolicy>,
    #[serde(default)]
    pub certificate_type: Option<CertificateType>,
}

/// Full read-back of a fleet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fleet {
    #[serde(flatten)]
    pub attributes: FleetAttributes,
    #[serde(default, rename = "ec2_inbound_permission")]
    pub ec2_inbound_permissions: Vec<IpPermission>,
    #[serde(default)]
    pub runtime_configuration: Option<RuntimeConfiguration>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Fleet {
    pub fn id(&self) -> &str {
        &self.attributes.fleet_id
    }

    pub fn arn(&self) -> Option<&str> {
        self.attributes.fleet_arn.as_deref()
    }
}

/// Mutable fleet attributes sent with UpdateFleetAttributes
#[derive(Debug, Clone, PartialEq)]
pub struct FleetAttributesUpdate {
    pub name: String,
    pub description: Option<String>,
    pub metric_groups: Vec<String>,
    pub new_game_session_protection_policy: ProtectionPolicy,
    pub resource_creation_limit_policy: Option<ResourceCreationLimitPolicy>,
}

impl From<&FleetSpec> for FleetAttributesUpdate {
    fn from(spec: &FleetSpec) -> Self {
        Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
            metric_groups: spec.metric_groups.clone(),
            new_game_session_protection_policy: spec.new_game_session_protection_policy,
            resource_creation_limit_policy: spec.resource_creation_limit_policy,
        }
    }
}

/// Entry of DescribeFleetEvents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetEvent {
    pub event_code: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfiguration {
    pub target_value: f64,
}

/// Desired scaling policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalingPolicySpec {
    /// Remote policy name; defaults to the manifest resource name
    #[serde(default)]
    pub name: String,
    /// Manifest name of the fleet this policy scales
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fleet: Option<String>,
    /// Literal fleet id, for fleets not managed by this manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fleet_id: Option<String>,
    pub metric_name: MetricName,
    #[serde(default)]
    pub policy_type: PolicyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling_adjustment: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling_adjustment_type: Option<ScalingAdjustmentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_operator: Option<ComparisonOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_periods: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_configuration: Option<TargetConfiguration>,
}

impl ScalingPolicySpec {
    pub fn validate(&self) -> Result<()> {
        check_text("name", &self.name, MAX_TEXT_LEN)?;
        match (&self.fleet, &self.fleet_id) {
            (Some(_), Some(_)) => {
                return Err(GameLiftError::InvalidConfig(format!(
                    "scaling policy {} sets both fleet and fleet_id",
                    self.name
                )));
            }
            (None, None) => {
                return Err(GameLiftError::InvalidConfig(format!(
                    "scaling policy {} needs fleet or fleet_id",
                    self.name
                )));
            }
            _ => {}
        }

        match self.policy_type {
            PolicyType::RuleBased => {
                let missing: Vec<&str> = [
                    ("scaling_adjustment", self.scaling_adjustment.is_none()),
                    ("scaling_adjustment_type", self.scaling_adjustment_type.is_none()),
                    ("threshold", self.threshold.is_none()),
                    ("comparison_operator", self.comparison_operator.is_none()),
                    ("evaluation_periods", self.evaluation_periods.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(field, _)| field)
                .collect();
                if !missing.is_empty() {
                    return Err(GameLiftError::InvalidConfig(format!(
                        "rule-based scaling policy {} is missing: {}",
                        self.name,
                        missing.join(", ")
                    )));
                }
                if self.evaluation_periods == Some(0) {
                    return Err(GameLiftError::InvalidConfig(
                        "evaluation_periods must be at least 1".to_string(),
                    ));
                }
            }
            PolicyType::TargetBased => {
                if self.target_configuration.is_none() {
                    return Err(GameLiftError::InvalidConfig(format!(
                        "target-based scaling policy {} needs target_configuration",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Scaling policy as reported by DescribeScalingPolicies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingPolicy {
    pub fleet_id: String,
    #[serde(default)]
    pub fleet_arn: Option<String>,
    pub name: String,
    pub status: ScalingStatus,
    #[serde(default)]
    pub metric_name: Option<MetricName>,
    #[serde(default)]
    pub policy_type: Option<PolicyType>,
    #[serde(default)]
    pub scaling_adjustment: Option<i32>,
    #[serde(default)]
    pub scaling_adjustment_type: Option<ScalingAdjustmentType>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub comparison_operator: Option<ComparisonOperator>,
    #[serde(default)]
    pub evaluation_periods: Option<u32>,
    #[serde(default)]
    pub target_configuration: Option<TargetConfiguration>,
}

fn check_text(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len == 0 || len > max {
        return Err(GameLiftError::InvalidConfig(format!(
            "{} must be 1-{} characters, got {}",
            field, max, len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fleet_spec() -> FleetSpec {
        serde_json::from_value(json!({
            "name": "arena",
            "build_id": "build-1111",
            "ec2_instance_type": "c5.large",
        }))
        .unwrap()
    }

    #[test]
    fn test_fleet_spec_defaults() {
        let spec = fleet_spec();
        assert_eq!(spec.fleet_type, FleetType::OnDemand);
        assert_eq!(
            spec.new_game_session_protection_policy,
            ProtectionPolicy::NoProtection
        );
        assert_eq!(spec.certificate_type, CertificateType::Disabled);
        assert!(spec.ec2_inbound_permissions.is_empty());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_fleet_spec_from_manifest_json() {
        let spec: FleetSpec = serde_json::from_value(json!({
            "name": "arena",
            "build_id": "build-1111",
            "ec2_instance_type": "c5.large",
            "fleet_type": "spot",
            "ec2_inbound_permission": [
                { "from_port": 7777, "to_port": 7780, "ip_range": "0.0.0.0/0", "protocol": "udp" }
            ],
            "runtime_configuration": {
                "server_process": [
                    { "launch_path": "/local/game/server", "concurrent_executions": 2 }
                ]
            },
            "tags": { "team": "netcode" }
        }))
        .unwrap();

        assert_eq!(spec.fleet_type, FleetType::Spot);
        assert_eq!(
            spec.ec2_inbound_permissions,
            vec![IpPermission::new(7777, 7780, "0.0.0.0/0", IpProtocol::Udp)]
        );
        let runtime = spec.runtime_configuration.as_ref().unwrap();
        assert_eq!(runtime.server_processes[0].concurrent_executions, 2);
        assert_eq!(spec.tags.get("team").map(String::as_str), Some("netcode"));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_fleet_spec_rejects_unknown_field() {
        let err = serde_json::from_value::<FleetSpec>(json!({
            "build_id": "build-1111",
            "ec2_instance_type": "c5.large",
            "instance_typo": "x",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("instance_typo"));
    }

    #[test]
    fn test_invalid_enum_value() {
        let err = serde_json::from_value::<IpPermission>(json!({
            "from_port": 1, "to_port": 2, "ip_range": "10.0.0.0/8", "protocol": "icmp"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("TCP, UDP"));
    }

    #[test]
    fn test_ip_permission_validation() {
        assert!(IpPermission::new(7777, 7777, "10.0.0.0/8", IpProtocol::Tcp).validate().is_ok());
        assert!(IpPermission::new(0, 10, "10.0.0.0/8", IpProtocol::Tcp).validate().is_err());
        assert!(IpPermission::new(20, 10, "10.0.0.0/8", IpProtocol::Tcp).validate().is_err());
        assert!(IpPermission::new(1, 60001, "10.0.0.0/8", IpProtocol::Tcp).validate().is_err());
        assert!(IpPermission::new(1, 10, "10.0.0.1", IpProtocol::Tcp).validate().is_err());

        let err = IpPermission::new(1, 10, "10.0.0.1/8", IpProtocol::Tcp)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("10.0.0.0/8"));
    }

    #[test]
    fn test_fleet_spec_validation_limits() {
        let mut spec = fleet_spec();
        spec.ec2_inbound_permissions = (1..=51)
            .map(|p| IpPermission::new(p, p, "0.0.0.0/0", IpProtocol::Tcp))
            .collect();
        assert!(spec.validate().is_err());

        let mut spec = fleet_spec();
        spec.runtime_configuration = Some(RuntimeConfiguration {
            game_session_activation_timeout_seconds: Some(601),
            ..Default::default()
        });
        assert!(spec.validate().is_err());

        let mut spec = fleet_spec();
        spec.instance_role_arn = Some("role/game".to_string());
        assert!(spec.validate().is_err());

        let mut spec = fleet_spec();
        spec.name = String::new();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_fleet_status_round_trip() {
        assert_eq!(FleetStatus::from("ACTIVATING"), FleetStatus::Activating);
        assert_eq!(
            FleetStatus::from("MIGRATING"),
            FleetStatus::Other("MIGRATING".to_string())
        );
        let json = serde_json::to_value(FleetStatus::NotFound).unwrap();
        assert_eq!(json, json!("NOT_FOUND"));
    }

    #[test]
    fn test_fleet_flattened_attributes() {
        let fleet: Fleet = serde_json::from_value(json!({
            "fleet_id": "fleet-1",
            "name": "arena",
            "status": "ACTIVE",
            "ec2_inbound_permission": [
                { "from_port": 1, "to_port": 2, "ip_range": "10.0.0.0/8", "protocol": "TCP" }
            ],
        }))
        .unwrap();
        assert_eq!(fleet.id(), "fleet-1");
        assert_eq!(fleet.attributes.status, FleetStatus::Active);
        assert_eq!(fleet.ec2_inbound_permissions.len(), 1);
    }

    #[test]
    fn test_scaling_policy_validation() {
        let rule: ScalingPolicySpec = serde_json::from_value(json!({
            "name": "scale-out",
            "fleet": "arena",
            "metric_name": "PercentAvailableGameSessions",
            "scaling_adjustment": 2,
            "scaling_adjustment_type": "ChangeInCapacity",
            "threshold": 10.0,
            "comparison_operator": "LessThanThreshold",
            "evaluation_periods": 5,
        }))
        .unwrap();
        assert!(rule.validate().is_ok());

        let mut incomplete = rule.clone();
        incomplete.threshold = None;
        incomplete.evaluation_periods = None;
        let err = incomplete.validate().unwrap_err();
        assert!(err.to_string().contains("threshold, evaluation_periods"));

        let mut both = rule.clone();
        both.fleet_id = Some("fleet-1".to_string());
        assert!(both.validate().is_err());

        let target: ScalingPolicySpec = serde_json::from_value(json!({
            "name": "target",
            "fleet_id": "fleet-1",
            "metric_name": "PercentAvailableGameSessions",
            "policy_type": "TargetBased",
        }))
        .unwrap();
        assert!(target.validate().is_err());
    }
}
