//! Remote API seam
//!
//! Resource logic in [`crate::fleet`] and [`crate::scaling_policy`] talks to
//! GameLift only through this trait. `SdkGameLift` is the production
//! implementation; tests use the in-memory `FakeGameLift`.

use crate::error::Result;
use crate::model::{
    FleetAttributes, FleetAttributesUpdate, FleetEvent, FleetSpec, IpPermission,
    RuntimeConfiguration, ScalingPolicy, ScalingPolicySpec,
};
use crate::ports::PortSettingsDelta;
use async_trait::async_trait;
use std::collections::BTreeMap;

#[async_trait]
pub trait GameLiftApi: Send + Sync {
    /// CreateFleet. Returns the attributes of the new fleet (status NEW).
    async fn create_fleet(&self, spec: &FleetSpec) -> Result<FleetAttributes>;

    /// DescribeFleetAttributes for one fleet; `None` when it does not exist
    async fn describe_fleet(&self, fleet_id: &str) -> Result<Option<FleetAttributes>>;

    async fn describe_fleet_port_settings(&self, fleet_id: &str) -> Result<Vec<IpPermission>>;

    async fn describe_runtime_configuration(
        &self,
        fleet_id: &str,
    ) -> Result<Option<RuntimeConfiguration>>;

    /// Most recent fleet events first, at most `limit` entries
    async fn describe_fleet_events(&self, fleet_id: &str, limit: usize) -> Result<Vec<FleetEvent>>;

    async fn update_fleet_attributes(
        &self,
        fleet_id: &str,
        update: &FleetAttributesUpdate,
    ) -> Result<()>;

    async fn update_fleet_port_settings(
        &self,
        fleet_id: &str,
        delta: &PortSettingsDelta,
    ) -> Result<()>;

    async fn update_runtime_configuration(
        &self,
        fleet_id: &str,
        runtime: &RuntimeConfiguration,
    ) -> Result<()>;

    async fn delete_fleet(&self, fleet_id: &str) -> Result<()>;

    /// Every fleet id in the region, following pagination
    async fn list_fleets(&self) -> Result<Vec<String>>;

    async fn list_tags(&self, arn: &str) -> Result<BTreeMap<String, String>>;

    async fn tag_resource(&self, arn: &str, tags: &BTreeMap<String, String>) -> Result<()>;

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<()>;

    /// PutScalingPolicy; creates or overwrites the policy named `spec.name`
    async fn put_scaling_policy(&self, fleet_id: &str, spec: &ScalingPolicySpec) -> Result<()>;

    /// Every scaling policy of a fleet, following pagination
    async fn describe_scaling_policies(&self, fleet_id: &str) -> Result<Vec<ScalingPolicy>>;

    async fn delete_scaling_policy(&self, fleet_id: &str, name: &str) -> Result<()>;
}
