//! # LiftFlow GameLift Provider
//!
//! Amazon GameLift fleets and fleet scaling policies as LiftFlow resources.
//!
//! ## Resources
//!
//! - `fleet` - EC2 game server fleet: build, instance type, inbound ports,
//!   runtime configuration, tags
//! - `scaling_policy` - rule-based or target-based fleet scaling policy
//!
//! The remote API sits behind [`GameLiftApi`]. Enable the `aws-sdk` feature
//! for [`SdkGameLift`]; the `test-utils` feature exposes an in-memory fake.

pub mod api;
pub mod config;
pub mod error;
pub mod fleet;
pub mod model;
pub mod ports;
pub mod provider;
pub mod scaling_policy;
#[cfg(feature = "aws-sdk")]
pub mod sdk;
pub mod tags;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use api::GameLiftApi;
pub use config::{ProviderConfig, Timeouts};
pub use error::{GameLiftError, Result};
pub use fleet::FleetChanges;
pub use model::{
    Fleet, FleetSpec, FleetStatus, IpPermission, IpProtocol, ScalingPolicy, ScalingPolicySpec,
};
pub use ports::{PortSettingsDelta, diff_port_settings};
pub use provider::{Desired, GameLiftProvider, PROVIDER_NAME, parse_desired};
#[cfg(feature = "aws-sdk")]
pub use sdk::SdkGameLift;
pub use tags::{TagDelta, diff_tags};
