//! Provider configuration
//!
//! Built from the manifest `provider "gamelift"` block:
//!
//! ```kdl
//! provider "gamelift" {
//!     region "us-west-2"
//!     profile "games"
//!     poll-interval "15s"
//!     timeouts {
//!         fleet-create "90m"
//!         fleet-delete "30m"
//!     }
//! }
//! ```
//!
//! Region and profile fall back to `AWS_REGION` / `AWS_DEFAULT_REGION` and
//! `AWS_PROFILE`. Durations use humantime syntax (`90s`, `70m`, `1h 10m`).

use crate::error::{GameLiftError, Result};
use liftflow_cloud::RetryConfig;
use serde::Deserialize;
use std::time::Duration;

/// Upper bounds for long-running operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Wait for a new fleet to become ACTIVE
    pub fleet_create: Duration,
    /// Wait for a deleted fleet to terminate
    pub fleet_delete: Duration,
    /// Retry window for CreateFleet while a new IAM role propagates
    pub iam_propagation: Duration,
    /// Retry window for DeleteFleet while the fleet is in a non-deletable status
    pub fleet_delete_conflict: Duration,
    /// Wait for scaling policy creation, update and deletion
    pub scaling_policy: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            fleet_create: Duration::from_secs(70 * 60),
            fleet_delete: Duration::from_secs(20 * 60),
            iam_propagation: Duration::from_secs(2 * 60),
            fleet_delete_conflict: Duration::from_secs(60 * 60),
            scaling_policy: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
    /// Endpoint override, for local emulators
    pub endpoint_url: Option<String>,
    /// Delay between two status checks while waiting
    pub poll_interval: Duration,
    pub timeouts: Timeouts,
    /// Backoff for retried API calls
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            endpoint_url: None,
            poll_interval: Duration::from_secs(10),
            timeouts: Timeouts::default(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    region: Option<String>,
    profile: Option<String>,
    endpoint_url: Option<String>,
    poll_interval: Option<String>,
    #[serde(default)]
    timeouts: RawTimeouts,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTimeouts {
    fleet_create: Option<String>,
    fleet_delete: Option<String>,
    iam_propagation: Option<String>,
    fleet_delete_conflict: Option<String>,
    scaling_policy: Option<String>,
}

impl ProviderConfig {
    /// Parse a provider block, then fill region and profile from the process environment
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        Self::from_value_with_env(value, |key| std::env::var(key).ok())
    }

    /// Same as [`ProviderConfig::from_value`] with an explicit environment lookup
    pub fn from_value_with_env<F>(value: &serde_json::Value, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = if value.is_null() {
            RawConfig::default()
        } else {
            serde_json::from_value(value.clone()).map_err(|e| {
                GameLiftError::InvalidConfig(format!("provider \"gamelift\": {}", e))
            })?
        };

        let defaults = ProviderConfig::default();
        let t = raw.timeouts;
        let timeouts = Timeouts {
            fleet_create: duration("timeouts.fleet_create", t.fleet_create, defaults.timeouts.fleet_create)?,
            fleet_delete: duration("timeouts.fleet_delete", t.fleet_delete, defaults.timeouts.fleet_delete)?,
            iam_propagation: duration(
                "timeouts.iam_propagation",
                t.iam_propagation,
                defaults.timeouts.iam_propagation,
            )?,
            fleet_delete_conflict: duration(
                "timeouts.fleet_delete_conflict",
                t.fleet_delete_conflict,
                defaults.timeouts.fleet_delete_conflict,
            )?,
            scaling_policy: duration(
                "timeouts.scaling_policy",
                t.scaling_policy,
                defaults.timeouts.scaling_policy,
            )?,
        };

        let poll_interval = duration("poll_interval", raw.poll_interval, defaults.poll_interval)?;
        if poll_interval.is_zero() {
            return Err(GameLiftError::InvalidConfig(
                "poll_interval must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            region: raw
                .region
                .or_else(|| env("AWS_REGION"))
                .or_else(|| env("AWS_DEFAULT_REGION")),
            profile: raw.profile.or_else(|| env("AWS_PROFILE")),
            endpoint_url: raw.endpoint_url,
            poll_interval,
            timeouts,
            retry: defaults.retry,
        })
    }
}

fn duration(field: &str, value: Option<String>, default: Duration) -> Result<Duration> {
    match value {
        None => Ok(default),
        Some(text) => humantime::parse_duration(&text).map_err(|e| {
            GameLiftError::InvalidConfig(format!("{}: invalid duration '{}': {}", field, text, e))
        }),
    }
}
