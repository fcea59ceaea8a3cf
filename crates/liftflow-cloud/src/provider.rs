//! Cloud provider trait definition

use crate::action::{ApplyResult, Plan};
use crate::error::{CloudError, Result};
use crate::state::{ProviderState, ResourceState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Cloud provider abstraction trait
///
/// A provider owns a set of resource types. State handed to the provider is
/// keyed by resource key (`type:name`); the provider never touches the state
/// file itself, the caller loads and saves it around these calls.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "gamelift")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Read back every tracked resource from the remote API.
    ///
    /// Resources that no longer exist remotely are dropped from the returned state.
    async fn refresh(&self, current: &ProviderState) -> Result<ProviderState>;

    /// Calculate the actions needed to converge `current` to `desired`
    async fn plan(&self, desired: &ResourceSet, current: &ProviderState) -> Result<Plan>;

    /// Apply the planned actions, recording results into `state`
    async fn apply(&self, plan: &Plan, state: &mut ProviderState) -> Result<ApplyResult>;

    /// Adopt an existing remote resource under a manifest name
    async fn import(
        &self,
        resource_type: &str,
        name: &str,
        remote_id: &str,
    ) -> Result<ResourceState>;

    /// Destroy a specific resource by key (type:name)
    async fn destroy(&self, state: &mut ProviderState, resource_key: &str) -> Result<()>;

    /// Destroy all resources tracked in `state`
    async fn destroy_all(&self, state: &mut ProviderState) -> Result<ApplyResult>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Set of resources to be managed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    /// Resources indexed by `type:name`
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource; a second resource with the same key is rejected
    pub fn add(&mut self, resource: ResourceConfig) -> Result<()> {
        let key = resource.key();
        if self.resources.contains_key(&key) {
            return Err(CloudError::InvalidConfig(format!(
                "duplicate resource {}",
                key
            )));
        }
        self.resources.insert(key, resource);
        Ok(())
    }

    pub fn get(&self, resource_type: &str, id: &str) -> Option<&ResourceConfig> {
        let key = format!("{}:{}", resource_type, id);
        self.resources.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.values()
    }

    pub fn by_type(&self, resource_type: &str) -> Vec<&ResourceConfig> {
        self.resources
            .values()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Configuration for a cloud resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type (e.g., "fleet", "scaling_policy")
    pub resource_type: String,

    /// Resource name as declared in the manifest
    pub id: String,

    /// Provider name
    pub provider: String,

    /// Resource-specific configuration
    pub config: serde_json::Value,
}

impl ResourceConfig {
    pub fn new(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        provider: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            provider: provider.into(),
            config,
        }
    }

    /// Get the full resource key (type:id)
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.id)
    }

    /// Get a configuration value as a specific type
    pub fn get_config<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Deserialize the whole configuration into a typed spec
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.config.clone()).map_err(|e| {
            CloudError::InvalidConfig(format!("{}: {}", self.key(), e))
        })
    }
}

/// Retry configuration for provider operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Delay before retry number `attempt` (zero based), capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(delay)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10000),
            backoff_multiplier: 2.0,
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(8000));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(10000)); // capped at max
        assert_eq!(config.delay_for_attempt(500), Duration::from_millis(10000));
    }

    #[test]
    fn test_resource_set_rejects_duplicates() {
        let mut set = ResourceSet::new();
        set.add(ResourceConfig::new(
            "fleet",
            "arena",
            "gamelift",
            serde_json::json!({}),
        ))
        .unwrap();
        let err = set
            .add(ResourceConfig::new(
                "fleet",
                "arena",
                "gamelift",
                serde_json::json!({}),
            ))
            .unwrap_err();
        assert!(matches!(err, CloudError::InvalidConfig(_)));
        assert_eq!(set.len(), 1);
        assert!(set.get("fleet", "arena").is_some());
    }

    #[test]
    fn test_resource_config_parse() {
        #[derive(Deserialize)]
        struct Spec {
            build_id: String,
        }

        let config = ResourceConfig::new(
            "fleet",
            "arena",
            "gamelift",
            serde_json::json!({ "build_id": "build-1" }),
        );
        let spec: Spec = config.parse().unwrap();
        assert_eq!(spec.build_id, "build-1");

        let bad = ResourceConfig::new("fleet", "arena", "gamelift", serde_json::json!({}));
        let err = bad.parse::<Spec>().err().unwrap();
        assert!(err.to_string().contains("fleet:arena"));
    }
}
