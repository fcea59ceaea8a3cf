//! Parsed manifest

use liftflow_cloud::{ResourceConfig, ResourceSet};
use serde::Serialize;
use serde_json::Value;

/// Provider used when the manifest has no `provider` node
pub const DEFAULT_PROVIDER: &str = "gamelift";

/// Resource node names accepted at the top level
pub const RESOURCE_NODES: &[&str] = &["fleet", "scaling_policy"];

/// A whole `lift.kdl` file
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    /// Project name (`project "name"`, or the project directory name)
    pub project: String,

    pub provider: ProviderBlock,

    /// Declared resources keyed by `type:name`
    pub resources: ResourceSet,
}

impl Manifest {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            provider: ProviderBlock::default(),
            resources: ResourceSet::new(),
        }
    }

    pub fn resources_of(&self, resource_type: &str) -> Vec<&ResourceConfig> {
        self.resources.by_type(resource_type)
    }
}

/// `provider "name" { ... }` with its block converted to a JSON object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderBlock {
    pub name: String,
    pub config: Value,
}

impl Default for ProviderBlock {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROVIDER.to_string(),
            config: Value::Object(Default::default()),
        }
    }
}
