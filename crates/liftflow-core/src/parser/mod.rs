//! KDL manifest parser
//!
//! ```kdl
//! project "arena"
//!
//! provider "gamelift" {
//!     region "us-west-2"
//! }
//!
//! fleet "arena" {
//!     build-id "build-1111"
//!     ec2-instance-type "c5.large"
//!     ec2-inbound-permission from-port=7777 to-port=7777 ip-range="0.0.0.0/0" protocol="UDP"
//! }
//!
//! scaling_policy "keep-headroom" {
//!     fleet "arena"
//!     metric-name "PercentAvailableGameSessions"
//!     policy-type "TargetBased"
//!     target-configuration target-value=20.0
//! }
//! ```

mod value;

use crate::error::{ManifestError, Result};
use crate::model::{Manifest, ProviderBlock, RESOURCE_NODES};
use kdl::{KdlDocument, KdlNode};
use liftflow_cloud::ResourceConfig;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;
use value::{arguments, field_name, merge_block, properties_object};

/// Parse a manifest file; the project name defaults to its directory name
pub fn parse_manifest_file<P: AsRef<Path>>(path: P) -> Result<Manifest> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let default_project = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed");
    parse_manifest_str(&content, default_project)
}

/// Parse manifest source text
pub fn parse_manifest_str(content: &str, default_project: &str) -> Result<Manifest> {
    let doc: KdlDocument = content.parse()?;

    let mut project = default_project.to_string();
    let mut provider: Option<ProviderBlock> = None;
    let mut declared: Vec<(String, String, Value)> = Vec::new();

    for node in doc.nodes() {
        let kind = field_name(node.name().value());
        match kind.as_str() {
            "project" => {
                project = node_name(node, "project")?;
            }
            "provider" => {
                if provider.is_some() {
                    return Err(ManifestError::invalid(
                        "provider",
                        "only one provider block is supported",
                    ));
                }
                let name = node_name(node, "provider")?;
                let config = block_config(node, &format!("provider {}", name))?;
                provider = Some(ProviderBlock { name, config });
            }
            kind if RESOURCE_NODES.contains(&kind) => {
                let name = node_name(node, kind)?;
                let config = block_config(node, &format!("{} {}", kind, name))?;
                debug!(resource_type = kind, name = %name, "Parsed resource");
                declared.push((kind.to_string(), name, config));
            }
            _ => return Err(ManifestError::UnknownNode(node.name().value().to_string())),
        }
    }

    let mut manifest = Manifest::new(project);
    if let Some(provider) = provider {
        manifest.provider = provider;
    }
    for (resource_type, name, config) in declared {
        manifest.resources.add(ResourceConfig::new(
            resource_type,
            name,
            manifest.provider.name.clone(),
            config,
        ))?;
    }

    Ok(manifest)
}

/// The single string argument naming a node
fn node_name(node: &KdlNode, kind: &str) -> Result<String> {
    match arguments(node).as_slice() {
        [single] => single
            .value()
            .as_string()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .ok_or_else(|| ManifestError::invalid(kind, "name must be a non-empty string")),
        [] => Err(ManifestError::invalid(kind, "missing name")),
        _ => Err(ManifestError::invalid(kind, "expected a single name argument")),
    }
}

/// Properties and block children of a named node as one object
fn block_config(node: &KdlNode, path: &str) -> Result<Value> {
    let mut object = properties_object(node, path)?;
    if let Some(children) = node.children() {
        merge_block(&mut object, children, path)?;
    }
    Ok(Value::Object(object))
}
