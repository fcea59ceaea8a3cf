//! LiftFlow Core
//!
//! Finds and parses `lift.kdl` manifests into a [`Manifest`] whose resources
//! are handed to cloud providers.

pub mod discovery;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;

pub use discovery::{CONFIG_PATH_ENV, ManifestLocation, PROJECT_DIR, find_manifest, manifest_at};
pub use error::{ManifestError, Result};
pub use loader::{Project, load_project};
pub use model::{DEFAULT_PROVIDER, Manifest, ProviderBlock, RESOURCE_NODES};
pub use parser::{parse_manifest_file, parse_manifest_str};
