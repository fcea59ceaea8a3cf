//! Manifest discovery
//!
//! Lookup order:
//! 1. `LIFT_CONFIG_PATH`
//! 2. `lift.local.kdl`, `.lift.local.kdl`, `lift.kdl`, `.lift.kdl` in the start directory
//! 3. the same names inside `.liftflow/`

use crate::error::{ManifestError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_PATH_ENV: &str = "LIFT_CONFIG_PATH";

/// Directory holding state (and optionally the manifest)
pub const PROJECT_DIR: &str = ".liftflow";

const CANDIDATES: &[&str] = &["lift.local.kdl", ".lift.local.kdl", "lift.kdl", ".lift.kdl"];

/// A located manifest and the project root it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLocation {
    pub path: PathBuf,
    pub project_root: PathBuf,
}

impl ManifestLocation {
    fn at(path: PathBuf) -> Self {
        let project_root = project_root_of(&path);
        Self { path, project_root }
    }
}

/// Locate the manifest for `start_dir`, honouring `LIFT_CONFIG_PATH`
#[tracing::instrument(skip(start_dir), fields(start_dir = %start_dir.display()))]
pub fn find_manifest(start_dir: &Path) -> Result<ManifestLocation> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
        && !path.is_empty()
    {
        debug!(path = %path, "Using {}", CONFIG_PATH_ENV);
        return manifest_at(Path::new(&path));
    }

    for dir in [start_dir.to_path_buf(), start_dir.join(PROJECT_DIR)] {
        for name in CANDIDATES {
            let candidate = dir.join(name);
            debug!(checking = %candidate.display(), "Looking for manifest");
            if candidate.is_file() {
                info!(manifest = %candidate.display(), "Found manifest");
                return Ok(ManifestLocation::at(candidate));
            }
        }
    }

    Err(ManifestError::NotFound(start_dir.to_path_buf()))
}

/// Use an explicitly given manifest path
pub fn manifest_at(path: &Path) -> Result<ManifestLocation> {
    if !path.is_file() {
        return Err(ManifestError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "manifest does not exist"),
        });
    }
    Ok(ManifestLocation::at(path.to_path_buf()))
}

/// Directory containing the manifest, stepping out of `.liftflow/`
fn project_root_of(manifest: &Path) -> PathBuf {
    let parent = manifest.parent().unwrap_or(Path::new(""));
    let root = if parent.file_name().is_some_and(|n| n == PROJECT_DIR) {
        parent.parent().unwrap_or(Path::new(""))
    } else {
        parent
    };
    if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root.to_path_buf()
    }
}
