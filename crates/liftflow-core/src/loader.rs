//! Discovery plus parsing

use crate::discovery::{ManifestLocation, find_manifest, manifest_at};
use crate::error::{ManifestError, Result};
use crate::model::Manifest;
use crate::parser::parse_manifest_str;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// A manifest together with where it was loaded from
#[derive(Debug, Clone)]
pub struct Project {
    pub location: ManifestLocation,
    pub manifest: Manifest,
}

impl Project {
    pub fn root(&self) -> &Path {
        &self.location.project_root
    }

    pub fn manifest_path(&self) -> &PathBuf {
        &self.location.path
    }
}

/// Load the project for `start_dir`
///
/// An explicit `manifest` path bypasses discovery.
#[instrument(skip_all, fields(start_dir = %start_dir.display()))]
pub fn load_project(start_dir: &Path, manifest: Option<&Path>) -> Result<Project> {
    let location = match manifest {
        Some(path) => manifest_at(path)?,
        None => find_manifest(start_dir)?,
    };
    load_from(location)
}

fn load_from(location: ManifestLocation) -> Result<Project> {
    let content = std::fs::read_to_string(&location.path).map_err(|source| ManifestError::Io {
        path: location.path.clone(),
        source,
    })?;

    let default_project = location
        .project_root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .unwrap_or_else(|| "unnamed".to_string());

    let manifest = parse_manifest_str(&content, &default_project)?;
    info!(
        project = %manifest.project,
        resources = manifest.resources.len(),
        manifest = %location.path.display(),
        "Manifest loaded"
    );

    Ok(Project { location, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_project_dir() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("arena");
        fs::create_dir_all(root.join(".liftflow")).unwrap();
        fs::write(
            root.join(".liftflow/lift.kdl"),
            r#"fleet "arena" { build-id "b-1" }"#,
        )
        .unwrap();

        let project = temp_env::with_var_unset(crate::CONFIG_PATH_ENV, || {
            load_project(&root, None)
        })
        .unwrap();

        assert_eq!(project.root(), root.as_path());
        assert_eq!(project.manifest.project, "arena");
        assert_eq!(project.manifest.resources.len(), 1);
    }

    #[test]
    fn test_explicit_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.kdl");
        fs::write(&path, r#"project "custom""#).unwrap();

        let project = load_project(Path::new("/nonexistent"), Some(path.as_path())).unwrap();
        assert_eq!(project.manifest_path(), &path);
        assert_eq!(project.manifest.project, "custom");
        assert!(project.manifest.resources.is_empty());
    }

    #[test]
    fn test_parse_error_surfaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lift.kdl");
        fs::write(&path, r#"service "web""#).unwrap();

        let err = load_project(dir.path(), Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("service"));
    }
}
