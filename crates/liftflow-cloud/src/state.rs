//! State management for cloud resources
//!
//! Manages the `.liftflow/state.json` file which tracks the remote identity
//! and last observed attributes of every managed resource.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".liftflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// Global state containing all provider states
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Resources indexed by provider:type:name
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slice out the resources of one provider, keyed by type:name
    pub fn provider_state(&self, provider: &str) -> ProviderState {
        let prefix = format!("{}:", provider);
        let resources = self
            .resources
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(&prefix)
                    .map(|key| (key.to_string(), v.clone()))
            })
            .collect();
        ProviderState { resources }
    }

    /// Replace every resource of one provider with `state`
    pub fn replace_provider_state(&mut self, provider: &str, state: ProviderState) {
        let prefix = format!("{}:", provider);
        self.resources.retain(|k, _| !k.starts_with(&prefix));
        for (key, resource) in state.resources {
            self.resources.insert(format!("{}{}", prefix, key), resource);
        }
        self.updated_at = Utc::now();
    }

    /// Add or update a resource
    pub fn set_resource(&mut self, key: String, state: ResourceState) {
        self.resources.insert(key, state);
        self.updated_at = Utc::now();
    }

    /// Remove a resource
    pub fn remove_resource(&mut self, key: &str) -> Option<ResourceState> {
        let result = self.resources.remove(key);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    /// Get a resource by key
    pub fn get_resource(&self, key: &str) -> Option<&ResourceState> {
        self.resources.get(key)
    }
}

/// State for a single provider, keyed by type:name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderState {
    /// Resources managed by this provider
    pub resources: BTreeMap<String, ResourceState>,
}

impl ProviderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: String, state: ResourceState) {
        self.resources.insert(key, state);
    }

    pub fn get(&self, key: &str) -> Option<&ResourceState> {
        self.resources.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ResourceState> {
        self.resources.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResourceState)> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// State of a single resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Provider-specific remote identifier
    pub id: String,

    /// Resource type
    pub resource_type: String,

    /// Current status
    pub status: ResourceStatus,

    /// Last observed attributes (arn, ports, runtime configuration, ...)
    pub attributes: BTreeMap<String, serde_json::Value>,

    /// When the resource was created
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            status: ResourceStatus::Unknown,
            attributes: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Store every top-level field of a serialized object as an attribute
    pub fn with_attributes_from<T: Serialize>(mut self, value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            serde_json::Value::Object(map) => {
                self.attributes.extend(map);
                Ok(self)
            }
            other => Err(CloudError::StateError(format!(
                "resource attributes must be an object, got {}",
                other
            ))),
        }
    }

    /// Rebuild a typed object from the stored attributes
    pub fn attributes_as<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let map: serde_json::Map<String, serde_json::Value> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Status of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Resource is being created
    Creating,
    /// Resource is active and serving
    Active,
    /// Resource is applying an update
    Updating,
    /// Resource is being deleted
    Deleting,
    /// Resource is in error state
    Error,
    /// Status is unknown
    Unknown,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Creating => write!(f, "creating"),
            ResourceStatus::Active => write!(f, "active"),
            ResourceStatus::Updating => write!(f, "updating"),
            ResourceStatus::Deleting => write!(f, "deleting"),
            ResourceStatus::Error => write!(f, "error"),
            ResourceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// State manager for reading/writing state files
pub struct StateManager {
    /// Project root directory
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    /// Path of the state file
    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        fs::create_dir_all(self.state_dir()).await?;
        Ok(())
    }

    /// Load the current state; a missing file is an empty state
    pub async fn load(&self) -> Result<GlobalState> {
        let content = match fs::read(self.state_path()).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No state file yet");
                return Ok(GlobalState::new());
            }
            Err(e) => return Err(e.into()),
        };
        let state: GlobalState = serde_json::from_slice(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!(resources = state.resources.len(), "Loaded state");
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    ///
    /// The new content is written next to the state file and renamed over it,
    /// so an interrupted save leaves either the old or the new state.
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(state)?).await?;

        if path.exists() {
            fs::copy(&path, self.backup_path()).await?;
        }
        fs::rename(&staging, &path).await?;

        tracing::debug!(resources = state.resources.len(), "Saved state");
        Ok(())
    }

    /// Acquire a lock for exclusive access; a lock older than an hour is taken over
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;
        let lock_path = self.lock_path();

        let holder = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        let content = serde_json::to_vec_pretty(&holder)?;

        for _ in 0..2 {
            match create_exclusive(&lock_path, &content).await {
                Ok(()) => {
                    tracing::debug!(pid = holder.pid, "Acquired state lock");
                    return Ok(StateLock {
                        lock_path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    let Some(existing) = read_lock(&lock_path).await? else {
                        // released between our create and read
                        continue;
                    };
                    let age = Utc::now().signed_duration_since(existing.acquired_at);
                    if age.num_hours() < STALE_LOCK_HOURS {
                        return Err(CloudError::LockError(format!(
                            "State is locked by {} (pid {}) since {}",
                            existing.holder, existing.pid, existing.acquired_at
                        )));
                    }
                    tracing::warn!(holder = %existing.holder, "Taking over stale state lock");
                    fs::remove_file(&lock_path).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CloudError::LockError(format!(
            "could not create {}",
            lock_path.display()
        )))
    }
}

const STALE_LOCK_HOURS: i64 = 1;

/// Read an existing lock; `None` when it has disappeared.
///
/// A lock file that does not parse was left by a holder that died between
/// creating and writing it. It is dated by its modification time so the
/// stale takeover still applies.
async fn read_lock(path: &Path) -> Result<Option<LockInfo>> {
    let content = match fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice(&content) {
        Ok(info) => Ok(Some(info)),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Unreadable state lock");
            let modified = fs::metadata(path).await?.modified()?;
            Ok(Some(LockInfo {
                holder: "unknown".to_string(),
                pid: 0,
                acquired_at: DateTime::<Utc>::from(modified),
            }))
        }
    }
}

async fn create_exclusive(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content).await?;
    file.flush().await
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    #[serde(default)]
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Held lock; dropping it without [`StateLock::release`] still removes the file
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.lock_path).await {
            Ok(()) => {
                tracing::debug!("Released state lock");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_state_save_load() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        state.set_resource(
            "gamelift:fleet:arena".to_string(),
            ResourceState::new("fleet-1234", "fleet")
                .with_status(ResourceStatus::Active)
                .with_attribute("arn", serde_json::json!("arn:aws:gamelift:::fleet/fleet-1234")),
        );

        manager.save(&state).await.unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.resources.len(), 1);
        assert!(loaded.resources.contains_key("gamelift:fleet:arena"));

        // second save keeps a backup of the first
        manager.save(&loaded).await.unwrap();
        assert!(temp_dir.path().join(".liftflow/state.json.backup").exists());
    }

    #[tokio::test]
    async fn test_empty_state() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let state = manager.load().await.unwrap();
        assert!(state.resources.is_empty());
    }

    #[tokio::test]
    async fn test_newer_state_version_rejected() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        state.version = STATE_VERSION + 1;
        manager.save(&state).await.unwrap();

        let err = manager.load().await.unwrap_err();
        assert!(matches!(err, CloudError::StateError(_)));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let lock = manager.acquire_lock().await.unwrap();
        let err = manager.acquire_lock().await.err().unwrap();
        assert!(matches!(err, CloudError::LockError(_)));

        lock.release().await.unwrap();
        let again = manager.acquire_lock().await.unwrap();
        drop(again);
        assert!(!temp_dir.path().join(".liftflow/lock.json").exists());
    }

    #[tokio::test]
    async fn test_unreadable_lock_is_dated_by_mtime() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());
        manager.ensure_state_dir().await.unwrap();
        let lock_path = manager.lock_path();
        std::fs::write(&lock_path, b"").unwrap();

        // a fresh empty lock may still be mid-write
        let err = manager.acquire_lock().await.err().unwrap();
        assert!(matches!(err, CloudError::LockError(_)));

        let two_hours_ago = std::time::SystemTime::now() - std::time::Duration::from_secs(2 * 3600);
        std::fs::File::options()
            .write(true)
            .open(&lock_path)
            .unwrap()
            .set_modified(two_hours_ago)
            .unwrap();

        let lock = manager.acquire_lock().await.unwrap();
        let info: LockInfo = serde_json::from_slice(&std::fs::read(&lock_path).unwrap()).unwrap();
        assert_eq!(info.pid, std::process::id());
        lock.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_garbage_lock_is_taken_over_when_old() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());
        manager.ensure_state_dir().await.unwrap();
        let lock_path = manager.lock_path();
        std::fs::write(&lock_path, b"{\"holder\": \"build-ag").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&lock_path)
            .unwrap()
            .set_modified(std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(86_400))
            .unwrap();

        let lock = manager.acquire_lock().await.unwrap();
        drop(lock);
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_provider_state_slicing() {
        let mut global = GlobalState::new();
        global.set_resource(
            "gamelift:fleet:arena".to_string(),
            ResourceState::new("fleet-1", "fleet"),
        );
        global.set_resource(
            "other:bucket:logs".to_string(),
            ResourceState::new("logs", "bucket"),
        );

        let mut provider = global.provider_state("gamelift");
        assert_eq!(provider.len(), 1);
        assert!(provider.get("fleet:arena").is_some());

        provider.remove("fleet:arena");
        provider.add(
            "scaling_policy:cpu".to_string(),
            ResourceState::new("fleet-1/cpu", "scaling_policy"),
        );
        global.replace_provider_state("gamelift", provider);

        assert!(global.get_resource("gamelift:fleet:arena").is_none());
        assert!(global.get_resource("gamelift:scaling_policy:cpu").is_some());
        assert!(global.get_resource("other:bucket:logs").is_some());
    }

    #[test]
    fn test_attributes_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Observed {
            arn: String,
            ports: Vec<u16>,
        }

        let observed = Observed {
            arn: "arn:1".to_string(),
            ports: vec![7777, 7778],
        };
        let state = ResourceState::new("fleet-1", "fleet")
            .with_attributes_from(&observed)
            .unwrap();
        assert_eq!(state.get_attribute::<String>("arn"), Some("arn:1".to_string()));
        assert_eq!(state.attributes_as::<Observed>().unwrap(), observed);

        let err = ResourceState::new("x", "fleet")
            .with_attributes_from(&42)
            .unwrap_err();
        assert!(matches!(err, CloudError::StateError(_)));
    }
}
