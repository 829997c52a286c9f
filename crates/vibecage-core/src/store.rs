//! Durable sandbox configuration.
//!
//! Two record kinds are kept: the per-project [`SandboxConfig`] under
//! `<project>/.vibecage/config.json`, and the global name registry
//! `<global>/sandboxes.json`. Every call reads from disk; nothing is cached,
//! since another invocation may have changed either file.

use crate::config::SandboxConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Name of the per-project state directory.
pub const STATE_DIR: &str = ".vibecage";

const CONFIG_FILE: &str = "config.json";
const REGISTRY_FILE: &str = "sandboxes.json";
const CLAUDE_CONFIG_DIR: &str = "claude-config";
const HISTORY_FILE: &str = "zsh_history";

/// Per-project state directory.
pub fn state_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_DIR)
}

/// Path of the local config file for a project.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(CONFIG_FILE)
}

/// Host directory holding the assistant's auth and settings.
pub fn claude_config_dir(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(CLAUDE_CONFIG_DIR)
}

/// Host file holding the container shell history.
pub fn history_file(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(HISTORY_FILE)
}

/// A registered sandbox name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// Directory holding the sandbox's local config.
    pub project_dir: PathBuf,
    /// When the sandbox was registered.
    pub created_at: DateTime<Utc>,
}

impl RegistryEntry {
    /// Create an entry stamped with the current time.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            created_at: Utc::now(),
        }
    }
}

/// Registry contents keyed by sandbox name.
pub type Registry = BTreeMap<String, RegistryEntry>;

/// Persistence for local configs and the global registry.
///
/// Writes are last-write-wins; there is no transaction spanning both
/// record kinds.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the config stored for `project_dir`, if any.
    async fn load_local(&self, project_dir: &Path) -> Result<Option<SandboxConfig>>;

    /// Store `config` for `project_dir`.
    async fn save_local(&self, project_dir: &Path, config: &SandboxConfig) -> Result<()>;

    /// Delete the project's whole state directory.
    async fn delete_local(&self, project_dir: &Path) -> Result<()>;

    /// Make sure the directories and files mounted into the container exist.
    async fn prepare_state(&self, project_dir: &Path) -> Result<()>;

    /// All registered sandboxes.
    async fn registry(&self) -> Result<Registry>;

    /// Add or replace a registry entry.
    async fn register(&self, name: &str, entry: RegistryEntry) -> Result<()>;

    /// Remove a registry entry. Removing an absent name is not an error.
    async fn unregister(&self, name: &str) -> Result<()>;

    /// Look up a single registry entry.
    async fn lookup(&self, name: &str) -> Result<Option<RegistryEntry>> {
        Ok(self.registry().await?.remove(name))
    }
}

/// JSON files on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    global_dir: PathBuf,
}

impl FsConfigStore {
    /// Store whose registry lives in `global_dir`.
    pub fn new(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_dir: global_dir.into(),
        }
    }

    /// Path of the registry file.
    pub fn registry_path(&self) -> PathBuf {
        self.global_dir.join(REGISTRY_FILE)
    }

    async fn save_registry(&self, registry: &Registry) -> Result<()> {
        write_json(&self.registry_path(), registry).await
    }
}

/// Write pretty JSON through a temp file and rename it into place.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl ConfigStore for FsConfigStore {
    async fn load_local(&self, project_dir: &Path) -> Result<Option<SandboxConfig>> {
        let path = local_config_path(project_dir);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable sandbox config");
                return Ok(None);
            }
        };

        match serde_json::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring invalid sandbox config");
                Ok(None)
            }
        }
    }

    async fn save_local(&self, project_dir: &Path, config: &SandboxConfig) -> Result<()> {
        let path = local_config_path(project_dir);
        tracing::debug!(sandbox = %config.name, path = %path.display(), "Saving sandbox config");
        write_json(&path, config).await
    }

    async fn delete_local(&self, project_dir: &Path) -> Result<()> {
        let dir = state_dir(project_dir);
        tracing::debug!(path = %dir.display(), "Removing sandbox state directory");
        match tokio::fs::remove_dir_all(&dir).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn prepare_state(&self, project_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(claude_config_dir(project_dir)).await?;

        // A missing bind source makes docker create a directory in its place.
        let history = history_file(project_dir);
        match tokio::fs::metadata(&history).await {
            Ok(meta) if meta.is_file() => return Ok(()),
            Ok(_) => {
                tracing::debug!(path = %history.display(), "Replacing history directory with a file");
                tokio::fs::remove_dir_all(&history).await?;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::write(&history, b"").await?;
        Ok(())
    }

    async fn registry(&self) -> Result<Registry> {
        match tokio::fs::read_to_string(self.registry_path()).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Registry::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn register(&self, name: &str, entry: RegistryEntry) -> Result<()> {
        let mut registry = self.registry().await?;
        tracing::debug!(sandbox = %name, project_dir = %entry.project_dir.display(), "Registering sandbox");
        registry.insert(name.to_string(), entry);
        self.save_registry(&registry).await
    }

    async fn unregister(&self, name: &str) -> Result<()> {
        let mut registry = self.registry().await?;
        if registry.remove(name).is_some() {
            tracing::debug!(sandbox = %name, "Unregistering sandbox");
            self.save_registry(&registry).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortPolicy;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> FsConfigStore {
        FsConfigStore::new(tmp.path().join("global"))
    }

    #[tokio::test]
    async fn test_local_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let project = tmp.path().join("project");

        assert!(store.load_local(&project).await.unwrap().is_none());

        let mut config = SandboxConfig::new("work", &project);
        config.ports = PortPolicy::Minimal;
        store.save_local(&project, &config).await.unwrap();

        assert!(local_config_path(&project).is_file());
        assert_eq!(store.load_local(&project).await.unwrap(), Some(config));
    }

    #[tokio::test]
    async fn test_invalid_local_config_reads_as_absent() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let project = tmp.path().join("project");
        tokio::fs::create_dir_all(state_dir(&project)).await.unwrap();
        tokio::fs::write(local_config_path(&project), "{not json")
            .await
            .unwrap();

        assert!(store.load_local(&project).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_local_removes_state_dir() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let project = tmp.path().join("project");
        store
            .save_local(&project, &SandboxConfig::new("work", &project))
            .await
            .unwrap();
        store.prepare_state(&project).await.unwrap();

        store.delete_local(&project).await.unwrap();
        assert!(!state_dir(&project).exists());
        assert!(project.exists());

        // Second delete is a no-op.
        store.delete_local(&project).await.unwrap();
    }

    #[tokio::test]
    async fn test_prepare_state_repairs_history_directory() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let project = tmp.path().join("project");
        tokio::fs::create_dir_all(history_file(&project))
            .await
            .unwrap();

        store.prepare_state(&project).await.unwrap();

        assert!(history_file(&project).is_file());
        assert!(claude_config_dir(&project).is_dir());
    }

    #[tokio::test]
    async fn test_prepare_state_keeps_existing_history() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let project = tmp.path().join("project");
        store.prepare_state(&project).await.unwrap();
        tokio::fs::write(history_file(&project), "ls\n").await.unwrap();

        store.prepare_state(&project).await.unwrap();

        let content = tokio::fs::read_to_string(history_file(&project))
            .await
            .unwrap();
        assert_eq!(content, "ls\n");
    }

    #[tokio::test]
    async fn test_registry_register_lookup_unregister() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        assert!(store.registry().await.unwrap().is_empty());

        let entry = RegistryEntry::new("/srv/work");
        store.register("work", entry.clone()).await.unwrap();
        store
            .register("default", RegistryEntry::new("/srv/default"))
            .await
            .unwrap();

        assert_eq!(store.lookup("work").await.unwrap(), Some(entry));
        let names: Vec<String> = store.registry().await.unwrap().into_keys().collect();
        assert_eq!(names, vec!["default", "work"]);

        store.unregister("work").await.unwrap();
        assert!(store.lookup("work").await.unwrap().is_none());
        store.unregister("work").await.unwrap();
    }

    #[tokio::test]
    async fn test_registry_json_shape() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store
            .register("work", RegistryEntry::new("/srv/work"))
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(store.registry_path())
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["work"]["projectDir"], "/srv/work");
        assert!(json["work"]["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_corrupt_registry_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        tokio::fs::create_dir_all(tmp.path().join("global"))
            .await
            .unwrap();
        tokio::fs::write(store.registry_path(), "[1, 2")
            .await
            .unwrap();

        assert!(store.registry().await.is_err());
        // Registering must not clobber the unreadable file.
        assert!(store
            .register("work", RegistryEntry::new("/srv/work"))
            .await
            .is_err());
    }
}
