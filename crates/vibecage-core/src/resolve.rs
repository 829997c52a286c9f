//! Finding which sandbox an invocation refers to.

use crate::config::SandboxConfig;
use crate::error::Result;
use crate::store::ConfigStore;
use std::path::{Path, PathBuf};

/// Registry name used when no name is given and no local config is found.
pub const DEFAULT_SANDBOX: &str = "default";

/// A sandbox config together with the directory it was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSandbox {
    /// The loaded config.
    pub config: SandboxConfig,
    /// Directory holding `.vibecage/config.json`.
    pub project_dir: PathBuf,
}

impl ResolvedSandbox {
    /// Sandbox name.
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

/// Resolve a sandbox by name, or from the directory tree when unnamed.
///
/// With a name, only the registry is consulted. Without one, the nearest
/// ancestor of `current_dir` holding a local config wins, then the
/// [`DEFAULT_SANDBOX`] registry entry. Registry entries whose directory no
/// longer holds a config resolve to `None`.
pub async fn resolve(
    store: &dyn ConfigStore,
    name: Option<&str>,
    current_dir: &Path,
) -> Result<Option<ResolvedSandbox>> {
    match name {
        Some(name) => by_name(store, name).await,
        None => {
            if let Some(found) = find_upward(store, current_dir).await? {
                return Ok(Some(found));
            }
            by_name(store, DEFAULT_SANDBOX).await
        }
    }
}

/// Search `start` and its ancestors for the first local config.
pub async fn find_upward(
    store: &dyn ConfigStore,
    start: &Path,
) -> Result<Option<ResolvedSandbox>> {
    for dir in start.ancestors() {
        if let Some(config) = store.load_local(dir).await? {
            tracing::debug!(sandbox = %config.name, dir = %dir.display(), "Found local config");
            return Ok(Some(ResolvedSandbox {
                config,
                project_dir: dir.to_path_buf(),
            }));
        }
    }
    Ok(None)
}

async fn by_name(store: &dyn ConfigStore, name: &str) -> Result<Option<ResolvedSandbox>> {
    let Some(entry) = store.lookup(name).await? else {
        return Ok(None);
    };

    match store.load_local(&entry.project_dir).await? {
        Some(config) => Ok(Some(ResolvedSandbox {
            config,
            project_dir: entry.project_dir,
        })),
        None => {
            tracing::warn!(
                sandbox = %name,
                project_dir = %entry.project_dir.display(),
                "Registered sandbox has no config (orphaned)"
            );
            Ok(None)
        }
    }
}
