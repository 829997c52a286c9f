//! Configuration for the CLI.
//!
//! Configuration is loaded from environment variables with defaults.

use std::path::PathBuf;

/// Where the registry lives and which runtime binary to call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VibecageConfig {
    /// Directory holding `sandboxes.json`.
    pub home: PathBuf,

    /// Container runtime CLI.
    pub docker: PathBuf,
}

impl Default for VibecageConfig {
    fn default() -> Self {
        Self {
            home: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".vibecage"),
            docker: PathBuf::from("docker"),
        }
    }
}

impl VibecageConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `VIBECAGE_HOME` | `~/.vibecage` |
    /// | `VIBECAGE_DOCKER` | `docker` |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            home: var("VIBECAGE_HOME")
                .map(PathBuf::from)
                .unwrap_or(default.home),
            docker: var("VIBECAGE_DOCKER")
                .map(PathBuf::from)
                .unwrap_or(default.docker),
        }
    }
}
