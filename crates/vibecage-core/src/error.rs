//! Error types for vibecage-core.

use std::path::PathBuf;
use thiserror::Error;
use vibecage_runtime::RuntimeError;

/// Result type alias for vibecage-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur during sandbox operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Error from the container runtime
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// No registered sandbox with this name
    #[error("sandbox \"{0}\" not found")]
    NotFound(String),

    /// No sandbox config in the directory chain and no default sandbox
    #[error("no sandbox configured in {}", .0.display())]
    NoSandbox(PathBuf),

    /// Init target already holds a sandbox config
    #[error("sandbox already configured in {} (use --force to overwrite)", .0.display())]
    AlreadyConfigured(PathBuf),

    /// Sandbox name is registered to another directory
    #[error("sandbox name \"{name}\" is already registered to {}", .project_dir.display())]
    NameTaken {
        /// The requested name
        name: String,
        /// Directory the name is registered to
        project_dir: PathBuf,
    },

    /// Commit failed, so the container was left running
    #[error("failed to save state of \"{sandbox}\", container is still running: {source}")]
    CommitFailed {
        /// Sandbox name
        sandbox: String,
        /// Underlying runtime failure
        #[source]
        source: RuntimeError,
    },

    /// Unparseable port specifier
    #[error("invalid port specifier \"{0}\"")]
    InvalidPort(String),

    /// Name unusable as a container or image name
    #[error("invalid sandbox name \"{0}\" (use lowercase letters, digits, '.', '_' or '-')")]
    InvalidName(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether this error means the sandbox could not be resolved.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NoSandbox(_))
    }
}
