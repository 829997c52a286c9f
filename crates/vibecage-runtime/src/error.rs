//! Error types for vibecage-runtime.

use thiserror::Error;

/// Result type alias for vibecage-runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur while driving the container engine.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The container engine could not be reached
    #[error("container runtime is not reachable (is Docker running?)")]
    DaemonUnavailable,

    /// Image build exited unsuccessfully
    #[error("image build failed with code {code}\n{output}")]
    Build {
        /// Exit code of the build process (-1 if killed by a signal)
        code: i32,
        /// Captured stdout and stderr
        output: String,
    },

    /// A runtime command exited unsuccessfully
    #[error("{operation} failed: {message}")]
    Command {
        /// Name of the operation (e.g. `docker commit`)
        operation: String,
        /// Captured stderr, trimmed
        message: String,
    },

    /// Invalid create descriptor
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error spawning or talking to the runtime process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    pub(crate) fn command(operation: impl Into<String>, stderr: &[u8]) -> Self {
        Self::Command {
            operation: operation.into(),
            message: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}
