//! The runtime driver seam used by the lifecycle controller.

use crate::config::{BuildRecipe, ContainerSpec};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Observed state of a sandbox container.
///
/// Never cached; query the driver again before acting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// No container with this name exists
    NotCreated,
    /// Container exists but is not running
    Stopped,
    /// Container is running
    Running,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerState::NotCreated => write!(f, "not created"),
            ContainerState::Stopped => write!(f, "stopped"),
            ContainerState::Running => write!(f, "running"),
        }
    }
}

/// Operations the lifecycle controller needs from a container engine.
///
/// Implementations report results without interpreting them: deciding what
/// a missing image or a failed stop means is the caller's job.
#[async_trait]
pub trait RuntimeDriver: Send + Sync {
    /// Whether the engine daemon answers.
    async fn daemon_reachable(&self) -> bool;

    /// Whether an image with this tag exists locally.
    async fn image_exists(&self, tag: &str) -> bool;

    /// Whether a container with this exact name exists, running or not.
    async fn container_exists(&self, name: &str) -> bool;

    /// Whether a container with this exact name is running.
    async fn container_running(&self, name: &str) -> bool;

    /// Build `tag` from `recipe`, feeding each output line to `on_progress`.
    async fn build_image(
        &self,
        tag: &str,
        recipe: &BuildRecipe,
        on_progress: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<()>;

    /// Create a container from `spec` and start it detached.
    async fn create_and_start(&self, spec: &ContainerSpec) -> Result<()>;

    /// Start an existing, stopped container.
    async fn start_existing(&self, name: &str) -> Result<()>;

    /// Stop a running container.
    async fn stop(&self, name: &str) -> Result<()>;

    /// Remove a stopped container.
    async fn remove(&self, name: &str) -> Result<()>;

    /// Remove an image.
    async fn remove_image(&self, tag: &str) -> Result<()>;

    /// Snapshot a container's filesystem into `dest_tag`.
    async fn commit(&self, container: &str, dest_tag: &str) -> Result<()>;

    /// Open an interactive shell in a running container.
    ///
    /// Blocks until the session ends and returns its exit code.
    async fn attach_interactive(&self, name: &str) -> Result<i32>;

    /// Derive the container state from the existence and running queries.
    async fn container_state(&self, name: &str) -> ContainerState {
        if !self.container_exists(name).await {
            return ContainerState::NotCreated;
        }
        if self.container_running(name).await {
            ContainerState::Running
        } else {
            ContainerState::Stopped
        }
    }
}
