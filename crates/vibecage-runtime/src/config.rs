//! Create descriptors and naming for sandbox containers.

use crate::builder::ContainerSpecBuilder;
use crate::error::{Result, RuntimeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Prefix shared by every container and image this tool owns.
const PREFIX: &str = "vibecage";

/// Container name for a sandbox.
pub fn container_name(sandbox: &str) -> String {
    format!("{PREFIX}-{sandbox}")
}

/// Image tag that holds a sandbox's committed state.
pub fn sandbox_image(sandbox: &str) -> String {
    format!("{PREFIX}-{sandbox}:latest")
}

/// Shared base image tag.
pub fn base_image() -> String {
    format!("{PREFIX}-base:latest")
}

/// A host port published to a container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port on the host.
    pub host: u16,
    /// Port inside the container.
    pub container: u16,
}

impl PortMapping {
    /// Create a new mapping.
    pub fn new(host: u16, container: u16) -> Self {
        Self { host, container }
    }

    /// Mapping that publishes the same port on both sides.
    pub fn same(port: u16) -> Self {
        Self::new(port, port)
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

/// A bind mount from the host into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Host path.
    pub source: PathBuf,
    /// Path inside the container.
    pub target: PathBuf,
}

impl Mount {
    /// Create a new bind mount.
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Everything the driver needs to create and start a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Image to run.
    pub image: String,
    /// Container name.
    pub name: String,
    /// Container hostname.
    pub hostname: Option<String>,
    /// Working directory inside the container.
    pub working_dir: Option<PathBuf>,
    /// Bind mounts, in order.
    pub mounts: Vec<Mount>,
    /// Environment variables, in order.
    pub env: Vec<(String, String)>,
    /// Published ports, in order.
    pub ports: Vec<PortMapping>,
    /// Supplementary groups for the container user.
    pub group_add: Vec<String>,
}

impl ContainerSpec {
    /// Create a new descriptor builder.
    pub fn builder(image: impl Into<String>, name: impl Into<String>) -> ContainerSpecBuilder {
        ContainerSpecBuilder::new(image, name)
    }

    /// Validate the descriptor.
    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            return Err(RuntimeError::Config("image is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(RuntimeError::Config("container name is required".into()));
        }
        if let Some(port) = self.ports.iter().find(|p| p.host == 0 || p.container == 0) {
            return Err(RuntimeError::Config(format!("invalid port mapping {port}")));
        }
        for mount in &self.mounts {
            if !mount.target.is_absolute() {
                return Err(RuntimeError::Config(format!(
                    "mount target must be absolute: {}",
                    mount.target.display()
                )));
            }
        }
        Ok(())
    }
}

/// Dockerfile text used to build the shared base image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecipe {
    dockerfile: String,
}

impl BuildRecipe {
    /// Wrap custom Dockerfile text.
    pub fn new(dockerfile: impl Into<String>) -> Self {
        Self {
            dockerfile: dockerfile.into(),
        }
    }

    /// Dockerfile text.
    pub fn dockerfile(&self) -> &str {
        &self.dockerfile
    }
}

impl Default for BuildRecipe {
    fn default() -> Self {
        Self::new(DEFAULT_DOCKERFILE)
    }
}

const DEFAULT_DOCKERFILE: &str = r#"FROM ubuntu:24.04

ENV DEBIAN_FRONTEND=noninteractive

RUN apt-get update && apt-get install -y \
    curl git sudo zsh ca-certificates locales \
    && rm -rf /var/lib/apt/lists/*

RUN locale-gen en_US.UTF-8
ENV LANG=en_US.UTF-8

RUN curl -fsSL https://deb.nodesource.com/setup_20.x | bash - \
    && apt-get install -y nodejs \
    && rm -rf /var/lib/apt/lists/* \
    && npm install -g @anthropic-ai/claude-code

RUN useradd -m -s /bin/zsh claude \
    && echo "claude ALL=(ALL) NOPASSWD:ALL" > /etc/sudoers.d/claude \
    && mkdir -p /home/claude/projects /home/claude/.claude \
    && touch /home/claude/.zsh_history \
    && chown -R claude:claude /home/claude

USER claude

RUN echo '# Skip permission prompts when the sandbox runs in yolo mode' >> ~/.zshrc \
    && echo 'if [ "$VIBECAGE_YOLO" = "true" ]; then' >> ~/.zshrc \
    && echo '  alias claude="claude --dangerously-skip-permissions"' >> ~/.zshrc \
    && echo 'fi' >> ~/.zshrc

WORKDIR /home/claude/projects

CMD ["zsh"]
"#;
