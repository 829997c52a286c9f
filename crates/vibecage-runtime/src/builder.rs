//! Builder pattern for ergonomic ContainerSpec configuration.

use crate::config::{ContainerSpec, Mount, PortMapping};
use crate::error::Result;
use std::path::PathBuf;

/// Fluent builder for container create descriptors.
///
/// # Example
///
/// ```
/// use vibecage_runtime::{ContainerSpec, PortMapping};
///
/// let spec = ContainerSpec::builder("vibecage-base:latest", "vibecage-work")
///     .hostname("vibecage")
///     .mount("/srv/work", "/home/claude/projects")
///     .ports([PortMapping::same(3000), PortMapping::new(8081, 8080)])
///     .build()
///     .unwrap();
///
/// assert_eq!(spec.ports.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ContainerSpecBuilder {
    spec: ContainerSpec,
}

impl ContainerSpecBuilder {
    /// Create a new builder for the given image and container name.
    pub fn new(image: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            spec: ContainerSpec {
                image: image.into(),
                name: name.into(),
                ..Default::default()
            },
        }
    }

    /// Set the container hostname.
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.spec.hostname = Some(hostname.into());
        self
    }

    /// Set the working directory inside the container.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spec.working_dir = Some(dir.into());
        self
    }

    /// Add a bind mount.
    pub fn mount(mut self, source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.spec.mounts.push(Mount::new(source, target));
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.env.push((key.into(), value.into()));
        self
    }

    /// Publish a port.
    pub fn port(mut self, mapping: PortMapping) -> Self {
        self.spec.ports.push(mapping);
        self
    }

    /// Publish several ports, keeping their order.
    pub fn ports(mut self, mappings: impl IntoIterator<Item = PortMapping>) -> Self {
        self.spec.ports.extend(mappings);
        self
    }

    /// Add a supplementary group.
    pub fn group_add(mut self, group: impl Into<String>) -> Self {
        self.spec.group_add.push(group.into());
        self
    }

    /// Build the descriptor, validating it.
    pub fn build(self) -> Result<ContainerSpec> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_order() {
        let spec = ContainerSpecBuilder::new("img", "name")
            .env("A", "1")
            .env("B", "2")
            .port(PortMapping::same(9000))
            .port(PortMapping::same(3000))
            .build()
            .expect("should build");

        assert_eq!(spec.env, vec![("A".into(), "1".into()), ("B".into(), "2".into())]);
        assert_eq!(spec.ports[0].host, 9000);
        assert_eq!(spec.ports[1].host, 3000);
    }

    #[test]
    fn test_builder_validation_missing_name() {
        let result = ContainerSpecBuilder::new("img", "").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_zero_port() {
        let result = ContainerSpecBuilder::new("img", "name")
            .port(PortMapping::new(0, 80))
            .build();
        assert!(result.is_err());
    }
}
