//! # vibecage-runtime
//!
//! Container runtime layer for vibecage sandboxes.
//! Provides a narrow driver abstraction over an external container engine.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vibecage_runtime::{ContainerSpec, DockerDriver, PortMapping, RuntimeDriver};
//!
//! # async fn example() -> vibecage_runtime::Result<()> {
//! let driver = DockerDriver::new();
//!
//! let spec = ContainerSpec::builder("vibecage-base:latest", "vibecage-demo")
//!     .hostname("vibecage")
//!     .working_dir("/home/claude/projects")
//!     .mount("/home/me/projects", "/home/claude/projects")
//!     .env("VIBECAGE_YOLO", "false")
//!     .port(PortMapping::new(3000, 3000))
//!     .build()?;
//!
//! driver.create_and_start(&spec).await?;
//! assert!(driver.container_running("vibecage-demo").await);
//!
//! driver.stop("vibecage-demo").await?;
//! driver.remove("vibecage-demo").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **State Queries**: Daemon reachability, image and container existence
//! - **Image Builds**: Streaming build output to a progress callback
//! - **Lifecycle**: Create, start, stop, commit, remove, interactive attach
//! - **Builder Pattern**: Ergonomic create descriptors with `ContainerSpecBuilder`

mod builder;
mod config;
mod docker;
mod driver;
mod error;

pub use builder::ContainerSpecBuilder;
pub use config::{
    base_image, container_name, sandbox_image, BuildRecipe, ContainerSpec, Mount, PortMapping,
};
pub use docker::DockerDriver;
pub use driver::{ContainerState, RuntimeDriver};
pub use error::{Result, RuntimeError};
