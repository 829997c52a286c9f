//! # vibecage-core
//!
//! Sandbox lifecycle for vibecage development containers.
//!
//! A sandbox is a named, long-lived container bound to one project
//! directory. This crate decides which sandbox an invocation means, moves its
//! container between states and keeps its configuration on disk. Talking to
//! the container engine is left to a [`vibecage_runtime::RuntimeDriver`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    vibecage-core                         │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │  ┌───────────────────┐     ┌────────────────────────┐   │
//! │  │ SandboxController │────▶│  resolve()             │   │
//! │  │   - attach()      │     │  upward search, then   │   │
//! │  │   - stop()        │     │  "default" registry    │   │
//! │  │   - destroy()     │     └────────────────────────┘   │
//! │  │   - status()      │                │                 │
//! │  │   - init()        │                ▼                 │
//! │  │   - *_ports()     │     ┌────────────────────────┐   │
//! │  │   - yolo()        │────▶│  ConfigStore           │   │
//! │  └───────────────────┘     │  .vibecage/config.json │   │
//! │      │          │          │  ~/.vibecage/          │   │
//! │      │          ▼          │    sandboxes.json      │   │
//! │      │   ┌─────────────┐   └────────────────────────┘   │
//! │      │   │resolve_ports│                                │
//! │      │   │ (PortProbe) │                                │
//! │      │   └─────────────┘                                │
//! └──────┼───────────────────────────────────────────────────┘
//!        ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │           RuntimeDriver (vibecage-runtime)               │
//! │      docker build / run / start / commit / stop / rm     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use vibecage_core::{FsConfigStore, LifecycleEvent, SandboxController};
//! use vibecage_runtime::DockerDriver;
//!
//! # async fn example() -> vibecage_core::Result<()> {
//! let controller = SandboxController::new(
//!     Arc::new(DockerDriver::new()),
//!     Arc::new(FsConfigStore::new("/home/me/.vibecage")),
//! );
//!
//! let cwd = std::env::current_dir()?;
//! let mut events = |event: LifecycleEvent| println!("{event:?}");
//! let outcome = controller.attach(None, &cwd, &mut events).await?;
//! println!("session for {} ended", outcome.sandbox);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod ports;
pub mod resolve;
pub mod settings;
pub mod store;

pub use config::{parse_port_list, parse_port_spec, validate_name, PortPolicy, SandboxConfig};
pub use error::{CoreError, Result};
pub use events::{EventSink, LifecycleEvent};
pub use lifecycle::{
    AttachOutcome, DestroyReport, InitOutcome, InitRequest, SandboxController, SandboxStatus,
    StartKind, StopOutcome,
};
pub use ports::{resolve_ports, PortChange, PortProbe, PortResolution, TcpProbe};
pub use resolve::{ResolvedSandbox, DEFAULT_SANDBOX};
pub use settings::{PortEdit, PortsReport, YoloAction, YoloReport};
pub use store::{ConfigStore, FsConfigStore, Registry, RegistryEntry};
