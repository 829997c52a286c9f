//! Progress events emitted while a transition runs.

use crate::ports::PortChange;
use std::path::PathBuf;
use vibecage_runtime::PortMapping;

/// Something the user may want to see while a lifecycle operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// No sandbox was found, so one is being initialized here.
    Initializing {
        /// Sandbox name being created
        sandbox: String,
        /// Directory it is bound to
        project_dir: PathBuf,
    },
    /// The base image is missing and is being built.
    BuildStarted {
        /// Image tag
        image: String,
    },
    /// One line of build output.
    BuildOutput(String),
    /// The base image build finished.
    BuildFinished {
        /// Image tag
        image: String,
    },
    /// A container is being created or started.
    ContainerStarting {
        /// Container name
        container: String,
    },
    /// The container is up.
    ContainerStarted {
        /// Container name
        container: String,
    },
    /// Some requested host ports were busy and were moved.
    PortsRemapped(Vec<PortChange>),
    /// Some requested ports could not be placed and are not published.
    PortsUnresolved(Vec<PortMapping>),
    /// An interactive session is about to start.
    Attaching {
        /// Container name
        container: String,
    },
    /// Container state is being committed.
    SavingState {
        /// Destination image tag
        image: String,
    },
    /// The container is being stopped.
    Stopping {
        /// Container name
        container: String,
    },
}

/// Callback receiving [`LifecycleEvent`]s.
pub type EventSink<'a> = &'a mut (dyn FnMut(LifecycleEvent) + Send);
