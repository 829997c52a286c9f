//! Sandbox lifecycle controller.
//!
//! Every transition starts by asking the runtime for the container's current
//! state; nothing about containers is remembered between calls.

use crate::config::{validate_name, PortPolicy, SandboxConfig};
use crate::error::{CoreError, Result};
use crate::events::{EventSink, LifecycleEvent};
use crate::ports::{resolve_ports, PortProbe, PortResolution, TcpProbe};
use crate::resolve::{self, ResolvedSandbox, DEFAULT_SANDBOX};
use crate::store::{claude_config_dir, history_file, ConfigStore, RegistryEntry};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use vibecage_runtime::{
    base_image, container_name, sandbox_image, BuildRecipe, ContainerSpec, ContainerState,
    PortMapping, RuntimeDriver, RuntimeError,
};

/// Home of the unprivileged user inside the base image.
const CONTAINER_HOME: &str = "/home/claude";
const CONTAINER_HOSTNAME: &str = "vibecage";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const DOCKER_GROUP: &str = "999";
const YOLO_ENV: &str = "VIBECAGE_YOLO";

/// How an attach got a running container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartKind {
    /// The container was already running.
    Reused,
    /// A stopped container was started again.
    Restarted,
    /// A new container was created.
    Created {
        /// Image the container was created from
        image: String,
        /// Port resolution used for the container
        ports: PortResolution,
    },
}

/// Result of an attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachOutcome {
    /// Sandbox name
    pub sandbox: String,
    /// Project directory
    pub project_dir: PathBuf,
    /// How the container was brought up
    pub start: StartKind,
    /// Exit code of the interactive session
    pub exit_code: i32,
}

/// Result of a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// No container exists.
    NotRunning,
    /// The container exists but was not running.
    AlreadyStopped,
    /// State was committed and the container stopped.
    Stopped {
        /// Image the state was committed to
        image: String,
    },
}

/// What a destroy managed to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestroyReport {
    /// A running container was stopped
    pub container_stopped: bool,
    /// The container was removed
    pub container_removed: bool,
    /// The sandbox image was removed
    pub image_removed: bool,
    /// The project's `.vibecage` directory was removed
    pub config_removed: bool,
    /// The registry entry was removed
    pub unregistered: bool,
    /// Soft failures, in the order they happened
    pub warnings: Vec<String>,
}

/// One row of `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxStatus {
    /// Sandbox name
    pub name: String,
    /// Container state, `None` when the runtime is unreachable
    pub state: Option<ContainerState>,
    /// Port policy, `None` when the local config is missing
    pub ports: Option<PortPolicy>,
    /// Registered project directory
    pub project_dir: PathBuf,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRequest {
    /// Sandbox name (default: `default`)
    pub name: Option<String>,
    /// Directory to bind the sandbox to
    pub project_dir: PathBuf,
    /// Port policy
    pub ports: PortPolicy,
    /// Yolo flag
    pub yolo: bool,
    /// Overwrite an existing config or name binding
    pub force: bool,
}

impl InitRequest {
    /// Request with defaults for `project_dir`.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            project_dir: project_dir.into(),
            ports: PortPolicy::default(),
            yolo: false,
            force: false,
        }
    }

    /// Set the sandbox name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the port policy.
    pub fn ports(mut self, ports: PortPolicy) -> Self {
        self.ports = ports;
        self
    }

    /// Set the yolo flag.
    pub fn yolo(mut self, yolo: bool) -> Self {
        self.yolo = yolo;
        self
    }

    /// Allow overwriting.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Result of an init.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    /// The stored config
    pub config: SandboxConfig,
    /// Whether the base image had to be built
    pub built_base_image: bool,
}

/// Drives sandboxes through attach, stop and destroy.
///
/// The controller owns no state of its own: the runtime is queried and the
/// store is read on every call.
pub struct SandboxController {
    driver: Arc<dyn RuntimeDriver>,
    store: Arc<dyn ConfigStore>,
    probe: Arc<dyn PortProbe>,
    recipe: BuildRecipe,
    docker_group: bool,
}

impl SandboxController {
    /// Create a controller probing ports over TCP.
    pub fn new(driver: Arc<dyn RuntimeDriver>, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            driver,
            store,
            probe: Arc::new(TcpProbe),
            recipe: BuildRecipe::default(),
            docker_group: cfg!(target_os = "linux"),
        }
    }

    /// Replace the host port probe.
    pub fn with_probe(mut self, probe: impl PortProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Replace the base image recipe.
    pub fn with_recipe(mut self, recipe: BuildRecipe) -> Self {
        self.recipe = recipe;
        self
    }

    /// Whether containers join the host docker group (Linux hosts).
    pub fn with_docker_group(mut self, enabled: bool) -> Self {
        self.docker_group = enabled;
        self
    }

    /// The runtime driver.
    pub fn driver(&self) -> &dyn RuntimeDriver {
        self.driver.as_ref()
    }

    /// The config store.
    pub fn store(&self) -> &dyn ConfigStore {
        self.store.as_ref()
    }

    /// Resolve a sandbox without failing when it is absent.
    pub async fn resolve(
        &self,
        name: Option<&str>,
        current_dir: &Path,
    ) -> Result<Option<ResolvedSandbox>> {
        resolve::resolve(self.store(), name, current_dir).await
    }

    /// Resolve a sandbox, mapping absence to a not-found error.
    pub async fn require(&self, name: Option<&str>, current_dir: &Path) -> Result<ResolvedSandbox> {
        self.resolve(name, current_dir)
            .await?
            .ok_or_else(|| not_found(name, current_dir))
    }

    async fn ensure_daemon(&self) -> Result<()> {
        if self.driver.daemon_reachable().await {
            Ok(())
        } else {
            Err(RuntimeError::DaemonUnavailable.into())
        }
    }

    /// Build the base image if it does not exist yet.
    ///
    /// Returns whether a build ran.
    pub async fn ensure_base_image(&self, events: EventSink<'_>) -> Result<bool> {
        let image = base_image();
        if self.driver.image_exists(&image).await {
            return Ok(false);
        }

        events(LifecycleEvent::BuildStarted {
            image: image.clone(),
        });
        self.driver
            .build_image(&image, &self.recipe, &mut |line: &str| {
                events(LifecycleEvent::BuildOutput(line.to_string()))
            })
            .await?;
        events(LifecycleEvent::BuildFinished { image });
        Ok(true)
    }

    /// Image to create a sandbox's container from.
    ///
    /// A committed sandbox image wins over the shared base image.
    pub async fn image_for(&self, sandbox: &str) -> String {
        let committed = sandbox_image(sandbox);
        if self.driver.image_exists(&committed).await {
            committed
        } else {
            base_image()
        }
    }

    /// Build the create descriptor for a sandbox.
    pub fn container_spec(
        &self,
        sandbox: &ResolvedSandbox,
        image: &str,
        ports: &[PortMapping],
    ) -> Result<ContainerSpec> {
        let home = Path::new(CONTAINER_HOME);
        let projects = home.join("projects");

        let mut builder = ContainerSpec::builder(image, container_name(sandbox.name()))
            .hostname(CONTAINER_HOSTNAME)
            .working_dir(&projects)
            .mount(&sandbox.project_dir, &projects)
            .mount(claude_config_dir(&sandbox.project_dir), home.join(".claude"))
            .mount(history_file(&sandbox.project_dir), home.join(".zsh_history"))
            .mount(DOCKER_SOCKET, DOCKER_SOCKET)
            .env(YOLO_ENV, sandbox.config.yolo.to_string())
            .ports(ports.iter().copied());

        if self.docker_group {
            builder = builder.group_add(DOCKER_GROUP);
        }

        Ok(builder.build()?)
    }

    /// Attach to a sandbox, starting or creating its container as needed.
    ///
    /// Without a name and without any resolvable sandbox, a default sandbox
    /// is initialized in `current_dir` and resolution is retried once.
    pub async fn attach(
        &self,
        name: Option<&str>,
        current_dir: &Path,
        events: EventSink<'_>,
    ) -> Result<AttachOutcome> {
        self.ensure_daemon().await?;

        let sandbox = match self.resolve(name, current_dir).await? {
            Some(sandbox) => sandbox,
            None if name.is_some() => return Err(not_found(name, current_dir)),
            None => {
                events(LifecycleEvent::Initializing {
                    sandbox: DEFAULT_SANDBOX.to_string(),
                    project_dir: current_dir.to_path_buf(),
                });
                self.init(InitRequest::new(current_dir), events).await?;
                self.require(None, current_dir).await?
            }
        };

        self.attach_resolved(&sandbox, events).await
    }

    /// Attach to an already resolved sandbox.
    pub async fn attach_resolved(
        &self,
        sandbox: &ResolvedSandbox,
        events: EventSink<'_>,
    ) -> Result<AttachOutcome> {
        let name = sandbox.name();
        let container = container_name(name);
        self.store.prepare_state(&sandbox.project_dir).await?;

        let state = self.driver.container_state(&container).await;
        tracing::info!(sandbox = %name, %state, "Attaching to sandbox");

        let start = match state {
            ContainerState::Running => StartKind::Reused,
            ContainerState::Stopped => {
                events(LifecycleEvent::ContainerStarting {
                    container: container.clone(),
                });
                self.driver.start_existing(&container).await?;
                events(LifecycleEvent::ContainerStarted {
                    container: container.clone(),
                });
                StartKind::Restarted
            }
            ContainerState::NotCreated => self.create_container(sandbox, events).await?,
        };

        events(LifecycleEvent::Attaching {
            container: container.clone(),
        });
        let exit_code = self.driver.attach_interactive(&container).await?;
        tracing::info!(sandbox = %name, exit_code, "Session ended, container left running");

        Ok(AttachOutcome {
            sandbox: name.to_string(),
            project_dir: sandbox.project_dir.clone(),
            start,
            exit_code,
        })
    }

    async fn create_container(
        &self,
        sandbox: &ResolvedSandbox,
        events: EventSink<'_>,
    ) -> Result<StartKind> {
        let start = Instant::now();
        self.ensure_base_image(events).await?;

        let requested = sandbox.config.ports.expand();
        let ports = resolve_ports(&requested, self.probe.as_ref());
        let image = self.image_for(sandbox.name()).await;
        let spec = self.container_spec(sandbox, &image, &ports.resolved)?;

        events(LifecycleEvent::ContainerStarting {
            container: spec.name.clone(),
        });
        self.driver.create_and_start(&spec).await?;
        events(LifecycleEvent::ContainerStarted {
            container: spec.name.clone(),
        });

        if !ports.changes.is_empty() {
            events(LifecycleEvent::PortsRemapped(ports.changes.clone()));
        }
        if !ports.unresolved.is_empty() {
            events(LifecycleEvent::PortsUnresolved(ports.unresolved.clone()));
        }

        tracing::info!(
            sandbox = %sandbox.name(),
            image = %image,
            published = ports.resolved.len(),
            remapped = ports.changes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Container created"
        );
        Ok(StartKind::Created { image, ports })
    }

    /// Save a sandbox's state and stop its container.
    pub async fn stop(
        &self,
        name: Option<&str>,
        current_dir: &Path,
        events: EventSink<'_>,
    ) -> Result<StopOutcome> {
        self.ensure_daemon().await?;
        let sandbox = self.require(name, current_dir).await?;
        self.stop_resolved(&sandbox, events).await
    }

    /// Stop an already resolved sandbox.
    ///
    /// The commit must succeed before the container is stopped; if it fails
    /// the container is left running.
    pub async fn stop_resolved(
        &self,
        sandbox: &ResolvedSandbox,
        events: EventSink<'_>,
    ) -> Result<StopOutcome> {
        let name = sandbox.name();
        let container = container_name(name);

        match self.driver.container_state(&container).await {
            ContainerState::NotCreated => {
                tracing::debug!(sandbox = %name, "Stop requested but no container exists");
                Ok(StopOutcome::NotRunning)
            }
            ContainerState::Stopped => {
                tracing::debug!(sandbox = %name, "Stop requested but container is stopped");
                Ok(StopOutcome::AlreadyStopped)
            }
            ContainerState::Running => {
                let image = sandbox_image(name);

                events(LifecycleEvent::SavingState {
                    image: image.clone(),
                });
                if let Err(source) = self.driver.commit(&container, &image).await {
                    tracing::error!(sandbox = %name, error = %source, "Commit failed, leaving container running");
                    return Err(CoreError::CommitFailed {
                        sandbox: name.to_string(),
                        source,
                    });
                }

                events(LifecycleEvent::Stopping {
                    container: container.clone(),
                });
                self.driver.stop(&container).await?;

                tracing::info!(sandbox = %name, image = %image, "Sandbox stopped");
                Ok(StopOutcome::Stopped { image })
            }
        }
    }

    /// Remove every trace of a sandbox.
    ///
    /// Steps run in order and are best-effort; the registry entry goes last
    /// and is kept if the local state could not be deleted, so a failed
    /// destroy can be retried by name.
    pub async fn destroy(&self, name: &str) -> Result<DestroyReport> {
        let entry = self
            .store
            .lookup(name)
            .await?
            .ok_or_else(|| CoreError::NotFound(name.to_string()))?;
        self.ensure_daemon().await?;

        let container = container_name(name);
        let image = sandbox_image(name);
        let mut report = DestroyReport::default();
        tracing::info!(sandbox = %name, "Destroying sandbox");

        if self.driver.container_exists(&container).await {
            if self.driver.container_running(&container).await {
                match self.driver.stop(&container).await {
                    Ok(()) => report.container_stopped = true,
                    Err(e) => report.warn(format!("could not stop container: {e}")),
                }
            }
            match self.driver.remove(&container).await {
                Ok(()) => report.container_removed = true,
                Err(e) => report.warn(format!("could not remove container: {e}")),
            }
        }

        // The shared base image is never removed here.
        if self.driver.image_exists(&image).await {
            match self.driver.remove_image(&image).await {
                Ok(()) => report.image_removed = true,
                Err(e) => report.warn(format!("could not remove image {image}: {e}")),
            }
        } else {
            tracing::debug!(image = %image, "No sandbox image to remove");
            report.warn("no sandbox-specific image found (base image preserved)".to_string());
        }

        match self.store.delete_local(&entry.project_dir).await {
            Ok(()) => report.config_removed = true,
            Err(e) => {
                report.warn(format!("could not remove configuration: {e}"));
                return Ok(report);
            }
        }

        self.store.unregister(name).await?;
        report.unregistered = true;
        tracing::info!(sandbox = %name, "Sandbox destroyed");
        Ok(report)
    }

    /// List every registered sandbox with its container state.
    pub async fn status(&self) -> Result<Vec<SandboxStatus>> {
        let registry = self.store.registry().await?;
        let reachable = self.driver.daemon_reachable().await;
        if !reachable {
            tracing::warn!("Container runtime unreachable, states unknown");
        }

        let mut rows = Vec::with_capacity(registry.len());
        for (name, entry) in registry {
            let state = if reachable {
                Some(self.driver.container_state(&container_name(&name)).await)
            } else {
                None
            };
            let ports = self
                .store
                .load_local(&entry.project_dir)
                .await?
                .map(|config| config.ports);

            rows.push(SandboxStatus {
                name,
                state,
                ports,
                project_dir: entry.project_dir,
                created_at: entry.created_at,
            });
        }
        Ok(rows)
    }

    /// Create a sandbox config, register it and make sure the base image exists.
    pub async fn init(&self, request: InitRequest, events: EventSink<'_>) -> Result<InitOutcome> {
        self.ensure_daemon().await?;

        let name = request
            .name
            .unwrap_or_else(|| DEFAULT_SANDBOX.to_string());
        validate_name(&name)?;
        let project_dir = std::path::absolute(&request.project_dir)?;

        if !request.force && self.store.load_local(&project_dir).await?.is_some() {
            return Err(CoreError::AlreadyConfigured(project_dir));
        }
        if let Some(entry) = self.store.lookup(&name).await? {
            if entry.project_dir != project_dir && !request.force {
                // An entry whose config is gone no longer owns the name.
                if self.store.load_local(&entry.project_dir).await?.is_some() {
                    return Err(CoreError::NameTaken {
                        name,
                        project_dir: entry.project_dir,
                    });
                }
                tracing::debug!(
                    sandbox = %name,
                    stale_dir = %entry.project_dir.display(),
                    "Rebinding orphaned registry entry"
                );
            }
        }

        let config = SandboxConfig {
            name: name.clone(),
            projects_dir: project_dir.clone(),
            ports: request.ports,
            yolo: request.yolo,
        };

        self.store.prepare_state(&project_dir).await?;
        self.store.save_local(&project_dir, &config).await?;
        self.store
            .register(&name, RegistryEntry::new(&project_dir))
            .await?;
        tracing::info!(sandbox = %name, project_dir = %project_dir.display(), "Sandbox initialized");

        let built_base_image = self.ensure_base_image(events).await?;
        Ok(InitOutcome {
            config,
            built_base_image,
        })
    }
}

impl DestroyReport {
    fn warn(&mut self, message: String) {
        tracing::warn!(%message, "Destroy step failed");
        self.warnings.push(message);
    }
}

fn not_found(name: Option<&str>, current_dir: &Path) -> CoreError {
    match name {
        Some(name) => CoreError::NotFound(name.to_string()),
        None => CoreError::NoSandbox(current_dir.to_path_buf()),
    }
}
