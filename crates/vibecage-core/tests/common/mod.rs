//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use vibecage_core::{
    ConfigStore, CoreError, LifecycleEvent, Registry, RegistryEntry, SandboxConfig,
    SandboxController,
};
use vibecage_runtime::{BuildRecipe, ContainerSpec, RuntimeDriver, RuntimeError};

#[derive(Debug, Default)]
pub struct DriverState {
    pub daemon_down: bool,
    pub images: BTreeSet<String>,
    /// Container name -> running
    pub containers: HashMap<String, bool>,
    pub fail_commit: bool,
    pub fail_build: bool,
    pub fail_rmi: bool,
    pub calls: Vec<String>,
    pub created: Vec<ContainerSpec>,
}

/// Records every mutating call and keeps a fake engine state.
#[derive(Debug, Default)]
pub struct MockDriver {
    pub state: Mutex<DriverState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(self, tag: &str) -> Self {
        self.state.lock().unwrap().images.insert(tag.to_string());
        self
    }

    pub fn with_container(self, name: &str, running: bool) -> Self {
        self.state
            .lock()
            .unwrap()
            .containers
            .insert(name.to_string(), running);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn created(&self) -> Vec<ContainerSpec> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn has_image(&self, tag: &str) -> bool {
        self.state.lock().unwrap().images.contains(tag)
    }

    pub fn running(&self, name: &str) -> Option<bool> {
        self.state.lock().unwrap().containers.get(name).copied()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn failure(operation: &str, message: &str) -> RuntimeError {
        RuntimeError::Command {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl RuntimeDriver for MockDriver {
    async fn daemon_reachable(&self) -> bool {
        !self.state.lock().unwrap().daemon_down
    }

    async fn image_exists(&self, tag: &str) -> bool {
        self.has_image(tag)
    }

    async fn container_exists(&self, name: &str) -> bool {
        self.running(name).is_some()
    }

    async fn container_running(&self, name: &str) -> bool {
        self.running(name).unwrap_or(false)
    }

    async fn build_image(
        &self,
        tag: &str,
        _recipe: &BuildRecipe,
        on_progress: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> vibecage_runtime::Result<()> {
        self.record(format!("build {tag}"));
        let line = format!("Step 1/2 : FROM {}", "ubuntu:24.04");
        on_progress(&line);
        if self.state.lock().unwrap().fail_build {
            on_progress("error: no space left on device");
            return Err(RuntimeError::Build {
                code: 1,
                output: "error: no space left on device".to_string(),
            });
        }
        on_progress("Successfully built");
        self.state.lock().unwrap().images.insert(tag.to_string());
        Ok(())
    }

    async fn create_and_start(&self, spec: &ContainerSpec) -> vibecage_runtime::Result<()> {
        self.record(format!("create {} from {}", spec.name, spec.image));
        let mut state = self.state.lock().unwrap();
        if state.containers.contains_key(&spec.name) {
            return Err(Self::failure("create", "name already in use"));
        }
        state.containers.insert(spec.name.clone(), true);
        state.created.push(spec.clone());
        Ok(())
    }

    async fn start_existing(&self, name: &str) -> vibecage_runtime::Result<()> {
        self.record(format!("start {name}"));
        let mut state = self.state.lock().unwrap();
        match state.containers.get_mut(name) {
            Some(running) => {
                *running = true;
                Ok(())
            }
            None => Err(Self::failure("start", "no such container")),
        }
    }

    async fn stop(&self, name: &str) -> vibecage_runtime::Result<()> {
        self.record(format!("stop {name}"));
        let mut state = self.state.lock().unwrap();
        match state.containers.get_mut(name) {
            Some(running) => {
                *running = false;
                Ok(())
            }
            None => Err(Self::failure("stop", "no such container")),
        }
    }

    async fn remove(&self, name: &str) -> vibecage_runtime::Result<()> {
        self.record(format!("rm {name}"));
        match self.state.lock().unwrap().containers.remove(name) {
            Some(_) => Ok(()),
            None => Err(Self::failure("rm", "no such container")),
        }
    }

    async fn remove_image(&self, tag: &str) -> vibecage_runtime::Result<()> {
        self.record(format!("rmi {tag}"));
        let mut state = self.state.lock().unwrap();
        if state.fail_rmi {
            return Err(Self::failure("rmi", "image is being used by a stopped container"));
        }
        if state.images.remove(tag) {
            Ok(())
        } else {
            Err(Self::failure("rmi", "no such image"))
        }
    }

    async fn commit(&self, container: &str, dest_tag: &str) -> vibecage_runtime::Result<()> {
        self.record(format!("commit {container} {dest_tag}"));
        let mut state = self.state.lock().unwrap();
        if state.fail_commit {
            return Err(Self::failure("commit", "disk full"));
        }
        state.images.insert(dest_tag.to_string());
        Ok(())
    }

    async fn attach_interactive(&self, name: &str) -> vibecage_runtime::Result<i32> {
        self.record(format!("attach {name}"));
        if self.running(name) == Some(true) {
            Ok(0)
        } else {
            Err(Self::failure("exec", "container is not running"))
        }
    }
}

/// In-memory config store with an operation log.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub locals: Mutex<HashMap<PathBuf, SandboxConfig>>,
    pub registry: Mutex<Registry>,
    pub ops: Mutex<Vec<String>>,
    pub fail_delete: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a local config and its registry entry.
    pub fn with_sandbox(self, name: &str, project_dir: &str) -> Self {
        let dir = PathBuf::from(project_dir);
        self.locals
            .lock()
            .unwrap()
            .insert(dir.clone(), SandboxConfig::new(name, &dir));
        self.registry
            .lock()
            .unwrap()
            .insert(name.to_string(), RegistryEntry::new(dir));
        self
    }

    /// Add a registry entry with no local config behind it.
    pub fn with_orphan(self, name: &str, project_dir: &str) -> Self {
        self.registry
            .lock()
            .unwrap()
            .insert(name.to_string(), RegistryEntry::new(project_dir));
        self
    }

    pub fn local(&self, project_dir: &str) -> Option<SandboxConfig> {
        self.locals
            .lock()
            .unwrap()
            .get(Path::new(project_dir))
            .cloned()
    }

    pub fn registered(&self, name: &str) -> bool {
        self.registry.lock().unwrap().contains_key(name)
    }

    pub fn registered_dir(&self, name: &str) -> Option<PathBuf> {
        self.registry
            .lock()
            .unwrap()
            .get(name)
            .map(|entry| entry.project_dir.clone())
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: String) {
        self.ops.lock().unwrap().push(op);
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn load_local(&self, project_dir: &Path) -> vibecage_core::Result<Option<SandboxConfig>> {
        Ok(self.locals.lock().unwrap().get(project_dir).cloned())
    }

    async fn save_local(
        &self,
        project_dir: &Path,
        config: &SandboxConfig,
    ) -> vibecage_core::Result<()> {
        self.record(format!("save {}", project_dir.display()));
        self.locals
            .lock()
            .unwrap()
            .insert(project_dir.to_path_buf(), config.clone());
        Ok(())
    }

    async fn delete_local(&self, project_dir: &Path) -> vibecage_core::Result<()> {
        self.record(format!("delete {}", project_dir.display()));
        if *self.fail_delete.lock().unwrap() {
            return Err(CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            )));
        }
        self.locals.lock().unwrap().remove(project_dir);
        Ok(())
    }

    async fn prepare_state(&self, project_dir: &Path) -> vibecage_core::Result<()> {
        self.record(format!("prepare {}", project_dir.display()));
        Ok(())
    }

    async fn registry(&self) -> vibecage_core::Result<Registry> {
        Ok(self.registry.lock().unwrap().clone())
    }

    async fn register(&self, name: &str, entry: RegistryEntry) -> vibecage_core::Result<()> {
        self.record(format!("register {name}"));
        self.registry
            .lock()
            .unwrap()
            .insert(name.to_string(), entry);
        Ok(())
    }

    async fn unregister(&self, name: &str) -> vibecage_core::Result<()> {
        self.record(format!("unregister {name}"));
        self.registry.lock().unwrap().remove(name);
        Ok(())
    }
}

/// Controller over the given doubles, with every host port free and no
/// docker group.
pub fn controller(driver: &Arc<MockDriver>, store: &Arc<MemoryStore>) -> SandboxController {
    SandboxController::new(driver.clone(), store.clone())
        .with_probe(|_: u16| true)
        .with_docker_group(false)
}

/// Event sink collecting everything it sees.
pub fn collect(events: &mut Vec<LifecycleEvent>) -> impl FnMut(LifecycleEvent) + Send + '_ {
    move |event| events.push(event)
}
