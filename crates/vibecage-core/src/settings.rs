//! Port policy and yolo edits.
//!
//! Edits only touch the local config; a running container keeps its old
//! settings until it is recreated, so every result says whether one is up.

use crate::config::{parse_port_list, PortPolicy};
use crate::error::Result;
use crate::lifecycle::SandboxController;
use crate::resolve::ResolvedSandbox;
use std::path::Path;
use vibecage_runtime::container_name;

/// What a port edit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortEdit {
    /// The stored policy changed.
    Updated,
    /// `add` on a sandbox that already exposes every preset port.
    AlreadyAll,
    /// `remove` on a sandbox that publishes nothing.
    NothingToRemove,
}

/// Port policy after a show or edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortsReport {
    /// Sandbox name
    pub sandbox: String,
    /// Policy as stored after the call
    pub policy: PortPolicy,
    /// What the call did (`Updated` for a show)
    pub edit: PortEdit,
    /// Whether the container is running right now
    pub running: bool,
}

/// Yolo subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YoloAction {
    /// Report the flag without touching it
    Show,
    /// Enable; a no-op when already on
    On,
    /// Disable; a no-op when already off
    Off,
    /// Flip the stored value
    Toggle,
}

/// Yolo flag after a show or edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YoloReport {
    /// Resolved sandbox name
    pub sandbox: String,
    /// Flag value after the call
    pub enabled: bool,
    /// Whether the local config was rewritten
    pub changed: bool,
    /// Whether the container is running; a change applies on its next creation
    pub running: bool,
}

impl SandboxController {
    /// Current port policy.
    pub async fn show_ports(&self, name: Option<&str>, current_dir: &Path) -> Result<PortsReport> {
        let sandbox = self.require(name, current_dir).await?;
        Ok(PortsReport {
            running: self.is_running(&sandbox).await,
            sandbox: sandbox.config.name,
            policy: sandbox.config.ports,
            edit: PortEdit::Updated,
        })
    }

    /// Append port specifiers not already published.
    pub async fn add_ports(
        &self,
        name: Option<&str>,
        current_dir: &Path,
        specs: &str,
    ) -> Result<PortsReport> {
        let additions = parse_port_list(specs)?;
        let sandbox = self.require(name, current_dir).await?;

        if sandbox.config.ports == PortPolicy::All {
            return self.report(sandbox, PortEdit::AlreadyAll).await;
        }

        let mut ports = sandbox.config.ports.expand();
        for mapping in additions {
            if !ports.contains(&mapping) {
                ports.push(mapping);
            }
        }
        self.save_ports(sandbox, PortPolicy::Custom(ports)).await
    }

    /// Drop the given port specifiers.
    pub async fn remove_ports(
        &self,
        name: Option<&str>,
        current_dir: &Path,
        specs: &str,
    ) -> Result<PortsReport> {
        let removals = parse_port_list(specs)?;
        let sandbox = self.require(name, current_dir).await?;

        if sandbox.config.ports == PortPolicy::None {
            return self.report(sandbox, PortEdit::NothingToRemove).await;
        }

        let mut ports = sandbox.config.ports.expand();
        ports.retain(|mapping| !removals.contains(mapping));
        let policy = if ports.is_empty() {
            PortPolicy::None
        } else {
            PortPolicy::Custom(ports)
        };
        self.save_ports(sandbox, policy).await
    }

    /// Replace the port policy.
    pub async fn set_ports(
        &self,
        name: Option<&str>,
        current_dir: &Path,
        policy: PortPolicy,
    ) -> Result<PortsReport> {
        let sandbox = self.require(name, current_dir).await?;
        self.save_ports(sandbox, policy).await
    }

    /// Show or change the yolo flag.
    pub async fn yolo(
        &self,
        name: Option<&str>,
        current_dir: &Path,
        action: YoloAction,
    ) -> Result<YoloReport> {
        let mut sandbox = self.require(name, current_dir).await?;
        let current = sandbox.config.yolo;
        let enabled = match action {
            YoloAction::Show => current,
            YoloAction::On => true,
            YoloAction::Off => false,
            YoloAction::Toggle => !current,
        };

        let changed = enabled != current;
        if changed {
            sandbox.config.yolo = enabled;
            self.store()
                .save_local(&sandbox.project_dir, &sandbox.config)
                .await?;
            tracing::info!(sandbox = %sandbox.name(), enabled, "Yolo flag updated");
        }

        Ok(YoloReport {
            running: self.is_running(&sandbox).await,
            sandbox: sandbox.config.name,
            enabled,
            changed,
        })
    }

    async fn save_ports(&self, mut sandbox: ResolvedSandbox, policy: PortPolicy) -> Result<PortsReport> {
        tracing::info!(sandbox = %sandbox.name(), ports = %policy, "Port policy updated");
        sandbox.config.ports = policy;
        self.store()
            .save_local(&sandbox.project_dir, &sandbox.config)
            .await?;
        self.report(sandbox, PortEdit::Updated).await
    }

    async fn report(&self, sandbox: ResolvedSandbox, edit: PortEdit) -> Result<PortsReport> {
        Ok(PortsReport {
            running: self.is_running(&sandbox).await,
            sandbox: sandbox.config.name,
            policy: sandbox.config.ports,
            edit,
        })
    }

    /// Whether the sandbox's container runs; an unreachable runtime counts as not.
    async fn is_running(&self, sandbox: &ResolvedSandbox) -> bool {
        self.driver().daemon_reachable().await
            && self
                .driver()
                .container_running(&container_name(sandbox.name()))
                .await
    }
}
