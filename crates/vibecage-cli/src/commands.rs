//! Command handlers and their terminal output.

use crate::cli::{Cli, Commands, PortsCommand, YoloCommand};
use crate::config::VibecageConfig;
use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use vibecage_core::{
    FsConfigStore, InitRequest, LifecycleEvent, PortEdit, PortPolicy, PortsReport,
    SandboxController, StopOutcome, YoloAction, YoloReport,
};
use vibecage_runtime::DockerDriver;

const RESTART_HINT: &str = "Restart the sandbox to apply changes: vibecage stop && vibecage";

/// Dispatches parsed commands to the controller.
pub struct App {
    controller: SandboxController,
    cwd: PathBuf,
}

impl App {
    pub fn new(config: &VibecageConfig) -> Result<Self> {
        let driver = DockerDriver::with_binary(&config.docker);
        let store = FsConfigStore::new(&config.home);
        let cwd = std::env::current_dir()
            .map_err(|e| anyhow!("cannot determine current directory: {e}"))?;

        Ok(Self {
            controller: SandboxController::new(Arc::new(driver), Arc::new(store)),
            cwd,
        })
    }

    pub async fn run(&self, cli: Cli) -> Result<()> {
        match cli.command {
            None => self.attach(cli.name.as_deref()).await,
            Some(Commands::Init {
                name,
                dir,
                ports,
                yolo,
                force,
            }) => {
                let mut request = InitRequest::new(dir.unwrap_or_else(|| self.cwd.clone()))
                    .ports(ports.parse()?)
                    .yolo(yolo)
                    .force(force);
                request.name = name;
                self.init(request).await
            }
            Some(Commands::Stop { name }) => self.stop(name.as_deref()).await,
            Some(Commands::Status) => self.status().await,
            Some(Commands::Destroy { name, force }) => self.destroy(&name, force).await,
            Some(Commands::Ports { command }) => self.ports(command).await,
            Some(Commands::Yolo { command, name }) => {
                let (action, name) = match command {
                    None => (YoloAction::Show, name),
                    Some(YoloCommand::On { name }) => (YoloAction::On, name),
                    Some(YoloCommand::Off { name }) => (YoloAction::Off, name),
                    Some(YoloCommand::Toggle { name }) => (YoloAction::Toggle, name),
                };
                let report = self
                    .controller
                    .yolo(name.as_deref(), &self.cwd, action)
                    .await?;
                print_yolo(&report);
                Ok(())
            }
        }
    }

    async fn attach(&self, name: Option<&str>) -> Result<()> {
        let outcome = self
            .controller
            .attach(name, &self.cwd, &mut print_event)
            .await?;

        tracing::debug!(sandbox = %outcome.sandbox, start = ?outcome.start, "Session ended");
        println!(
            "\n  Detached from \"{}\" (exit {}). The container keeps running; `vibecage stop` saves and stops it.\n",
            outcome.sandbox, outcome.exit_code
        );
        Ok(())
    }

    async fn init(&self, request: InitRequest) -> Result<()> {
        let outcome = self.controller.init(request, &mut print_event).await?;
        let config = outcome.config;

        println!("\n  Sandbox \"{}\" initialized", config.name);
        println!("  Directory: {}", config.projects_dir.display());
        println!("  Ports:     {}", config.ports);
        println!("  Yolo:      {}", on_off(config.yolo));
        println!("\n  Start it with: vibecage {}\n", config.name);
        Ok(())
    }

    async fn stop(&self, name: Option<&str>) -> Result<()> {
        match self.controller.stop(name, &self.cwd, &mut print_event).await? {
            StopOutcome::NotRunning => println!("\n  Sandbox is not running.\n"),
            StopOutcome::AlreadyStopped => println!("\n  Sandbox is already stopped.\n"),
            StopOutcome::Stopped { image } => {
                println!("\n  Sandbox stopped, state saved to {image}\n")
            }
        }
        Ok(())
    }

    async fn status(&self) -> Result<()> {
        let rows = self.controller.status().await?;
        if rows.is_empty() {
            println!("\n  No sandboxes. Create one with: vibecage init\n");
            return Ok(());
        }

        println!();
        println!("  {:<20} {:<12} {:<20} DIRECTORY", "NAME", "STATUS", "PORTS");
        for row in rows {
            let state = row
                .state
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let ports = row
                .ports
                .map(|p| p.to_string())
                .unwrap_or_else(|| "(missing config)".to_string());
            println!(
                "  {:<20} {:<12} {:<20} {}",
                row.name,
                state,
                ports,
                row.project_dir.display()
            );
        }
        println!();
        Ok(())
    }

    async fn destroy(&self, name: &str, force: bool) -> Result<()> {
        if !force && !confirm(name).await? {
            println!("  Cancelled.");
            return Ok(());
        }

        let report = self.controller.destroy(name).await?;
        for warning in &report.warnings {
            eprintln!("  warning: {warning}");
        }
        if report.container_removed {
            println!("  Removed container");
        }
        if report.image_removed {
            println!("  Removed saved image");
        }
        if report.config_removed {
            println!("  Removed configuration");
        }
        if report.unregistered {
            println!("\n  Sandbox \"{name}\" destroyed.\n");
        } else {
            println!("\n  Sandbox \"{name}\" is still registered; fix the errors above and retry.\n");
        }
        Ok(())
    }

    async fn ports(&self, command: PortsCommand) -> Result<()> {
        let cwd = &self.cwd;
        let report = match command {
            PortsCommand::Show { name } => {
                let report = self.controller.show_ports(name.as_deref(), cwd).await?;
                print_policy(&report);
                return Ok(());
            }
            PortsCommand::Add { ports, name } => {
                self.controller
                    .add_ports(name.as_deref(), cwd, &ports)
                    .await?
            }
            PortsCommand::Remove { ports, name } => {
                self.controller
                    .remove_ports(name.as_deref(), cwd, &ports)
                    .await?
            }
            PortsCommand::Set { policy, name } => {
                let policy: PortPolicy = policy.parse()?;
                self.controller
                    .set_ports(name.as_deref(), cwd, policy)
                    .await?
            }
        };

        match report.edit {
            PortEdit::AlreadyAll => {
                println!("\n  Sandbox already exposes all ports. Use `vibecage ports set` for a custom list.\n");
            }
            PortEdit::NothingToRemove => println!("\n  No ports to remove.\n"),
            PortEdit::Updated => {
                println!("\n  Ports for \"{}\": {}\n", report.sandbox, report.policy);
                if report.running {
                    println!("  {RESTART_HINT}\n");
                }
            }
        }
        Ok(())
    }
}

fn print_policy(report: &PortsReport) {
    println!("\n  Sandbox: {}", report.sandbox);
    match &report.policy {
        PortPolicy::Custom(_) => println!("  Custom ports: {}", report.policy),
        preset => {
            let ports: Vec<String> = preset
                .expand()
                .iter()
                .map(|m| m.host.to_string())
                .collect();
            println!("  Port preset: {preset}");
            if ports.is_empty() {
                println!("  No ports exposed");
            } else {
                println!("  {}", ports.join(", "));
            }
        }
    }
    println!();
    if report.running {
        println!("  Note: restart the sandbox to apply port changes.\n");
    }
}

fn print_yolo(report: &YoloReport) {
    if report.changed {
        println!(
            "\n  Yolo mode {} for \"{}\"\n",
            if report.enabled { "enabled" } else { "disabled" },
            report.sandbox
        );
        if report.running {
            println!("  {RESTART_HINT}\n");
        }
    } else {
        println!("\n  Yolo mode for \"{}\": {}\n", report.sandbox, on_off(report.enabled));
    }
}

fn print_event(event: LifecycleEvent) {
    match event {
        LifecycleEvent::Initializing {
            sandbox,
            project_dir,
        } => println!(
            "\n  No sandbox found. Initializing \"{sandbox}\" in {}",
            project_dir.display()
        ),
        LifecycleEvent::BuildStarted { image } => {
            println!("\n  Building {image} (first run only, this can take a few minutes)...\n")
        }
        LifecycleEvent::BuildOutput(line) => println!("    {line}"),
        LifecycleEvent::BuildFinished { image } => println!("\n  Built {image}"),
        LifecycleEvent::ContainerStarting { container } => {
            println!("  Starting {container}...")
        }
        LifecycleEvent::ContainerStarted { .. } => {}
        LifecycleEvent::PortsRemapped(changes) => {
            println!("\n  Some ports were busy and were remapped:");
            for change in changes {
                println!(
                    "    {} -> {} (container {})",
                    change.original_host, change.resolved_host, change.container
                );
            }
            println!();
        }
        LifecycleEvent::PortsUnresolved(mappings) => {
            eprintln!("\n  warning: no free host port found for:");
            for mapping in mappings {
                eprintln!("    {mapping}");
            }
            eprintln!();
        }
        LifecycleEvent::Attaching { container } => println!("  Attaching to {container}...\n"),
        LifecycleEvent::SavingState { image } => println!("  Saving state to {image}..."),
        LifecycleEvent::Stopping { container } => println!("  Stopping {container}..."),
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

async fn confirm(name: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(
            format!("Remove sandbox \"{name}\" (container, saved image, config)? [y/N] ")
                .as_bytes(),
        )
        .await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
