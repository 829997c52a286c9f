use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vibecage")]
#[command(version, about = "Isolated Docker sandboxes for AI-assisted development", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(after_help = "EXAMPLES:
    vibecage                    Start or attach to the sandbox for this directory
    vibecage work               Start or attach to the sandbox named 'work'
    vibecage init myproject     Initialize a sandbox named 'myproject' here
    vibecage stop               Save state and stop the sandbox
    vibecage status             List all sandboxes
    vibecage destroy myproject  Remove a sandbox entirely
    vibecage ports add 5000     Publish port 5000 on next start
    vibecage yolo on            Skip assistant permission prompts
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Sandbox to attach to (default: this directory's sandbox)
    #[arg(value_name = "NAME")]
    pub name: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new sandbox
    Init {
        /// Sandbox name (default: "default")
        name: Option<String>,

        /// Project directory (default: current directory)
        #[arg(long, value_name = "PATH")]
        dir: Option<PathBuf>,

        /// Port preset (all, minimal, none) or a list like 3000,5000:5001
        #[arg(long, value_name = "PORTS", default_value = "all")]
        ports: String,

        /// Launch the assistant without permission prompts
        #[arg(long)]
        yolo: bool,

        /// Overwrite an existing configuration or name binding
        #[arg(short, long)]
        force: bool,
    },

    /// Save sandbox state and stop its container
    Stop {
        /// Sandbox name
        name: Option<String>,
    },

    /// List all sandboxes and their status
    Status,

    /// Remove a sandbox entirely (container, image, config)
    Destroy {
        /// Sandbox name
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Manage published ports
    #[command(after_help = "Port changes apply when the container is recreated: vibecage stop && vibecage")]
    Ports {
        #[command(subcommand)]
        command: PortsCommand,
    },

    /// Show or change yolo mode
    #[command(args_conflicts_with_subcommands = true)]
    Yolo {
        #[command(subcommand)]
        command: Option<YoloCommand>,

        /// Sandbox name
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PortsCommand {
    /// Show the port policy
    Show {
        /// Sandbox name
        name: Option<String>,
    },

    /// Add ports (comma-separated)
    Add {
        /// Ports to add
        ports: String,
        /// Sandbox name
        name: Option<String>,
    },

    /// Remove ports (comma-separated)
    Remove {
        /// Ports to remove
        ports: String,
        /// Sandbox name
        name: Option<String>,
    },

    /// Replace the policy with a preset or a list
    Set {
        /// all, minimal, none, or a comma-separated list
        policy: String,
        /// Sandbox name
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum YoloCommand {
    /// Enable yolo mode
    On { name: Option<String> },
    /// Disable yolo mode
    Off { name: Option<String> },
    /// Toggle yolo mode
    Toggle { name: Option<String> },
}
