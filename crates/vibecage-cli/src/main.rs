//! vibecage entry point.
//!
//! Each invocation performs one sandbox transition and exits. Logs go to
//! stderr at `warn` unless `RUST_LOG` says otherwise.

mod cli;
mod commands;
mod config;

use clap::Parser;
use cli::Cli;
use commands::App;
use config::VibecageConfig;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = VibecageConfig::from_env();
    tracing::debug!(?config, "Configuration loaded");

    App::new(&config)?.run(cli).await
}
