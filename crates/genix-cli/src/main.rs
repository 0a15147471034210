mod cli;
mod completions;
mod config;
mod error;
mod tui;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::CliConfig;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error::handle_error(err);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        completions::generate_completions(shell);
        return Ok(());
    }

    let config_path = cli.config.clone().unwrap_or_else(CliConfig::config_path);
    let mut config = CliConfig::load_from(&config_path);
    cli.apply_overrides(&mut config.overlay);
    config.overlay.validate()?;

    if let Some(Commands::Config { save }) = cli.command {
        print!("{}", config.to_toml()?);
        if save {
            config.save_to(&config_path)?;
            eprintln!("Saved to {}", config_path.display());
        }
        return Ok(());
    }

    // The TUI owns the terminal, so logs always go to a file
    let _guard = init_logging(cli.verbose)?;
    tracing::info!(config = %config_path.display(), "Starting genix");

    tui::run(&config).await
}

fn init_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "genix.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose {
        "genix=debug,genix_core=debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    Ok(guard)
}

fn log_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("genix")
        .join("logs")
}
