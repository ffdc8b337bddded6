use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

use cli::commands::{handle_check_command, handle_config_command, handle_import_command};
use cli::{Cli, Commands};
use form_import::config::Config;

const DEFAULT_LOG_FILE: &str = "form-import.log";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logger to file (truncate on each run)
    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    info!("Starting form-import");
    let config = Config::load()?;

    match cli.command {
        Commands::Import(args) => handle_import_command(args, config).await,
        Commands::Check(args) => handle_check_command(args, &config).await,
        Commands::Config(args) => {
            handle_config_command(args, &config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
