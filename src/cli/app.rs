use super::commands::check::CheckCommands;
use super::commands::config::ConfigCommands;
use super::commands::import::ImportCommands;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "form-import")]
#[command(about = "Import JSON form definitions into a project through the forms API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Write the log to this file instead of form-import.log
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import forms from JSON files into a project
    Import(ImportCommands),
    /// Validate and remap forms locally without submitting anything
    Check(CheckCommands),
    /// Configuration management
    Config(ConfigCommands),
}
