use anyhow::Result;
use clap::{Args, Subcommand};
use colored::*;

use form_import::config::Config;

#[derive(Args)]
pub struct ConfigCommands {
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Show the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn handle_config_command(args: ConfigCommands, config: &Config) -> Result<()> {
    match args.command {
        ConfigSubcommands::Show => show_command(config),
        ConfigSubcommands::Path => {
            println!("{}", Config::get_config_path()?.display());
            Ok(())
        }
        ConfigSubcommands::Init { force } => init_command(force),
    }
}

fn show_command(config: &Config) -> Result<()> {
    let unset = || "(not set)".dimmed().to_string();

    println!("⚙️  {}", "Configuration".bold());
    println!("  API URL:          {}", config.api_url.clone().unwrap_or_else(unset));
    println!("  API token:        {}", config.masked_token().unwrap_or_else(unset));
    println!("  Default project:  {}", config.default_project.clone().unwrap_or_else(unset));
    println!();
    println!("  {}", "[import]".cyan());
    println!(
        "  reference_policy: {}",
        format!("{:?}", config.import.reference_policy).to_lowercase()
    );
    println!("  default_category: {}", config.import.default_category);
    println!();
    println!("  {}", "[http]".cyan());
    println!("  timeout_secs:     {}", config.http.timeout_secs);
    println!("  max_attempts:     {}", config.http.max_attempts);
    println!("  base_delay_ms:    {}", config.http.base_delay_ms);
    Ok(())
}

fn init_command(force: bool) -> Result<()> {
    let path = Config::get_config_path()?;
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    let path = Config::default().save()?;
    println!("✅ Wrote default config to {}", path.display().to_string().bright_green());
    Ok(())
}
