pub mod handler;

use clap::Args;
use std::path::PathBuf;

pub use handler::handle_import_command;

#[derive(Args)]
pub struct ImportCommands {
    /// JSON files holding one form or an array of forms
    #[arg(required = true, help = "Files to import")]
    pub files: Vec<PathBuf>,

    /// Target project (overrides default_project from config)
    #[arg(short, long, help = "Project to create the forms in")]
    pub project: Option<String>,

    /// Forms API base URL (overrides config and FORM_IMPORT_API_URL)
    #[arg(long, help = "Forms API base URL")]
    pub api_url: Option<String>,

    /// Bearer token (overrides config and FORM_IMPORT_TOKEN)
    #[arg(long, help = "API access token")]
    pub token: Option<String>,

    /// Run the whole pipeline without contacting the server
    #[arg(long, help = "Do not submit anything")]
    pub dry_run: bool,

    /// Fail forms whose options point at sections that do not exist
    #[arg(long, help = "Reject dangling section references")]
    pub strict_references: bool,

    /// Append a diagnostic trace of the run to this file
    #[arg(long, help = "Diagnostic trace file")]
    pub trace_file: Option<PathBuf>,

    /// Write the batch report as JSON
    #[arg(long, help = "JSON report output path")]
    pub report: Option<PathBuf>,
}
