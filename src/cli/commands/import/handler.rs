//! Import command handler

use anyhow::{Context, Result};
use colored::*;
use log::{info, warn};
use std::fs;
use std::process::ExitCode;

use form_import::api::{DryRunCreator, FormCreator, FormsClient};
use form_import::config::Config;
use form_import::import::{
    BatchReport, CancellationToken, DiagnosticsSink, FileResult, FileSink, FileStatus, ImportEvent,
    ImportSession, ReferencePolicy, SelectedFile, accept_files,
};

use super::ImportCommands;
use crate::cli::ui::Spinner;

/// Handle the import command
pub async fn handle_import_command(args: ImportCommands, mut config: Config) -> Result<ExitCode> {
    // Flags win over environment and file
    if let Some(url) = args.api_url.clone() {
        config.api_url = Some(url);
    }
    if let Some(token) = args.token.clone() {
        config.api_token = Some(token);
    }

    let project_id = args
        .project
        .clone()
        .or_else(|| config.default_project.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("No project given. Pass --project or set default_project in the config file.")
        })?;

    let policy = if args.strict_references {
        ReferencePolicy::Reject
    } else {
        config.import.reference_policy
    };

    let selection = accept_files(args.files.iter().map(SelectedFile::from_path));
    if let Some(rejection) = selection.rejection() {
        println!("⚠️  {}", rejection.to_string().yellow());
    }
    if selection.accepted.is_empty() {
        anyhow::bail!("No JSON files to import");
    }

    let creator: Box<dyn FormCreator> = if args.dry_run {
        println!("🧪 {}", "Dry run: nothing will be submitted".bright_yellow());
        Box::new(DryRunCreator::new())
    } else {
        let api_url = config.api_url.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "No API URL configured. Pass --api-url, set FORM_IMPORT_API_URL or run 'form-import config init'."
            )
        })?;
        println!("🌍 Using API: {}", api_url.bright_green().bold());
        Box::new(
            FormsClient::new(api_url, config.api_token.clone(), config.http.timeout())?
                .with_retry_config(config.http.retry_config()),
        )
    };

    let trace = match &args.trace_file {
        Some(path) => Some(FileSink::open(path)?),
        None => None,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling import");
            ctrl_c.cancel();
        }
    });

    println!(
        "📦 Importing {} file(s) into project {}",
        selection.accepted.len(),
        project_id.cyan()
    );
    println!();

    let mut session = ImportSession::new(creator.as_ref())
        .reference_policy(policy)
        .default_category(config.import.default_category.clone())
        .cancellation(cancel)
        .rejected_files(selection.rejected_names());
    if let Some(sink) = trace.as_ref() {
        session = session.diagnostics(sink as &dyn DiagnosticsSink);
    }

    let mut spinner: Option<Spinner> = None;
    let report = session
        .run(&selection.accepted, &project_id, |event| match event {
            ImportEvent::FileStarted { index, total, name } => {
                spinner = Some(Spinner::start(format!("[{}/{}] {}", index + 1, total, name)));
            }
            ImportEvent::FileFinished { progress, result } => {
                if let Some(spinner) = spinner.take() {
                    spinner.stop();
                }
                print_file_result(progress.percent(), result);
            }
        })
        .await;

    print_summary(&report);

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report to: {}", path.display()))?;
        println!("💾 Report saved to: {}", path.display().to_string().bright_green());
    }

    info!("Import command finished with {} form(s) created", report.forms_created);
    if report.forms_created == 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_file_result(percent: u8, result: &FileResult) {
    let prefix = format!("[{:>3}%]", percent).dimmed();
    match result.status {
        FileStatus::Success => {
            println!(
                "{} ✅ {} {}",
                prefix,
                result.name.bold(),
                format!("{} form(s) created", result.forms_created).green()
            );
        }
        FileStatus::Cancelled => {
            println!("{} ⏹️  {} {}", prefix, result.name.bold(), "cancelled".yellow());
        }
        _ => {
            println!("{} ❌ {} {}", prefix, result.name.bold(), "failed".red());
        }
    }
    if let Some(message) = &result.error {
        println!("         {}", message.dimmed());
    }
}

fn print_summary(report: &BatchReport) {
    let notice = report.notice();
    println!();
    if notice.is_error {
        println!("❌ {}", notice.title.red().bold());
        println!("   {}", notice.message.red());
    } else {
        println!("🎉 {}", notice.title.bright_green().bold());
        println!("   {}", notice.message);
    }

    for form in &report.created_forms {
        println!("   • {} {}", form.title, format!("({})", form.id).dimmed());
    }
    println!();
}
