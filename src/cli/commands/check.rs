//! Local validation of form files

use anyhow::Result;
use clap::Args;
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;

use form_import::api::DryRunCreator;
use form_import::config::Config;
use form_import::import::{
    FormImporter, ReferencePolicy, RemappedForm, SelectedFile, SequentialIdGenerator, accept_files,
    decode,
};

#[derive(Args)]
pub struct CheckCommands {
    /// JSON files holding one form or an array of forms
    #[arg(required = true, help = "Files to check")]
    pub files: Vec<PathBuf>,

    /// Fail forms whose options point at sections that do not exist
    #[arg(long, help = "Reject dangling section references")]
    pub strict_references: bool,
}

/// Decode, validate and remap every form; nothing leaves the process
pub async fn handle_check_command(args: CheckCommands, config: &Config) -> Result<ExitCode> {
    let policy = if args.strict_references {
        ReferencePolicy::Reject
    } else {
        config.import.reference_policy
    };

    let selection = accept_files(args.files.iter().map(SelectedFile::from_path));
    if let Some(rejection) = selection.rejection() {
        println!("⚠️  {}", rejection.to_string().yellow());
    }

    let creator = DryRunCreator::new();
    let mut valid = 0;
    let mut invalid = 0;

    for file in &selection.accepted {
        println!("📄 {}", file.name.cyan().bold());

        let candidates = match file.read_text().await.and_then(|text| decode(&text)) {
            Ok(candidates) => candidates,
            Err(e) => {
                println!("   ❌ {}", e.to_string().red());
                invalid += 1;
                continue;
            }
        };
        if candidates.is_empty() {
            println!("   ❌ {}", "No forms found in file".red());
            invalid += 1;
            continue;
        }

        // Deterministic ids so repeated checks print the same output
        let ids = SequentialIdGenerator::new("check");
        let importer = FormImporter::new(&creator, &ids).reference_policy(policy);

        for (i, raw) in candidates.iter().enumerate() {
            match importer.prepare(raw) {
                Ok(remapped) => {
                    valid += 1;
                    print_form_summary(i + 1, &remapped);
                }
                Err(e) => {
                    invalid += 1;
                    println!("   ❌ Form {}: {}", i + 1, e.to_string().red());
                }
            }
        }
    }

    println!();
    println!(
        "{} valid, {} invalid",
        valid.to_string().green().bold(),
        invalid.to_string().red().bold()
    );

    if invalid == 0 && valid > 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn print_form_summary(position: usize, remapped: &RemappedForm) {
    let form = &remapped.form;
    println!(
        "   ✅ Form {}: {} {}",
        position,
        form.title.bold(),
        format!(
            "({} section(s), {} question(s), {} option(s))",
            form.sections.len(),
            form.question_count(),
            form.option_count()
        )
        .dimmed()
    );
    if remapped.removed_duplicates > 0 {
        println!(
            "      {} duplicate conditional question(s) removed from top level",
            remapped.removed_duplicates
        );
    }
    for dangling in &remapped.dangling_references {
        println!(
            "      {} option {} points to unknown section {}",
            "⚠️".yellow(),
            dangling.option_id,
            dangling.section_id.yellow()
        );
    }
}
