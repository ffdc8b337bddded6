//! Per-file results, progress and the final batch report

use serde::Serialize;

use super::importer::FormOutcome;
use crate::api::CreatedForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Processing,
    /// At least one form from the file was created
    Success,
    Error,
    /// Never started, or stopped before any form was attempted
    Cancelled,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileStatus::Pending => "pending",
            FileStatus::Processing => "processing",
            FileStatus::Success => "success",
            FileStatus::Error => "error",
            FileStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// How the forms of one file fared overall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClassification {
    AllSucceeded,
    PartialSuccess,
    AllFailed,
}

/// Outcome of importing one file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub name: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Candidates decoded from the file; unset when decoding failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_count: Option<usize>,
    pub forms_created: usize,
    pub forms_failed: usize,
    pub created: Vec<CreatedForm>,
}

impl FileResult {
    /// File that could not be read or decoded
    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: FileStatus::Error,
            error: Some(error.into()),
            form_count: None,
            forms_created: 0,
            forms_failed: 0,
            created: Vec::new(),
        }
    }

    /// File skipped because the batch was cancelled first
    pub fn cancelled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: FileStatus::Cancelled,
            error: Some("Import cancelled".to_string()),
            form_count: None,
            forms_created: 0,
            forms_failed: 0,
            created: Vec::new(),
        }
    }

    /// Classify a file from the outcomes of its forms.
    ///
    /// `interrupted` means cancellation stopped the loop before every candidate ran.
    pub fn from_outcomes(
        name: impl Into<String>,
        form_count: usize,
        outcomes: Vec<FormOutcome>,
        interrupted: bool,
    ) -> Self {
        let name = name.into();
        let failures = failure_summary(&outcomes);
        let forms_failed = outcomes.iter().filter(|o| !o.is_created()).count();
        let created: Vec<CreatedForm> = outcomes
            .into_iter()
            .filter_map(|o| match o {
                FormOutcome::Created(form) => Some(form),
                _ => None,
            })
            .collect();
        let forms_created = created.len();

        let (status, error) = if interrupted && forms_created == 0 && forms_failed == 0 {
            (FileStatus::Cancelled, Some("Import cancelled".to_string()))
        } else {
            match classify(forms_created, forms_failed) {
                FileClassification::AllSucceeded if interrupted => (
                    FileStatus::Success,
                    Some(format!(
                        "Imported {} of {} form(s) before cancellation",
                        forms_created, form_count
                    )),
                ),
                FileClassification::AllSucceeded => (FileStatus::Success, None),
                FileClassification::PartialSuccess => (
                    FileStatus::Success,
                    Some(format!(
                        "Imported {} form(s), {} failed: {}",
                        forms_created, forms_failed, failures
                    )),
                ),
                FileClassification::AllFailed if forms_failed == 0 => {
                    (FileStatus::Error, Some("No forms found in file".to_string()))
                }
                FileClassification::AllFailed => (FileStatus::Error, Some(failures)),
            }
        };

        Self {
            name,
            status,
            error,
            form_count: Some(form_count),
            forms_created,
            forms_failed,
            created,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FileStatus::Success
    }
}

/// Zero successes is a failure regardless of how many forms were attempted
pub fn classify(created: usize, failed: usize) -> FileClassification {
    match (created, failed) {
        (0, _) => FileClassification::AllFailed,
        (_, 0) => FileClassification::AllSucceeded,
        _ => FileClassification::PartialSuccess,
    }
}

/// `Form <n>: <reason>` for each failed form, 1-based by position in the file
fn failure_summary(outcomes: &[FormOutcome]) -> String {
    outcomes
        .iter()
        .enumerate()
        .filter_map(|(i, o)| o.error().map(|e| format!("Form {}: {}", i + 1, e)))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Files completed out of files queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    /// Whole percent, rounded down
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            100
        } else {
            (self.completed * 100 / self.total) as u8
        }
    }
}

/// Toast-style summary of a finished batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub is_error: bool,
}

/// Everything a caller needs after a batch finishes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total_files: usize,
    pub files_succeeded: usize,
    pub forms_created: usize,
    pub created_forms: Vec<CreatedForm>,
    pub files: Vec<FileResult>,
    pub rejected_files: Vec<String>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn from_files(files: Vec<FileResult>, rejected_files: Vec<String>, cancelled: bool) -> Self {
        let created_forms: Vec<CreatedForm> = files.iter().flat_map(|f| f.created.iter().cloned()).collect();
        Self {
            total_files: files.len(),
            files_succeeded: files.iter().filter(|f| f.is_success()).count(),
            forms_created: created_forms.len(),
            created_forms,
            files,
            rejected_files,
            cancelled,
        }
    }

    pub fn notice(&self) -> Notice {
        if self.forms_created == 0 {
            let message = if self.cancelled {
                "Import cancelled before any form was created".to_string()
            } else {
                "No forms were imported".to_string()
            };
            return Notice {
                title: "Import Failed".to_string(),
                message,
                is_error: true,
            };
        }

        let mut message = format!(
            "Imported {} form(s) from {} file(s)",
            self.forms_created, self.files_succeeded
        );
        if self.cancelled {
            message.push_str(" before the import was cancelled");
        }
        Notice {
            title: "Import Successful".to_string(),
            message,
            is_error: false,
        }
    }
}
