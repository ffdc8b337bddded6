//! Sequential batch orchestration
//!
//! Files are imported strictly one after another, and the forms of a file in
//! order. Every submission is awaited before the next one starts so progress
//! events arrive in order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use super::decoder::decode;
use super::diagnostics::{DiagnosticEvent, DiagnosticsSink};
use super::files::SelectedFile;
use super::ids::{IdGenerator, UuidIdGenerator};
use super::importer::{DEFAULT_CATEGORY, FormImporter, FormOutcome};
use super::remap::ReferencePolicy;
use super::report::{BatchReport, FileResult, Progress};
use crate::api::{CreatedForm, FormCreator};

const DEFAULT_IDS: &UuidIdGenerator = &UuidIdGenerator;

/// Shared flag checked between files and between forms
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-file notifications for whoever renders progress
#[derive(Debug)]
pub enum ImportEvent<'e> {
    FileStarted {
        index: usize,
        total: usize,
        name: &'e str,
    },
    FileFinished {
        progress: Progress,
        result: &'e FileResult,
    },
}

type CompletionCallback<'a> = Box<dyn FnOnce(&[CreatedForm]) + Send + 'a>;

/// One import run over a set of queued files
pub struct ImportSession<'a> {
    creator: &'a dyn FormCreator,
    ids: &'a dyn IdGenerator,
    policy: ReferencePolicy,
    default_category: String,
    diagnostics: Option<&'a dyn DiagnosticsSink>,
    cancel: CancellationToken,
    rejected_files: Vec<String>,
    on_complete: Option<CompletionCallback<'a>>,
}

impl<'a> ImportSession<'a> {
    pub fn new(creator: &'a dyn FormCreator) -> Self {
        Self {
            creator,
            ids: DEFAULT_IDS,
            policy: ReferencePolicy::default(),
            default_category: DEFAULT_CATEGORY.to_string(),
            diagnostics: None,
            cancel: CancellationToken::new(),
            rejected_files: Vec::new(),
            on_complete: None,
        }
    }

    pub fn id_generator(mut self, ids: &'a dyn IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }

    pub fn diagnostics(mut self, sink: &'a dyn DiagnosticsSink) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Names filtered out before queueing, carried into the report
    pub fn rejected_files(mut self, names: Vec<String>) -> Self {
        self.rejected_files = names;
        self
    }

    /// Called with every created form once the batch ends, if any were created
    pub fn on_complete(mut self, callback: impl FnOnce(&[CreatedForm]) + Send + 'a) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    fn trace(&self, event: DiagnosticEvent) {
        if let Some(sink) = self.diagnostics {
            sink.record(&event);
        }
    }

    /// Import every file in order and report per-file outcomes through `on_event`
    pub async fn run(
        mut self,
        files: &[SelectedFile],
        project_id: &str,
        mut on_event: impl FnMut(ImportEvent<'_>),
    ) -> BatchReport {
        let total = files.len();
        info!("Importing {} file(s) into project {}", total, project_id);

        for name in &self.rejected_files {
            self.trace(DiagnosticEvent::FileRejected { name: name.clone() });
        }
        self.trace(DiagnosticEvent::BatchStarted {
            files: total,
            project_id: project_id.to_string(),
        });

        let importer = FormImporter::new(self.creator, self.ids)
            .reference_policy(self.policy)
            .default_category(self.default_category.clone());

        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;

        for (index, file) in files.iter().enumerate() {
            let result = if self.cancel.is_cancelled() {
                cancelled = true;
                debug!("Skipping {} after cancellation", file.name);
                FileResult::cancelled(&file.name)
            } else {
                on_event(ImportEvent::FileStarted {
                    index,
                    total,
                    name: &file.name,
                });
                self.trace(DiagnosticEvent::FileStarted {
                    index,
                    name: file.name.clone(),
                });

                let (result, interrupted) = self.import_file(&importer, file, project_id).await;
                cancelled |= interrupted;

                match &result.error {
                    Some(message) => warn!("{}: {} ({})", result.name, result.status, message),
                    None => info!("{}: {} form(s) imported", result.name, result.forms_created),
                }
                result
            };

            self.trace(DiagnosticEvent::FileFinished {
                name: result.name.clone(),
                status: result.status,
                message: result.error.clone(),
            });

            // Skipped files count too, so progress always ends at 100%
            let progress = Progress {
                completed: index + 1,
                total,
            };
            on_event(ImportEvent::FileFinished {
                progress,
                result: &result,
            });
            results.push(result);
        }

        let report = BatchReport::from_files(results, std::mem::take(&mut self.rejected_files), cancelled);
        self.trace(DiagnosticEvent::BatchFinished {
            files_succeeded: report.files_succeeded,
            forms_created: report.forms_created,
            cancelled: report.cancelled,
        });
        info!(
            "Import finished: {} form(s) from {}/{} file(s)",
            report.forms_created, report.files_succeeded, report.total_files
        );

        if !report.created_forms.is_empty() {
            if let Some(callback) = self.on_complete.take() {
                callback(&report.created_forms);
            }
        }

        report
    }

    async fn import_file(
        &self,
        importer: &FormImporter<'_>,
        file: &SelectedFile,
        project_id: &str,
    ) -> (FileResult, bool) {
        let text = match file.read_text().await {
            Ok(text) => text,
            Err(e) => return (FileResult::failed(&file.name, e.to_string()), false),
        };

        let candidates = match decode(&text) {
            Ok(candidates) => candidates,
            Err(e) => return (FileResult::failed(&file.name, e.to_string()), false),
        };
        self.trace(DiagnosticEvent::FileDecoded {
            name: file.name.clone(),
            candidates: candidates.len(),
        });

        let mut outcomes = Vec::with_capacity(candidates.len());
        let mut interrupted = false;
        for (position, raw) in candidates.iter().enumerate() {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            let outcome = importer.import_one(raw, project_id).await;
            let detail = match &outcome {
                FormOutcome::Created(form) => form.id.clone(),
                other => other.error().unwrap_or_default().to_string(),
            };
            self.trace(DiagnosticEvent::FormResult {
                file: file.name.clone(),
                position: position + 1,
                created: outcome.is_created(),
                detail,
            });
            outcomes.push(outcome);
        }

        let result = FileResult::from_outcomes(&file.name, candidates.len(), outcomes, interrupted);
        (result, interrupted)
    }
}
