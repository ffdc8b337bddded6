//! Append-only trace of an import run
//!
//! The orchestrator pushes events into a caller-owned sink. Nothing in the
//! pipeline ever reads them back.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use log::warn;
use serde::Serialize;

use super::report::FileStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    BatchStarted {
        files: usize,
        project_id: String,
    },
    FileRejected {
        name: String,
    },
    FileStarted {
        index: usize,
        name: String,
    },
    FileDecoded {
        name: String,
        candidates: usize,
    },
    FormResult {
        file: String,
        position: usize,
        created: bool,
        detail: String,
    },
    FileFinished {
        name: String,
        status: FileStatus,
        message: Option<String>,
    },
    BatchFinished {
        files_succeeded: usize,
        forms_created: usize,
        cancelled: bool,
    },
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticEvent::BatchStarted { files, project_id } => {
                write!(f, "batch started: {} file(s) into project {}", files, project_id)
            }
            DiagnosticEvent::FileRejected { name } => write!(f, "rejected {} (not JSON)", name),
            DiagnosticEvent::FileStarted { index, name } => {
                write!(f, "file #{} {} started", index + 1, name)
            }
            DiagnosticEvent::FileDecoded { name, candidates } => {
                write!(f, "{} decoded: {} candidate(s)", name, candidates)
            }
            DiagnosticEvent::FormResult {
                file,
                position,
                created,
                detail,
            } => {
                let verdict = if *created { "created" } else { "failed" };
                write!(f, "{} form {} {}: {}", file, position, verdict, detail)
            }
            DiagnosticEvent::FileFinished { name, status, message } => match message {
                Some(message) => write!(f, "{} finished ({}): {}", name, status, message),
                None => write!(f, "{} finished ({})", name, status),
            },
            DiagnosticEvent::BatchFinished {
                files_succeeded,
                forms_created,
                cancelled,
            } => write!(
                f,
                "batch finished: {} form(s) from {} file(s){}",
                forms_created,
                files_succeeded,
                if *cancelled { ", cancelled" } else { "" }
            ),
        }
    }
}

pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, event: &DiagnosticEvent);
}

/// Appends one timestamped line per event to a file
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open trace file: {}", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl DiagnosticsSink for FileSink {
    fn record(&self, event: &DiagnosticEvent) {
        let line = format!("[{}] {}\n", Utc::now().to_rfc3339(), event);
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = file.write_all(line.as_bytes()) {
            warn!("Failed to write trace line: {}", e);
        }
    }
}

/// Keeps events in memory
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&self, event: &DiagnosticEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lines() {
        let event = DiagnosticEvent::FileFinished {
            name: "a.json".to_string(),
            status: FileStatus::Success,
            message: None,
        };
        assert_eq!(event.to_string(), "a.json finished (success)");

        let event = DiagnosticEvent::FormResult {
            file: "a.json".to_string(),
            position: 2,
            created: false,
            detail: "Missing or invalid form title".to_string(),
        };
        assert_eq!(event.to_string(), "a.json form 2 failed: Missing or invalid form title");
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");

        let sink = FileSink::open(&path).unwrap();
        sink.record(&DiagnosticEvent::FileRejected {
            name: "notes.txt".to_string(),
        });
        drop(sink);

        let sink = FileSink::open(&path).unwrap();
        sink.record(&DiagnosticEvent::BatchStarted {
            files: 2,
            project_id: "p-1".to_string(),
        });
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("rejected notes.txt (not JSON)"));
        assert!(lines[1].ends_with("batch started: 2 file(s) into project p-1"));
    }

    #[test]
    fn test_event_json_is_tagged() {
        let value = serde_json::to_value(DiagnosticEvent::FileDecoded {
            name: "a.json".to_string(),
            candidates: 3,
        })
        .unwrap();
        assert_eq!(value["event"], serde_json::json!("file_decoded"));
        assert_eq!(value["candidates"], serde_json::json!(3));
    }
}
