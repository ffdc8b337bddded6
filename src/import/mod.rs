//! Form import pipeline
//!
//! Files are filtered, decoded into form candidates, validated, remapped to
//! fresh identifiers and submitted one by one. Results roll up into a
//! [`BatchReport`].

pub mod batch;
pub mod decoder;
pub mod diagnostics;
pub mod error;
pub mod files;
pub mod ids;
pub mod importer;
pub mod model;
pub mod remap;
pub mod report;
pub mod validator;

pub use batch::{CancellationToken, ImportEvent, ImportSession};
pub use decoder::decode;
pub use diagnostics::{DiagnosticEvent, DiagnosticsSink, FileSink, MemorySink};
pub use error::{ImportError, RemapError, ValidationError};
pub use files::{FileSelection, SelectedFile, accept_files};
pub use ids::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use importer::{DEFAULT_CATEGORY, FormImporter, FormOutcome, build_payload};
pub use model::{ChoiceOption, FormDocument, Question, QuestionConfig, Section};
pub use remap::{DanglingReference, IdMapping, ReferencePolicy, RemappedForm, remap};
pub use report::{BatchReport, FileResult, FileStatus, Notice, Progress};
pub use validator::validate;
