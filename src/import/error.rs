//! Error types for the import pipeline

use thiserror::Error;

/// Structural problems found in an uploaded form value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Form data must be an object")]
    NotAnObject,
    #[error("Missing or invalid form title")]
    InvalidTitle,
    #[error("Missing or invalid sections array")]
    InvalidSections,
    #[error("Missing or invalid settings object")]
    InvalidSettings,
    #[error("Section \"{section}\" is missing questions array")]
    MissingQuestions { section: String },
    /// Shape passed the structural checks but a nested field has the wrong type
    #[error("Malformed form structure: {0}")]
    Malformed(String),
}

/// Failures while rewriting identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemapError {
    #[error("Option \"{option}\" points to unknown section \"{section_id}\"")]
    DanglingSectionReference { option: String, section_id: String },
}

/// Every way a file or form can fail during an import run
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{count} file(s) skipped: only JSON files are supported ({names})")]
    FileTypeRejected { count: usize, names: String },

    #[error("Failed to read file: {0}")]
    Read(String),

    #[error("Invalid JSON format")]
    Decode(#[source] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remap(#[from] RemapError),

    #[error("{0}")]
    Submission(String),
}

impl ImportError {
    /// Short machine-friendly code for reports and diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::FileTypeRejected { .. } => "file_type_rejected",
            ImportError::Read(_) => "read_error",
            ImportError::Decode(_) => "decode_error",
            ImportError::Validation(_) => "validation_error",
            ImportError::Remap(_) => "remap_error",
            ImportError::Submission(_) => "submission_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::InvalidTitle.to_string(),
            "Missing or invalid form title"
        );
        assert_eq!(
            ValidationError::MissingQuestions {
                section: "Intro".to_string()
            }
            .to_string(),
            "Section \"Intro\" is missing questions array"
        );
    }

    #[test]
    fn test_decode_error_message_hides_parser_detail() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = ImportError::Decode(parse_err);
        assert_eq!(err.to_string(), "Invalid JSON format");
        assert_eq!(err.code(), "decode_error");
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let err = ImportError::from(ValidationError::InvalidSettings);
        assert_eq!(err.to_string(), "Missing or invalid settings object");
        assert_eq!(err.code(), "validation_error");
    }
}
