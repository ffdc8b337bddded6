//! Selected files and the JSON-only acceptance filter

use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::error::ImportError;

const JSON_MIME: &str = "application/json";
const JSON_EXTENSION: &str = ".json";

/// Where a selected file's bytes come from
#[derive(Debug, Clone)]
enum FileContent {
    Path(PathBuf),
    Inline(Vec<u8>),
}

/// A file picked by the user for import
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    /// Declared content type, when the picker provides one
    pub mime_type: Option<String>,
    content: FileContent,
}

impl SelectedFile {
    /// File on disk; the display name is the file name component
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            mime_type: None,
            content: FileContent::Path(path),
        }
    }

    /// In-memory file contents
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            content: FileContent::Inline(bytes.into()),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.content {
            FileContent::Path(path) => Some(path),
            FileContent::Inline(_) => None,
        }
    }

    /// Declared type or extension says JSON
    pub fn is_json(&self) -> bool {
        let mime_ok = self
            .mime_type
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case(JSON_MIME));
        mime_ok || self.name.to_ascii_lowercase().ends_with(JSON_EXTENSION)
    }

    /// Read the whole file as UTF-8 text
    pub async fn read_text(&self) -> Result<String, ImportError> {
        let bytes = match &self.content {
            FileContent::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| ImportError::Read(format!("{}: {}", path.display(), e)))?,
            FileContent::Inline(bytes) => bytes.clone(),
        };
        String::from_utf8(bytes).map_err(|_| ImportError::Read(format!("{} is not valid UTF-8", self.name)))
    }
}

/// Outcome of filtering a selection down to JSON files
#[derive(Debug, Default)]
pub struct FileSelection {
    pub accepted: Vec<SelectedFile>,
    pub rejected: Vec<SelectedFile>,
}

impl FileSelection {
    /// Single aggregated notice for everything that was filtered out
    pub fn rejection(&self) -> Option<ImportError> {
        if self.rejected.is_empty() {
            return None;
        }
        let names = self
            .rejected
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Some(ImportError::FileTypeRejected {
            count: self.rejected.len(),
            names,
        })
    }

    pub fn rejected_names(&self) -> Vec<String> {
        self.rejected.iter().map(|f| f.name.clone()).collect()
    }
}

/// Keep JSON files, set the rest aside without affecting the accepted ones
pub fn accept_files(files: impl IntoIterator<Item = SelectedFile>) -> FileSelection {
    let mut selection = FileSelection::default();
    for file in files {
        if file.is_json() {
            debug!("Queued {}", file.name);
            selection.accepted.push(file);
        } else {
            warn!("Rejected non-JSON file {}", file.name);
            selection.rejected.push(file);
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(SelectedFile::from_bytes("forms.JSON", "[]").is_json());
        assert!(SelectedFile::from_bytes("forms.json", "[]").is_json());
        assert!(!SelectedFile::from_bytes("forms.txt", "[]").is_json());
    }

    #[test]
    fn test_mime_type_is_enough() {
        let file = SelectedFile::from_bytes("export", "{}").with_mime_type("application/json");
        assert!(file.is_json());
    }

    #[test]
    fn test_rejects_only_non_json() {
        let selection = accept_files(vec![
            SelectedFile::from_bytes("a.json", "{}"),
            SelectedFile::from_bytes("notes.txt", "hi"),
            SelectedFile::from_bytes("b.json", "[]"),
            SelectedFile::from_bytes("logo.png", vec![0u8, 1, 2]),
        ]);

        assert_eq!(selection.accepted.len(), 2);
        assert_eq!(selection.rejected_names(), vec!["notes.txt", "logo.png"]);
        let notice = selection.rejection().unwrap();
        assert_eq!(
            notice.to_string(),
            "2 file(s) skipped: only JSON files are supported (notes.txt, logo.png)"
        );
    }

    #[test]
    fn test_no_rejection_notice_when_all_accepted() {
        let selection = accept_files(vec![SelectedFile::from_bytes("a.json", "{}")]);
        assert!(selection.rejection().is_none());
    }

    #[test]
    fn test_from_path_uses_file_name() {
        let file = SelectedFile::from_path("/tmp/exports/survey.json");
        assert_eq!(file.name, "survey.json");
        assert!(file.path().is_some());
    }

    #[tokio::test]
    async fn test_read_inline_text() {
        let file = SelectedFile::from_bytes("a.json", "{\"title\":\"A\"}");
        assert_eq!(file.read_text().await.unwrap(), "{\"title\":\"A\"}");
    }

    #[tokio::test]
    async fn test_read_rejects_invalid_utf8() {
        let file = SelectedFile::from_bytes("a.json", vec![0xff, 0xfe, 0xfd]);
        let err = file.read_text().await.unwrap_err();
        assert!(matches!(err, ImportError::Read(_)));
    }

    #[tokio::test]
    async fn test_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forms.json");
        std::fs::write(&path, "[]").unwrap();

        let file = SelectedFile::from_path(&path);
        assert_eq!(file.read_text().await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let file = SelectedFile::from_path("/definitely/not/here.json");
        assert!(matches!(file.read_text().await, Err(ImportError::Read(_))));
    }
}
