//! Creator that never leaves the process

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use log::debug;

use super::creator::FormCreator;
use super::models::{CreateFormPayload, CreatedForm};

/// Accepts every payload and fabricates the resource the server would return
#[derive(Debug, Default)]
pub struct DryRunCreator {
    created: AtomicUsize,
}

impl DryRunCreator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of forms that would have been created
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FormCreator for DryRunCreator {
    async fn create_form(&self, project_id: &str, payload: &CreateFormPayload) -> Result<CreatedForm> {
        let n = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            "Dry run: would create form in project {}: {}",
            project_id,
            serde_json::to_string(payload)?
        );

        let now = Utc::now();
        let mut form = CreatedForm::new(format!("dry-run-{}", n), payload.title.clone());
        form.project_id = Some(project_id.to_string());
        form.status = Some("draft".to_string());
        form.created_at = Some(now);
        form.updated_at = Some(now);
        Ok(form)
    }
}
