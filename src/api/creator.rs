//! Trait abstraction for the create-form operation to enable mocking in tests

use anyhow::Result;
use async_trait::async_trait;

use super::models::{CreateFormPayload, CreatedForm};

/// Anything that can create a form inside a project
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FormCreator: Send + Sync {
    /// Create the form and return the server's representation of it
    async fn create_form(&self, project_id: &str, payload: &CreateFormPayload) -> Result<CreatedForm>;
}
