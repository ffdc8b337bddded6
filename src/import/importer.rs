//! Imports a single form candidate: validate, remap, submit

use log::{debug, warn};
use serde_json::Value;

use super::error::ImportError;
use super::ids::IdGenerator;
use super::model::FormDocument;
use super::remap::{ReferencePolicy, RemappedForm, remap};
use super::validator::validate;
use crate::api::{CreateFormPayload, CreatedForm, FormCreator, FormStatus};

pub const DEFAULT_CATEGORY: &str = "General";

/// Result of importing one form candidate
#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    /// Submitted and created on the server
    Created(CreatedForm),
    /// Rejected locally, never submitted
    Invalid(String),
    /// Submission failed
    Failed(String),
}

impl FormOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, FormOutcome::Created(_))
    }

    /// Reason for a non-created outcome
    pub fn error(&self) -> Option<&str> {
        match self {
            FormOutcome::Created(_) => None,
            FormOutcome::Invalid(reason) | FormOutcome::Failed(reason) => Some(reason),
        }
    }
}

/// Runs the per-form pipeline against a creator
pub struct FormImporter<'a> {
    creator: &'a dyn FormCreator,
    ids: &'a dyn IdGenerator,
    policy: ReferencePolicy,
    default_category: String,
}

impl<'a> FormImporter<'a> {
    pub fn new(creator: &'a dyn FormCreator, ids: &'a dyn IdGenerator) -> Self {
        Self {
            creator,
            ids,
            policy: ReferencePolicy::default(),
            default_category: DEFAULT_CATEGORY.to_string(),
        }
    }

    pub fn reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }

    /// Validate, convert and remap without submitting
    pub fn prepare(&self, raw: &Value) -> Result<RemappedForm, ImportError> {
        validate(raw)?;
        let form = FormDocument::from_value(raw.clone())?;
        Ok(remap(form, self.ids, self.policy)?)
    }

    /// Import one candidate; failures are reported in the outcome, never raised
    pub async fn import_one(&self, raw: &Value, project_id: &str) -> FormOutcome {
        let remapped = match self.prepare(raw) {
            Ok(remapped) => remapped,
            Err(e) => {
                debug!("Form rejected before submission: {}", e);
                return FormOutcome::Invalid(e.to_string());
            }
        };

        let payload = build_payload(remapped.form, project_id, &self.default_category);
        match self.creator.create_form(project_id, &payload).await {
            Ok(created) => FormOutcome::Created(created),
            Err(e) => {
                let err = ImportError::Submission(format!("{:#}", e));
                warn!("Failed to create form '{}': {}", payload.title, err);
                FormOutcome::Failed(err.to_string())
            }
        }
    }
}

/// Keep client-owned fields only and apply defaults
pub fn build_payload(form: FormDocument, project_id: &str, default_category: &str) -> CreateFormPayload {
    let description = form.description().unwrap_or_default().to_string();
    let tags = form.tags();
    let category = form
        .category()
        .filter(|c| !c.is_empty())
        .unwrap_or(default_category)
        .to_string();

    CreateFormPayload {
        title: form.title,
        description,
        project_id: project_id.to_string(),
        status: FormStatus::Draft,
        sections: form.sections,
        settings: form.settings,
        tags,
        category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockFormCreator;
    use crate::import::ids::SequentialIdGenerator;
    use anyhow::anyhow;
    use serde_json::json;

    fn raw_form() -> Value {
        json!({
            "id": "old-form",
            "title": "Feedback",
            "description": "Quarterly",
            "status": "published",
            "createdAt": "2023-01-01T00:00:00Z",
            "updatedAt": "2023-02-01T00:00:00Z",
            "responseCount": 12,
            "settings": { "allowAnonymous": true },
            "tags": ["q3"],
            "sections": [{
                "id": "s1",
                "title": "Main",
                "questions": [{ "id": "q1", "type": "text", "title": "Anything else?", "isRequired": false }]
            }]
        })
    }

    #[tokio::test]
    async fn test_created_outcome() {
        let mut creator = MockFormCreator::new();
        creator
            .expect_create_form()
            .withf(|project_id, payload| project_id.to_string() == "p-1" && payload.title == "Feedback")
            .times(1)
            .returning(|_, payload| Ok(CreatedForm::new("srv-1", payload.title.clone())));
        let ids = SequentialIdGenerator::new("n");

        let outcome = FormImporter::new(&creator, &ids).import_one(&raw_form(), "p-1").await;
        assert_eq!(outcome, FormOutcome::Created(CreatedForm::new("srv-1", "Feedback")));
    }

    #[tokio::test]
    async fn test_invalid_form_is_not_submitted() {
        let mut creator = MockFormCreator::new();
        creator.expect_create_form().times(0);
        let ids = SequentialIdGenerator::new("n");

        let outcome = FormImporter::new(&creator, &ids)
            .import_one(&json!({ "sections": [], "settings": {} }), "p-1")
            .await;
        assert_eq!(
            outcome,
            FormOutcome::Invalid("Missing or invalid form title".to_string())
        );
        assert_eq!(ids.issued(), 0);
    }

    #[tokio::test]
    async fn test_submission_failure() {
        let mut creator = MockFormCreator::new();
        creator
            .expect_create_form()
            .returning(|_, _| Err(anyhow!("Server rejected form (500): boom")));
        let ids = SequentialIdGenerator::new("n");

        let outcome = FormImporter::new(&creator, &ids).import_one(&raw_form(), "p-1").await;
        assert!(!outcome.is_created());
        assert_eq!(outcome.error(), Some("Server rejected form (500): boom"));
    }

    #[tokio::test]
    async fn test_strict_references_reject_form() {
        let mut creator = MockFormCreator::new();
        creator.expect_create_form().times(0);
        let ids = SequentialIdGenerator::new("n");
        let raw = json!({
            "title": "T",
            "settings": {},
            "sections": [{ "id": "s1", "questions": [
                { "id": "q1", "options": [{ "id": "o1", "label": "Go", "assignedSectionId": "s9" }] }
            ]}]
        });

        let outcome = FormImporter::new(&creator, &ids)
            .reference_policy(ReferencePolicy::Reject)
            .import_one(&raw, "p-1")
            .await;
        assert_eq!(
            outcome,
            FormOutcome::Invalid("Option \"Go\" points to unknown section \"s9\"".to_string())
        );
    }

    #[test]
    fn test_payload_drops_server_fields_and_applies_defaults() {
        let ids = SequentialIdGenerator::new("n");
        let creator = MockFormCreator::new();
        let importer = FormImporter::new(&creator, &ids);
        let remapped = importer.prepare(&raw_form()).unwrap();

        let payload = build_payload(remapped.form, "p-1", DEFAULT_CATEGORY);
        let value = serde_json::to_value(&payload).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();

        let mut keys_sorted = keys.clone();
        keys_sorted.sort();
        assert_eq!(
            keys_sorted,
            vec!["category", "description", "projectId", "sections", "settings", "status", "tags", "title"]
        );
        assert_eq!(value["status"], json!("draft"));
        assert_eq!(value["category"], json!("General"));
        assert_eq!(value["description"], json!("Quarterly"));
        assert_eq!(value["tags"], json!(["q3"]));
    }

    #[tokio::test]
    async fn test_loosely_typed_fields_are_imported() {
        let mut creator = MockFormCreator::new();
        creator
            .expect_create_form()
            .withf(|_, payload| {
                let question = &payload.sections[0].questions[0];
                payload.sections[0].extra.get("title") == Some(&json!(2024))
                    && question.extra.get("isRequired") == Some(&json!("true"))
                    && question.options()[0].extra.get("label") == Some(&json!(1))
                    && payload.description.is_empty()
                    && payload.category == DEFAULT_CATEGORY
            })
            .times(1)
            .returning(|_, payload| Ok(CreatedForm::new("srv-2", payload.title.clone())));
        let ids = SequentialIdGenerator::new("n");
        let raw = json!({
            "title": "Legacy export",
            "description": 7,
            "category": ["misc"],
            "settings": {},
            "sections": [{ "id": "s1", "title": 2024, "questions": [{
                "id": "q1",
                "type": "radio",
                "isRequired": "true",
                "options": [{ "id": "o1", "label": 1 }]
            }]}]
        });

        assert!(validate(&raw).is_ok());
        let outcome = FormImporter::new(&creator, &ids).import_one(&raw, "p-1").await;
        assert_eq!(outcome, FormOutcome::Created(CreatedForm::new("srv-2", "Legacy export")));
    }

    #[test]
    fn test_payload_defaults_for_sparse_form() {
        let form = FormDocument::from_value(json!({ "title": "T", "sections": [], "settings": {} })).unwrap();
        let payload = build_payload(form, "p-1", "Research");
        assert_eq!(payload.description, "");
        assert!(payload.tags.is_empty());
        assert_eq!(payload.category, "Research");
    }
}
