//! Structural validation of uploaded form values
//!
//! Only checks the minimal shape needed by the rest of the pipeline and stops
//! at the first violated rule.

use serde_json::Value;

use super::error::ValidationError;

/// Check the minimal shape of a form: title, sections, settings, questions per section
pub fn validate(value: &Value) -> Result<(), ValidationError> {
    let form = value.as_object().ok_or(ValidationError::NotAnObject)?;

    if !form.get("title").is_some_and(Value::is_string) {
        return Err(ValidationError::InvalidTitle);
    }

    let sections = form
        .get("sections")
        .and_then(Value::as_array)
        .ok_or(ValidationError::InvalidSections)?;

    if !form.get("settings").is_some_and(Value::is_object) {
        return Err(ValidationError::InvalidSettings);
    }

    for section in sections {
        let has_questions = section
            .get("questions")
            .is_some_and(Value::is_array);
        if !has_questions {
            let title = section
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("Unknown");
            return Err(ValidationError::MissingQuestions {
                section: title.to_string(),
            });
        }
    }

    Ok(())
}
