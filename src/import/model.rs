//! Typed form tree
//!
//! Uploaded JSON is converted into these structs once it passes the
//! structural validator. Every node keeps the fields it does not model in a
//! flattened `extra` map so reassembled nodes carry their original content.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::error::ValidationError;

/// A complete form definition
///
/// Only what remapping touches is typed: identifiers, option lists,
/// conditional questions and section references. Everything else rides in
/// `extra` and is submitted exactly as uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDocument {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub sections: Vec<Section>,
    pub settings: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named group of questions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub questions: Vec<Question>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Canonical option list; populated by [`Question::normalize`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<QuestionConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-question settings; older exports keep the option list here
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One answer choice, optionally routing to a section or revealing follow-ups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub assigned_section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_questions: Option<Vec<Question>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// String value of an untyped field, if it is one
fn text_field<'a>(extra: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    extra.get(key).and_then(Value::as_str)
}

impl FormDocument {
    pub fn description(&self) -> Option<&str> {
        text_field(&self.extra, "description")
    }

    pub fn category(&self) -> Option<&str> {
        text_field(&self.extra, "category")
    }

    /// Tags as text; numbers are kept as their decimal form, anything else is skipped
    pub fn tags(&self) -> Vec<String> {
        match self.extra.get("tags") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|tag| match tag {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Convert a validated JSON value into the typed tree and normalize option locations
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let mut form: FormDocument = serde_json::from_value(value)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        form.normalize();
        Ok(form)
    }

    /// Move every question's options onto the question itself
    pub fn normalize(&mut self) {
        for section in &mut self.sections {
            for question in &mut section.questions {
                question.normalize();
            }
        }
    }

    /// Every identifier in the tree, in document order
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        if let Some(id) = self.id.as_deref() {
            ids.push(id);
        }
        for section in &self.sections {
            if let Some(id) = section.id.as_deref() {
                ids.push(id);
            }
            for question in &section.questions {
                question.collect_identifiers(&mut ids);
            }
        }
        ids
    }

    /// Number of questions reachable from the form, nested follow-ups included
    pub fn question_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.questions.iter())
            .map(Question::subtree_question_count)
            .sum()
    }

    /// Number of options reachable from the form
    pub fn option_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.questions.iter())
            .map(Question::subtree_option_count)
            .sum()
    }
}

impl Section {
    /// Title when it is a string
    pub fn title(&self) -> Option<&str> {
        text_field(&self.extra, "title")
    }
}

impl Question {
    pub fn title(&self) -> Option<&str> {
        text_field(&self.extra, "title")
    }

    /// The `type` field when it is a string
    pub fn kind(&self) -> Option<&str> {
        text_field(&self.extra, "type")
    }

    /// Prefer direct `options` (even when empty), then `config.options`, then nothing.
    /// `config.options` never survives normalization.
    pub fn normalize(&mut self) {
        let from_config = match self.config.as_mut() {
            Some(config) => config.options.take(),
            None => None,
        };
        if self.config.as_ref().is_some_and(|c| c.extra.is_empty()) {
            self.config = None;
        }

        let mut options = self.options.take().or(from_config).unwrap_or_default();
        for option in &mut options {
            if let Some(conditionals) = option.conditional_questions.as_mut() {
                for question in conditionals {
                    question.normalize();
                }
            }
        }
        self.options = Some(options);
    }

    /// Options after normalization; empty for free-text questions
    pub fn options(&self) -> &[ChoiceOption] {
        self.options.as_deref().unwrap_or_default()
    }

    fn collect_identifiers<'a>(&'a self, ids: &mut Vec<&'a str>) {
        if let Some(id) = self.id.as_deref() {
            ids.push(id);
        }
        for option in self.options() {
            if let Some(id) = option.id.as_deref() {
                ids.push(id);
            }
            for question in option.conditional_questions() {
                question.collect_identifiers(ids);
            }
        }
    }

    fn subtree_question_count(&self) -> usize {
        1 + self
            .options()
            .iter()
            .flat_map(ChoiceOption::conditional_questions)
            .map(Question::subtree_question_count)
            .sum::<usize>()
    }

    fn subtree_option_count(&self) -> usize {
        self.options().len()
            + self
                .options()
                .iter()
                .flat_map(ChoiceOption::conditional_questions)
                .map(Question::subtree_option_count)
                .sum::<usize>()
    }
}

impl ChoiceOption {
    pub fn label(&self) -> Option<&str> {
        text_field(&self.extra, "label")
    }

    pub fn conditional_questions(&self) -> &[Question] {
        self.conditional_questions.as_deref().unwrap_or_default()
    }
}

/// Accept string or numeric identifiers; numbers are kept as their decimal text.
/// Any other value is treated as absent, since the node gets a fresh identifier anyway.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}
