//! Identifier remapping
//!
//! Every addressable node of a form (the form itself, sections, questions,
//! options and the questions nested under options) gets a fresh identifier.
//! Cross-references from options to sections are rewritten through the
//! old→new mapping built while walking the tree. A mapping lives for exactly
//! one [`remap`] call.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::error::RemapError;
use super::ids::IdGenerator;
use super::model::{ChoiceOption, FormDocument, Question, Section};

/// Mapping key used for forms that arrive without an identifier
pub const FORM_SENTINEL_KEY: &str = "__form__";

/// What to do with an `assignedSectionId` that names no section of the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Write a fresh identifier and keep going
    #[default]
    Substitute,
    /// Fail the form
    Reject,
}

/// Old→new identifiers recorded during one remap
#[derive(Debug, Default, Clone)]
pub struct IdMapping {
    sections: HashMap<String, String>,
    nodes: HashMap<String, String>,
}

impl IdMapping {
    fn record(&mut self, old: &str, new: &str) {
        self.nodes.insert(old.to_string(), new.to_string());
    }

    fn record_section(&mut self, old: &str, new: &str) {
        self.sections.insert(old.to_string(), new.to_string());
        self.record(old, new);
    }

    /// New identifier for any node with the given original identifier
    pub fn get(&self, old: &str) -> Option<&str> {
        self.nodes.get(old).map(String::as_str)
    }

    /// New identifier for a section with the given original identifier
    pub fn section(&self, old: &str) -> Option<&str> {
        self.sections.get(old).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// An option reference that pointed at a section the form does not contain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    /// New identifier of the option carrying the reference
    pub option_id: String,
    pub section_id: String,
    pub substituted_id: String,
}

/// A form with every identifier replaced
#[derive(Debug, Clone)]
pub struct RemappedForm {
    pub form: FormDocument,
    pub original_id: Option<String>,
    pub mapping: IdMapping,
    /// Form, sections, questions and options given a new identifier
    pub remapped_nodes: usize,
    /// Top-level questions dropped because they already live under an option
    pub removed_duplicates: usize,
    pub dangling_references: Vec<DanglingReference>,
}

/// Replace every identifier in `form`, keeping option→section references consistent
pub fn remap(
    mut form: FormDocument,
    ids: &dyn IdGenerator,
    policy: ReferencePolicy,
) -> Result<RemappedForm, RemapError> {
    form.normalize();

    let mut remapper = Remapper {
        ids,
        policy,
        mapping: IdMapping::default(),
        remapped_nodes: 0,
        removed_duplicates: 0,
        dangling: Vec::new(),
    };

    let original_id = form.id.take();
    let form_key = original_id.as_deref().unwrap_or(FORM_SENTINEL_KEY);
    form.id = Some(remapper.fresh(Some(form_key)));

    // Sections first so options can point forward to later sections
    let section_ids: Vec<String> = form
        .sections
        .iter()
        .map(|section| {
            let new_id = remapper.ids.next_id();
            if let Some(old) = section.id.as_deref() {
                remapper.mapping.record_section(old, &new_id);
            }
            remapper.remapped_nodes += 1;
            new_id
        })
        .collect();

    let sections = std::mem::take(&mut form.sections);
    form.sections = sections
        .into_iter()
        .zip(section_ids)
        .map(|(section, new_id)| remapper.remap_section(section, new_id))
        .collect::<Result<_, _>>()?;

    debug!(
        "Remapped form '{}': {} node(s), {} duplicate(s) removed",
        form.title, remapper.remapped_nodes, remapper.removed_duplicates
    );

    Ok(RemappedForm {
        form,
        original_id,
        mapping: remapper.mapping,
        remapped_nodes: remapper.remapped_nodes,
        removed_duplicates: remapper.removed_duplicates,
        dangling_references: remapper.dangling,
    })
}

struct Remapper<'a> {
    ids: &'a dyn IdGenerator,
    policy: ReferencePolicy,
    mapping: IdMapping,
    remapped_nodes: usize,
    removed_duplicates: usize,
    dangling: Vec<DanglingReference>,
}

impl Remapper<'_> {
    fn fresh(&mut self, old: Option<&str>) -> String {
        let new_id = self.ids.next_id();
        if let Some(old) = old {
            self.mapping.record(old, &new_id);
        }
        self.remapped_nodes += 1;
        new_id
    }

    fn remap_section(&mut self, mut section: Section, new_id: String) -> Result<Section, RemapError> {
        let nested = conditional_question_ids(&section.questions);
        let questions = std::mem::take(&mut section.questions);
        let before = questions.len();

        let top_level: Vec<Question> = questions
            .into_iter()
            .filter(|q| q.id.as_ref().is_none_or(|id| !nested.contains(id)))
            .collect();

        let removed = before - top_level.len();
        if removed > 0 {
            debug!(
                "Section '{}': dropped {} top-level question(s) that are nested under options",
                section.title().unwrap_or("Unknown"),
                removed
            );
        }
        self.removed_duplicates += removed;

        section.questions = top_level
            .into_iter()
            .map(|q| self.remap_question(q))
            .collect::<Result<_, _>>()?;
        section.id = Some(new_id);
        Ok(section)
    }

    fn remap_question(&mut self, mut question: Question) -> Result<Question, RemapError> {
        question.id = Some(self.fresh(question.id.as_deref()));

        let options = question.options.take().unwrap_or_default();
        question.options = Some(
            options
                .into_iter()
                .map(|o| self.remap_option(o))
                .collect::<Result<_, _>>()?,
        );
        Ok(question)
    }

    fn remap_option(&mut self, mut option: ChoiceOption) -> Result<ChoiceOption, RemapError> {
        let new_id = self.fresh(option.id.as_deref());
        option.id = Some(new_id.clone());

        if let Some(target) = option.assigned_section_id.take() {
            let resolved = if target.is_empty() {
                target
            } else {
                self.resolve_section(&target, &new_id, option.label())?
            };
            option.assigned_section_id = Some(resolved);
        }

        if let Some(conditionals) = option.conditional_questions.take() {
            option.conditional_questions = Some(
                conditionals
                    .into_iter()
                    .map(|q| self.remap_question(q))
                    .collect::<Result<_, _>>()?,
            );
        }
        Ok(option)
    }

    fn resolve_section(
        &mut self,
        target: &str,
        option_id: &str,
        label: Option<&str>,
    ) -> Result<String, RemapError> {
        if let Some(new_id) = self.mapping.section(target) {
            return Ok(new_id.to_string());
        }

        match self.policy {
            ReferencePolicy::Reject => Err(RemapError::DanglingSectionReference {
                option: label.unwrap_or(option_id).to_string(),
                section_id: target.to_string(),
            }),
            ReferencePolicy::Substitute => {
                let substituted = self.ids.next_id();
                warn!(
                    "Option {} points to unknown section {}; substituting {}",
                    option_id, target, substituted
                );
                self.dangling.push(DanglingReference {
                    option_id: option_id.to_string(),
                    section_id: target.to_string(),
                    substituted_id: substituted.clone(),
                });
                Ok(substituted)
            }
        }
    }
}

/// Original identifiers of every question nested under an option, at any depth
fn conditional_question_ids(questions: &[Question]) -> HashSet<String> {
    fn collect(question: &Question, ids: &mut HashSet<String>) {
        for option in question.options() {
            for nested in option.conditional_questions() {
                if let Some(id) = nested.id.as_ref() {
                    ids.insert(id.clone());
                }
                collect(nested, ids);
            }
        }
    }

    let mut ids = HashSet::new();
    for question in questions {
        collect(question, &mut ids);
    }
    ids
}
