//! Import JSON form definitions into a project.
//!
//! [`import`] holds the pipeline (file filter, decoder, validator, remapper,
//! batch orchestrator), [`api`] the create-form operation and its HTTP client.

pub mod api;
pub mod config;
pub mod import;
