//! Forms API module
//!
//! The create-form operation behind a trait, an HTTP implementation with
//! retries, and an offline implementation for dry runs.

pub mod client;
pub mod constants;
pub mod creator;
pub mod dry_run;
pub mod models;
pub mod resilience;

pub use client::FormsClient;
pub use creator::FormCreator;
#[cfg(test)]
pub use creator::MockFormCreator;
pub use dry_run::DryRunCreator;
pub use models::{CreateFormPayload, CreatedForm, FormStatus};
pub use resilience::{RetryConfig, RetryPolicy, RetryableError};
