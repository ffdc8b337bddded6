//! Retry behaviour for forms API requests

pub mod retry;

pub use retry::{RetryConfig, RetryPolicy, RetryableError};
