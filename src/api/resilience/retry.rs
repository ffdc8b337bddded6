//! Retry policies with exponential backoff
//!
//! Provides retry logic for transient failures when talking to the forms API

use std::future::Future;
use std::time::Duration;

use anyhow::anyhow;
use log::{debug, info, warn};
use rand::Rng;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no waiting
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

/// Types of errors and their retry behavior
#[derive(Debug, Clone, PartialEq)]
pub enum RetryableError {
    /// Network-level errors (connection refused, DNS, etc)
    Network,
    /// HTTP 5xx server errors
    ServerError(u16),
    /// HTTP 429 Too Many Requests
    RateLimited,
    /// HTTP 408 or a client-side timeout
    Timeout,
    /// Non-retryable client errors (4xx except 408, 429)
    ClientError(u16),
    /// 401/403
    AuthError,
    Unknown,
}

impl RetryableError {
    /// Determine if this error type should be retried
    pub fn should_retry(&self) -> bool {
        match self {
            RetryableError::Network => true,
            RetryableError::ServerError(_) => true,
            RetryableError::RateLimited => true,
            RetryableError::Timeout => true,
            RetryableError::ClientError(_) => false,
            RetryableError::AuthError => false,
            RetryableError::Unknown => false,
        }
    }

    /// Classify an HTTP status code into retry behavior
    pub fn from_status_code(status: u16) -> Self {
        match status {
            401 | 403 => RetryableError::AuthError,
            408 => RetryableError::Timeout,
            429 => RetryableError::RateLimited,
            400..=499 => RetryableError::ClientError(status),
            500..=599 => RetryableError::ServerError(status),
            _ => RetryableError::Unknown,
        }
    }

    /// Classify a reqwest error
    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            RetryableError::Timeout
        } else if error.is_connect() || error.is_request() {
            RetryableError::Network
        } else if let Some(status) = error.status() {
            Self::from_status_code(status.as_u16())
        } else {
            RetryableError::Unknown
        }
    }
}

/// Whether a request may safely reach the server more than once
#[derive(Debug, Clone, Copy, PartialEq)]
enum Delivery {
    Idempotent,
    AtMostOnce,
}

impl Delivery {
    fn retry_response(self, response: &reqwest::Response) -> bool {
        let status = response.status();
        match self {
            Delivery::Idempotent => RetryableError::from_status_code(status.as_u16()).should_retry(),
            Delivery::AtMostOnce => {
                status == StatusCode::TOO_MANY_REQUESTS
                    || (status == StatusCode::SERVICE_UNAVAILABLE
                        && response.headers().contains_key(RETRY_AFTER))
            }
        }
    }

    fn retry_error(self, error: &reqwest::Error) -> bool {
        match self {
            Delivery::Idempotent => RetryableError::from_reqwest_error(error).should_retry(),
            Delivery::AtMostOnce => error.is_connect(),
        }
    }
}

/// Retry policy that implements exponential backoff with jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Send a request, retrying transport failures and retryable status codes.
    ///
    /// The last response is returned as-is when its status is not retryable or
    /// attempts run out, so callers can still read the server's error body.
    pub async fn execute<F, Fut>(&self, operation: F) -> anyhow::Result<reqwest::Response>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        self.run(operation, Delivery::Idempotent).await
    }

    /// Like [`RetryPolicy::execute`], for requests that must not be applied twice.
    ///
    /// Only failures where the server cannot have acted on the request are
    /// retried: connection errors, 429, and 503 carrying `Retry-After`.
    /// Timeouts and other 5xx may have been processed and are returned as-is.
    pub async fn execute_once<F, Fut>(&self, operation: F) -> anyhow::Result<reqwest::Response>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        self.run(operation, Delivery::AtMostOnce).await
    }

    async fn run<F, Fut>(&self, operation: F, delivery: Delivery) -> anyhow::Result<reqwest::Response>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            debug!("Sending request (attempt {}/{})", attempt, max_attempts);
            let last_attempt = attempt == max_attempts;

            match operation().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        if attempt > 1 {
                            info!("Request succeeded after {} attempts", attempt);
                        }
                        return Ok(response);
                    }

                    if !delivery.retry_response(&response) || last_attempt {
                        return Ok(response);
                    }
                    warn!("Request returned {} on attempt {} (retryable)", status, attempt);
                }
                Err(error) => {
                    let should_retry = delivery.retry_error(&error);
                    if !should_retry || last_attempt {
                        warn!(
                            "Request failed permanently on attempt {} (should_retry: {}): {}",
                            attempt, should_retry, error
                        );
                        return Err(error.into());
                    }
                    warn!("Request failed on attempt {} (retryable): {}", attempt, error);
                }
            }

            let delay = self.calculate_delay(attempt);
            debug!("Waiting {:?} before retry", delay);
            tokio::time::sleep(delay).await;
        }

        Err(anyhow!("Request failed after {} attempts", max_attempts))
    }

    /// Calculate exponential backoff delay with optional jitter
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.config.base_delay.as_millis() as f64)
            * self.config.backoff_multiplier.powi(attempt as i32 - 1);

        let mut delay = Duration::from_millis(delay_ms as u64);

        if delay > self.config.max_delay {
            delay = self.config.max_delay;
        }

        if self.config.jitter {
            let jitter_factor = rand::thread_rng().gen_range(0.5..=1.5);
            let jittered_ms = (delay.as_millis() as f64 * jitter_factor) as u64;
            delay = Duration::from_millis(jittered_ms);
        }

        delay
    }
}
