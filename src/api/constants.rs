//! API constants for the forms service

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("form-import/", env!("CARGO_PKG_VERSION"));

/// Standard headers for forms API requests
pub mod headers {
    /// Content type for JSON requests
    pub const CONTENT_TYPE_JSON: &str = "application/json";

    /// Correlation header echoed into server logs
    pub const X_CORRELATION_ID: &str = "X-Correlation-Id";
}

/// Collection endpoint for forms of one project
pub fn forms_endpoint(base_url: &str, project_id: &str) -> String {
    format!(
        "{}/projects/{}/forms",
        base_url.trim_end_matches('/'),
        urlencoding::encode(project_id)
    )
}
