use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;

use super::constants::{self, headers};
use super::creator::FormCreator;
use super::models::{CreateFormPayload, CreatedForm};
use super::resilience::{RetryConfig, RetryPolicy};

/// HTTP client for the forms API with connection pooling
#[derive(Clone)]
pub struct FormsClient {
    base_url: String,
    http_client: reqwest::Client,
    access_token: Option<String>,
    retry_policy: RetryPolicy,
}

impl FormsClient {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(constants::USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_custom_client(base_url, access_token, http_client))
    }

    /// Create a new client around an existing HTTP client
    pub fn with_custom_client(
        base_url: impl Into<String>,
        access_token: Option<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            http_client,
            access_token,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_policy = RetryPolicy::new(retry_config);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a form to the project's form collection
    pub async fn create(&self, project_id: &str, payload: &CreateFormPayload) -> Result<CreatedForm> {
        let url = constants::forms_endpoint(&self.base_url, project_id);
        let correlation_id = uuid::Uuid::new_v4().to_string();
        debug!("POST {} [{}] '{}'", url, correlation_id, payload.title);

        let started = Instant::now();
        let response = self
            .retry_policy
            .execute_once(|| {
                let mut request = self
                    .http_client
                    .post(&url)
                    .header("Content-Type", headers::CONTENT_TYPE_JSON)
                    .header("Accept", headers::CONTENT_TYPE_JSON)
                    .header(headers::X_CORRELATION_ID, &correlation_id)
                    .json(payload);
                if let Some(token) = self.access_token.as_deref() {
                    request = request.bearer_auth(token);
                }
                request.send()
            })
            .await
            .with_context(|| format!("Failed to reach forms API at {}", self.base_url))?;

        let status = response.status();
        debug!("[{}] {} in {:?}", correlation_id, status, started.elapsed());

        let body = response
            .text()
            .await
            .context("Failed to read forms API response")?;
        if !status.is_success() {
            warn!("[{}] create form rejected with {}", correlation_id, status);
            return Err(anyhow!(
                "Server rejected form ({}): {}",
                status,
                server_message(&body)
            ));
        }

        let created = parse_created(&body)?;
        info!("Created form {} ('{}') in project {}", created.id, created.title, project_id);
        Ok(created)
    }
}

#[async_trait]
impl FormCreator for FormsClient {
    async fn create_form(&self, project_id: &str, payload: &CreateFormPayload) -> Result<CreatedForm> {
        self.create(project_id, payload).await
    }
}

/// Accept both a bare resource and one wrapped in `{"data": ...}`
fn parse_created(body: &str) -> Result<CreatedForm> {
    let value: Value = serde_json::from_str(body).context("Forms API returned invalid JSON")?;
    let resource = match value {
        Value::Object(mut obj) if obj.get("data").is_some_and(Value::is_object) => {
            obj.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(resource).context("Forms API returned an unexpected form representation")
}

/// Best human-readable message from an error body
fn server_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no response body".to_string();
    }
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(trimmed) {
        for key in ["message", "error", "detail"] {
            match obj.get(key) {
                Some(Value::String(msg)) => return msg.clone(),
                Some(Value::Object(inner)) => {
                    if let Some(Value::String(msg)) = inner.get("message") {
                        return msg.clone();
                    }
                }
                _ => {}
            }
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::FormStatus;
    use serde_json::{Map, json};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Canned HTTP reply
    struct Reply {
        status: u16,
        body: &'static str,
        headers: &'static str,
        delay: Duration,
        missing_bytes: usize,
    }

    impl Reply {
        fn new(status: u16, body: &'static str) -> Self {
            Self { status, body, headers: "", delay: Duration::ZERO, missing_bytes: 0 }
        }

        fn header(mut self, line: &'static str) -> Self {
            self.headers = line;
            self
        }

        fn after(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Declare more body than is sent before closing
        fn truncated(mut self, missing_bytes: usize) -> Self {
            self.missing_bytes = missing_bytes;
            self
        }
    }

    /// Serve canned responses, one per connection, and record request heads and bodies
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
        serve_replies(responses.into_iter().map(|(status, body)| Reply::new(status, body)).collect()).await
    }

    /// Connections are handled concurrently so a client that gives up early can reconnect
    async fn serve_replies(replies: Vec<Reply>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        tokio::spawn(async move {
            for reply in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                let seen = seen_clone.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    seen.lock().unwrap().push(request);
                    tokio::time::sleep(reply.delay).await;
                    let extra = if reply.headers.is_empty() {
                        String::new()
                    } else {
                        format!("{}\r\n", reply.headers)
                    };
                    let response = format!(
                        "HTTP/1.1 {} Status\r\nContent-Type: application/json\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                        reply.status,
                        extra,
                        reply.body.len() + reply.missing_bytes,
                        reply.body
                    );
                    socket.write_all(response.as_bytes()).await.ok();
                    socket.shutdown().await.ok();
                });
            }
        });

        (format!("http://{}", addr), seen)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if data.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    fn payload() -> CreateFormPayload {
        CreateFormPayload {
            title: "Survey".to_string(),
            description: String::new(),
            project_id: "p-1".to_string(),
            status: FormStatus::Draft,
            sections: vec![],
            settings: Map::new(),
            tags: vec![],
            category: "General".to_string(),
        }
    }

    fn fast_retries() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_parse_created_bare_and_wrapped() {
        let bare = parse_created(r#"{"id": "f1", "title": "A"}"#).unwrap();
        assert_eq!(bare.id, "f1");

        let wrapped = parse_created(r#"{"data": {"id": "f2", "title": "B"}, "success": true}"#).unwrap();
        assert_eq!(wrapped.id, "f2");
        assert_eq!(wrapped.title, "B");
    }

    #[test]
    fn test_server_message_extraction() {
        assert_eq!(server_message(r#"{"message": "Title too long"}"#), "Title too long");
        assert_eq!(server_message(r#"{"error": {"message": "Forbidden"}}"#), "Forbidden");
        assert_eq!(server_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(server_message("  "), "no response body");
    }

    #[tokio::test]
    async fn test_create_posts_payload() {
        let (url, seen) = serve(vec![(201, r#"{"id": "srv-1", "title": "Survey", "status": "draft"}"#)]).await;
        let client = FormsClient::new(url, Some("secret".to_string()), Duration::from_secs(5))
            .unwrap()
            .with_retry_config(fast_retries());

        let created = client.create_form("p-1", &payload()).await.unwrap();
        assert_eq!(created.id, "srv-1");

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.starts_with("POST /projects/p-1/forms HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(request.to_ascii_lowercase().contains("x-correlation-id:"));
        assert!(request.contains(r#""status":"draft""#));
    }

    #[tokio::test]
    async fn test_retries_unavailable_with_retry_after() {
        let replies = vec![
            Reply::new(503, r#"{"message": "busy"}"#).header("Retry-After: 1"),
            Reply::new(201, r#"{"data": {"id": "srv-2", "title": "Survey"}}"#),
        ];
        let (url, seen) = serve_replies(replies).await;
        let client = FormsClient::new(url, None, Duration::from_secs(5))
            .unwrap()
            .with_retry_config(fast_retries());

        let created = client.create_form("p-1", &payload()).await.unwrap();
        assert_eq!(created.id, "srv-2");
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_not_resent() {
        let (url, seen) = serve(vec![
            (500, r#"{"message": "boom"}"#),
            (201, r#"{"id": "dup", "title": "Survey"}"#),
        ])
        .await;
        let client = FormsClient::new(url, None, Duration::from_secs(5))
            .unwrap()
            .with_retry_config(fast_retries());

        let err = client.create_form("p-1", &payload()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_create_is_posted_once() {
        let slow = || Reply::new(201, r#"{"id": "srv-3", "title": "Survey"}"#).after(Duration::from_millis(1500));
        let (url, seen) = serve_replies(vec![slow(), slow(), slow()]).await;
        let client = FormsClient::new(url, None, Duration::from_millis(300))
            .unwrap()
            .with_retry_config(fast_retries());

        let err = client.create_form("p-1", &payload()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to reach forms API"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_truncated_body_is_an_error() {
        let (url, _seen) = serve_replies(vec![Reply::new(201, r#"{"id": "srv-4""#).truncated(64)]).await;
        let client = FormsClient::new(url, None, Duration::from_secs(5))
            .unwrap()
            .with_retry_config(fast_retries());

        let err = client.create_form("p-1", &payload()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read forms API response"));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (url, seen) = serve(vec![(422, r#"{"message": "Title is required"}"#)]).await;
        let client = FormsClient::new(url, None, Duration::from_secs(5))
            .unwrap()
            .with_retry_config(fast_retries());

        let err = client.create_form("p-1", &payload()).await.unwrap_err();
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("Title is required"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client = FormsClient::new("http://127.0.0.1:1", None, Duration::from_secs(2))
            .unwrap()
            .with_retry_config(RetryConfig::disabled());

        let err = client.create_form("p-1", &payload()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to reach forms API"));
    }

    #[test]
    fn test_payload_shape_sent() {
        let value = serde_json::to_value(payload()).unwrap();
        assert_eq!(value["projectId"], json!("p-1"));
    }
}
