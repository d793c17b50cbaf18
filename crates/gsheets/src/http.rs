//! HTTPS transport over reqwest.

use std::time::Duration;

use serde_json::Value;

use crate::transport::{ApiRequest, BoxFuture, Method, Transport, TransportError};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/";

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API root, ending in `/`
    pub base_url: String,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Retries after the first attempt for 429, 5xx and network errors
    pub max_retries: u32,
    /// Delay before the first retry; doubles each attempt
    pub initial_backoff: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl HttpConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff = initial_backoff;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    config: HttpConfig,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("gsheets/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    async fn send_once(&self, request: &ApiRequest) -> Attempt {
        let url = format!("{}{}", self.config.base_url, request.path);
        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Put => self.http.put(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(TransportError::network(e.to_string()), None),
        };

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return Attempt::Retry(TransportError::network(e.to_string()), None),
        };

        if (200..300).contains(&status) {
            if text.trim().is_empty() {
                return Attempt::Done(Ok(Value::Null));
            }
            return Attempt::Done(serde_json::from_str(&text).map_err(|e| {
                TransportError::http(status, format!("invalid JSON in response: {e}"))
            }));
        }

        let err = api_error(status, &text);
        if status == 429 || status >= 500 {
            Attempt::Retry(err, retry_after)
        } else {
            Attempt::Done(Err(err))
        }
    }
}

enum Attempt {
    Done(Result<Value, TransportError>),
    Retry(TransportError, Option<Duration>),
}

impl Transport for HttpTransport {
    fn request(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, TransportError>> {
        Box::pin(async move {
            let mut backoff = self.config.initial_backoff;
            let mut attempt = 0;
            loop {
                match self.send_once(&request).await {
                    Attempt::Done(result) => return result,
                    Attempt::Retry(err, retry_after) => {
                        if attempt >= self.config.max_retries {
                            return Err(err);
                        }
                        attempt += 1;
                        let wait = retry_after.unwrap_or(backoff);
                        tracing::warn!(
                            attempt,
                            max = self.config.max_retries,
                            wait_ms = wait.as_millis() as u64,
                            status = ?err.status,
                            "retrying sheets request: {}",
                            err.message
                        );
                        tokio::time::sleep(wait).await;
                        backoff *= 2;
                    }
                }
            }
        })
    }
}

/// Decode the API's error envelope:
/// `{"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}}`
fn api_error(status: u16, body: &str) -> TransportError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            let snippet: String = body.chars().take(200).collect();
            format!("HTTP {status}: {snippet}")
        });
    let mut err = TransportError::http(status, message);
    if let Some(reason) = error.and_then(|e| e.get("status")).and_then(Value::as_str) {
        err = err.with_reason(reason);
    }
    err
}
