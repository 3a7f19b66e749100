//! Transport types
//!
//! Common types shared across transport implementations.

use std::time::Duration;

use async_trait::async_trait;

/// Backend errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Connection refused, DNS failure, reset, ...
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Non-2xx status
    #[error("HTTP error {status}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl BackendError {
    /// Network failures, timeouts and 5xx replies are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Network(_) | BackendError::Timeout(_) => true,
            BackendError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Text surfaced when retries are exhausted
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Network(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Json(err.to_string())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            BackendError::Configuration(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for BackendError {
    fn from(err: url::ParseError) -> Self {
        BackendError::Configuration(format!("Invalid URL: {}", err))
    }
}

/// Status and body of an HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// Asynchronous HTTP transport
///
/// Abstraction over the HTTP client to enable testing with FakeTransport.
/// Any status code is a successful exchange; only failures to complete the
/// exchange are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST a JSON body
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<HttpReply, BackendError>;

    /// GET expecting a JSON body
    async fn get_json(&self, url: &str, headers: &[(&str, &str)])
        -> Result<HttpReply, BackendError>;
}
