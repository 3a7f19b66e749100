//! HTTP verification backend
//!
//! Retry policy: up to `max_attempts` calls in total. Network failures,
//! timeouts and 5xx replies are retried after `base_delay * 2^n` (n = 0 for
//! the first retry); 4xx replies are final. Cancellation aborts both the
//! in-flight request and a pending backoff sleep.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::backend::transport::{BackendError, HttpReply, HttpTransport, Transport};
use crate::backend::types::{
    ResponseStatus, ScanCountResponse, VerificationRequest, VerificationResponse, MALFORMED_RESPONSE,
    SERVICE_UNAVAILABLE,
};
use crate::backend::VerificationBackend;

pub const RECORD_SCAN_PATH: &str = "/record-scan";
pub const SCAN_COUNT_PATH: &str = "/scan-count";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first call included
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.min(16)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub base_url: String,
    pub verify_path: String,
    pub auth_token: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl HttpSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            verify_path: "/verify".to_string(),
            auth_token: None,
            timeout: Duration::from_millis(30_000),
            retry: RetryPolicy::default(),
        }
    }
}

/// Verification backend speaking HTTP/JSON
#[derive(Debug, Clone)]
pub struct HttpBackend {
    transport: Transport,
    settings: HttpSettings,
}

/// How one attempt ended
enum Attempt {
    Done(VerificationResponse),
    Retry(BackendError),
}

impl HttpBackend {
    pub fn new(settings: HttpSettings, transport: Transport) -> Result<Self, BackendError> {
        let base = Url::parse(&settings.base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(BackendError::Configuration(format!(
                "Unsupported URL scheme: {}",
                base.scheme()
            )));
        }
        Ok(Self {
            transport,
            settings,
        })
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn headers(&self) -> Vec<(&str, String)> {
        let mut headers = vec![
            ("Content-Type", "application/json".to_string()),
            ("Accept", "application/json".to_string()),
        ];
        if let Some(token) = self.settings.auth_token.as_deref().filter(|t| !t.is_empty()) {
            headers.push(("Authorization", format!("Bearer {}", token)));
        }
        headers
    }

    async fn post_once(&self, url: &str, body: &str) -> Result<HttpReply, BackendError> {
        let owned = self.headers();
        let headers: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (*k, v.as_str())).collect();
        match tokio::time::timeout(
            self.settings.timeout,
            self.transport.post_json(url, &headers, body),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.settings.timeout)),
        }
    }

    async fn get_once(&self, url: &str) -> Result<HttpReply, BackendError> {
        let owned = self.headers();
        let headers: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (*k, v.as_str())).collect();
        match tokio::time::timeout(self.settings.timeout, self.transport.get_json(url, &headers))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.settings.timeout)),
        }
    }

    fn classify(&self, result: Result<HttpReply, BackendError>) -> Attempt {
        let reply = match result {
            Ok(reply) => reply,
            Err(err) if err.is_retryable() => return Attempt::Retry(err),
            Err(err) => return Attempt::Done(VerificationResponse::client_error(err.user_message(), None)),
        };

        if reply.is_success() {
            return Attempt::Done(match serde_json::from_str(&reply.body) {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "unparsable verification response");
                    VerificationResponse::client_error(MALFORMED_RESPONSE, None)
                }
            });
        }

        if reply.is_server_error() {
            return Attempt::Retry(BackendError::Http {
                status: reply.status,
                body: reply.body,
            });
        }

        // 4xx: the service may still describe the failure with an error code.
        // Only an error-status body is trusted; a 4xx never verifies a product.
        match serde_json::from_str::<VerificationResponse>(&reply.body) {
            Ok(response) if response.status == ResponseStatus::Error => Attempt::Done(response),
            Ok(response) => {
                warn!(
                    http_status = reply.status,
                    body_status = ?response.status,
                    "non-error body on client error reply"
                );
                Attempt::Done(VerificationResponse::client_error(
                    SERVICE_UNAVAILABLE,
                    Some(i64::from(reply.status)),
                ))
            }
            Err(_) => Attempt::Done(VerificationResponse::client_error(
                SERVICE_UNAVAILABLE,
                Some(i64::from(reply.status)),
            )),
        }
    }
}

fn exhausted(last: Option<BackendError>) -> VerificationResponse {
    match last {
        Some(BackendError::Http { status, .. }) => {
            VerificationResponse::client_error(SERVICE_UNAVAILABLE, Some(i64::from(status)))
        }
        Some(err) => VerificationResponse::client_error(err.user_message(), None),
        None => VerificationResponse::client_error(SERVICE_UNAVAILABLE, None),
    }
}

#[async_trait]
impl VerificationBackend for HttpBackend {
    async fn verify(
        &self,
        request: &VerificationRequest,
        cancel: &CancellationToken,
    ) -> VerificationResponse {
        let body = match serde_json::to_string(request) {
            Ok(body) => body,
            Err(err) => return VerificationResponse::client_error(err.to_string(), None),
        };
        let url = self.endpoint(&self.settings.verify_path);
        let max_attempts = self.settings.retry.max_attempts.max(1);
        let mut last_failure = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.settings.retry.delay_for_retry(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
                tokio::select! {
                    _ = cancel.cancelled() => return VerificationResponse::cancelled(),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return VerificationResponse::cancelled(),
                result = self.post_once(&url, &body) => result,
            };

            match self.classify(result) {
                Attempt::Done(response) => {
                    debug!(attempt, status = ?response.status, "verification call finished");
                    return response;
                }
                Attempt::Retry(err) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        error = %err,
                        "verification call failed"
                    );
                    last_failure = Some(err);
                }
            }
        }

        info!(max_attempts, "verification retries exhausted");
        exhausted(last_failure)
    }

    async fn record_scan(&self, tracking_id: &str, user_id: Option<&str>) -> Result<(), BackendError> {
        let body = serde_json::json!({
            "trackingId": tracking_id,
            "userId": user_id,
            "timestamp": Utc::now().to_rfc3339(),
        })
        .to_string();
        let reply = self.post_once(&self.endpoint(RECORD_SCAN_PATH), &body).await?;
        if reply.is_success() {
            Ok(())
        } else {
            Err(BackendError::Http {
                status: reply.status,
                body: reply.body,
            })
        }
    }

    async fn scan_count(&self, tracking_id: &str, period_days: u32) -> Result<Option<u64>, BackendError> {
        let mut url = Url::parse(&self.endpoint(SCAN_COUNT_PATH))?;
        url.query_pairs_mut()
            .append_pair("trackingId", tracking_id)
            .append_pair("periodDays", &period_days.to_string());

        let reply = self.get_once(url.as_str()).await?;
        if !reply.is_success() {
            return Err(BackendError::Http {
                status: reply.status,
                body: reply.body,
            });
        }
        let parsed: ScanCountResponse = serde_json::from_str(&reply.body)
            .map_err(|err| BackendError::InvalidResponse(err.to_string()))?;
        Ok(Some(parsed.scan_count))
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        };
        assert_eq!(policy.delay_for_retry(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let transport = Transport::fake(Default::default());
        assert!(HttpBackend::new(HttpSettings::new("ftp://host"), transport.clone()).is_err());
        assert!(HttpBackend::new(HttpSettings::new("not a url"), transport.clone()).is_err());
        assert!(HttpBackend::new(HttpSettings::new("https://api.test/v1/"), transport).is_ok());
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let backend = HttpBackend::new(
            HttpSettings::new("https://api.test/v1/"),
            Transport::fake(Default::default()),
        )
        .unwrap();
        assert_eq!(backend.endpoint("/verify"), "https://api.test/v1/verify");
        assert_eq!(backend.endpoint("scan-count"), "https://api.test/v1/scan-count");
    }

    #[test]
    fn test_bearer_header_only_with_token() {
        let mut settings = HttpSettings::new("https://api.test");
        let backend = HttpBackend::new(settings.clone(), Transport::fake(Default::default())).unwrap();
        assert!(backend.headers().iter().all(|(k, _)| *k != "Authorization"));

        settings.auth_token = Some("secret".to_string());
        let backend = HttpBackend::new(settings, Transport::fake(Default::default())).unwrap();
        assert!(backend
            .headers()
            .iter()
            .any(|(k, v)| *k == "Authorization" && v == "Bearer secret"));
    }
}
