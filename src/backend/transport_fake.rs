//! Fake transport for testing
//!
//! Replays a script of replies instead of making HTTP calls and records
//! every request it receives.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::transport_types::{BackendError, HttpReply, HttpTransport};

/// One scripted exchange
#[derive(Debug, Clone)]
pub enum FakeStep {
    Reply(HttpReply),
    Fail(BackendError),
    /// Wait, then run the inner step
    Delay(Duration, Box<FakeStep>),
    /// Never completes; only a timeout or cancellation ends it
    Hang,
}

/// Request seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Fake transport for testing (uses scripted steps)
///
/// Steps are consumed in order; once the script runs out every request
/// fails with a network error.
#[derive(Debug, Default)]
pub struct FakeTransport {
    script: Mutex<VecDeque<FakeStep>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, step: FakeStep) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(step);
        }
        self
    }

    pub fn reply(self, status: u16, body: &str) -> Self {
        self.then(FakeStep::Reply(HttpReply::new(status, body)))
    }

    pub fn fail(self, error: BackendError) -> Self {
        self.then(FakeStep::Fail(error))
    }

    pub fn hang(self) -> Self {
        self.then(FakeStep::Hang)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
    }

    fn record(&self, method: &'static str, url: &str, headers: &[(&str, &str)], body: Option<&str>) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                method,
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
                body: body.map(str::to_string),
            });
        }
    }

    fn next_step(&self) -> Option<FakeStep> {
        self.script.lock().ok()?.pop_front()
    }

    async fn run(&self) -> Result<HttpReply, BackendError> {
        let mut step = self
            .next_step()
            .ok_or_else(|| BackendError::Network("fake transport script exhausted".to_string()))?;
        loop {
            match step {
                FakeStep::Reply(reply) => return Ok(reply),
                FakeStep::Fail(error) => return Err(error),
                FakeStep::Delay(duration, inner) => {
                    tokio::time::sleep(duration).await;
                    step = *inner;
                }
                FakeStep::Hang => return std::future::pending().await,
            }
        }
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<HttpReply, BackendError> {
        self.record("POST", url, headers, Some(body));
        self.run().await
    }

    async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpReply, BackendError> {
        self.record("GET", url, headers, None);
        self.run().await
    }
}
