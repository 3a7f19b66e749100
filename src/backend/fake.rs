//! Scripted backend for tests
//!
//! Hands out queued verdicts in order and records every request. When the
//! queue is empty it answers with the fallback response.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::backend::transport::BackendError;
use crate::backend::types::{VerificationRequest, VerificationResponse};
use crate::backend::VerificationBackend;

#[derive(Debug, Clone)]
pub enum FakeVerdict {
    Respond(VerificationResponse),
    /// Answer after a delay (cancellable)
    Delayed(Duration, VerificationResponse),
    /// Panic inside `verify`
    Panic(String),
}

#[derive(Debug)]
pub struct FakeBackend {
    verdicts: Mutex<VecDeque<FakeVerdict>>,
    fallback: VerificationResponse,
    requests: Mutex<Vec<VerificationRequest>>,
    recorded_scans: Mutex<Vec<String>>,
    scan_count: Option<u64>,
    report_delay: Option<Duration>,
    report_failure: Option<BackendError>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            verdicts: Mutex::new(VecDeque::new()),
            fallback: VerificationResponse::error("no scripted response", None),
            requests: Mutex::new(Vec::new()),
            recorded_scans: Mutex::new(Vec::new()),
            scan_count: None,
            report_delay: None,
            report_failure: None,
        }
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with `response`
    pub fn always(response: VerificationResponse) -> Self {
        Self {
            fallback: response,
            ..Self::default()
        }
    }

    pub fn then(self, verdict: FakeVerdict) -> Self {
        if let Ok(mut verdicts) = self.verdicts.lock() {
            verdicts.push_back(verdict);
        }
        self
    }

    pub fn respond(self, response: VerificationResponse) -> Self {
        self.then(FakeVerdict::Respond(response))
    }

    pub fn with_scan_count(mut self, count: u64) -> Self {
        self.scan_count = Some(count);
        self
    }

    /// `record_scan` waits this long before recording
    pub fn slow_reports(mut self, delay: Duration) -> Self {
        self.report_delay = Some(delay);
        self
    }

    /// `record_scan` records, then fails with `error`
    pub fn failing_reports(mut self, error: BackendError) -> Self {
        self.report_failure = Some(error);
        self
    }

    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn recorded_scans(&self) -> Vec<String> {
        self.recorded_scans
            .lock()
            .map(|scans| scans.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VerificationBackend for FakeBackend {
    async fn verify(
        &self,
        request: &VerificationRequest,
        cancel: &CancellationToken,
    ) -> VerificationResponse {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let verdict = self
            .verdicts
            .lock()
            .ok()
            .and_then(|mut verdicts| verdicts.pop_front());

        match verdict {
            None => self.fallback.clone(),
            Some(FakeVerdict::Respond(response)) => response,
            Some(FakeVerdict::Delayed(delay, response)) => tokio::select! {
                _ = cancel.cancelled() => VerificationResponse::cancelled(),
                _ = tokio::time::sleep(delay) => response,
            },
            Some(FakeVerdict::Panic(message)) => panic!("{}", message),
        }
    }

    async fn record_scan(&self, tracking_id: &str, _user_id: Option<&str>) -> Result<(), BackendError> {
        if let Some(delay) = self.report_delay {
            tokio::time::sleep(delay).await;
        }
        if let Ok(mut scans) = self.recorded_scans.lock() {
            scans.push(tracking_id.to_string());
        }
        match &self.report_failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn scan_count(&self, _tracking_id: &str, _period_days: u32) -> Result<Option<u64>, BackendError> {
        Ok(self.scan_count)
    }

    fn name(&self) -> &str {
        "fake"
    }
}
