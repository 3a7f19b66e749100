//! Analytics side channel
//!
//! Scan lifecycle events are emitted fire-and-forget: a failing sink is
//! logged and otherwise ignored.

use std::fmt::{self, Debug};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScanEvent {
    #[serde(rename = "scan_start")]
    Start,
    #[serde(rename = "scan_success")]
    Success,
    #[serde(rename = "scan_warning")]
    Warning,
    #[serde(rename = "scan_counterfeit_warning")]
    CounterfeitWarning,
    #[serde(rename = "scan_error")]
    Error,
    #[serde(rename = "scan_exception")]
    Exception,
}

impl ScanEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanEvent::Start => "scan_start",
            ScanEvent::Success => "scan_success",
            ScanEvent::Warning => "scan_warning",
            ScanEvent::CounterfeitWarning => "scan_counterfeit_warning",
            ScanEvent::Error => "scan_error",
            ScanEvent::Exception => "scan_exception",
        }
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub event: ScanEvent,
    pub scan_id: Uuid,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_retailers: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn new(event: ScanEvent, scan_id: Uuid, code: &str) -> Self {
        Self {
            event,
            scan_id,
            code: code.to_string(),
            tracking_id: None,
            error_code: None,
            scan_count: None,
            unique_retailers: None,
            detail: None,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("analytics sink failed: {0}")]
pub struct AnalyticsError(pub String);

pub trait AnalyticsSink: Send + Sync + Debug {
    fn emit(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError>;
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn emit(&self, _event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        Ok(())
    }
}

/// Logs events at info level under the `scancheck::analytics` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn emit(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        info!(
            target: "scancheck::analytics",
            event = event.event.as_str(),
            scan_id = %event.scan_id,
            code = %event.code,
            tracking_id = event.tracking_id.as_deref(),
            error_code = event.error_code,
            scan_count = event.scan_count,
            unique_retailers = event.unique_retailers,
            detail = event.detail.as_deref(),
            "scan event"
        );
        Ok(())
    }
}

/// Keeps events in memory
#[derive(Debug, Default)]
pub struct MemoryAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl MemoryAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event.as_str()).collect()
    }
}

impl AnalyticsSink for MemoryAnalytics {
    fn emit(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        self.events
            .lock()
            .map_err(|err| AnalyticsError(err.to_string()))?
            .push(event.clone());
        Ok(())
    }
}
