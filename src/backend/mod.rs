//! Verification backends
//!
//! Backend-agnostic interface for the product verification service.
//! Implementations: HTTP (with retry, timeout and cancellation), an
//! offline stub, and a scripted fake for tests.

pub mod factory;
pub mod fake;
pub mod http;
pub mod stub;
pub mod transport;
pub mod transport_fake;
pub mod transport_reqwest;
pub mod transport_types;
pub mod types;

use std::fmt::Debug;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use factory::{create_backend_from_config, create_backend_with_transport};
pub use fake::{FakeBackend, FakeVerdict};
pub use http::{HttpBackend, HttpSettings, RetryPolicy};
pub use stub::StubBackend;
pub use transport::{BackendError, Transport};
pub use types::{
    ProductMetadata, ResponseStatus, VerificationRequest, VerificationResponse,
};

/// Verification backend trait
///
/// `verify` never fails: transport problems come back as an error
/// response so callers always get a value to classify.
#[async_trait]
pub trait VerificationBackend: Send + Sync + Debug {
    async fn verify(
        &self,
        request: &VerificationRequest,
        cancel: &CancellationToken,
    ) -> VerificationResponse;

    /// Report a scan to the service; no-op unless the backend supports it
    async fn record_scan(&self, _tracking_id: &str, _user_id: Option<&str>) -> Result<(), BackendError> {
        Ok(())
    }

    /// Service-side scan count over `period_days`; `None` when unsupported
    async fn scan_count(&self, _tracking_id: &str, _period_days: u32) -> Result<Option<u64>, BackendError> {
        Ok(None)
    }

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Backend enum, the concrete type built from configuration
#[derive(Debug, Clone)]
pub enum Backend {
    Http(HttpBackend),
    Stub(StubBackend),
}

#[async_trait]
impl VerificationBackend for Backend {
    async fn verify(
        &self,
        request: &VerificationRequest,
        cancel: &CancellationToken,
    ) -> VerificationResponse {
        match self {
            Backend::Http(b) => b.verify(request, cancel).await,
            Backend::Stub(b) => b.verify(request, cancel).await,
        }
    }

    async fn record_scan(&self, tracking_id: &str, user_id: Option<&str>) -> Result<(), BackendError> {
        match self {
            Backend::Http(b) => b.record_scan(tracking_id, user_id).await,
            Backend::Stub(b) => b.record_scan(tracking_id, user_id).await,
        }
    }

    async fn scan_count(&self, tracking_id: &str, period_days: u32) -> Result<Option<u64>, BackendError> {
        match self {
            Backend::Http(b) => b.scan_count(tracking_id, period_days).await,
            Backend::Stub(b) => b.scan_count(tracking_id, period_days).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Backend::Http(b) => b.name(),
            Backend::Stub(b) => b.name(),
        }
    }
}
