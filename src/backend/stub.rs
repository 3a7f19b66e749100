//! Stub Backend
//!
//! Offline backend that answers without network calls. Used by the CLI's
//! `stub` mode and for demos.
//!
//! Rules, first match wins:
//! - empty code: error code 4
//! - code containing `BLACKLIST`: error code 7
//! - issuer (QR) codes: authentic demo product; codes containing
//!   `COUNTERFEIT` report 12 unique retailers, others 3
//! - anything else: error code 6

use async_trait::async_trait;
use scancheck_core::{BackendErrorCode, CodeType};
use tokio_util::sync::CancellationToken;

use crate::backend::types::{ProductMetadata, VerificationRequest, VerificationResponse};
use crate::backend::VerificationBackend;

#[derive(Debug, Clone, Default)]
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn demo_product(tracking_id: &str) -> ProductMetadata {
        ProductMetadata {
            name: Some("Demo Product".to_string()),
            manufacturer: Some("Syngenta".to_string()),
            marketed_by: Some("Syngenta".to_string()),
            manufactured_on: Some("2025-01-01".to_string()),
            expiry_date: Some("2026-01-01".to_string()),
            batch_number: Some("BATCH-123".to_string()),
            serial_number: Some("SN-555-XYZ".to_string()),
            raw_material_batch_number: Some("RAW-888".to_string()),
            tracking_id: Some(tracking_id.to_string()),
        }
    }

    fn respond(request: &VerificationRequest) -> VerificationResponse {
        let code = request.code.trim();
        if code.is_empty() {
            return coded_error(BackendErrorCode::InvalidMandatoryInput);
        }
        if code.contains("BLACKLIST") {
            return coded_error(BackendErrorCode::TrackingIdBlacklisted);
        }
        if matches!(request.code_type, Some(CodeType::Qr)) {
            let unique_retailers = if code.contains("COUNTERFEIT") { 12 } else { 3 };
            return VerificationResponse::success(
                "This product is authentic and registered with Syngenta.",
                Self::demo_product(code),
            )
            .with_counts(Some(15), Some(unique_retailers));
        }
        coded_error(BackendErrorCode::InvalidTrackingId)
    }
}

fn coded_error(code: BackendErrorCode) -> VerificationResponse {
    VerificationResponse::error(code.default_message(), Some(code.code()))
}

#[async_trait]
impl VerificationBackend for StubBackend {
    async fn verify(
        &self,
        request: &VerificationRequest,
        cancel: &CancellationToken,
    ) -> VerificationResponse {
        if cancel.is_cancelled() {
            return VerificationResponse::cancelled();
        }
        Self::respond(request)
    }

    fn name(&self) -> &str {
        "stub"
    }
}
