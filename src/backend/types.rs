//! Verification wire types
//!
//! Request and response bodies of the verification endpoint, plus the
//! messages the client itself produces when the service cannot answer.

use scancheck_core::CodeType;
use serde::{Deserialize, Serialize};

pub const SERVICE_UNAVAILABLE: &str = "Verification service unavailable";
pub const MALFORMED_RESPONSE: &str = "Malformed response from verification service";
pub const CANCELLED: &str = "Verification cancelled";

/// Body of `POST /verify`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_type: Option<CodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retailer_id: Option<String>,
}

impl VerificationRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            code_type: None,
            retailer_id: None,
        }
    }

    pub fn with_code_type(mut self, code_type: CodeType) -> Self {
        self.code_type = Some(code_type);
        self
    }

    pub fn with_retailer_id(mut self, retailer_id: Option<String>) -> Self {
        self.retailer_id = retailer_id;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
    Warning,
}

/// Product payload; every field is optional on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufactured_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_material_batch_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
}

/// Who produced a response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseOrigin {
    /// Parsed from the verification service
    #[default]
    Service,
    /// Synthesized by the client after a transport failure
    Client,
}

/// Response DTO of the verification endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_count_last_year: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_retailers_last_year: Option<u64>,
    #[serde(skip)]
    pub origin: ResponseOrigin,
}

impl VerificationResponse {
    pub fn success(message: impl Into<String>, product: ProductMetadata) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            product: Some(product),
            error_code: None,
            scan_count_last_year: None,
            unique_retailers_last_year: None,
            origin: ResponseOrigin::Service,
        }
    }

    pub fn error(message: impl Into<String>, error_code: Option<i64>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            product: None,
            error_code,
            scan_count_last_year: None,
            unique_retailers_last_year: None,
            origin: ResponseOrigin::Service,
        }
    }

    pub fn warning(message: impl Into<String>, error_code: Option<i64>) -> Self {
        Self {
            status: ResponseStatus::Warning,
            ..Self::error(message, error_code)
        }
    }

    /// Error produced locally when the service could not be reached
    pub fn client_error(message: impl Into<String>, error_code: Option<i64>) -> Self {
        Self {
            origin: ResponseOrigin::Client,
            ..Self::error(message, error_code)
        }
    }

    pub fn cancelled() -> Self {
        Self::client_error(CANCELLED, None)
    }

    pub fn with_counts(mut self, scan_count: Option<u64>, unique_retailers: Option<u64>) -> Self {
        self.scan_count_last_year = scan_count;
        self.unique_retailers_last_year = unique_retailers;
        self
    }

    pub fn is_client_generated(&self) -> bool {
        self.origin == ResponseOrigin::Client
    }
}

/// Body of `GET /scan-count`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCountResponse {
    #[serde(default)]
    pub scan_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = VerificationRequest::new("ABC123")
            .with_code_type(CodeType::Qr)
            .with_retailer_id(Some("R-1".to_string()));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"code": "ABC123", "codeType": "QR", "retailerId": "R-1"})
        );

        let bare = serde_json::to_value(VerificationRequest::new("X")).unwrap();
        assert_eq!(bare, serde_json::json!({"code": "X"}));
    }

    #[test]
    fn test_response_parses_full_dto() {
        let body = r#"{
            "status": "success",
            "message": "ok",
            "product": {"name": "Widget", "marketedBy": "Acme", "rawMaterialBatchNumber": "RAW-1"},
            "scanCountLastYear": 4,
            "uniqueRetailersLastYear": 2
        }"#;
        let response: VerificationResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.status, ResponseStatus::Success);
        let product = response.product.unwrap();
        assert_eq!(product.marketed_by.as_deref(), Some("Acme"));
        assert_eq!(product.raw_material_batch_number.as_deref(), Some("RAW-1"));
        assert_eq!(product.expiry_date, None);
        assert_eq!(response.unique_retailers_last_year, Some(2));
        assert_eq!(response.origin, ResponseOrigin::Service);
    }

    #[test]
    fn test_error_dto_without_message() {
        let response: VerificationResponse =
            serde_json::from_str(r#"{"status":"error","errorCode":7}"#).unwrap();
        assert_eq!(response.error_code, Some(7));
        assert_eq!(response.message, "");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(serde_json::from_str::<VerificationResponse>(r#"{"status":"maybe"}"#).is_err());
    }
}
