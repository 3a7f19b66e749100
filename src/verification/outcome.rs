//! Verification outcome
//!
//! The single tagged value a scan resolves to. Constructors keep the
//! status/counterfeit invariant: a success is never counterfeit-suspected
//! and a suspected scan is never a success.

use serde::Serialize;

use crate::backend::types::ProductMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Warning,
    Error,
}

/// Product fields ready for display; missing values hold the localized
/// "not available" placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub name: String,
    pub manufacturer: String,
    pub marketed_by: String,
    pub manufactured_on: String,
    pub expiry_date: String,
    pub batch_number: String,
    pub serial_number: String,
    pub raw_material_batch_number: String,
    pub tracking_id: String,
}

impl ProductDetails {
    /// Fill from the backend payload, then from locally decoded fields,
    /// then with `placeholder`
    pub fn fill(
        product: &ProductMetadata,
        decoded: &ProductMetadata,
        tracking_id: &str,
        placeholder: &str,
    ) -> Self {
        let pick = |remote: &Option<String>, local: &Option<String>| {
            remote
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .or(local.as_deref().filter(|v| !v.trim().is_empty()))
                .unwrap_or(placeholder)
                .to_string()
        };
        Self {
            name: pick(&product.name, &decoded.name),
            manufacturer: pick(&product.manufacturer, &decoded.manufacturer),
            marketed_by: pick(&product.marketed_by, &decoded.marketed_by),
            manufactured_on: pick(&product.manufactured_on, &decoded.manufactured_on),
            expiry_date: pick(&product.expiry_date, &decoded.expiry_date),
            batch_number: pick(&product.batch_number, &decoded.batch_number),
            serial_number: pick(&product.serial_number, &decoded.serial_number),
            raw_material_batch_number: pick(
                &product.raw_material_batch_number,
                &decoded.raw_material_batch_number,
            ),
            tracking_id: product
                .tracking_id
                .clone()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| tracking_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub status: OutcomeStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_details: Option<ProductDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_count_last_year: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_retailers_last_year: Option<u64>,
    pub counterfeit_suspected: bool,
    /// Code exactly as scanned
    pub raw_code: String,
    /// Internal context for logs; never shown to the user
    #[serde(skip)]
    pub diagnostic: Option<String>,
}

impl VerificationOutcome {
    pub fn verified(raw_code: &str, message: String, product: ProductDetails) -> Self {
        Self {
            status: OutcomeStatus::Success,
            message,
            product_details: Some(product),
            error_code: None,
            scan_count_last_year: None,
            unique_retailers_last_year: None,
            counterfeit_suspected: false,
            raw_code: raw_code.to_string(),
            diagnostic: None,
        }
    }

    pub fn warning(raw_code: &str, message: String, product: Option<ProductDetails>) -> Self {
        Self {
            status: OutcomeStatus::Warning,
            product_details: product,
            counterfeit_suspected: true,
            ..Self::rejected(raw_code, message)
        }
    }

    pub fn rejected(raw_code: &str, message: String) -> Self {
        Self {
            status: OutcomeStatus::Error,
            message,
            product_details: None,
            error_code: None,
            scan_count_last_year: None,
            unique_retailers_last_year: None,
            counterfeit_suspected: false,
            raw_code: raw_code.to_string(),
            diagnostic: None,
        }
    }

    pub fn with_error_code(mut self, error_code: Option<i64>) -> Self {
        self.error_code = error_code;
        self
    }

    pub fn with_counts(mut self, scan_count: Option<u64>, unique_retailers: Option<u64>) -> Self {
        self.scan_count_last_year = scan_count;
        self.unique_retailers_last_year = unique_retailers;
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}
