//! Scanned code decoding
//!
//! Turns the text reported by a camera scanner into a [`DecodedCode`]:
//! the detected symbology, the canonical tracking id used for backend
//! lookups and, for GS1 DataMatrix payloads, the fields that can be read
//! without a backend round-trip.
//!
//! # Detection order
//!
//! First match wins:
//!
//! 1. empty / whitespace-only → invalid
//! 2. issuer URL (allow-listed host) or issuer prefix token → QR
//! 3. exactly 13 digits → EAN-13
//! 4. exactly 12 digits → UPC-A (zero-padded to a GTIN-13)
//! 5. group separator present, or two leading digits → GS1 DataMatrix
//! 6. anything else → QR with the whole text as tracking id
//!    (rejected instead when the decoder is strict)

pub mod gs1;
pub mod issuer;

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub use gs1::{gs1_check_digit_is_valid, Gs1Fields, GROUP_SEPARATOR};
pub use issuer::{IssuerMatch, IssuerProfile, TRACKING_ID_PARAMS};

/// Longest code accepted by the format pre-check (in characters)
pub const MAX_CODE_LENGTH: usize = 500;

/// Symbology detected for a scanned code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeType {
    #[serde(rename = "QR")]
    Qr,
    #[serde(rename = "DataMatrix")]
    DataMatrix,
    #[serde(rename = "EAN")]
    Ean,
    #[serde(rename = "UPC")]
    Upc,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl CodeType {
    /// Wire name used in backend requests
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeType::Qr => "QR",
            CodeType::DataMatrix => "DataMatrix",
            CodeType::Ean => "EAN",
            CodeType::Upc => "UPC",
            CodeType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format pre-check failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Code is empty")]
    Empty,

    #[error("Code too long")]
    TooLong,

    #[error("Code contains invalid characters")]
    InvalidCharacters,
}

/// Result of decoding one scan
///
/// `is_valid == true` implies `tracking_id` is present, or the code is a
/// DataMatrix whose GTIN passed its checksum. `is_valid == false` always
/// carries a `validation_error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedCode {
    /// Text exactly as scanned
    pub raw: String,
    pub code_type: CodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
}

impl DecodedCode {
    fn new(raw: &str, code_type: CodeType) -> Self {
        Self {
            raw: raw.to_string(),
            code_type,
            tracking_id: None,
            gtin: None,
            serial_number: None,
            batch_number: None,
            expiry_date: None,
            is_valid: false,
            validation_error: None,
        }
    }

    fn rejected(raw: &str, code_type: CodeType, error: impl Into<String>) -> Self {
        let mut decoded = Self::new(raw, code_type);
        decoded.validation_error = Some(error.into());
        decoded
    }

    /// Key sent to the verification backend
    ///
    /// The tracking id when present, otherwise the GS1 element string
    /// `01<gtin>[21<serial>]` of a DataMatrix payload.
    pub fn lookup_key(&self) -> Option<String> {
        if let Some(tracking_id) = &self.tracking_id {
            return Some(tracking_id.clone());
        }
        let gtin = self.gtin.as_ref()?;
        Some(match &self.serial_number {
            Some(serial) => format!("01{gtin}21{serial}"),
            None => format!("01{gtin}"),
        })
    }
}

/// Decode with the default issuer profile in permissive mode
pub fn decode(raw: &str) -> DecodedCode {
    CodeDecoder::default().decode(raw)
}

/// Stateless decoder configured with an issuer profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeDecoder {
    issuer: IssuerProfile,
    strict_unknown_formats: bool,
}

impl CodeDecoder {
    pub fn new(issuer: IssuerProfile) -> Self {
        Self {
            issuer,
            strict_unknown_formats: false,
        }
    }

    /// Reject codes that match no known format instead of passing them on
    pub fn with_strict_unknown_formats(mut self, strict: bool) -> Self {
        self.strict_unknown_formats = strict;
        self
    }

    pub fn issuer(&self) -> &IssuerProfile {
        &self.issuer
    }

    pub fn is_strict(&self) -> bool {
        self.strict_unknown_formats
    }

    /// Decode one scanned string. Pure: no I/O, no hidden state.
    pub fn decode(&self, raw: &str) -> DecodedCode {
        let code = raw.trim();
        if code.is_empty() {
            return DecodedCode::rejected(raw, CodeType::Unknown, FormatError::Empty.to_string());
        }

        if let Some(found) = self.issuer.match_code(code) {
            let mut decoded = DecodedCode::new(raw, CodeType::Qr);
            decoded.tracking_id = Some(found.tracking_id);
            decoded.serial_number = found.serial_number;
            decoded.is_valid = true;
            return decoded;
        }

        if is_all_digits(code, 13) {
            return decode_gtin(raw, code.to_string(), CodeType::Ean);
        }

        if is_all_digits(code, 12) {
            return decode_gtin(raw, format!("0{code}"), CodeType::Upc);
        }

        if code.contains(GROUP_SEPARATOR) || starts_with_two_digits(code) {
            return decode_data_matrix(raw, code);
        }

        if self.strict_unknown_formats {
            return DecodedCode::rejected(raw, CodeType::Unknown, "Unrecognized code format");
        }

        let mut decoded = DecodedCode::new(raw, CodeType::Qr);
        decoded.tracking_id = Some(code.to_string());
        decoded.is_valid = true;
        decoded
    }
}

fn decode_gtin(raw: &str, gtin: String, code_type: CodeType) -> DecodedCode {
    let mut decoded = DecodedCode::new(raw, code_type);
    if gs1_check_digit_is_valid(&gtin) {
        decoded.tracking_id = Some(gtin.clone());
        decoded.is_valid = true;
    } else {
        decoded.validation_error = Some(match code_type {
            CodeType::Upc => "Invalid UPC checksum".to_string(),
            _ => "Invalid EAN-13 checksum".to_string(),
        });
    }
    decoded.gtin = Some(gtin);
    decoded
}

fn decode_data_matrix(raw: &str, code: &str) -> DecodedCode {
    let fields = gs1::parse_element_string(code);
    let mut decoded = DecodedCode::new(raw, CodeType::DataMatrix);
    decoded.serial_number = fields.serial_number;
    decoded.batch_number = fields.batch_number;
    decoded.expiry_date = fields.expiry_date;

    match fields.gtin {
        None => {
            decoded.validation_error = Some("Missing GTIN in DataMatrix".to_string());
        }
        Some(gtin) => {
            if gs1_check_digit_is_valid(&gtin) {
                decoded.is_valid = true;
            } else {
                decoded.validation_error = Some("Invalid GTIN checksum in DataMatrix".to_string());
            }
            decoded.gtin = Some(gtin);
        }
    }
    decoded
}

fn is_all_digits(code: &str, len: usize) -> bool {
    code.len() == len && code.bytes().all(|b| b.is_ascii_digit())
}

fn starts_with_two_digits(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_digit() && bytes[1].is_ascii_digit()
}

/// Parse `code` as an absolute URL with an `http` or `https` scheme
pub fn parse_http_url(code: &str) -> Option<Url> {
    let url = Url::parse(code).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Character/length sanity check applied before decoding
///
/// Allowed characters: ASCII letters and digits, `-`, `_`, `.`, `/` and the
/// GS1 group separator.
pub fn validate_code_format(code: &str) -> Result<(), FormatError> {
    if code.trim().is_empty() {
        return Err(FormatError::Empty);
    }
    if code.chars().count() > MAX_CODE_LENGTH {
        return Err(FormatError::TooLong);
    }
    if !code.chars().all(is_allowed_char) {
        return Err(FormatError::InvalidCharacters);
    }
    Ok(())
}

/// Screening run by the verifier before [`CodeDecoder::decode`]
///
/// http(s) URLs legitimately carry `:`, `?`, `=` and `&`, so they only get
/// the emptiness and length checks; everything else goes through
/// [`validate_code_format`]. Surrounding whitespace is ignored.
pub fn precheck(code: &str) -> Result<(), FormatError> {
    let code = code.trim();
    if parse_http_url(code).is_none() {
        return validate_code_format(code);
    }
    if code.chars().count() > MAX_CODE_LENGTH {
        return Err(FormatError::TooLong);
    }
    Ok(())
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | GROUP_SEPARATOR)
}
