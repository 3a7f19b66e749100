//! Backend error code catalog
//!
//! The verification service reports rejections with a numeric code from a
//! closed set (0-12). Each code maps to a localization key
//! (`error.code.N`) and an English default message.

use serde::{Deserialize, Serialize};

use crate::i18n::Localizer;

/// Canonical backend error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendErrorCode {
    TrackingIdUnavailable,
    ScannedMultipleTimes,
    TrackingIdUnavailableAlt,
    TrackingIdInactive,
    InvalidMandatoryInput,
    MissingMandatoryInput,
    InvalidTrackingId,
    TrackingIdBlacklisted,
    AuthenticationFailed,
    RegionalValidFormat,
    GtinNotFound,
    SerialNotFound,
    TrackingIdStolen,
}

impl BackendErrorCode {
    pub const ALL: [BackendErrorCode; 13] = [
        BackendErrorCode::TrackingIdUnavailable,
        BackendErrorCode::ScannedMultipleTimes,
        BackendErrorCode::TrackingIdUnavailableAlt,
        BackendErrorCode::TrackingIdInactive,
        BackendErrorCode::InvalidMandatoryInput,
        BackendErrorCode::MissingMandatoryInput,
        BackendErrorCode::InvalidTrackingId,
        BackendErrorCode::TrackingIdBlacklisted,
        BackendErrorCode::AuthenticationFailed,
        BackendErrorCode::RegionalValidFormat,
        BackendErrorCode::GtinNotFound,
        BackendErrorCode::SerialNotFound,
        BackendErrorCode::TrackingIdStolen,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub fn code(&self) -> i64 {
        match self {
            BackendErrorCode::TrackingIdUnavailable => 0,
            BackendErrorCode::ScannedMultipleTimes => 1,
            BackendErrorCode::TrackingIdUnavailableAlt => 2,
            BackendErrorCode::TrackingIdInactive => 3,
            BackendErrorCode::InvalidMandatoryInput => 4,
            BackendErrorCode::MissingMandatoryInput => 5,
            BackendErrorCode::InvalidTrackingId => 6,
            BackendErrorCode::TrackingIdBlacklisted => 7,
            BackendErrorCode::AuthenticationFailed => 8,
            BackendErrorCode::RegionalValidFormat => 9,
            BackendErrorCode::GtinNotFound => 10,
            BackendErrorCode::SerialNotFound => 11,
            BackendErrorCode::TrackingIdStolen => 12,
        }
    }

    /// Localization key, e.g. `error.code.7`
    pub fn key(&self) -> String {
        format!("error.code.{}", self.code())
    }

    /// English text used when no table carries the key
    pub fn default_message(&self) -> &'static str {
        match self {
            BackendErrorCode::TrackingIdUnavailable | BackendErrorCode::TrackingIdUnavailableAlt => {
                "Tracking id is not available."
            }
            BackendErrorCode::ScannedMultipleTimes => {
                "Code scanned multiple times. Contact Syngenta."
            }
            BackendErrorCode::TrackingIdInactive => "Tracking ID is not active.",
            BackendErrorCode::InvalidMandatoryInput => "Invalid mandatory input values.",
            BackendErrorCode::MissingMandatoryInput => "Missing mandatory input values.",
            BackendErrorCode::InvalidTrackingId => "Invalid Tracking ID.",
            BackendErrorCode::TrackingIdBlacklisted => "Tracking ID is blacklisted.",
            BackendErrorCode::AuthenticationFailed => "Authentication for code has failed.",
            BackendErrorCode::RegionalValidFormat => "Turkey product with valid format.",
            BackendErrorCode::GtinNotFound => "GTIN does not exist.",
            BackendErrorCode::SerialNotFound => "Serial Number does not exist.",
            BackendErrorCode::TrackingIdStolen => "Tracking ID is stolen.",
        }
    }
}

/// Localized message for a backend error code using the built-in tables
///
/// Unknown codes yield the generic error text, never the number itself.
pub fn message_for(code: i64, locale: &str) -> String {
    Localizer::new(locale).error_message(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_index() {
        for (index, code) in BackendErrorCode::ALL.iter().enumerate() {
            assert_eq!(code.code(), index as i64);
            assert_eq!(BackendErrorCode::from_code(index as i64), Some(*code));
        }
        assert_eq!(BackendErrorCode::from_code(13), None);
        assert_eq!(BackendErrorCode::from_code(-1), None);
    }

    #[test]
    fn test_blacklisted_message() {
        assert_eq!(message_for(7, "en"), "Tracking ID is blacklisted.");
    }

    #[test]
    fn test_unknown_code_never_leaks_number() {
        let message = message_for(503, "en");
        assert!(!message.contains("503"));
        assert_eq!(message, Localizer::new("en").t("verification.error"));
    }

    #[test]
    fn test_localized_catalog() {
        assert_eq!(message_for(12, "es"), "El ID de seguimiento ha sido robado.");
        assert_eq!(message_for(7, "xx"), "Tracking ID is blacklisted.");
    }
}
