//! ScanCheck Core
//!
//! Pure, synchronous building blocks of the product verification pipeline:
//!
//! - [`decoder`] - raw scan text → [`DecodedCode`] (issuer QR, EAN-13, UPC-A, GS1 DataMatrix)
//! - [`catalog`] - the closed set of backend error codes (0-12)
//! - [`i18n`] - explicit [`Localizer`] value with built-in message tables
//! - [`tracker`] - time-windowed scan frequency per tracking id
//! - [`clock`] - injectable time source for the tracker
//!
//! Nothing in this crate performs I/O; the network side lives in the
//! `scancheck` package.

pub mod catalog;
pub mod clock;
pub mod decoder;
pub mod i18n;
pub mod tracker;

pub use catalog::{message_for, BackendErrorCode};
pub use clock::{Clock, ManualClock, SystemClock};
pub use decoder::{
    decode, precheck, validate_code_format, CodeDecoder, CodeType, DecodedCode, FormatError,
    IssuerProfile,
};
pub use i18n::Localizer;
pub use tracker::{CounterfeitRiskTracker, RiskAssessment, TrackerConfig, MILLIS_PER_DAY};
