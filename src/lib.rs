//! ScanCheck: product code scan verification
//!
//! Decodes scanned product codes, verifies them against the issuer's
//! verification service and classifies the result as verified, counterfeit
//! warning or rejected.
//!
//! The pure building blocks (decoder, error catalog, localization, risk
//! tracker) live in `scancheck-core` and are re-exported here.

pub mod backend;
pub mod cli;
pub mod config;
pub mod telemetry;
pub mod verification;

// Re-export core building blocks
pub use scancheck_core::{
    decode, message_for, precheck, validate_code_format, BackendErrorCode, Clock, CodeDecoder,
    CodeType, CounterfeitRiskTracker, DecodedCode, FormatError, IssuerProfile, Localizer,
    ManualClock, RiskAssessment, SystemClock, TrackerConfig, MILLIS_PER_DAY,
};

// Re-export backend interface
pub use backend::{
    create_backend_from_config, Backend, BackendError, FakeBackend, HttpBackend, StubBackend,
    VerificationBackend, VerificationRequest, VerificationResponse,
};

// Re-export configuration
pub use config::{BackendKind, ConfigError, ScannerConfig};

// Re-export verification
pub use verification::{
    AnalyticsSink, OutcomeStatus, ProductDetails, ProductVerifier, VerificationOutcome,
};
