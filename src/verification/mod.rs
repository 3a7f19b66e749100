//! Product verification
//!
//! [`ProductVerifier`] turns one scanned string into one
//! [`VerificationOutcome`], emitting scan lifecycle events to an
//! [`AnalyticsSink`] along the way.

pub mod analytics;
pub mod classifier;
pub mod outcome;

pub use analytics::{
    AnalyticsError, AnalyticsEvent, AnalyticsSink, MemoryAnalytics, NoopAnalytics, ScanEvent,
    TracingAnalytics,
};
pub use classifier::{ProductVerifier, ProductVerifierBuilder, VerifierSettings};
pub use outcome::{OutcomeStatus, ProductDetails, VerificationOutcome};
