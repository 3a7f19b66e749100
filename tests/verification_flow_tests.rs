//! Verification flow integration tests
//!
//! Runs ProductVerifier end to end against the scripted FakeBackend, with
//! in-memory analytics and a manual clock for the counterfeit window.

use std::sync::Arc;
use std::time::Duration;

use scancheck::backend::types::{ProductMetadata, VerificationResponse, SERVICE_UNAVAILABLE};
use scancheck::backend::{BackendError, FakeBackend, FakeVerdict};
use scancheck::verification::{MemoryAnalytics, OutcomeStatus, ProductVerifier, VerifierSettings};
use scancheck::{Localizer, ManualClock, TrackerConfig, MILLIS_PER_DAY};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const GENERIC_ERROR: &str = "Verification failed. Please try again.";
const COUNTERFEIT_WARNING: &str = "Potential counterfeit detected. Please escalate to Syngenta support.";
const AUTHENTIC: &str = "This product is authentic and registered with Syngenta.";

// Test helpers
fn product(name: &str) -> ProductMetadata {
    ProductMetadata {
        name: Some(name.to_string()),
        manufacturer: Some("Syngenta".to_string()),
        ..ProductMetadata::default()
    }
}

fn authentic() -> VerificationResponse {
    VerificationResponse::success("ok", product("Widget"))
}

struct Harness {
    backend: Arc<FakeBackend>,
    analytics: Arc<MemoryAnalytics>,
    clock: Arc<ManualClock>,
    verifier: ProductVerifier,
}

fn harness(backend: FakeBackend, threshold: u64) -> Harness {
    let backend = Arc::new(backend);
    let analytics = Arc::new(MemoryAnalytics::new());
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let verifier = ProductVerifier::builder(backend.clone())
        .analytics(analytics.clone())
        .clock(clock.clone())
        .threshold(threshold)
        .build();
    Harness {
        backend,
        analytics,
        clock,
        verifier,
    }
}

// ============================================================================
// Counterfeit evaluation
// ============================================================================

#[tokio::test]
async fn test_unique_retailers_over_threshold_is_counterfeit() {
    let h = harness(
        FakeBackend::always(authentic().with_counts(Some(20), Some(15))),
        10,
    );
    let outcome = h.verifier.verify_code("TRK12345").await;

    assert_eq!(outcome.status, OutcomeStatus::Warning);
    assert!(outcome.counterfeit_suspected);
    assert_eq!(outcome.message, COUNTERFEIT_WARNING);
    assert_eq!(outcome.unique_retailers_last_year, Some(15));
    assert_eq!(outcome.scan_count_last_year, Some(20));
    assert_eq!(outcome.product_details.unwrap().name, "Widget");
    assert_eq!(
        h.analytics.names(),
        vec!["scan_start", "scan_counterfeit_warning"]
    );
}

#[tokio::test]
async fn test_unique_retailers_take_precedence_over_scan_count() {
    let h = harness(
        FakeBackend::always(authentic().with_counts(Some(50), Some(2))),
        10,
    );
    let outcome = h.verifier.verify_code("TRK12345").await;
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert!(!outcome.counterfeit_suspected);
}

#[tokio::test]
async fn test_backend_count_at_threshold_is_suspicious() {
    let h = harness(FakeBackend::always(authentic().with_counts(Some(10), None)), 10);
    let outcome = h.verifier.verify_code("TRK12345").await;
    assert_eq!(outcome.status, OutcomeStatus::Warning);
}

#[tokio::test]
async fn test_local_tracker_threshold_boundary() {
    let h = harness(FakeBackend::always(authentic()), 3);

    for expected in 1..=2u64 {
        let outcome = h.verifier.verify_code("TRK-LOCAL").await;
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.scan_count_last_year, Some(expected));
    }

    let third = h.verifier.verify_code("TRK-LOCAL").await;
    assert_eq!(third.status, OutcomeStatus::Warning);
    assert!(third.counterfeit_suspected);
    assert_eq!(third.scan_count_last_year, Some(3));

    // Other ids have their own history
    let other = h.verifier.verify_code("TRK-OTHER").await;
    assert_eq!(other.status, OutcomeStatus::Success);
}

#[tokio::test]
async fn test_local_history_expires_with_window() {
    let h = harness(FakeBackend::always(authentic()), 2);

    h.verifier.verify_code("TRK-OLD").await;
    h.clock.advance(366 * MILLIS_PER_DAY);
    let outcome = h.verifier.verify_code("TRK-OLD").await;

    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.scan_count_last_year, Some(1));
}

// ============================================================================
// Success payloads
// ============================================================================

#[tokio::test]
async fn test_verified_outcome_and_events() {
    let h = harness(FakeBackend::always(authentic()), 10);
    let outcome = h.verifier.verify_code("TRK12345").await;

    assert!(outcome.is_success());
    assert_eq!(outcome.message, AUTHENTIC);
    assert_eq!(outcome.raw_code, "TRK12345");
    assert_eq!(h.analytics.names(), vec!["scan_start", "scan_success"]);

    let events = h.analytics.events();
    assert_eq!(events[0].scan_id, events[1].scan_id);
    assert_eq!(events[1].tracking_id.as_deref(), Some("TRK12345"));

    let sent = h.backend.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].code, "TRK12345");
}

#[tokio::test]
async fn test_missing_fields_fall_back_to_decoded_then_placeholder() {
    let h = harness(
        FakeBackend::always(VerificationResponse::success("ok", product("Widget"))),
        10,
    );
    let outcome = h
        .verifier
        .verify_code("0109506000134352\u{1d}21SN0042\u{1d}10LOT7")
        .await;

    let details = outcome.product_details.unwrap();
    assert_eq!(details.name, "Widget");
    assert_eq!(details.batch_number, "LOT7");
    assert_eq!(details.serial_number, "SN0042");
    assert_eq!(details.marketed_by, "N/A");
    assert_eq!(details.expiry_date, "N/A");
    assert_eq!(details.tracking_id, "010950600013435221SN0042");
    assert_eq!(h.backend.requests()[0].code, "010950600013435221SN0042");
}

#[tokio::test]
async fn test_success_without_product_is_rejected() {
    let mut response = authentic();
    response.product = None;
    let h = harness(FakeBackend::always(response), 10);

    let outcome = h.verifier.verify_code("TRK12345").await;
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert_eq!(outcome.message, GENERIC_ERROR);
    assert_eq!(h.analytics.names(), vec!["scan_start", "scan_error"]);
}

#[tokio::test]
async fn test_report_scans_records_with_backend() {
    let backend = Arc::new(FakeBackend::always(authentic()));
    let verifier = ProductVerifier::builder(backend.clone())
        .settings(VerifierSettings {
            report_scans: true,
            user_id: Some("user-1".to_string()),
            ..VerifierSettings::default()
        })
        .build();

    verifier.verify_code("TRK12345").await;
    verifier.flush_reports().await;
    assert_eq!(backend.recorded_scans(), vec!["TRK12345".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_report_does_not_delay_outcome() {
    let backend = Arc::new(FakeBackend::always(authentic()).slow_reports(Duration::from_secs(30)));
    let verifier = ProductVerifier::builder(backend.clone())
        .settings(VerifierSettings {
            report_scans: true,
            ..VerifierSettings::default()
        })
        .build();
    let cancel = CancellationToken::new();

    let started = Instant::now();
    let outcome = verifier.verify_code_with_cancel("TRK12345", &cancel).await;
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert!(started.elapsed() < Duration::from_secs(1));

    // cancelling the scan abandons its pending report
    cancel.cancel();
    verifier.flush_reports().await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(backend.recorded_scans().is_empty());
}

#[tokio::test]
async fn test_failed_report_leaves_outcome_unchanged() {
    let backend = Arc::new(
        FakeBackend::always(authentic())
            .failing_reports(BackendError::Network("connection reset".into())),
    );
    let verifier = ProductVerifier::builder(backend.clone())
        .settings(VerifierSettings {
            report_scans: true,
            ..VerifierSettings::default()
        })
        .build();

    let outcome = verifier.verify_code("TRK12345").await;
    verifier.flush_reports().await;

    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.message, AUTHENTIC);
    assert!(outcome.diagnostic.is_none());
    assert_eq!(backend.recorded_scans(), vec!["TRK12345".to_string()]);
}

#[tokio::test]
async fn test_scans_are_not_reported_by_default() {
    let h = harness(FakeBackend::always(authentic()), 10);
    h.verifier.verify_code("TRK12345").await;
    assert!(h.backend.recorded_scans().is_empty());
}

// ============================================================================
// Backend errors and warnings
// ============================================================================

#[tokio::test]
async fn test_blacklisted_error_code() {
    let h = harness(
        FakeBackend::always(VerificationResponse::error("blacklisted", Some(7))),
        10,
    );
    let outcome = h.verifier.verify_code("TRK12345").await;

    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert_eq!(outcome.message, "Tracking ID is blacklisted.");
    assert_eq!(outcome.error_code, Some(7));
    assert!(!outcome.counterfeit_suspected);

    let events = h.analytics.events();
    assert_eq!(events[1].event.as_str(), "scan_error");
    assert_eq!(events[1].error_code, Some(7));
}

#[tokio::test]
async fn test_blacklisted_error_code_spanish() {
    let backend = Arc::new(FakeBackend::always(VerificationResponse::error("", Some(7))));
    let verifier = ProductVerifier::builder(backend)
        .localizer(Localizer::new("es"))
        .build();

    let outcome = verifier.verify_code("TRK12345").await;
    assert_eq!(outcome.message, "El ID de seguimiento está en la lista negra.");
}

#[tokio::test]
async fn test_unknown_error_code_gets_generic_message() {
    let h = harness(
        FakeBackend::always(VerificationResponse::error("odd", Some(99))),
        10,
    );
    let outcome = h.verifier.verify_code("TRK12345").await;
    assert_eq!(outcome.message, GENERIC_ERROR);
    assert_eq!(outcome.error_code, None);
}

#[tokio::test]
async fn test_backend_warning_passes_through() {
    let h = harness(
        FakeBackend::always(VerificationResponse::warning("Scanned before", Some(1))),
        10,
    );
    let outcome = h.verifier.verify_code("TRK12345").await;

    assert_eq!(outcome.status, OutcomeStatus::Warning);
    assert_eq!(outcome.message, "Scanned before");
    assert_eq!(outcome.error_code, Some(1));
    assert_eq!(h.analytics.names(), vec!["scan_start", "scan_warning"]);
}

#[tokio::test]
async fn test_client_generated_error_shows_generic_message() {
    let h = harness(
        FakeBackend::always(VerificationResponse::client_error(
            SERVICE_UNAVAILABLE,
            Some(503),
        )),
        10,
    );
    let outcome = h.verifier.verify_code("TRK12345").await;

    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert_eq!(outcome.message, GENERIC_ERROR);
    assert_eq!(outcome.error_code, None);
    assert!(outcome.diagnostic.unwrap().contains("HTTP 503"));
}

// ============================================================================
// Input rejection
// ============================================================================

#[tokio::test]
async fn test_bad_checksum_never_reaches_backend() {
    let h = harness(FakeBackend::always(authentic()), 10);
    let outcome = h.verifier.verify_code("4006381333932").await;

    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert_eq!(outcome.message, "Invalid EAN-13 checksum");
    assert!(h.backend.requests().is_empty());
    assert_eq!(h.analytics.names(), vec!["scan_start", "scan_error"]);
}

#[tokio::test]
async fn test_empty_and_malformed_input_rejected() {
    let h = harness(FakeBackend::always(authentic()), 10);
    for raw in ["", "   ", "bad code!"] {
        let outcome = h.verifier.verify_code(raw).await;
        assert_eq!(outcome.status, OutcomeStatus::Error, "input {:?}", raw);
        assert_eq!(outcome.raw_code, raw);
    }
    assert!(h.backend.requests().is_empty());
}

#[tokio::test]
async fn test_issuer_code_uses_extracted_tracking_id() {
    let h = harness(FakeBackend::always(authentic()), 10);
    let outcome = h
        .verifier
        .verify_code("https://verify.syngenta.com/check?id=TRK777")
        .await;

    assert!(outcome.is_success());
    assert_eq!(h.backend.requests()[0].code, "TRK777");
}

// ============================================================================
// Cancellation and failure containment
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_backend_call() {
    let h = harness(
        FakeBackend::new().then(FakeVerdict::Delayed(Duration::from_secs(10), authentic())),
        10,
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let outcome = h.verifier.verify_code_with_cancel("TRK12345", &cancel).await;
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert_eq!(outcome.message, "Verification cancelled.");
    assert_eq!(h.verifier.tracker().tracked_ids(), 0);
}

#[tokio::test]
async fn test_already_cancelled_skips_backend() {
    let h = harness(FakeBackend::always(authentic()), 10);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = h.verifier.verify_code_with_cancel("TRK12345", &cancel).await;
    assert_eq!(outcome.message, "Verification cancelled.");
    assert!(h.backend.requests().is_empty());
}

#[tokio::test]
async fn test_backend_panic_is_contained() {
    let h = harness(
        FakeBackend::new()
            .then(FakeVerdict::Panic("backend exploded".to_string()))
            .respond(authentic()),
        10,
    );

    let outcome = h.verifier.verify_code("TRK12345").await;
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert_eq!(outcome.message, GENERIC_ERROR);
    assert!(outcome.diagnostic.unwrap().contains("backend exploded"));

    let events = h.analytics.events();
    assert_eq!(events[1].event.as_str(), "scan_exception");
    assert_eq!(events[1].detail.as_deref(), Some("backend exploded"));

    // The verifier stays usable afterwards
    let next = h.verifier.verify_code("TRK12345").await;
    assert!(next.is_success());
}

#[tokio::test]
async fn test_shared_tracker_config_decides_threshold() {
    let tracker = Arc::new(scancheck::CounterfeitRiskTracker::new(
        TrackerConfig::default().with_threshold(1),
    ));
    let verifier = ProductVerifier::builder(Arc::new(FakeBackend::always(authentic())))
        .tracker(tracker.clone())
        .build();

    let outcome = verifier.verify_code("TRK12345").await;
    assert!(outcome.counterfeit_suspected);
    assert_eq!(tracker.tracked_ids(), 1);
}
