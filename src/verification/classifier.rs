//! Verification classifier
//!
//! Drives one scan through decode → backend call → counterfeit evaluation
//! and folds the result into a [`VerificationOutcome`]:
//!
//! ```text
//! Decoding ──invalid──────────────────────────────▶ Rejected
//!    │
//!    ▼
//! Calling ──error──────────────────────────────────▶ Rejected
//!    │  └──warning─────────────────────────────────▶ Warning
//!    ▼ success + product
//! Evaluating ──count >= threshold──────────────────▶ Warning (counterfeit)
//!    └────────────────────────────────────────────▶ Verified
//! ```
//!
//! The risk metric is the backend's unique-retailer count, else its scan
//! count, else the local tracker's count. Every scan that reaches
//! Evaluating is recorded in the local tracker.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use scancheck_core::i18n::keys;
use scancheck_core::{
    precheck, BackendErrorCode, Clock, CodeDecoder, CounterfeitRiskTracker, DecodedCode,
    Localizer, SystemClock, TrackerConfig,
};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backend::types::{ProductMetadata, ResponseStatus, VerificationResponse};
use crate::backend::{VerificationBackend, VerificationRequest};
use crate::config::ScannerConfig;
use crate::verification::analytics::{AnalyticsEvent, AnalyticsSink, NoopAnalytics, ScanEvent};
use crate::verification::outcome::{ProductDetails, VerificationOutcome};

/// Classifier knobs
#[derive(Debug, Clone, Default)]
pub struct VerifierSettings {
    /// Threshold, window and bounds of the local tracker; the threshold
    /// also applies to backend-supplied counts
    pub tracker: TrackerConfig,
    pub retailer_id: Option<String>,
    pub user_id: Option<String>,
    /// Report Verified/Warning scans back to the service
    pub report_scans: bool,
    pub decoder: CodeDecoder,
}

impl VerifierSettings {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            tracker: config.tracker_config(),
            retailer_id: config.retailer_id.clone(),
            user_id: config.user_id.clone(),
            report_scans: config.report_scans,
            decoder: config.decoder(),
        }
    }
}

/// Result of one pipeline run before analytics
struct Classified {
    outcome: VerificationOutcome,
    event: ScanEvent,
    tracking_id: Option<String>,
}

impl Classified {
    fn new(outcome: VerificationOutcome, event: ScanEvent, tracking_id: Option<&str>) -> Self {
        Self {
            outcome,
            event,
            tracking_id: tracking_id.map(str::to_string),
        }
    }
}

#[derive(Debug)]
pub struct ProductVerifier {
    backend: Arc<dyn VerificationBackend>,
    localizer: Localizer,
    analytics: Arc<dyn AnalyticsSink>,
    tracker: Arc<CounterfeitRiskTracker>,
    settings: VerifierSettings,
    /// Detached `record_scan` calls
    reports: TaskTracker,
}

pub struct ProductVerifierBuilder {
    backend: Arc<dyn VerificationBackend>,
    localizer: Localizer,
    analytics: Arc<dyn AnalyticsSink>,
    tracker: Option<Arc<CounterfeitRiskTracker>>,
    clock: Arc<dyn Clock>,
    settings: VerifierSettings,
}

impl ProductVerifierBuilder {
    pub fn localizer(mut self, localizer: Localizer) -> Self {
        self.localizer = localizer;
        self
    }

    pub fn analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    /// Share an existing tracker; its config then decides the threshold
    pub fn tracker(mut self, tracker: Arc<CounterfeitRiskTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Time source for a tracker built by [`ProductVerifierBuilder::build`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(mut self, settings: VerifierSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn threshold(mut self, threshold: u64) -> Self {
        self.settings.tracker.threshold = threshold;
        self
    }

    pub fn retailer_id(mut self, retailer_id: impl Into<String>) -> Self {
        self.settings.retailer_id = Some(retailer_id.into());
        self
    }

    pub fn decoder(mut self, decoder: CodeDecoder) -> Self {
        self.settings.decoder = decoder;
        self
    }

    pub fn build(self) -> ProductVerifier {
        let tracker = self.tracker.unwrap_or_else(|| {
            Arc::new(CounterfeitRiskTracker::with_clock(
                self.settings.tracker.clone(),
                self.clock,
            ))
        });
        ProductVerifier {
            backend: self.backend,
            localizer: self.localizer,
            analytics: self.analytics,
            tracker,
            settings: self.settings,
            reports: TaskTracker::new(),
        }
    }
}

impl ProductVerifier {
    pub fn builder(backend: Arc<dyn VerificationBackend>) -> ProductVerifierBuilder {
        ProductVerifierBuilder {
            backend,
            localizer: Localizer::default(),
            analytics: Arc::new(NoopAnalytics),
            tracker: None,
            clock: Arc::new(SystemClock),
            settings: VerifierSettings::default(),
        }
    }

    /// Verifier wired from configuration
    pub fn from_config(
        config: &ScannerConfig,
        backend: Arc<dyn VerificationBackend>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self::builder(backend)
            .localizer(config.localizer())
            .analytics(analytics)
            .settings(VerifierSettings::from_config(config))
            .build()
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn tracker(&self) -> &CounterfeitRiskTracker {
        &self.tracker
    }

    pub fn backend(&self) -> &Arc<dyn VerificationBackend> {
        &self.backend
    }

    pub fn decoder(&self) -> &CodeDecoder {
        &self.settings.decoder
    }

    /// Wait until every scan report spawned so far has finished
    ///
    /// Reports are detached from the scan that spawned them and end early
    /// when that scan's cancellation token fires.
    pub async fn flush_reports(&self) {
        self.reports.close();
        self.reports.wait().await;
        self.reports.reopen();
    }

    pub async fn verify_code(&self, raw: &str) -> VerificationOutcome {
        self.verify_code_with_cancel(raw, &CancellationToken::new())
            .await
    }

    /// Verify one scanned code; never fails and never panics
    pub async fn verify_code_with_cancel(
        &self,
        raw: &str,
        cancel: &CancellationToken,
    ) -> VerificationOutcome {
        let scan_id = Uuid::new_v4();
        let span = info_span!("scan", %scan_id);

        async move {
            self.emit(AnalyticsEvent::new(ScanEvent::Start, scan_id, raw));

            match AssertUnwindSafe(self.classify(raw, cancel))
                .catch_unwind()
                .await
            {
                Ok(classified) => {
                    info!(
                        status = ?classified.outcome.status,
                        counterfeit_suspected = classified.outcome.counterfeit_suspected,
                        "scan classified"
                    );
                    self.emit(event_for(&classified, scan_id, raw));
                    classified.outcome
                }
                Err(panic) => {
                    let detail = panic_message(panic.as_ref());
                    error!(detail = %detail, "verification pipeline panicked");
                    let mut event = AnalyticsEvent::new(ScanEvent::Exception, scan_id, raw);
                    event.detail = Some(detail.clone());
                    self.emit(event);
                    VerificationOutcome::rejected(raw, self.localizer.t(keys::ERROR))
                        .with_diagnostic(format!("panic: {}", detail))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn classify(&self, raw: &str, cancel: &CancellationToken) -> Classified {
        if let Err(err) = precheck(raw) {
            debug!(error = %err, "code failed format check");
            return self.reject_input(raw, err.to_string());
        }

        let decoded = self.settings.decoder.decode(raw);
        if !decoded.is_valid {
            let message = decoded
                .validation_error
                .clone()
                .unwrap_or_else(|| self.localizer.t(keys::INVALID_CODE));
            debug!(code_type = %decoded.code_type, error = %message, "code rejected by decoder");
            return self.reject_input(raw, message);
        }

        let Some(key) = decoded.lookup_key() else {
            return self.reject_input(raw, self.localizer.t(keys::INVALID_CODE));
        };

        if cancel.is_cancelled() {
            return self.cancelled(raw, &key);
        }

        let request = VerificationRequest::new(key.clone())
            .with_code_type(decoded.code_type)
            .with_retailer_id(self.settings.retailer_id.clone());
        debug!(
            backend = self.backend.name(),
            code_type = %decoded.code_type,
            tracking_id = %key,
            "calling verification backend"
        );
        let response = self.backend.verify(&request, cancel).await;

        if cancel.is_cancelled() && response.is_client_generated() {
            return self.cancelled(raw, &key);
        }

        match response.status {
            ResponseStatus::Success => self.evaluate(raw, &decoded, &key, response, cancel),
            ResponseStatus::Warning => self.backend_warning(raw, &decoded, &key, response),
            ResponseStatus::Error => self.backend_error(raw, &key, response),
        }
    }

    fn evaluate(
        &self,
        raw: &str,
        decoded: &DecodedCode,
        key: &str,
        response: VerificationResponse,
        cancel: &CancellationToken,
    ) -> Classified {
        let Some(product) = response.product.as_ref() else {
            warn!(tracking_id = %key, "backend reported success without a product");
            let outcome = VerificationOutcome::rejected(raw, self.localizer.t(keys::ERROR))
                .with_diagnostic("success response without product payload");
            return Classified::new(outcome, ScanEvent::Error, Some(key));
        };

        let local = self.tracker.record(key);
        let metric = response
            .unique_retailers_last_year
            .or(response.scan_count_last_year)
            .unwrap_or(local.scan_count);
        let suspected = self.tracker.config().is_suspicious(metric);
        debug!(
            metric,
            local_count = local.scan_count,
            threshold = self.tracker.config().threshold,
            suspected,
            "counterfeit risk evaluated"
        );

        if self.settings.report_scans {
            self.spawn_report(key, cancel);
        }

        let details = self.product_details(product, decoded, key);
        let scan_count = response.scan_count_last_year.or(Some(local.scan_count));
        if suspected {
            let outcome =
                VerificationOutcome::warning(raw, self.localizer.t(keys::WARNING), Some(details))
                    .with_counts(scan_count, response.unique_retailers_last_year);
            Classified::new(outcome, ScanEvent::CounterfeitWarning, Some(key))
        } else {
            let outcome =
                VerificationOutcome::verified(raw, self.localizer.t(keys::SUCCESS), details)
                    .with_counts(scan_count, response.unique_retailers_last_year);
            Classified::new(outcome, ScanEvent::Success, Some(key))
        }
    }

    fn spawn_report(&self, key: &str, cancel: &CancellationToken) {
        let backend = self.backend.clone();
        let tracking_id = key.to_string();
        let user_id = self.settings.user_id.clone();
        let cancel = cancel.clone();

        self.reports.spawn(
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => debug!("scan report cancelled"),
                    result = backend.record_scan(&tracking_id, user_id.as_deref()) => {
                        if let Err(err) = result {
                            warn!(error = %err, "failed to report scan");
                        }
                    }
                }
            }
            .in_current_span(),
        );
    }

    fn backend_warning(
        &self,
        raw: &str,
        decoded: &DecodedCode,
        key: &str,
        response: VerificationResponse,
    ) -> Classified {
        let error_code = canonical(response.error_code);
        let message = if !response.message.trim().is_empty() {
            response.message.clone()
        } else if let Some(code) = error_code {
            self.localizer.error_message(code)
        } else {
            self.localizer.t(keys::WARNING)
        };
        let details = response
            .product
            .as_ref()
            .map(|product| self.product_details(product, decoded, key));

        let outcome = VerificationOutcome::warning(raw, message, details)
            .with_error_code(error_code)
            .with_counts(
                response.scan_count_last_year,
                response.unique_retailers_last_year,
            );
        Classified::new(outcome, ScanEvent::Warning, Some(key))
    }

    fn backend_error(&self, raw: &str, key: &str, response: VerificationResponse) -> Classified {
        let outcome = if response.is_client_generated() {
            let diagnostic = match response.error_code {
                Some(status) => format!("{} (HTTP {})", response.message, status),
                None => response.message.clone(),
            };
            VerificationOutcome::rejected(raw, self.localizer.t(keys::ERROR))
                .with_diagnostic(diagnostic)
        } else {
            match response.error_code {
                Some(code) => VerificationOutcome::rejected(raw, self.localizer.error_message(code))
                    .with_error_code(canonical(Some(code)))
                    .with_diagnostic(format!("backend error code {}: {}", code, response.message)),
                None if !response.message.trim().is_empty() => {
                    VerificationOutcome::rejected(raw, response.message.clone())
                }
                None => VerificationOutcome::rejected(raw, self.localizer.t(keys::ERROR)),
            }
        };
        debug!(error_code = ?response.error_code, "backend rejected code");
        Classified::new(outcome, ScanEvent::Error, Some(key))
    }

    fn reject_input(&self, raw: &str, message: String) -> Classified {
        let outcome = VerificationOutcome::rejected(raw, message.clone()).with_diagnostic(message);
        Classified::new(outcome, ScanEvent::Error, None)
    }

    fn cancelled(&self, raw: &str, key: &str) -> Classified {
        debug!("verification cancelled");
        let outcome = VerificationOutcome::rejected(raw, self.localizer.t(keys::CANCELLED))
            .with_diagnostic("cancelled");
        Classified::new(outcome, ScanEvent::Error, Some(key))
    }

    fn product_details(
        &self,
        product: &ProductMetadata,
        decoded: &DecodedCode,
        key: &str,
    ) -> ProductDetails {
        let local = ProductMetadata {
            batch_number: decoded.batch_number.clone(),
            expiry_date: decoded.expiry_date.clone(),
            serial_number: decoded.serial_number.clone(),
            ..ProductMetadata::default()
        };
        ProductDetails::fill(product, &local, key, &self.localizer.t(keys::NOT_AVAILABLE))
    }

    fn emit(&self, event: AnalyticsEvent) {
        let name = event.event;
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| self.analytics.emit(&event)));
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(event = %name, error = %err, "analytics emission failed"),
            Err(_) => warn!(event = %name, "analytics sink panicked"),
        }
    }
}

fn canonical(code: Option<i64>) -> Option<i64> {
    code.and_then(BackendErrorCode::from_code)
        .map(|known| known.code())
}

fn event_for(classified: &Classified, scan_id: Uuid, raw: &str) -> AnalyticsEvent {
    let outcome = &classified.outcome;
    let mut event = AnalyticsEvent::new(classified.event, scan_id, raw);
    event.tracking_id = classified.tracking_id.clone();
    event.error_code = outcome.error_code;
    event.scan_count = outcome.scan_count_last_year;
    event.unique_retailers = outcome.unique_retailers_last_year;
    event.detail = outcome.diagnostic.clone();
    event
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_codes_only() {
        assert_eq!(canonical(Some(7)), Some(7));
        assert_eq!(canonical(Some(503)), None);
        assert_eq!(canonical(None), None);
    }

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
