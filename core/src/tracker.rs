//! Counterfeit risk tracking
//!
//! A bounded, time-windowed scan history per tracking id. Each scan
//! appends a timestamp, drops timestamps that fell out of the rolling
//! window and returns how many remain. Append, prune and count happen
//! under one shard lock, so two scans of the same id never lose an update
//! while scans of different ids run in parallel.
//!
//! A tracking id counts as suspected once its count reaches the
//! threshold (`count >= threshold`).

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, SystemClock};

pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub threshold: u64,
    pub window_millis: i64,
    pub max_history_per_id: usize,
    pub max_tracked_ids: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            threshold: 10,
            window_millis: 365 * MILLIS_PER_DAY,
            max_history_per_id: 1000,
            max_tracked_ids: 10_000,
        }
    }
}

impl TrackerConfig {
    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_millis = i64::from(days) * MILLIS_PER_DAY;
        self
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn is_suspicious(&self, count: u64) -> bool {
        count >= self.threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub scan_count: u64,
    pub threshold: u64,
    pub counterfeit_suspected: bool,
}

#[derive(Debug)]
pub struct CounterfeitRiskTracker {
    config: TrackerConfig,
    histories: DashMap<String, VecDeque<i64>>,
    clock: Arc<dyn Clock>,
}

impl Default for CounterfeitRiskTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl CounterfeitRiskTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: TrackerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            histories: DashMap::new(),
            clock,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Record a scan at `now_millis` and return the in-window count,
    /// the new scan included
    ///
    /// `max_tracked_ids` holds once concurrent first scans of new ids have
    /// all returned; while they race the map may briefly exceed it.
    pub fn record_and_evaluate(&self, tracking_id: &str, now_millis: i64) -> u64 {
        let is_new = !self.histories.contains_key(tracking_id);
        if is_new {
            self.make_room(now_millis, self.config.max_tracked_ids, None);
        }

        let count = {
            let window = self.config.window_millis;
            let mut history = self.histories.entry(tracking_id.to_string()).or_default();
            history.push_back(now_millis);
            history.retain(|ts| now_millis - ts < window);
            while history.len() > self.config.max_history_per_id {
                history.pop_front();
            }
            history.len() as u64
        };

        // another new id may have been inserted between make_room and entry
        if is_new && self.histories.len() > self.config.max_tracked_ids {
            self.make_room(
                now_millis,
                self.config.max_tracked_ids.saturating_add(1),
                Some(tracking_id),
            );
        }
        count
    }

    /// Record a scan at the clock's current time
    pub fn record(&self, tracking_id: &str) -> RiskAssessment {
        let count = self.record_and_evaluate(tracking_id, self.clock.now_millis());
        self.assess(count)
    }

    /// Current risk without recording a scan
    pub fn evaluate(&self, tracking_id: &str) -> RiskAssessment {
        self.assess(self.scan_count(tracking_id, self.clock.now_millis()))
    }

    pub fn assess(&self, scan_count: u64) -> RiskAssessment {
        RiskAssessment {
            scan_count,
            threshold: self.config.threshold,
            counterfeit_suspected: self.config.is_suspicious(scan_count),
        }
    }

    /// In-window count at `now_millis`; read only
    pub fn scan_count(&self, tracking_id: &str, now_millis: i64) -> u64 {
        let window = self.config.window_millis;
        self.histories
            .get(tracking_id)
            .map(|history| {
                history
                    .iter()
                    .filter(|ts| now_millis - **ts < window)
                    .count() as u64
            })
            .unwrap_or(0)
    }

    pub fn tracked_ids(&self) -> usize {
        self.histories.len()
    }

    pub fn forget(&self, tracking_id: &str) -> bool {
        self.histories.remove(tracking_id).is_some()
    }

    // Evicts until fewer than `limit` ids remain, never touching `keep`.
    // Must not be called while holding a guard into `histories`.
    fn make_room(&self, now_millis: i64, limit: usize, keep: Option<&str>) {
        if self.histories.len() < limit {
            return;
        }

        let window = self.config.window_millis;
        self.histories.retain(|key, history| {
            Some(key.as_str()) == keep
                || history
                    .iter()
                    .max()
                    .is_some_and(|last| now_millis - last < window)
        });

        while self.histories.len() >= limit.max(1) {
            let stalest = self
                .histories
                .iter()
                .filter(|entry| Some(entry.key().as_str()) != keep)
                .map(|entry| {
                    let last = entry.value().iter().max().copied().unwrap_or(i64::MIN);
                    (entry.key().clone(), last)
                })
                .min_by_key(|(_, last)| *last)
                .map(|(key, _)| key);

            match stalest {
                Some(key) => {
                    debug!(tracking_id = %key, "evicting scan history");
                    self.histories.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn manual_tracker(threshold: u64) -> (CounterfeitRiskTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let config = TrackerConfig::default().with_threshold(threshold);
        (
            CounterfeitRiskTracker::with_clock(config, clock.clone()),
            clock,
        )
    }

    #[test]
    fn test_threshold_boundary() {
        let (tracker, clock) = manual_tracker(10);
        for _ in 0..9 {
            assert!(!tracker.record("T").counterfeit_suspected);
            clock.advance(1_000);
        }
        let at_threshold = tracker.record("T");
        assert_eq!(at_threshold.scan_count, 10);
        assert!(at_threshold.counterfeit_suspected);

        let above = tracker.record("T");
        assert_eq!(above.scan_count, 11);
        assert!(above.counterfeit_suspected);

        let (fresh, _) = manual_tracker(10);
        for _ in 0..9 {
            fresh.record("U");
        }
        assert_eq!(fresh.evaluate("U").scan_count, 9);
        assert!(!fresh.evaluate("U").counterfeit_suspected);
    }

    #[test]
    fn test_window_pruning() {
        let (tracker, clock) = manual_tracker(10);
        tracker.record("T");
        clock.advance(365 * MILLIS_PER_DAY - 1);
        assert_eq!(tracker.record("T").scan_count, 2);

        clock.advance(1);
        // the first scan is now exactly one window old
        assert_eq!(tracker.record("T").scan_count, 2);
        assert_eq!(tracker.evaluate("T").scan_count, 2);
    }

    #[test]
    fn test_scan_count_does_not_record() {
        let (tracker, clock) = manual_tracker(10);
        assert_eq!(tracker.scan_count("T", clock.now_millis()), 0);
        tracker.record("T");
        assert_eq!(tracker.scan_count("T", clock.now_millis()), 1);
        assert_eq!(tracker.scan_count("T", clock.now_millis()), 1);
    }

    #[test]
    fn test_history_is_capped_per_id() {
        let config = TrackerConfig {
            max_history_per_id: 3,
            ..TrackerConfig::default()
        };
        let tracker = CounterfeitRiskTracker::with_clock(config, Arc::new(ManualClock::new(0)));
        for ts in 0..5 {
            tracker.record_and_evaluate("T", ts);
        }
        assert_eq!(tracker.scan_count("T", 5), 3);
    }

    #[test]
    fn test_eviction_prefers_expired_then_stalest() {
        let config = TrackerConfig {
            max_tracked_ids: 2,
            window_millis: 100,
            ..TrackerConfig::default()
        };
        let tracker = CounterfeitRiskTracker::with_clock(config, Arc::new(ManualClock::new(0)));
        tracker.record_and_evaluate("old", 0);
        tracker.record_and_evaluate("recent", 150);
        tracker.record_and_evaluate("new", 160);
        assert_eq!(tracker.tracked_ids(), 2);
        assert_eq!(tracker.scan_count("old", 160), 0);
        assert_eq!(tracker.scan_count("recent", 160), 1);

        tracker.record_and_evaluate("newest", 170);
        assert_eq!(tracker.tracked_ids(), 2);
        assert_eq!(tracker.scan_count("recent", 170), 0);
        assert_eq!(tracker.scan_count("new", 170), 1);
    }

    #[test]
    fn test_concurrent_scans_of_same_id_are_not_lost() {
        let tracker = Arc::new(CounterfeitRiskTracker::with_clock(
            TrackerConfig::default(),
            Arc::new(ManualClock::new(1_000)),
        ));
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let tracker = tracker.clone();
                scope.spawn(move || {
                    for _ in 0..50 {
                        tracker.record("SAME");
                    }
                });
            }
        });
        assert_eq!(tracker.evaluate("SAME").scan_count, 400);
    }

    #[test]
    fn test_concurrent_new_ids_respect_cap() {
        let config = TrackerConfig {
            max_tracked_ids: 4,
            ..TrackerConfig::default()
        };
        let tracker = Arc::new(CounterfeitRiskTracker::with_clock(
            config,
            Arc::new(ManualClock::new(1_000)),
        ));
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let tracker = tracker.clone();
                scope.spawn(move || {
                    for n in 0..50 {
                        tracker.record(&format!("ID-{}-{}", worker, n));
                    }
                });
            }
        });
        assert!(tracker.tracked_ids() <= 4, "tracked {}", tracker.tracked_ids());
    }

    #[test]
    fn test_forget() {
        let (tracker, _) = manual_tracker(10);
        tracker.record("T");
        assert!(tracker.forget("T"));
        assert!(!tracker.forget("T"));
        assert_eq!(tracker.tracked_ids(), 0);
    }
}
