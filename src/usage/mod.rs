//! Usage logging module.
//!
//! Tracks per-(campaign, server) outcome counters that drive the
//! best-performance strategy and the failure-probability heuristic, plus
//! bounded per-carrier outcome windows that feed the adaptive rate limiter.

mod session;

pub use session::RotationSession;

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::registry::ServerKind;

/// Key for a usage entry: one row per campaign/server pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageKey {
    pub campaign_id: String,
    pub kind: ServerKind,
    pub server_id: String,
}

/// Counters for one campaign/server pair. All updates are atomic
/// fetch-adds so hot campaigns never serialize on a global lock.
#[derive(Debug, Default)]
struct UsageEntry {
    messages_processed: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    response_time_sum_ms: AtomicU64,
}

/// Windowed per-carrier success statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarrierWindow {
    pub success_rate: f64,
    pub samples: usize,
}

/// Flattened usage counters for the stats view.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UsageStat {
    pub server_id: String,
    pub kind: ServerKind,
    pub messages_processed: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub success_rate: f64,
    pub avg_response_time_ms: f64,
}

/// Records send outcomes per campaign and server.
///
/// Entries are created lazily on first use and never deleted here; cleanup
/// of stale campaigns belongs to the surrounding service.
#[derive(Debug)]
pub struct UsageLogger {
    entries: DashMap<UsageKey, UsageEntry>,
    carrier_windows: DashMap<String, Mutex<VecDeque<bool>>>,
    carrier_window_size: usize,
}

impl UsageLogger {
    /// Create a logger with the default carrier window size (100).
    pub fn new() -> Self {
        Self::with_window_size(100)
    }

    /// Create a logger keeping the last `carrier_window_size` outcomes per
    /// carrier.
    pub fn with_window_size(carrier_window_size: usize) -> Self {
        Self {
            entries: DashMap::new(),
            carrier_windows: DashMap::new(),
            carrier_window_size: carrier_window_size.max(1),
        }
    }

    /// Atomically record one send outcome for a campaign/server pair.
    pub fn record_outcome(
        &self,
        campaign_id: &str,
        kind: ServerKind,
        server_id: &str,
        success: bool,
        response_time_ms: u32,
    ) {
        let key = UsageKey {
            campaign_id: campaign_id.to_string(),
            kind,
            server_id: server_id.to_string(),
        };
        let entry = self.entries.entry(key).or_default();
        entry.messages_processed.fetch_add(1, Ordering::SeqCst);
        if success {
            entry.success_count.fetch_add(1, Ordering::SeqCst);
        } else {
            entry.failure_count.fetch_add(1, Ordering::SeqCst);
        }
        entry
            .response_time_sum_ms
            .fetch_add(u64::from(response_time_ms), Ordering::SeqCst);
    }

    /// Success rate for a campaign/server pair, in [0, 1].
    ///
    /// A pair with no recorded outcomes reports 0.0 with the denominator
    /// floored at one.
    pub fn success_rate(&self, campaign_id: &str, kind: ServerKind, server_id: &str) -> f64 {
        match self.lookup(campaign_id, kind, server_id) {
            Some((success, failure, _)) => success as f64 / (success + failure).max(1) as f64,
            None => 0.0,
        }
    }

    /// Number of recorded outcomes for a campaign/server pair.
    pub fn sample_size(&self, campaign_id: &str, kind: ServerKind, server_id: &str) -> u64 {
        match self.lookup(campaign_id, kind, server_id) {
            Some((success, failure, _)) => success + failure,
            None => 0,
        }
    }

    /// Failure-probability heuristic: `1 - successRate`, weighted down when
    /// the sample is small so a single early failure doesn't condemn a
    /// server.
    pub fn failure_probability(&self, campaign_id: &str, kind: ServerKind, server_id: &str) -> f64 {
        let n = self.sample_size(campaign_id, kind, server_id) as f64;
        if n == 0.0 {
            return 0.0;
        }
        let rate = self.success_rate(campaign_id, kind, server_id);
        (1.0 - rate) * (n / (n + 5.0))
    }

    /// Record an outcome in a carrier's rolling window.
    pub fn record_carrier_outcome(&self, carrier: &str, success: bool) {
        let window = self
            .carrier_windows
            .entry(carrier.to_string())
            .or_insert_with(|| Mutex::new(VecDeque::with_capacity(self.carrier_window_size)));
        let mut window = window.lock().expect("carrier window lock poisoned");
        if window.len() == self.carrier_window_size {
            window.pop_front();
        }
        window.push_back(success);
    }

    /// Windowed success statistics for a carrier, if any outcomes exist.
    pub fn carrier_window(&self, carrier: &str) -> Option<CarrierWindow> {
        let window = self.carrier_windows.get(carrier)?;
        let window = window.lock().expect("carrier window lock poisoned");
        if window.is_empty() {
            return None;
        }
        let successes = window.iter().filter(|&&ok| ok).count();
        Some(CarrierWindow {
            success_rate: successes as f64 / window.len() as f64,
            samples: window.len(),
        })
    }

    /// All usage rows recorded for a campaign.
    pub fn campaign_stats(&self, campaign_id: &str) -> Vec<UsageStat> {
        self.entries
            .iter()
            .filter(|entry| entry.key().campaign_id == campaign_id)
            .map(|entry| {
                let key = entry.key();
                let value = entry.value();
                let success = value.success_count.load(Ordering::SeqCst);
                let failure = value.failure_count.load(Ordering::SeqCst);
                let processed = value.messages_processed.load(Ordering::SeqCst);
                let sum = value.response_time_sum_ms.load(Ordering::SeqCst);
                UsageStat {
                    server_id: key.server_id.clone(),
                    kind: key.kind,
                    messages_processed: processed,
                    success_count: success,
                    failure_count: failure,
                    success_rate: success as f64 / (success + failure).max(1) as f64,
                    avg_response_time_ms: sum as f64 / processed.max(1) as f64,
                }
            })
            .collect()
    }

    /// Open a buffered session for a batch of sends.
    ///
    /// Buffered outcomes are flushed on [`RotationSession::close`] and on
    /// drop, so error paths cannot lose updates.
    pub fn open_session(
        self: &Arc<Self>,
        user_id: impl Into<String>,
        campaign_id: impl Into<String>,
    ) -> RotationSession {
        RotationSession::new(Arc::clone(self), user_id.into(), campaign_id.into())
    }

    fn lookup(
        &self,
        campaign_id: &str,
        kind: ServerKind,
        server_id: &str,
    ) -> Option<(u64, u64, u64)> {
        let key = UsageKey {
            campaign_id: campaign_id.to_string(),
            kind,
            server_id: server_id.to_string(),
        };
        self.entries.get(&key).map(|entry| {
            (
                entry.success_count.load(Ordering::SeqCst),
                entry.failure_count.load(Ordering::SeqCst),
                entry.messages_processed.load(Ordering::SeqCst),
            )
        })
    }
}

impl Default for UsageLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_over_recorded_outcomes() {
        let usage = UsageLogger::new();
        for _ in 0..3 {
            usage.record_outcome("c1", ServerKind::Relay, "relay-a", true, 100);
        }
        usage.record_outcome("c1", ServerKind::Relay, "relay-a", false, 250);

        assert_eq!(usage.success_rate("c1", ServerKind::Relay, "relay-a"), 0.75);
        assert_eq!(usage.sample_size("c1", ServerKind::Relay, "relay-a"), 4);
    }

    #[test]
    fn unknown_pair_reports_zero() {
        let usage = UsageLogger::new();
        assert_eq!(usage.success_rate("c1", ServerKind::Proxy, "nope"), 0.0);
        assert_eq!(usage.sample_size("c1", ServerKind::Proxy, "nope"), 0);
        assert_eq!(usage.failure_probability("c1", ServerKind::Proxy, "nope"), 0.0);
    }

    #[test]
    fn entries_are_scoped_per_campaign() {
        let usage = UsageLogger::new();
        usage.record_outcome("c1", ServerKind::Relay, "relay-a", true, 10);
        usage.record_outcome("c2", ServerKind::Relay, "relay-a", false, 10);

        assert_eq!(usage.success_rate("c1", ServerKind::Relay, "relay-a"), 1.0);
        assert_eq!(usage.success_rate("c2", ServerKind::Relay, "relay-a"), 0.0);
    }

    #[test]
    fn failure_probability_weighted_by_sample_size() {
        let usage = UsageLogger::new();
        // One failure out of one sample: heuristic stays well under 1.0.
        usage.record_outcome("c1", ServerKind::Relay, "relay-a", false, 10);
        let small = usage.failure_probability("c1", ServerKind::Relay, "relay-a");
        assert!(small < 0.2);

        // Fifty failures: heuristic approaches 1.0.
        for _ in 0..49 {
            usage.record_outcome("c1", ServerKind::Relay, "relay-a", false, 10);
        }
        let large = usage.failure_probability("c1", ServerKind::Relay, "relay-a");
        assert!(large > 0.9);
    }

    #[test]
    fn carrier_window_is_bounded() {
        let usage = UsageLogger::with_window_size(10);
        for _ in 0..25 {
            usage.record_carrier_outcome("Verizon", true);
        }
        let window = usage.carrier_window("Verizon").unwrap();
        assert_eq!(window.samples, 10);
        assert_eq!(window.success_rate, 1.0);
    }

    #[test]
    fn carrier_window_drops_oldest() {
        let usage = UsageLogger::with_window_size(4);
        usage.record_carrier_outcome("AT&T", false);
        usage.record_carrier_outcome("AT&T", false);
        usage.record_carrier_outcome("AT&T", true);
        usage.record_carrier_outcome("AT&T", true);
        // Pushes the first failure out of the window.
        usage.record_carrier_outcome("AT&T", true);

        let window = usage.carrier_window("AT&T").unwrap();
        assert_eq!(window.samples, 4);
        assert_eq!(window.success_rate, 0.75);
    }

    #[test]
    fn unknown_carrier_has_no_window() {
        let usage = UsageLogger::new();
        assert!(usage.carrier_window("T-Mobile").is_none());
    }

    #[test]
    fn campaign_stats_lists_all_servers() {
        let usage = UsageLogger::new();
        usage.record_outcome("c1", ServerKind::Relay, "relay-a", true, 100);
        usage.record_outcome("c1", ServerKind::Proxy, "proxy-a", true, 50);
        usage.record_outcome("c2", ServerKind::Relay, "relay-a", true, 100);

        let stats = usage.campaign_stats("c1");
        assert_eq!(stats.len(), 2);
    }
}
