//! Scoped rotation session with guaranteed flush.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::registry::ServerKind;

use super::UsageLogger;

#[derive(Debug, Clone)]
struct BufferedOutcome {
    kind: ServerKind,
    server_id: String,
    success: bool,
    response_time_ms: u32,
    carrier: Option<String>,
}

/// Buffers usage updates for a batch of sends belonging to one campaign.
///
/// Outcomes recorded through the session are applied to the shared
/// [`UsageLogger`] when the session is closed. The `Drop` impl flushes
/// whatever is still buffered, so early returns and error paths cannot lose
/// counters.
pub struct RotationSession {
    usage: Arc<UsageLogger>,
    user_id: String,
    campaign_id: String,
    buffer: Mutex<Vec<BufferedOutcome>>,
    flushed: AtomicBool,
}

impl RotationSession {
    pub(super) fn new(usage: Arc<UsageLogger>, user_id: String, campaign_id: String) -> Self {
        Self {
            usage,
            user_id,
            campaign_id,
            buffer: Mutex::new(Vec::new()),
            flushed: AtomicBool::new(false),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    /// Buffer one outcome; nothing is visible to readers until flush.
    pub fn record(
        &self,
        kind: ServerKind,
        server_id: &str,
        success: bool,
        response_time_ms: u32,
        carrier: Option<&str>,
    ) {
        self.buffer
            .lock()
            .expect("session buffer lock poisoned")
            .push(BufferedOutcome {
                kind,
                server_id: server_id.to_string(),
                success,
                response_time_ms,
                carrier: carrier.map(str::to_string),
            });
    }

    /// Number of outcomes waiting to be flushed.
    pub fn buffered(&self) -> usize {
        self.buffer.lock().expect("session buffer lock poisoned").len()
    }

    /// Apply all buffered outcomes to the shared logger.
    pub fn close(self) {
        self.flush();
    }

    fn flush(&self) {
        if self.flushed.swap(true, Ordering::SeqCst) {
            return;
        }
        let drained: Vec<BufferedOutcome> = {
            let mut buffer = self.buffer.lock().expect("session buffer lock poisoned");
            buffer.drain(..).collect()
        };
        let count = drained.len();
        for outcome in drained {
            self.usage.record_outcome(
                &self.campaign_id,
                outcome.kind,
                &outcome.server_id,
                outcome.success,
                outcome.response_time_ms,
            );
            if let Some(carrier) = outcome.carrier {
                self.usage.record_carrier_outcome(&carrier, outcome.success);
            }
        }
        if count > 0 {
            tracing::debug!(
                user_id = %self.user_id,
                campaign_id = %self.campaign_id,
                outcomes = count,
                "Flushed rotation session"
            );
        }
    }
}

impl Drop for RotationSession {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_flushes_buffered_outcomes() {
        let usage = Arc::new(UsageLogger::new());
        let session = usage.open_session("u1", "c1");
        session.record(ServerKind::Relay, "relay-a", true, 120, Some("Verizon"));
        session.record(ServerKind::Relay, "relay-a", false, 300, Some("Verizon"));

        // Not visible until the session closes.
        assert_eq!(usage.sample_size("c1", ServerKind::Relay, "relay-a"), 0);
        session.close();

        assert_eq!(usage.sample_size("c1", ServerKind::Relay, "relay-a"), 2);
        assert_eq!(usage.success_rate("c1", ServerKind::Relay, "relay-a"), 0.5);
        assert_eq!(usage.carrier_window("Verizon").unwrap().samples, 2);
    }

    #[test]
    fn drop_flushes_on_early_exit() {
        let usage = Arc::new(UsageLogger::new());
        {
            let session = usage.open_session("u1", "c1");
            session.record(ServerKind::Proxy, "proxy-a", true, 40, None);
            // Session dropped without an explicit close.
        }
        assert_eq!(usage.sample_size("c1", ServerKind::Proxy, "proxy-a"), 1);
    }

    #[test]
    fn flush_happens_exactly_once() {
        let usage = Arc::new(UsageLogger::new());
        let session = usage.open_session("u1", "c1");
        session.record(ServerKind::Relay, "relay-a", true, 10, None);
        session.close(); // Drop runs after close; counters must not double.

        assert_eq!(usage.sample_size("c1", ServerKind::Relay, "relay-a"), 1);
    }
}
