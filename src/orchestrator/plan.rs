//! Plan and outcome value types exchanged with the send workers.

use serde::{Deserialize, Serialize};

use crate::registry::ServerView;
use crate::retry::ErrorType;

/// One message the caller wants delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub message_id: String,
    /// Recipient phone number, any common formatting
    pub phone_number: String,
}

/// Everything a send worker needs to deliver one message.
///
/// `proxy`/`relay` are `None` when the corresponding rotation is disabled in
/// the resolved settings; the worker then connects directly or uses its own
/// fixed relay.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryPlan {
    pub message_id: String,
    pub proxy: Option<ServerView>,
    pub relay: Option<ServerView>,
    /// Pause before this send, in seconds
    pub delay_seconds: f64,
    pub carrier_hint: Option<String>,
    pub timezone_hint: Option<String>,
    /// Adaptive per-carrier throughput cap, when optimization is on
    pub allowed_rate_per_minute: Option<f64>,
}

/// Result of one executed send, reported back by the worker.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub user_id: String,
    pub campaign_id: String,
    pub message_id: String,
    pub proxy_id: Option<String>,
    pub relay_id: Option<String>,
    pub carrier: Option<String>,
    pub success: bool,
    pub response_time_ms: u32,
    /// Raw error text on failure, fed to the classifier
    pub error_message: Option<String>,
}

/// What the engine decided after recording an outcome.
#[derive(Debug, Clone)]
pub enum OutcomeDisposition {
    Delivered,
    RetryScheduled {
        attempt_number: u32,
        error_type: ErrorType,
        delay_seconds: f64,
    },
    PermanentlyFailed {
        error_type: ErrorType,
        attempts_made: u32,
    },
    /// The campaign was paused before the outcome arrived; no retry was
    /// scheduled.
    Cancelled,
}
