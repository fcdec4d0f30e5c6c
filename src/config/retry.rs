//! Retry and backoff configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for failure classification and retry scheduling.
///
/// Backoff is exponential: `base * 2^(attempt-1)`, scaled by an optional
/// per-carrier multiplier, capped at `max_delay_seconds`, with ±20% jitter
/// when enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base delay before the first retry
    #[serde(default = "default_base_delay")]
    pub base_delay_seconds: f64,
    /// Cap applied to the exponential backoff
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: f64,
    /// Apply ±20% jitter to scheduled delays
    #[serde(default = "default_jitter")]
    pub jitter: bool,
    /// Max retries for transient connection/timeout failures
    #[serde(default = "default_max_temporary")]
    pub max_retries_temporary: u32,
    /// Max retries for authentication failures
    #[serde(default = "default_max_auth")]
    pub max_retries_auth: u32,
    /// Max retries for rate-limit rejections
    #[serde(default = "default_max_rate_limit")]
    pub max_retries_rate_limit: u32,
    /// Max retries for remote server errors
    #[serde(default = "default_max_server")]
    pub max_retries_server: u32,
    /// Per-carrier backoff base multipliers (e.g., {"Verizon": 1.5})
    #[serde(default)]
    pub carrier_backoff_multipliers: HashMap<String, f64>,
}

fn default_base_delay() -> f64 {
    2.0
}

fn default_max_delay() -> f64 {
    300.0
}

fn default_jitter() -> bool {
    true
}

fn default_max_temporary() -> u32 {
    5
}

fn default_max_auth() -> u32 {
    2
}

fn default_max_rate_limit() -> u32 {
    5
}

fn default_max_server() -> u32 {
    3
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_seconds: default_base_delay(),
            max_delay_seconds: default_max_delay(),
            jitter: default_jitter(),
            max_retries_temporary: default_max_temporary(),
            max_retries_auth: default_max_auth(),
            max_retries_rate_limit: default_max_rate_limit(),
            max_retries_server: default_max_server(),
            carrier_backoff_multipliers: HashMap::new(),
        }
    }
}
