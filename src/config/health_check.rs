//! Configuration for server health probing.

use serde::{Deserialize, Serialize};

/// Configuration for background health probes.
///
/// A server is demoted after `failure_threshold` consecutive failed probes
/// and restored by the first successful one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Whether background probing is enabled
    pub enabled: bool,
    /// Seconds between probe cycles
    pub interval_seconds: u64,
    /// Timeout for each probe
    pub timeout_seconds: u64,
    /// Consecutive probe failures before marking unhealthy
    pub failure_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 30,
            timeout_seconds: 5,
            failure_threshold: 3,
        }
    }
}
