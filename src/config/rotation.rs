//! Rotation settings: the per-user delivery knobs.

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::rotation::RotationStrategy;

/// Per-user rotation settings, optionally overridden per campaign.
///
/// The engine treats a `RotationSettings` as an immutable snapshot: it is
/// resolved once at the start of each orchestration call and passed down,
/// never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSettings {
    /// Route sends through the proxy pool
    pub proxy_rotation_enabled: bool,
    /// Rotate across the SMTP relay pool
    pub smtp_rotation_enabled: bool,
    /// Selection strategy
    pub strategy: RotationStrategy,
    /// Lower bound of the randomized inter-message delay
    pub delay_min_seconds: f64,
    /// Upper bound of the randomized inter-message delay
    pub delay_max_seconds: f64,
    /// Optional PRNG seed for reproducible delay sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_seed: Option<u64>,
    /// Compute carrier and timezone hints for each message
    pub carrier_optimization_enabled: bool,
    /// Adjust per-carrier throughput from recent success rates
    pub adaptive_optimization_enabled: bool,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            proxy_rotation_enabled: true,
            smtp_rotation_enabled: true,
            strategy: RotationStrategy::RoundRobin,
            delay_min_seconds: 1.0,
            delay_max_seconds: 5.0,
            delay_seed: None,
            carrier_optimization_enabled: true,
            adaptive_optimization_enabled: true,
        }
    }
}

impl RotationSettings {
    /// Validate the settings.
    ///
    /// Negative and non-finite delays are rejected outright. An inverted
    /// min/max pair is allowed here: the delay controller swaps the bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.delay_min_seconds.is_finite() || self.delay_min_seconds < 0.0 {
            return Err(ConfigError::Validation {
                field: "rotation.delay_min_seconds".to_string(),
                message: "delay must be a finite non-negative number".to_string(),
            });
        }
        if !self.delay_max_seconds.is_finite() || self.delay_max_seconds < 0.0 {
            return Err(ConfigError::Validation {
                field: "rotation.delay_max_seconds".to_string(),
                message: "delay must be a finite non-negative number".to_string(),
            });
        }
        Ok(())
    }
}
