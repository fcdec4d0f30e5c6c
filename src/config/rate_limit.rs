//! Adaptive rate limiting configuration.

use serde::{Deserialize, Serialize};

/// Configuration for per-carrier adaptive throughput.
///
/// The allowed rate scales down when the windowed success rate drops below
/// `low_water_mark` and may rise up to `ceiling_multiplier * base` when it
/// sits at or above `high_water_mark` with enough samples. The result is
/// always clamped between `floor_per_minute` and the ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Baseline messages per minute per carrier
    pub base_rate_per_minute: f64,
    /// Success rate below which throughput is scaled down
    pub low_water_mark: f64,
    /// Success rate at or above which throughput may increase
    pub high_water_mark: f64,
    /// Hard minimum rate
    pub floor_per_minute: f64,
    /// Hard maximum as a multiple of the base rate
    pub ceiling_multiplier: f64,
    /// Samples required before a carrier window is trusted
    pub min_samples: usize,
    /// Outcomes kept per carrier window
    pub carrier_window_size: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            base_rate_per_minute: 60.0,
            low_water_mark: 0.80,
            high_water_mark: 0.97,
            floor_per_minute: 1.0,
            ceiling_multiplier: 1.5,
            min_samples: 10,
            carrier_window_size: 100,
        }
    }
}
