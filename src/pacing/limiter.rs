//! Carrier-aware adaptive rate limiting.

use crate::config::RateLimitConfig;
use crate::usage::CarrierWindow;

/// Adjusts the allowed per-carrier send rate from recent success rates.
///
/// Scaling is bounded on both sides: the result never drops below the
/// configured floor and never exceeds `ceiling_multiplier * base`, so a bad
/// window cannot stall a campaign and a good one cannot trigger a burst the
/// carrier would throttle.
#[derive(Debug)]
pub struct AdaptiveRateLimiter {
    config: RateLimitConfig,
}

impl AdaptiveRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config }
    }

    pub fn base_rate_per_minute(&self) -> f64 {
        self.config.base_rate_per_minute
    }

    /// Allowed messages per minute for a carrier.
    ///
    /// Below the low-water mark the base rate is scaled by
    /// `rate / low_water_mark`; at or above the high-water mark (with enough
    /// samples) the rate rises to the ceiling. Carriers without a trusted
    /// window get the clamped base rate.
    pub fn allowed_rate_per_minute(
        &self,
        carrier: &str,
        base_rate: f64,
        recent: Option<CarrierWindow>,
    ) -> f64 {
        let floor = self.config.floor_per_minute.max(1.0);
        let ceiling = base_rate * self.config.ceiling_multiplier;

        let adjusted = match recent {
            Some(window) if window.samples >= self.config.min_samples => {
                if window.success_rate < self.config.low_water_mark {
                    let scaled = base_rate * (window.success_rate / self.config.low_water_mark);
                    tracing::info!(
                        carrier = %carrier,
                        success_rate = window.success_rate,
                        samples = window.samples,
                        rate = scaled,
                        "Scaling down carrier rate"
                    );
                    scaled
                } else if window.success_rate >= self.config.high_water_mark {
                    ceiling
                } else {
                    base_rate
                }
            }
            _ => base_rate,
        };

        adjusted.clamp(floor, ceiling.max(floor))
    }
}
