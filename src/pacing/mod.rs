//! Message pacing module
//!
//! Groups the three timing concerns applied before each send: randomized
//! inter-message delay, carrier/timezone detection, and carrier-aware
//! adaptive rate limiting. Everything here is a pure in-memory decision; no
//! I/O happens on the send path.

mod carrier;
mod delay;
mod limiter;

pub use carrier::CarrierDetector;
pub use delay::DelayController;
pub use limiter::AdaptiveRateLimiter;
