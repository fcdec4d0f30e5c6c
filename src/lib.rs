//! Rotor - Adaptive delivery rotation and retry engine
//!
//! This library provides the core functionality for rotating SMS deliveries
//! across proxy and SMTP relay pools: health-checked server registries,
//! selection strategies, randomized pacing, carrier-aware rate limiting, and
//! classified retry scheduling.

pub mod cli;
pub mod config;
pub mod health;
pub mod logging;
pub mod orchestrator;
pub mod pacing;
pub mod registry;
pub mod retry;
pub mod rotation;
pub mod usage;
