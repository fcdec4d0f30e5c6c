//! Health checking module.
//!
//! Periodically probes every registered server and feeds the results into
//! the registry, which owns the healthy/unhealthy transition rules. Probes
//! run concurrently within a cycle; a slow server cannot stall the rest of
//! the pool.

mod error;
mod prober;

pub use error::ProbeError;
pub use prober::{Prober, TcpProber};

use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::HealthCheckConfig;
use crate::registry::{HealthTransition, ServerRegistry};

/// Background health checker for the proxy and relay pools.
pub struct HealthChecker {
    registry: Arc<ServerRegistry>,
    prober: Arc<dyn Prober>,
    config: HealthCheckConfig,
}

impl HealthChecker {
    /// Create a checker using the default TCP-connect prober.
    pub fn new(registry: Arc<ServerRegistry>, config: HealthCheckConfig) -> Self {
        let prober = Arc::new(TcpProber::new(config.timeout_seconds));
        Self::with_prober(registry, config, prober)
    }

    /// Create a checker with a custom prober (used by tests).
    pub fn with_prober(
        registry: Arc<ServerRegistry>,
        config: HealthCheckConfig,
        prober: Arc<dyn Prober>,
    ) -> Self {
        Self {
            registry,
            prober,
            config,
        }
    }

    /// Probe every registered server once, concurrently.
    ///
    /// Results go through the registry, the only writer of health state.
    /// Probe failures are recorded, never propagated; a dead server is a
    /// data point, not an error.
    pub async fn probe_all(&self) {
        let servers = self.registry.get_all_servers();
        let probes = servers.iter().map(|server| {
            let prober = Arc::clone(&self.prober);
            async move {
                let result = prober.probe(server).await;
                (server.id.clone(), result)
            }
        });

        for (id, result) in join_all(probes).await {
            let transition = match result {
                Ok(response_time_ms) => {
                    metrics::histogram!("rotor_probe_duration_ms", "server" => id.clone())
                        .record(f64::from(response_time_ms));
                    self.registry
                        .mark_health_check_result(&id, true, Some(response_time_ms), None)
                }
                Err(e) => {
                    self.registry
                        .mark_health_check_result(&id, false, None, Some(e.to_string()))
                }
            };

            match transition {
                Ok(HealthTransition::BecameUnhealthy) => {
                    metrics::counter!("rotor_health_transitions_total", "to" => "unhealthy")
                        .increment(1);
                    tracing::warn!(server = %id, "Server marked unhealthy");
                }
                Ok(HealthTransition::BecameHealthy) => {
                    metrics::counter!("rotor_health_transitions_total", "to" => "healthy")
                        .increment(1);
                    tracing::info!(server = %id, "Server recovered");
                }
                Ok(HealthTransition::Unchanged) => {}
                // Server was removed between snapshot and result; nothing to do.
                Err(_) => {}
            }
        }
    }

    /// Spawn the periodic probe loop.
    ///
    /// Runs until the token is cancelled. Ticks that pile up behind a slow
    /// cycle are skipped rather than replayed.
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if !self.config.enabled {
                tracing::info!("Health checking disabled");
                return;
            }

            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(self.config.interval_seconds));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(
                interval_seconds = self.config.interval_seconds,
                "Health checker started"
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.probe_all().await;
                    }
                    _ = shutdown.cancelled() => {
                        tracing::info!("Health checker stopping");
                        return;
                    }
                }
            }
        })
    }
}
