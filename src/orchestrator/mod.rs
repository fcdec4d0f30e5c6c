//! Delivery orchestration module.
//!
//! Composes the registry, selector, pacing, and retry pieces behind one
//! facade. Callers ask for a [`DeliveryPlan`] per message, execute the send
//! themselves, and report the [`SendOutcome`] back; the orchestrator keeps
//! every counter and scheduler consistent.

mod error;
mod plan;

pub use error::EngineError;
pub use plan::{DeliveryPlan, OutboundMessage, OutcomeDisposition, SendOutcome};

use dashmap::{DashMap, DashSet};
use serde::Serialize;
use std::sync::Arc;

use crate::config::{EngineConfig, RotationSettings};
use crate::pacing::{AdaptiveRateLimiter, CarrierDetector, DelayController};
use crate::registry::{load_servers_from_config, ServerKind, ServerRegistry, ServerView};
use crate::retry::{RetryDecision, RetryScheduler, RetryStats};
use crate::rotation::{RotationSelector, SelectionContext};
use crate::usage::{RotationSession, UsageLogger, UsageStat};

/// Rotation state snapshot for one user, for the stats surface.
#[derive(Debug, Clone, Serialize)]
pub struct RotationStats {
    pub user_id: String,
    pub proxy_cursor: u64,
    pub relay_cursor: u64,
    pub proxies: Vec<ServerView>,
    pub relays: Vec<ServerView>,
}

/// The delivery orchestrator.
///
/// Cheap to share behind an `Arc`; all interior state is concurrent.
/// Settings resolve per call as campaign override, then user settings, then
/// engine defaults, and the resolved snapshot never changes mid-message.
#[derive(Debug)]
pub struct DeliveryOrchestrator {
    registry: Arc<ServerRegistry>,
    selector: RotationSelector,
    usage: Arc<UsageLogger>,
    delays: DelayController,
    carriers: CarrierDetector,
    limiter: AdaptiveRateLimiter,
    retries: RetryScheduler,
    defaults: RotationSettings,
    user_settings: DashMap<String, RotationSettings>,
    campaign_overrides: DashMap<String, RotationSettings>,
    paused: DashSet<String>,
}

impl DeliveryOrchestrator {
    /// Build an orchestrator from validated config, loading the static pools.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let registry = Arc::new(ServerRegistry::with_failure_threshold(
            config.health_check.failure_threshold,
        ));
        let added = load_servers_from_config(config, &registry)?;
        tracing::info!(servers = added, "Loaded server pools");

        Ok(Self {
            registry,
            selector: RotationSelector::new(),
            usage: Arc::new(UsageLogger::with_window_size(
                config.rate_limit.carrier_window_size,
            )),
            delays: DelayController::new(),
            carriers: CarrierDetector::new(),
            limiter: AdaptiveRateLimiter::new(config.rate_limit.clone()),
            retries: RetryScheduler::new(config.retry.clone()),
            defaults: config.rotation.clone(),
            user_settings: DashMap::new(),
            campaign_overrides: DashMap::new(),
            paused: DashSet::new(),
        })
    }

    /// The shared registry, for wiring up the health checker.
    pub fn registry(&self) -> Arc<ServerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Store per-user rotation settings. Settings are validated the same way
    /// the engine defaults are.
    pub fn set_user_settings(
        &self,
        user_id: &str,
        settings: RotationSettings,
    ) -> Result<(), EngineError> {
        settings.validate()?;
        self.user_settings.insert(user_id.to_string(), settings);
        Ok(())
    }

    /// Store a campaign-level settings override.
    pub fn set_campaign_override(
        &self,
        campaign_id: &str,
        settings: RotationSettings,
    ) -> Result<(), EngineError> {
        settings.validate()?;
        self.campaign_overrides
            .insert(campaign_id.to_string(), settings);
        Ok(())
    }

    /// Settings for a call: campaign override, then user, then defaults.
    pub fn resolve_settings(&self, user_id: &str, campaign_id: &str) -> RotationSettings {
        if let Some(settings) = self.campaign_overrides.get(campaign_id) {
            return settings.clone();
        }
        if let Some(settings) = self.user_settings.get(user_id) {
            return settings.clone();
        }
        self.defaults.clone()
    }

    /// Produce the delivery plan for one message.
    ///
    /// Selects a proxy and relay per the resolved settings, draws the
    /// inter-message delay, and attaches carrier, timezone, and throughput
    /// hints. Fails fast when the campaign is paused or a required pool is
    /// empty.
    pub fn prepare_send(
        &self,
        user_id: &str,
        campaign_id: &str,
        message: &OutboundMessage,
    ) -> Result<DeliveryPlan, EngineError> {
        if self.paused.contains(campaign_id) {
            return Err(EngineError::CampaignPaused(campaign_id.to_string()));
        }

        let settings = self.resolve_settings(user_id, campaign_id);
        let ctx = SelectionContext {
            user_id,
            campaign_id,
            usage: &*self.usage,
        };

        let proxy = if settings.proxy_rotation_enabled {
            Some(self.select_from_pool(ServerKind::Proxy, settings.strategy, &ctx)?)
        } else {
            None
        };
        let relay = if settings.smtp_rotation_enabled {
            Some(self.select_from_pool(ServerKind::Relay, settings.strategy, &ctx)?)
        } else {
            None
        };

        let delay_seconds = self.delays.next_delay_seconds(
            campaign_id,
            settings.delay_min_seconds,
            settings.delay_max_seconds,
            settings.delay_seed,
        );

        let (carrier_hint, timezone_hint) = if settings.carrier_optimization_enabled {
            (
                Some(self.carriers.detect_carrier(&message.phone_number)),
                Some(self.carriers.detect_timezone(&message.phone_number)),
            )
        } else {
            (None, None)
        };

        let allowed_rate_per_minute = match (&carrier_hint, settings.adaptive_optimization_enabled)
        {
            (Some(carrier), true) => Some(self.limiter.allowed_rate_per_minute(
                carrier,
                self.limiter.base_rate_per_minute(),
                self.usage.carrier_window(carrier),
            )),
            _ => None,
        };

        tracing::debug!(
            user_id = %user_id,
            campaign_id = %campaign_id,
            message_id = %message.message_id,
            proxy = proxy.as_ref().map(|s| s.id.as_str()),
            relay = relay.as_ref().map(|s| s.id.as_str()),
            delay_seconds,
            "Prepared delivery plan"
        );

        Ok(DeliveryPlan {
            message_id: message.message_id.clone(),
            proxy,
            relay,
            delay_seconds,
            carrier_hint,
            timezone_hint,
            allowed_rate_per_minute,
        })
    }

    /// Record the outcome of an executed send.
    ///
    /// Updates server counters, per-campaign usage, and the carrier window,
    /// then routes failures through the retry scheduler. Counter updates
    /// happen regardless of what the scheduler decides.
    pub fn record_outcome(&self, outcome: &SendOutcome) -> Result<OutcomeDisposition, EngineError> {
        if let Some(proxy_id) = &outcome.proxy_id {
            self.registry
                .record_send_outcome(proxy_id, outcome.success, outcome.response_time_ms)?;
            self.usage.record_outcome(
                &outcome.campaign_id,
                ServerKind::Proxy,
                proxy_id,
                outcome.success,
                outcome.response_time_ms,
            );
        }
        if let Some(relay_id) = &outcome.relay_id {
            self.registry
                .record_send_outcome(relay_id, outcome.success, outcome.response_time_ms)?;
            self.usage.record_outcome(
                &outcome.campaign_id,
                ServerKind::Relay,
                relay_id,
                outcome.success,
                outcome.response_time_ms,
            );
        }
        if let Some(carrier) = &outcome.carrier {
            self.usage.record_carrier_outcome(carrier, outcome.success);
        }

        if outcome.success {
            self.retries.record_success(&outcome.message_id);
            metrics::counter!("rotor_messages_delivered_total").increment(1);
            return Ok(OutcomeDisposition::Delivered);
        }

        // An in-flight send can fail after its campaign was paused; that
        // failure must not re-enter the retry queue the pause just drained.
        if self.paused.contains(&outcome.campaign_id) {
            self.retries
                .record_cancellation(&outcome.message_id, &outcome.campaign_id);
            return Ok(OutcomeDisposition::Cancelled);
        }

        let error_message = outcome.error_message.as_deref().unwrap_or("send failed");
        let decision = self.retries.record_failure(
            &outcome.message_id,
            &outcome.campaign_id,
            error_message,
            outcome.carrier.as_deref(),
        );
        Ok(match decision {
            RetryDecision::Retry {
                attempt,
                delay_seconds,
            } => OutcomeDisposition::RetryScheduled {
                attempt_number: attempt.attempt_number,
                error_type: attempt.error_type,
                delay_seconds,
            },
            RetryDecision::GiveUp {
                error_type,
                attempts_made,
                ..
            } => OutcomeDisposition::PermanentlyFailed {
                error_type,
                attempts_made,
            },
        })
    }

    /// Pause a campaign: future plans are refused and not-yet-due retries
    /// are cancelled. Returns the number of retries cancelled.
    pub fn pause_campaign(&self, campaign_id: &str) -> usize {
        self.paused.insert(campaign_id.to_string());
        let cancelled = self.retries.cancel_campaign(campaign_id);
        tracing::info!(campaign_id = %campaign_id, cancelled, "Campaign paused");
        cancelled
    }

    /// Resume a paused campaign. Cancelled retries stay cancelled; only new
    /// failures schedule new attempts.
    pub fn resume_campaign(&self, campaign_id: &str) {
        if self.paused.remove(campaign_id).is_some() {
            tracing::info!(campaign_id = %campaign_id, "Campaign resumed");
        }
    }

    pub fn is_paused(&self, campaign_id: &str) -> bool {
        self.paused.contains(campaign_id)
    }

    /// Open a buffered usage session for a batch of sends.
    pub fn open_session(&self, user_id: &str, campaign_id: &str) -> RotationSession {
        self.usage.open_session(user_id, campaign_id)
    }

    /// Rotation state for one user: cursor positions plus pool snapshots.
    pub fn rotation_stats(&self, user_id: &str) -> RotationStats {
        RotationStats {
            user_id: user_id.to_string(),
            proxy_cursor: self.selector.cursor_position(user_id, ServerKind::Proxy),
            relay_cursor: self.selector.cursor_position(user_id, ServerKind::Relay),
            proxies: self.registry.get_servers(ServerKind::Proxy),
            relays: self.registry.get_servers(ServerKind::Relay),
        }
    }

    /// Pending-retry summary for a campaign.
    pub fn retry_stats(&self, campaign_id: &str) -> RetryStats {
        self.retries.stats(campaign_id)
    }

    /// Per-server usage rows for a campaign.
    pub fn campaign_usage(&self, campaign_id: &str) -> Vec<UsageStat> {
        self.usage.campaign_stats(campaign_id)
    }

    fn select_from_pool(
        &self,
        kind: ServerKind,
        strategy: crate::rotation::RotationStrategy,
        ctx: &SelectionContext<'_>,
    ) -> Result<ServerView, EngineError> {
        let candidates = self.registry.get_active_healthy_servers(kind);
        self.selector
            .select(&candidates, kind, strategy, ctx)
            .map_err(|_| EngineError::NoServerAvailable { kind })
    }
}
