//! Retry scheduling module
//!
//! Classifies send failures and schedules bounded, backoff-delayed retries.
//! Classification and eligibility are computed locally and never throw; the
//! scheduler returns decision values the task runner acts on.

mod classify;

pub use classify::{classify, ErrorType};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::RetryConfig;

/// One scheduled retry for a message.
#[derive(Debug, Clone, Serialize)]
pub struct RetryAttempt {
    pub id: Uuid,
    pub message_id: String,
    /// 1-based, strictly increasing per message
    pub attempt_number: u32,
    pub error_type: ErrorType,
    pub scheduled_at: DateTime<Utc>,
    pub delay_seconds: f64,
    pub completed: bool,
}

/// Delivery state of one message as the scheduler sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    /// Awaiting its first (or next) send attempt
    Pending,
    /// A retry is scheduled
    Retrying,
    /// Campaign was cancelled before the retry came due
    Cancelled,
    /// Exhausted retries or hit a permanent error
    PermanentlyFailed,
}

#[derive(Debug)]
struct MessageRetryState {
    campaign_id: String,
    state: MessageState,
    attempts: Vec<RetryAttempt>,
}

/// Outcome of recording a failure: retry scheduled, or terminal.
#[derive(Debug, Clone)]
pub enum RetryDecision {
    /// A retry was scheduled; exactly one new pending attempt exists.
    Retry {
        attempt: RetryAttempt,
        delay_seconds: f64,
    },
    /// The message is permanently failed.
    GiveUp {
        error_type: ErrorType,
        attempts_made: u32,
        reason: GiveUpReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// Classification says retrying can never succeed
    PermanentError,
    /// The error type's retry budget is spent
    RetriesExhausted,
}

/// Pending-retry summary for the dashboard layer.
#[derive(Debug, Clone, Serialize)]
pub struct RetryStats {
    pub pending_retries: u64,
    pub retries_by_error_type: HashMap<String, u64>,
    pub permanently_failed: u64,
}

/// Per-message retry state machine with bounded exponential backoff.
///
/// Invariants: attempt numbers are strictly increasing and bounded by the
/// error type's budget, and at most one pending (uncompleted) attempt exists
/// per message at any time.
#[derive(Debug)]
pub struct RetryScheduler {
    config: RetryConfig,
    messages: DashMap<String, MessageRetryState>,
}

impl RetryScheduler {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            messages: DashMap::new(),
        }
    }

    /// Retry budget for an error type.
    pub fn max_retries_for(&self, error_type: ErrorType) -> u32 {
        match error_type {
            ErrorType::Temporary => self.config.max_retries_temporary,
            ErrorType::Auth => self.config.max_retries_auth,
            ErrorType::RateLimit => self.config.max_retries_rate_limit,
            ErrorType::Server => self.config.max_retries_server,
            ErrorType::Permanent => 0,
        }
    }

    /// Whether `attempt_number` is still within the budget.
    ///
    /// Never true for `Permanent`, for any attempt number.
    pub fn should_retry(&self, error_type: ErrorType, attempt_number: u32) -> bool {
        match error_type {
            ErrorType::Permanent => false,
            _ => attempt_number <= self.max_retries_for(error_type),
        }
    }

    /// Backoff delay in seconds for a given attempt.
    ///
    /// `base * 2^(attempt-1)`, scaled by the carrier's configured
    /// multiplier, capped at the maximum, then jittered ±20% (when enabled)
    /// so a burst of failures doesn't retry in lockstep. The delay depends
    /// only on the attempt number and carrier; error types differ in their
    /// budgets, not their curve.
    pub fn retry_delay_seconds(&self, attempt_number: u32, carrier: Option<&str>) -> f64 {
        let multiplier = carrier
            .and_then(|c| self.config.carrier_backoff_multipliers.get(c))
            .copied()
            .unwrap_or(1.0);
        let exponent = attempt_number.saturating_sub(1).min(30);
        let raw = self.config.base_delay_seconds * multiplier * f64::from(1u32 << exponent);
        let capped = raw.min(self.config.max_delay_seconds);

        if self.config.jitter {
            let factor = rand::thread_rng().gen_range(0.8..=1.2);
            (capped * factor).max(0.0)
        } else {
            capped
        }
    }

    /// Record a send failure and decide whether to retry.
    ///
    /// Completes any previously pending attempt (the failure being recorded
    /// is its outcome), then either schedules exactly one new attempt or
    /// marks the message permanently failed.
    pub fn record_failure(
        &self,
        message_id: &str,
        campaign_id: &str,
        error_message: &str,
        carrier: Option<&str>,
    ) -> RetryDecision {
        let error_type = classify(error_message);
        let mut entry = self
            .messages
            .entry(message_id.to_string())
            .or_insert_with(|| MessageRetryState {
                campaign_id: campaign_id.to_string(),
                state: MessageState::Pending,
                attempts: Vec::new(),
            });

        if let Some(last) = entry.attempts.last_mut() {
            last.completed = true;
        }
        let attempts_made = entry.attempts.len() as u32;
        let next_attempt = attempts_made + 1;

        if error_type == ErrorType::Permanent {
            entry.state = MessageState::PermanentlyFailed;
            metrics::counter!("rotor_messages_failed_total", "reason" => "permanent")
                .increment(1);
            tracing::info!(
                message_id = %message_id,
                campaign_id = %campaign_id,
                error = %error_message,
                "Message permanently failed"
            );
            return RetryDecision::GiveUp {
                error_type,
                attempts_made,
                reason: GiveUpReason::PermanentError,
            };
        }

        if !self.should_retry(error_type, next_attempt) {
            entry.state = MessageState::PermanentlyFailed;
            metrics::counter!("rotor_messages_failed_total", "reason" => "exhausted")
                .increment(1);
            tracing::info!(
                message_id = %message_id,
                campaign_id = %campaign_id,
                error_type = %error_type,
                attempts = attempts_made,
                "Retries exhausted"
            );
            return RetryDecision::GiveUp {
                error_type,
                attempts_made,
                reason: GiveUpReason::RetriesExhausted,
            };
        }

        let delay_seconds = self.retry_delay_seconds(next_attempt, carrier);
        let attempt = RetryAttempt {
            id: Uuid::new_v4(),
            message_id: message_id.to_string(),
            attempt_number: next_attempt,
            error_type,
            scheduled_at: Utc::now() + Duration::milliseconds((delay_seconds * 1000.0) as i64),
            delay_seconds,
            completed: false,
        };
        entry.attempts.push(attempt.clone());
        entry.state = MessageState::Retrying;

        metrics::counter!("rotor_retries_scheduled_total", "error_type" => error_type.to_string())
            .increment(1);
        tracing::debug!(
            message_id = %message_id,
            attempt = next_attempt,
            error_type = %error_type,
            delay_seconds,
            "Retry scheduled"
        );
        RetryDecision::Retry {
            attempt,
            delay_seconds,
        }
    }

    /// Record a successful send, completing any pending attempt.
    pub fn record_success(&self, message_id: &str) {
        if let Some((_, mut state)) = self.messages.remove(message_id) {
            if let Some(last) = state.attempts.last_mut() {
                last.completed = true;
            }
        }
    }

    /// Record a failure for a message whose campaign is no longer running.
    ///
    /// Completes any pending attempt and marks the message cancelled
    /// without scheduling a new one, so an in-flight outcome reported after
    /// cancellation cannot resurrect the retry queue.
    pub fn record_cancellation(&self, message_id: &str, campaign_id: &str) {
        let mut entry = self
            .messages
            .entry(message_id.to_string())
            .or_insert_with(|| MessageRetryState {
                campaign_id: campaign_id.to_string(),
                state: MessageState::Pending,
                attempts: Vec::new(),
            });
        if let Some(last) = entry.attempts.last_mut() {
            last.completed = true;
        }
        entry.state = MessageState::Cancelled;
        tracing::debug!(
            message_id = %message_id,
            campaign_id = %campaign_id,
            "Dropped failure outcome for cancelled campaign"
        );
    }

    /// Cancel not-yet-due retries for a campaign.
    ///
    /// Attempts already past their scheduled time are left to run their last
    /// attempt (at-most-one-more semantics); only future ones are dropped.
    /// Returns the number of attempts cancelled.
    pub fn cancel_campaign(&self, campaign_id: &str) -> usize {
        let now = Utc::now();
        let mut cancelled = 0;
        for mut entry in self.messages.iter_mut() {
            if entry.campaign_id != campaign_id || entry.state != MessageState::Retrying {
                continue;
            }
            let not_yet_due = entry
                .attempts
                .last()
                .map(|a| !a.completed && a.scheduled_at > now)
                .unwrap_or(false);
            if not_yet_due {
                if let Some(last) = entry.attempts.last_mut() {
                    last.completed = true;
                }
                entry.state = MessageState::Cancelled;
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            tracing::info!(campaign_id = %campaign_id, cancelled, "Cancelled pending retries");
        }
        cancelled
    }

    /// Current state of a message, if the scheduler has seen it fail.
    pub fn message_state(&self, message_id: &str) -> Option<MessageState> {
        self.messages.get(message_id).map(|entry| entry.state)
    }

    /// Pending-retry summary for a campaign.
    pub fn stats(&self, campaign_id: &str) -> RetryStats {
        let mut pending = 0u64;
        let mut by_type: HashMap<String, u64> = HashMap::new();
        let mut failed = 0u64;

        for entry in self.messages.iter() {
            if entry.campaign_id != campaign_id {
                continue;
            }
            match entry.state {
                MessageState::Retrying => {
                    if let Some(last) = entry.attempts.last() {
                        if !last.completed {
                            pending += 1;
                            *by_type.entry(last.error_type.to_string()).or_insert(0) += 1;
                        }
                    }
                }
                MessageState::PermanentlyFailed => failed += 1,
                _ => {}
            }
        }

        RetryStats {
            pending_retries: pending,
            retries_by_error_type: by_type,
            permanently_failed: failed,
        }
    }
}
