//! Server selection module
//!
//! Implements the rotation strategies that pick the next proxy or relay from
//! the healthy pool. Selection is a pure in-memory decision: the selector
//! reads ordered snapshots produced by the registry and per-campaign stats
//! from the usage logger, and never mutates server records.

pub mod error;
pub mod strategies;

pub use error::RotationError;
pub use strategies::RotationStrategy;

use dashmap::DashMap;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::registry::{ServerKind, ServerView};
use crate::usage::UsageLogger;

/// Per-(user, pool) monotonic round-robin cursors.
///
/// `fetch_add` guarantees concurrent callers each observe a distinct,
/// monotonically advancing cursor value, so a full cycle over a stable list
/// selects every server exactly once.
#[derive(Debug, Default)]
pub struct CursorStore {
    cursors: DashMap<(String, ServerKind), AtomicU64>,
}

impl CursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next cursor value for a user/pool pair.
    pub fn next(&self, user_id: &str, kind: ServerKind) -> u64 {
        self.cursors
            .entry((user_id.to_string(), kind))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst)
    }

    /// Current cursor position without advancing it.
    pub fn position(&self, user_id: &str, kind: ServerKind) -> u64 {
        self.cursors
            .get(&(user_id.to_string(), kind))
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

/// Inputs the strategies need beyond the candidate list itself.
pub struct SelectionContext<'a> {
    pub user_id: &'a str,
    pub campaign_id: &'a str,
    pub usage: &'a UsageLogger,
}

/// Picks the next server from an ordered healthy-server list.
#[derive(Debug)]
pub struct RotationSelector {
    cursors: CursorStore,
    /// Minimum per-campaign samples before best-performance trusts a server
    min_samples: u64,
}

impl RotationSelector {
    /// Create a selector with the default best-performance sample floor (5).
    pub fn new() -> Self {
        Self::with_min_samples(5)
    }

    pub fn with_min_samples(min_samples: u64) -> Self {
        Self {
            cursors: CursorStore::new(),
            min_samples,
        }
    }

    /// Cursor position for the stats view.
    pub fn cursor_position(&self, user_id: &str, kind: ServerKind) -> u64 {
        self.cursors.position(user_id, kind)
    }

    /// Select one server of the given kind from the candidates using the
    /// given strategy.
    ///
    /// Candidates must already be filtered to active+healthy servers of
    /// `kind` and carry the registry's stable ordering. An empty list yields
    /// `RotationError::NoServerAvailable` naming that kind.
    pub fn select(
        &self,
        candidates: &[ServerView],
        kind: ServerKind,
        strategy: RotationStrategy,
        ctx: &SelectionContext<'_>,
    ) -> Result<ServerView, RotationError> {
        if candidates.is_empty() {
            return Err(RotationError::NoServerAvailable { kind });
        }

        let selected = match strategy {
            RotationStrategy::RoundRobin => self.select_round_robin(candidates, ctx.user_id, kind),
            RotationStrategy::Random => Self::select_random(candidates),
            RotationStrategy::LeastUsed => Self::select_least_used(candidates),
            RotationStrategy::BestPerformance => {
                self.select_best_performance(candidates, ctx, kind)
            }
        };

        metrics::counter!(
            "rotor_selections_total",
            "strategy" => strategy.to_string(),
            "kind" => kind.to_string()
        )
        .increment(1);

        tracing::debug!(
            user_id = %ctx.user_id,
            campaign_id = %ctx.campaign_id,
            strategy = %strategy,
            server_id = %selected.id,
            "Selected server"
        );
        Ok(selected)
    }

    fn select_round_robin(
        &self,
        candidates: &[ServerView],
        user_id: &str,
        kind: ServerKind,
    ) -> ServerView {
        let cursor = self.cursors.next(user_id, kind);
        let index = (cursor as usize) % candidates.len();
        candidates[index].clone()
    }

    fn select_random(candidates: &[ServerView]) -> ServerView {
        let index = rand::thread_rng().gen_range(0..candidates.len());
        candidates[index].clone()
    }

    /// Fewest lifetime requests wins; ties broken by lowest id. Uses the
    /// registry-level lifetime counter, not per-campaign stats.
    fn select_least_used(candidates: &[ServerView]) -> ServerView {
        candidates
            .iter()
            .min_by(|a, b| {
                a.total_requests
                    .cmp(&b.total_requests)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .cloned()
            .expect("candidates checked non-empty")
    }

    /// Highest per-campaign success rate among servers with enough samples.
    ///
    /// Servers under the sample floor stay eligible only as fallback: when
    /// no candidate qualifies, this call behaves as round-robin (and
    /// advances the shared cursor).
    fn select_best_performance(
        &self,
        candidates: &[ServerView],
        ctx: &SelectionContext<'_>,
        kind: ServerKind,
    ) -> ServerView {
        let mut best: Option<(&ServerView, f64)> = None;
        for candidate in candidates {
            let samples = ctx
                .usage
                .sample_size(ctx.campaign_id, kind, &candidate.id);
            if samples < self.min_samples {
                continue;
            }
            let rate = ctx
                .usage
                .success_rate(ctx.campaign_id, kind, &candidate.id);
            let better = match best {
                None => true,
                Some((current, best_rate)) => {
                    rate > best_rate || (rate == best_rate && candidate.id < current.id)
                }
            };
            if better {
                best = Some((candidate, rate));
            }
        }

        match best {
            Some((server, _)) => server.clone(),
            None => self.select_round_robin(candidates, ctx.user_id, kind),
        }
    }
}

impl Default for RotationSelector {
    fn default() -> Self {
        Self::new()
    }
}
