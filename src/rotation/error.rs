//! Error types for selection failures

use thiserror::Error;

use crate::registry::ServerKind;

/// Errors that can occur during server selection.
///
/// `NoServerAvailable` is a decision value: the caller should defer the
/// message or pause the campaign, never mark it failed.
#[derive(Debug, Clone, Error)]
pub enum RotationError {
    /// Every pool member is inactive or unhealthy
    #[error("no {kind} server available")]
    NoServerAvailable { kind: ServerKind },
}
