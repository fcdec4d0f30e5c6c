use thiserror::Error;

use crate::config::ConfigError;
use crate::registry::{RegistryError, ServerKind};

/// Top-level engine error for orchestration calls.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested pool has no active healthy member.
    #[error("no {kind} server available")]
    NoServerAvailable { kind: ServerKind },

    /// The campaign is paused; no sends may be prepared for it.
    #[error("campaign {0} is paused")]
    CampaignPaused(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
