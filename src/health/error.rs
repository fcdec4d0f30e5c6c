use thiserror::Error;

/// Failure reported by a single health probe.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("probe timed out after {0}s")]
    Timeout(u64),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}
