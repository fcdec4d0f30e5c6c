//! Failure classification.

use serde::{Deserialize, Serialize};

/// Classified send failure.
///
/// Drives retry eligibility and backoff; `Permanent` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Transient network/connection trouble
    Temporary,
    /// Relay rejected our credentials
    Auth,
    /// Carrier or relay throttled us
    RateLimit,
    /// Remote server fault
    Server,
    /// Recipient-level rejection, never retried
    Permanent,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorType::Temporary => write!(f, "temporary"),
            ErrorType::Auth => write!(f, "auth"),
            ErrorType::RateLimit => write!(f, "rate_limit"),
            ErrorType::Server => write!(f, "server"),
            ErrorType::Permanent => write!(f, "permanent"),
        }
    }
}

/// Classify an error message into an [`ErrorType`].
///
/// Pure and deterministic: identical input (case-insensitively) always
/// yields the identical type, which keeps retry decisions idempotent.
/// Matching is keyword-based on the lowercased text; unmapped text defaults
/// to `Server`. The heuristic is approximate and isolated here so
/// a structured SMTP status-code classifier can replace it without touching
/// callers.
pub fn classify(error_message: &str) -> ErrorType {
    let text = error_message.to_lowercase();

    const RATE_LIMIT: &[&str] = &["rate limit", "429", "too many", "throttl"];
    const AUTH: &[&str] = &["auth", "credential", "login", "password", "535"];
    const PERMANENT: &[&str] = &[
        "invalid recipient",
        "blocked",
        "unsubscribed",
        "blacklist",
        "does not exist",
        "no such user",
    ];
    const TEMPORARY: &[&str] = &[
        "timeout",
        "timed out",
        "connection",
        "network",
        "temporar",
        "greylist",
        "try again",
    ];

    if RATE_LIMIT.iter().any(|kw| text.contains(kw)) {
        ErrorType::RateLimit
    } else if AUTH.iter().any(|kw| text.contains(kw)) {
        ErrorType::Auth
    } else if PERMANENT.iter().any(|kw| text.contains(kw)) {
        ErrorType::Permanent
    } else if TEMPORARY.iter().any(|kw| text.contains(kw)) {
        ErrorType::Temporary
    } else {
        ErrorType::Server
    }
}
