//! Rotation strategies for server selection

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Rotation strategy determines how the next server is picked from the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    /// Cycle through the pool with a per-user cursor
    #[default]
    RoundRobin,

    /// Uniform random pick, no state
    Random,

    /// Server with the fewest lifetime requests, ties broken by lowest id
    LeastUsed,

    /// Server with the best per-campaign success rate; falls back to
    /// round-robin when no server has enough samples
    BestPerformance,
}

impl FromStr for RotationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "round_robin" => Ok(RotationStrategy::RoundRobin),
            "random" => Ok(RotationStrategy::Random),
            "least_used" => Ok(RotationStrategy::LeastUsed),
            "best_performance" => Ok(RotationStrategy::BestPerformance),
            _ => Err(format!("Unknown rotation strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for RotationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationStrategy::RoundRobin => write!(f, "round_robin"),
            RotationStrategy::Random => write!(f, "random"),
            RotationStrategy::LeastUsed => write!(f, "least_used"),
            RotationStrategy::BestPerformance => write!(f, "best_performance"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_strategy_default_is_round_robin() {
        assert_eq!(RotationStrategy::default(), RotationStrategy::RoundRobin);
    }

    #[test]
    fn rotation_strategy_from_str() {
        assert_eq!(
            "round_robin".parse::<RotationStrategy>().unwrap(),
            RotationStrategy::RoundRobin
        );
        assert_eq!(
            "random".parse::<RotationStrategy>().unwrap(),
            RotationStrategy::Random
        );
        assert_eq!(
            "least_used".parse::<RotationStrategy>().unwrap(),
            RotationStrategy::LeastUsed
        );
        assert_eq!(
            "best_performance".parse::<RotationStrategy>().unwrap(),
            RotationStrategy::BestPerformance
        );
    }

    #[test]
    fn rotation_strategy_from_str_case_insensitive() {
        assert_eq!(
            "Round_Robin".parse::<RotationStrategy>().unwrap(),
            RotationStrategy::RoundRobin
        );
        assert_eq!(
            "RANDOM".parse::<RotationStrategy>().unwrap(),
            RotationStrategy::Random
        );
    }

    #[test]
    fn rotation_strategy_from_str_invalid() {
        assert!("invalid".parse::<RotationStrategy>().is_err());
    }

    #[test]
    fn rotation_strategy_serde() {
        let json = serde_json::to_string(&RotationStrategy::BestPerformance).unwrap();
        assert_eq!(json, "\"best_performance\"");
    }
}
