//! Configuration module for the rotation engine
//!
//! Provides layered configuration loading from files, environment variables,
//! and defaults.
//!
//! # Configuration Precedence
//!
//! 1. Environment variables (`ROTOR_*`)
//! 2. Configuration file (TOML)
//! 3. Default values
//!
//! # Example
//!
//! ```rust
//! use rotor::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! assert_eq!(config.health_check.interval_seconds, 30);
//!
//! let toml = r#"
//! [rotation]
//! strategy = "least_used"
//! "#;
//! let config: EngineConfig = toml::from_str(toml).unwrap();
//! ```

pub mod error;
pub mod health_check;
pub mod logging;
pub mod rate_limit;
pub mod retry;
pub mod rotation;
pub mod server;

pub use error::ConfigError;
pub use health_check::HealthCheckConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use rate_limit::RateLimitConfig;
pub use retry::RetryConfig;
pub use rotation::RotationSettings;
pub use server::ServerConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the rotation engine.
///
/// Aggregates rotation defaults, health probing, retry policy, adaptive
/// rate limiting, logging, and the static proxy/relay pools.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Default rotation settings (per-user overrides are applied at runtime)
    pub rotation: RotationSettings,
    /// Health probe configuration
    pub health_check: HealthCheckConfig,
    /// Retry and backoff policy
    pub retry: RetryConfig,
    /// Adaptive rate limiting
    pub rate_limit: RateLimitConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Static proxy pool
    pub proxies: Vec<ServerConfig>,
    /// Static SMTP relay pool
    pub relays: Vec<ServerConfig>,
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports ROTOR_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("ROTOR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("ROTOR_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }
        if let Ok(strategy) = std::env::var("ROTOR_STRATEGY") {
            if let Ok(s) = strategy.parse() {
                self.rotation.strategy = s;
            }
        }
        if let Ok(health) = std::env::var("ROTOR_HEALTH_CHECK") {
            self.health_check.enabled = health.to_lowercase() == "true";
        }
        self
    }

    /// Validate configuration, failing fast with the offending field named.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rotation.validate()?;

        if self.health_check.interval_seconds == 0 {
            return Err(ConfigError::Validation {
                field: "health_check.interval_seconds".to_string(),
                message: "interval must be non-zero".to_string(),
            });
        }

        if !self.retry.base_delay_seconds.is_finite() || self.retry.base_delay_seconds <= 0.0 {
            return Err(ConfigError::Validation {
                field: "retry.base_delay_seconds".to_string(),
                message: "base delay must be a finite positive number".to_string(),
            });
        }
        if !self.retry.max_delay_seconds.is_finite()
            || self.retry.max_delay_seconds < self.retry.base_delay_seconds
        {
            return Err(ConfigError::Validation {
                field: "retry.max_delay_seconds".to_string(),
                message: "cap must be finite and at least the base delay".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.rate_limit.low_water_mark)
            || !(0.0..=1.0).contains(&self.rate_limit.high_water_mark)
        {
            return Err(ConfigError::Validation {
                field: "rate_limit.low_water_mark".to_string(),
                message: "water marks must be within [0, 1]".to_string(),
            });
        }
        if self.rate_limit.low_water_mark > self.rate_limit.high_water_mark {
            return Err(ConfigError::Validation {
                field: "rate_limit.high_water_mark".to_string(),
                message: "high water mark must be at or above the low water mark".to_string(),
            });
        }
        if !self.rate_limit.base_rate_per_minute.is_finite()
            || self.rate_limit.base_rate_per_minute <= 0.0
        {
            return Err(ConfigError::Validation {
                field: "rate_limit.base_rate_per_minute".to_string(),
                message: "base rate must be a finite positive number".to_string(),
            });
        }
        if !self.rate_limit.floor_per_minute.is_finite() || self.rate_limit.floor_per_minute < 0.0 {
            return Err(ConfigError::Validation {
                field: "rate_limit.floor_per_minute".to_string(),
                message: "floor must be a finite non-negative number".to_string(),
            });
        }
        if !self.rate_limit.ceiling_multiplier.is_finite()
            || self.rate_limit.ceiling_multiplier < 1.0
        {
            return Err(ConfigError::Validation {
                field: "rate_limit.ceiling_multiplier".to_string(),
                message: "ceiling multiplier must be finite and at least 1.0".to_string(),
            });
        }
        if self.rate_limit.carrier_window_size == 0 {
            return Err(ConfigError::Validation {
                field: "rate_limit.carrier_window_size".to_string(),
                message: "window size must be non-zero".to_string(),
            });
        }

        for (i, server) in self.proxies.iter().enumerate() {
            validate_server(server, &format!("proxies[{}]", i))?;
        }
        for (i, server) in self.relays.iter().enumerate() {
            validate_server(server, &format!("relays[{}]", i))?;
        }

        Ok(())
    }
}

fn validate_server(server: &ServerConfig, field: &str) -> Result<(), ConfigError> {
    if server.host.is_empty() {
        return Err(ConfigError::Validation {
            field: format!("{}.host", field),
            message: "host cannot be empty".to_string(),
        });
    }
    if server.port == 0 {
        return Err(ConfigError::Validation {
            field: format!("{}.port", field),
            message: "port must be non-zero".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert!(config.health_check.enabled);
        assert!(config.proxies.is_empty());
        assert!(config.relays.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_minimal_toml() {
        let toml = r#"
        [rotation]
        delay_min_seconds = 2.0
        "#;

        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.rotation.delay_min_seconds, 2.0);
        assert_eq!(config.rotation.delay_max_seconds, 5.0); // Default
    }

    #[test]
    fn test_config_parse_server_arrays() {
        let toml = r#"
        [[proxies]]
        host = "10.0.0.1"
        port = 1080
        protocol = "socks5"

        [[relays]]
        name = "relay-east"
        host = "relay1.example.net"
        port = 587

        [[relays]]
        host = "relay2.example.net"
        port = 587
        active = false
        "#;

        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.proxies.len(), 1);
        assert_eq!(config.relays.len(), 2);
        assert!(!config.relays[1].active);
    }

    #[test]
    fn test_config_load_from_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[health_check]\ninterval_seconds = 60").unwrap();

        let config = EngineConfig::load(Some(temp.path())).unwrap();
        assert_eq!(config.health_check.interval_seconds, 60);
    }

    #[test]
    fn test_config_missing_file_error() {
        let result = EngineConfig::load(Some(Path::new("/nonexistent/rotor.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_config_env_override_log_level() {
        std::env::set_var("ROTOR_LOG_LEVEL", "debug");
        let config = EngineConfig::default().with_env_overrides();
        std::env::remove_var("ROTOR_LOG_LEVEL");

        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_env_override_strategy() {
        std::env::set_var("ROTOR_STRATEGY", "least_used");
        let config = EngineConfig::default().with_env_overrides();
        std::env::remove_var("ROTOR_STRATEGY");

        assert_eq!(
            config.rotation.strategy,
            crate::rotation::RotationStrategy::LeastUsed
        );
    }

    #[test]
    fn test_config_env_invalid_value_ignored() {
        std::env::set_var("ROTOR_STRATEGY", "not-a-strategy");
        let config = EngineConfig::default().with_env_overrides();
        std::env::remove_var("ROTOR_STRATEGY");

        assert_eq!(
            config.rotation.strategy,
            crate::rotation::RotationStrategy::RoundRobin
        );
    }

    #[test]
    fn test_config_validation_empty_host() {
        let mut config = EngineConfig::default();
        config.relays.push(ServerConfig {
            name: None,
            host: String::new(),
            port: 587,
            protocol: None,
            username: None,
            password: None,
            active: true,
        });

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. }
            if field == "relays[0].host"));
    }

    #[test]
    fn test_config_validation_water_mark_order() {
        let mut config = EngineConfig::default();
        config.rate_limit.low_water_mark = 0.99;
        config.rate_limit.high_water_mark = 0.90;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_non_finite_floats() {
        let mut config = EngineConfig::default();
        config.retry.base_delay_seconds = f64::NAN;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. }
            if field == "retry.base_delay_seconds"));

        let mut config = EngineConfig::default();
        config.retry.max_delay_seconds = f64::NAN;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. }
            if field == "retry.max_delay_seconds"));

        let mut config = EngineConfig::default();
        config.rate_limit.base_rate_per_minute = f64::INFINITY;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. }
            if field == "rate_limit.base_rate_per_minute"));

        let mut config = EngineConfig::default();
        config.rate_limit.ceiling_multiplier = f64::NAN;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. }
            if field == "rate_limit.ceiling_multiplier"));
    }

    #[test]
    fn test_config_round_trip() {
        let config = EngineConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.rotation, config.rotation);
        assert_eq!(parsed.health_check, config.health_check);
    }
}
