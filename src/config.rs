//! Configuration for the proxy layer

use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment variable selecting the [`MissingEntityPolicy`]
pub const ENV_MISSING_ENTITY: &str = "OUROBOROS_PROXY_MISSING_ENTITY";
/// Environment variable for the initial identity map capacity
pub const ENV_CACHE_CAPACITY: &str = "OUROBOROS_PROXY_CACHE_CAPACITY";
/// Environment variable enabling identity map metrics
pub const ENV_METRICS: &str = "OUROBOROS_PROXY_METRICS";

/// What lazy resolution does when the owning entity is gone from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingEntityPolicy {
    /// Fail with `EntityNotFound`
    #[default]
    Error,
    /// Log a warning and read the relation as null without caching it
    Null,
}

impl fmt::Display for MissingEntityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingEntityPolicy::Error => write!(f, "error"),
            MissingEntityPolicy::Null => write!(f, "null"),
        }
    }
}

impl FromStr for MissingEntityPolicy {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" | "strict" => Ok(MissingEntityPolicy::Error),
            "null" | "lenient" => Ok(MissingEntityPolicy::Null),
            other => Err(ProxyError::ConfigError(format!(
                "unknown missing entity policy: {}",
                other
            ))),
        }
    }
}

/// Configuration shared by a proxy factory and its session cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Behavior when lazy resolution finds no entity
    pub missing_entity_policy: MissingEntityPolicy,

    /// Capacity reserved by a new identity map
    pub initial_capacity: usize,

    /// Count identity map hits and misses
    pub enable_metrics: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            missing_entity_policy: MissingEntityPolicy::Error,
            initial_capacity: 256,
            enable_metrics: true,
        }
    }
}

impl ProxyConfig {
    /// Create a new builder for proxy configuration
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.initial_capacity > MAX_INITIAL_CAPACITY {
            return Err(format!(
                "initial_capacity must not exceed {}",
                MAX_INITIAL_CAPACITY
            ));
        }

        Ok(())
    }

    /// Load configuration from `.env` and the process environment
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut builder = Self::builder();
        if let Some(policy) = env_value(ENV_MISSING_ENTITY) {
            builder = builder.missing_entity_policy(policy.parse()?);
        }
        if let Some(capacity) = env_value(ENV_CACHE_CAPACITY) {
            let capacity = capacity.parse::<usize>().map_err(|e| {
                ProxyError::ConfigError(format!("{}: {}", ENV_CACHE_CAPACITY, e))
            })?;
            builder = builder.initial_capacity(capacity);
        }
        if let Some(metrics) = env_value(ENV_METRICS) {
            builder = builder.enable_metrics(parse_flag(ENV_METRICS, &metrics)?);
        }

        let config = builder.build();
        config.validate().map_err(ProxyError::ConfigError)?;
        Ok(config)
    }
}

const MAX_INITIAL_CAPACITY: usize = 1 << 24;

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ProxyError::ConfigError(format!(
            "{}: expected a boolean, got {}",
            name, other
        ))),
    }
}

/// Builder for proxy configuration
#[derive(Debug, Default)]
pub struct ProxyConfigBuilder {
    missing_entity_policy: Option<MissingEntityPolicy>,
    initial_capacity: Option<usize>,
    enable_metrics: Option<bool>,
}

impl ProxyConfigBuilder {
    /// Set the missing entity policy
    pub fn missing_entity_policy(mut self, policy: MissingEntityPolicy) -> Self {
        self.missing_entity_policy = Some(policy);
        self
    }

    /// Set the initial identity map capacity
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build the proxy configuration
    pub fn build(self) -> ProxyConfig {
        let defaults = ProxyConfig::default();

        ProxyConfig {
            missing_entity_policy: self
                .missing_entity_policy
                .unwrap_or(defaults.missing_entity_policy),
            initial_capacity: self.initial_capacity.unwrap_or(defaults.initial_capacity),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
        }
    }
}

/// Preset configurations
impl ProxyConfig {
    /// Missing entities are errors
    pub fn strict() -> Self {
        Self::default()
    }

    /// Missing entities read as null
    pub fn lenient() -> Self {
        Self {
            missing_entity_policy: MissingEntityPolicy::Null,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.missing_entity_policy, MissingEntityPolicy::Error);
        assert_eq!(config.initial_capacity, 256);
        assert!(config.enable_metrics);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ProxyConfig::builder()
            .missing_entity_policy(MissingEntityPolicy::Null)
            .initial_capacity(16)
            .enable_metrics(false)
            .build();

        assert_eq!(config.missing_entity_policy, MissingEntityPolicy::Null);
        assert_eq!(config.initial_capacity, 16);
        assert!(!config.enable_metrics);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ProxyConfig::default();
        config.initial_capacity = MAX_INITIAL_CAPACITY + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_preset_configs() {
        assert_eq!(ProxyConfig::strict().missing_entity_policy, MissingEntityPolicy::Error);
        assert_eq!(ProxyConfig::lenient().missing_entity_policy, MissingEntityPolicy::Null);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("NULL".parse::<MissingEntityPolicy>().unwrap(), MissingEntityPolicy::Null);
        assert_eq!(" error ".parse::<MissingEntityPolicy>().unwrap(), MissingEntityPolicy::Error);
        assert!("ignore".parse::<MissingEntityPolicy>().is_err());
        assert_eq!(MissingEntityPolicy::Null.to_string(), "null");
    }

    #[test]
    fn test_from_env() {
        std::env::set_var(ENV_MISSING_ENTITY, "null");
        std::env::set_var(ENV_CACHE_CAPACITY, "64");
        std::env::set_var(ENV_METRICS, "off");

        let config = ProxyConfig::from_env().unwrap();
        assert_eq!(config.missing_entity_policy, MissingEntityPolicy::Null);
        assert_eq!(config.initial_capacity, 64);
        assert!(!config.enable_metrics);

        std::env::set_var(ENV_CACHE_CAPACITY, "many");
        assert!(matches!(ProxyConfig::from_env(), Err(ProxyError::ConfigError(_))));

        std::env::remove_var(ENV_MISSING_ENTITY);
        std::env::remove_var(ENV_CACHE_CAPACITY);
        std::env::remove_var(ENV_METRICS);
    }

    #[test]
    fn test_config_serde() {
        let json = serde_json::to_value(ProxyConfig::lenient()).unwrap();
        assert_eq!(json["missing_entity_policy"], "null");

        let parsed: ProxyConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, ProxyConfig::lenient());
    }
}
