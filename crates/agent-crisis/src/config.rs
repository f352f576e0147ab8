//! Configuration for the crisis pipeline

use crate::error::{CrisisError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default API base of the visualization frontend
pub const DEFAULT_SINK_API_BASE: &str = "http://localhost:3000/api";

/// Configuration for the crisis pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisConfig {
    /// Directory holding the per-stage fixture files
    pub data_dir: PathBuf,

    /// Whether events are forwarded to the visualization endpoint
    pub sink_enabled: bool,

    /// API base of the visualization endpoint
    pub sink_api_base: String,

    /// Upper bound on a single sink delivery attempt
    pub sink_timeout: Duration,

    /// Buffer size of the in-process event bus
    pub broadcast_capacity: usize,
}

impl Default for CrisisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/crises"),
            sink_enabled: false,
            sink_api_base: DEFAULT_SINK_API_BASE.to_string(),
            sink_timeout: Duration::from_millis(100),
            broadcast_capacity: 1024,
        }
    }
}

impl CrisisConfig {
    /// Create a new configuration builder
    pub fn builder() -> CrisisConfigBuilder {
        CrisisConfigBuilder::default()
    }

    /// Load overrides from `CRISIS_DATA_DIR` and `FRONTEND_API_URL`
    ///
    /// Setting `FRONTEND_API_URL` also turns the HTTP sink on.
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env().build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sink_timeout.is_zero() || self.sink_timeout >= Duration::from_secs(1) {
            return Err(CrisisError::ConfigError(
                "sink_timeout must be greater than 0 and below 1 second".to_string(),
            ));
        }

        if self.broadcast_capacity == 0 {
            return Err(CrisisError::ConfigError(
                "broadcast_capacity must be greater than 0".to_string(),
            ));
        }

        if self.sink_enabled && self.sink_api_base.trim().is_empty() {
            return Err(CrisisError::ConfigError(
                "sink_api_base required when the sink is enabled".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for CrisisConfig
#[derive(Debug, Default)]
pub struct CrisisConfigBuilder {
    data_dir: Option<PathBuf>,
    sink_enabled: Option<bool>,
    sink_api_base: Option<String>,
    sink_timeout: Option<Duration>,
    broadcast_capacity: Option<usize>,
}

impl CrisisConfigBuilder {
    /// Set the fixture directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Enable the HTTP sink against the given API base
    pub fn sink_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.sink_api_base = Some(api_base.into());
        self.sink_enabled = Some(true);
        self
    }

    /// Turn the HTTP sink on or off
    pub fn sink_enabled(mut self, enabled: bool) -> Self {
        self.sink_enabled = Some(enabled);
        self
    }

    /// Set the sink delivery timeout
    pub fn sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = Some(timeout);
        self
    }

    /// Set the in-process bus capacity
    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = Some(capacity);
        self
    }

    /// Pick up `CRISIS_DATA_DIR` and `FRONTEND_API_URL` from the environment
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`with_env`](Self::with_env) over an arbitrary lookup
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("CRISIS_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = lookup("FRONTEND_API_URL").filter(|v| !v.trim().is_empty()) {
            self = self.sink_api_base(url);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<CrisisConfig> {
        let defaults = CrisisConfig::default();

        let config = CrisisConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            sink_enabled: self.sink_enabled.unwrap_or(defaults.sink_enabled),
            sink_api_base: self.sink_api_base.unwrap_or(defaults.sink_api_base),
            sink_timeout: self.sink_timeout.unwrap_or(defaults.sink_timeout),
            broadcast_capacity: self.broadcast_capacity.unwrap_or(defaults.broadcast_capacity),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = CrisisConfig::default();
        assert!(!config.sink_enabled);
        assert_eq!(config.sink_timeout, Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CrisisConfig::builder()
            .data_dir("/tmp/crises")
            .sink_api_base("http://viz:3000/api")
            .sink_timeout(Duration::from_millis(250))
            .build()
            .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/crises"));
        assert!(config.sink_enabled);
        assert_eq!(config.sink_api_base, "http://viz:3000/api");
    }

    #[test]
    fn test_validation_rejects_slow_sink() {
        let result = CrisisConfig::builder()
            .sink_timeout(Duration::from_secs(5))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let config = CrisisConfig {
            broadcast_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CRISIS_DATA_DIR", "/srv/fixtures"),
            ("FRONTEND_API_URL", "http://frontend/api"),
        ]
        .into();

        let config = CrisisConfig::builder()
            .with_lookup(|k| vars.get(k).map(ToString::to_string))
            .build()
            .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/fixtures"));
        assert!(config.sink_enabled);
        assert_eq!(config.sink_api_base, "http://frontend/api");
    }

    #[test]
    fn test_sink_can_be_disabled_after_env() {
        let config = CrisisConfig::builder()
            .with_lookup(|k| (k == "FRONTEND_API_URL").then(|| "http://frontend/api".to_string()))
            .sink_enabled(false)
            .build()
            .unwrap();
        assert!(!config.sink_enabled);
    }
}
