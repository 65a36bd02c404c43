//! Coordinator configuration

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKFILL_ENABLED, DEFAULT_DIAGNOSTICS_CAPACITY, DEFAULT_MIRROR_WRITES,
};
use crate::error::ConfigError;

/// Knobs for a coordinator.
///
/// Every field has a default, so `StrataConfig::default()` reproduces the
/// classic cache-aside behaviour: source results are backfilled and writes
/// are mirrored to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrataConfig {
    /// Buffer of the diagnostic broadcast. Slow subscribers lose the oldest
    /// events beyond this.
    pub diagnostics_capacity: usize,
    /// Write source results of `get` back to the cache.
    pub backfill_enabled: bool,
    /// Mirror successful `set`/`call` results to the cache.
    pub mirror_writes: bool,
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
            backfill_enabled: DEFAULT_BACKFILL_ENABLED,
            mirror_writes: DEFAULT_MIRROR_WRITES,
        }
    }
}

impl StrataConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diagnostics_capacity(mut self, capacity: usize) -> Self {
        self.diagnostics_capacity = capacity;
        self
    }

    pub fn with_backfill(mut self, enabled: bool) -> Self {
        self.backfill_enabled = enabled;
        self
    }

    pub fn with_mirror_writes(mut self, enabled: bool) -> Self {
        self.mirror_writes = enabled;
        self
    }

    /// Load from environment variables, falling back to defaults for unset
    /// or unparseable values:
    ///
    /// - `STRATA_DIAGNOSTICS_CAPACITY`
    /// - `STRATA_BACKFILL_ENABLED`
    /// - `STRATA_MIRROR_WRITES`
    pub fn from_env() -> Result<Self, ConfigError> {
        let diagnostics_capacity = std::env::var("STRATA_DIAGNOSTICS_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DIAGNOSTICS_CAPACITY);

        let backfill_enabled = std::env::var("STRATA_BACKFILL_ENABLED")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(DEFAULT_BACKFILL_ENABLED);

        let mirror_writes = std::env::var("STRATA_MIRROR_WRITES")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(DEFAULT_MIRROR_WRITES);

        let config = Self {
            diagnostics_capacity,
            backfill_enabled,
            mirror_writes,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// The diagnostic broadcast cannot be created with zero capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.diagnostics_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "diagnostics_capacity".to_string(),
                value: self.diagnostics_capacity.to_string(),
                reason: "diagnostics_capacity must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StrataConfig::default();
        assert_eq!(config.diagnostics_capacity, DEFAULT_DIAGNOSTICS_CAPACITY);
        assert!(config.backfill_enabled);
        assert!(config.mirror_writes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = StrataConfig::new()
            .with_diagnostics_capacity(8)
            .with_backfill(false)
            .with_mirror_writes(false);
        assert_eq!(config.diagnostics_capacity, 8);
        assert!(!config.backfill_enabled);
        assert!(!config.mirror_writes);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = StrataConfig::new().with_diagnostics_capacity(0).validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "diagnostics_capacity"
        ));
    }

    #[test]
    fn test_from_env_defaults() {
        // Without environment variables set, should use defaults
        let config = StrataConfig::from_env().expect("defaults are valid");
        assert_eq!(config, StrataConfig::default());
    }
}
