//! Configuration loading and typed config structures for the Heatwatch
//! simulation.
//!
//! The canonical configuration lives in `heatwatch-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror
//! the YAML structure, and provides a loader that reads and validates the
//! file.

use std::path::Path;

use serde::Deserialize;

use crate::bounds::VitalBounds;
use crate::signal::SignalConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `heatwatch-config.yaml`. All fields have
/// defaults matching the documented dashboard behavior.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Tick cadence, step ceiling, and oracle error budgets.
    #[serde(default)]
    pub simulation: SimBoundsConfig,

    /// Physiological clamp ranges.
    #[serde(default)]
    pub bounds: VitalBounds,

    /// Per-mode signal rate tables.
    #[serde(default)]
    pub signal: SignalConfig,

    /// Risk oracle connection settings.
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Worker roster seeding.
    #[serde(default)]
    pub roster: RosterConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// The `ORACLE_URL` environment variable overrides
    /// `oracle.base_url`, so deployments can point at a different
    /// prediction service without editing the YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.oracle.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.oracle.apply_env_overrides();
        Ok(config)
    }
}

/// Tick cadence, step ceiling, and oracle error budgets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimBoundsConfig {
    /// Real-time milliseconds per tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Global step ceiling. Always enforced; a run never outlives it.
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,

    /// Consecutive oracle failures that end a run.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Total oracle failures over a run that end it.
    #[serde(default = "default_max_total_failures")]
    pub max_total_failures: u32,
}

impl Default for SimBoundsConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_steps: default_max_steps(),
            max_consecutive_failures: default_max_consecutive_failures(),
            max_total_failures: default_max_total_failures(),
        }
    }
}

/// Risk oracle connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OracleConfig {
    /// Base URL of the prediction service.
    #[serde(default = "default_oracle_base_url")]
    pub base_url: String,

    /// Hard request timeout in milliseconds. A slow oracle is a failed
    /// call, never a hung tick.
    #[serde(default = "default_oracle_timeout_ms")]
    pub timeout_ms: u64,
}

impl OracleConfig {
    /// Override the oracle base URL with the `ORACLE_URL` environment
    /// variable when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ORACLE_URL") {
            self.base_url = val;
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: default_oracle_base_url(),
            timeout_ms: default_oracle_timeout_ms(),
        }
    }
}

/// Worker roster seeding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterConfig {
    /// Number of workers to seed the registry with at startup.
    #[serde(default = "default_initial_workers")]
    pub initial_workers: u32,

    /// Random seed for reproducible baseline generation.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            initial_workers: default_initial_workers(),
            seed: default_seed(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_tick_interval_ms() -> u64 {
    500
}

const fn default_max_steps() -> u64 {
    240
}

const fn default_max_consecutive_failures() -> u32 {
    3
}

const fn default_max_total_failures() -> u32 {
    10
}

fn default_oracle_base_url() -> String {
    "http://localhost:8500".to_owned()
}

const fn default_oracle_timeout_ms() -> u64 {
    30_000
}

const fn default_initial_workers() -> u32 {
    6
}

const fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_owned()
}
