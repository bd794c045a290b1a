//! Batch execution configuration.
//!
//! [`BatchConfig`] is the caller-facing knob set recognized by the
//! processor: the execution model, dry-run mode, the batch log level, and
//! the reserved `parallel` flag. Configurations are plain serde structs with
//! defaults and an explicit validation pass, and can be parsed from a TOML
//! string.
//!
//! # Examples
//!
//! ```rust
//! use fsynth::config::{BatchConfig, ExecutionModel};
//!
//! let config = BatchConfig {
//!     model: ExecutionModel::Transactional,
//!     ..Default::default()
//! };
//! config.validate().unwrap();
//!
//! let parsed = BatchConfig::from_toml_str(
//!     "model = \"best_effort\"\nlog_level = \"debug\"",
//! ).unwrap();
//! assert_eq!(parsed.model, ExecutionModel::BestEffort);
//! ```

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::{Result, error::FsynthError};

/// How the processor routes per-operation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionModel {
    /// Stop on the first validation or execution error; never roll back.
    #[default]
    Standard,
    /// Validate every operation up front; refuse to execute when any
    /// validation failed (unless forced).
    ValidateFirst,
    /// Report every failure and still drain the whole queue; never roll
    /// back.
    BestEffort,
    /// Stop on the first execution error and undo executed operations in
    /// reverse order.
    Transactional,
}

impl ExecutionModel {
    /// The configuration string for this model.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionModel::Standard => "standard",
            ExecutionModel::ValidateFirst => "validate_first",
            ExecutionModel::BestEffort => "best_effort",
            ExecutionModel::Transactional => "transactional",
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Caller-facing configuration for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Execution model governing error routing
    pub model: ExecutionModel,
    /// Validate only; nothing is executed and `executed_count` counts the
    /// operations that passed validation
    pub dry_run: bool,
    /// Batch log verbosity: one of `trace`, `debug`, `info`, `warn`, `error`
    pub log_level: String,
    /// Re-check source digests immediately before each execution
    pub verify_checksums: bool,
    /// With the validate-first model, execute even when validation failed
    pub force: bool,
    /// Reserved; concurrent execution is not implemented and the only
    /// accepted value is `false`
    pub parallel: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            model: ExecutionModel::Standard,
            dry_run: false,
            log_level: "info".to_string(),
            verify_checksums: false,
            force: false,
            parallel: false,
        }
    }
}

impl BatchConfig {
    /// Check the configuration for values the processor cannot honor.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown log level or for
    /// `parallel = true`.
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(FsynthError::config(format!(
                "unknown log level '{}': expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        if self.parallel {
            return Err(FsynthError::config(
                "parallel execution is reserved and not implemented",
            ));
        }
        Ok(())
    }

    /// Parse a configuration from a TOML string; omitted fields take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the TOML is malformed or the
    /// parsed values fail [`BatchConfig::validate`].
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: BatchConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// The batch log level as a `log` filter. Unknown levels (rejected by
    /// [`BatchConfig::validate`]) fall back to `info`.
    pub fn log_level_filter(&self) -> LevelFilter {
        match self.log_level.as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            _ => LevelFilter::Info,
        }
    }
}
