//! Configuration types

use crate::{ConfigError, DEFAULT_NOTES_COLUMN};
use serde::{Deserialize, Serialize};

/// Annotation engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Name of the derived column the engine writes into.
    pub notes_column: String,
    /// Treat malformed `{$...}` placeholders as render errors instead of
    /// passing them through as literal text.
    pub strict_placeholders: bool,
    /// Minimum number of rows before a pass fans out across threads.
    /// `0` keeps every pass on the calling thread.
    pub parallel_row_threshold: usize,
    /// Worker threads used by a parallel pass.
    pub worker_threads: usize,
    /// Maximum nesting depth accepted by the condition parser.
    pub max_condition_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            notes_column: DEFAULT_NOTES_COLUMN.to_string(),
            strict_placeholders: false,
            parallel_row_threshold: 512,
            worker_threads: 4,
            max_condition_depth: 64,
        }
    }
}

impl EngineConfig {
    /// Parse from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `SPECNOTES_NOTES_COLUMN`: Derived column name (default: Notes)
    /// - `SPECNOTES_STRICT_PLACEHOLDERS`: `true`/`1` to enable (default: false)
    /// - `SPECNOTES_PARALLEL_ROW_THRESHOLD`: Rows before fan-out (default: 512)
    /// - `SPECNOTES_WORKER_THREADS`: Threads for a parallel pass (default: 4)
    /// - `SPECNOTES_MAX_CONDITION_DEPTH`: Parser nesting bound (default: 64)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            notes_column: std::env::var("SPECNOTES_NOTES_COLUMN")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.notes_column),
            strict_placeholders: std::env::var("SPECNOTES_STRICT_PLACEHOLDERS")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.strict_placeholders),
            parallel_row_threshold: std::env::var("SPECNOTES_PARALLEL_ROW_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.parallel_row_threshold),
            worker_threads: std::env::var("SPECNOTES_WORKER_THREADS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.worker_threads),
            max_condition_depth: std::env::var("SPECNOTES_MAX_CONDITION_DEPTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_condition_depth),
        }
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - notes_column is not blank
    /// - worker_threads >= 1
    /// - max_condition_depth >= 1
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notes_column.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "notes_column".to_string(),
                value: self.notes_column.clone(),
                reason: "notes_column must not be blank".to_string(),
            });
        }

        if self.worker_threads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker_threads".to_string(),
                value: self.worker_threads.to_string(),
                reason: "worker_threads must be at least 1".to_string(),
            });
        }

        if self.max_condition_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_condition_depth".to_string(),
                value: self.max_condition_depth.to_string(),
                reason: "max_condition_depth must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
