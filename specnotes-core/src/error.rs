//! Error types for specnotes operations

use thiserror::Error;

/// Structural table errors raised by table edits.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("Duplicate column name: {name}")]
    DuplicateColumn { name: String },

    #[error("Column name must not be empty")]
    EmptyColumnName,

    #[error("Unknown column: {name}")]
    UnknownColumn { name: String },

    #[error("Column index {index} out of bounds for {len} columns")]
    ColumnOutOfBounds { index: usize, len: usize },

    #[error("Row index {index} out of bounds for {len} rows")]
    RowOutOfBounds { index: usize, len: usize },

    #[error("Column {name} is derived and cannot be renamed or removed")]
    NotesColumnLocked { name: String },
}

/// Failure while annotating a single row. The row keeps its prior Notes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("Row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row} aborted: {message}")]
    Aborted { row: usize, message: String },
}

/// Failure while rendering one rule's template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Unterminated placeholder at byte {offset}")]
    UnterminatedPlaceholder { offset: usize },

    #[error("Invalid placeholder {text} at byte {offset}")]
    InvalidPlaceholder { offset: usize, text: String },

    #[error("Template rendering aborted: {message}")]
    Aborted { message: String },
}

/// Rule set editing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleSetError {
    #[error("Rule index {index} out of bounds for {len} rules")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Invalid rule set document: {reason}")]
    InvalidDocument { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Master error type for all specnotes errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpecNotesError {
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Row error: {0}")]
    Row(#[from] RowError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Rule set error: {0}")]
    RuleSet(#[from] RuleSetError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for specnotes operations.
pub type SpecNotesResult<T> = Result<T, SpecNotesError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_error_display_duplicate_column() {
        let err = TableError::DuplicateColumn {
            name: "sour".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Duplicate column"));
        assert!(msg.contains("sour"));
    }

    #[test]
    fn test_row_error_display_ragged() {
        let err = RowError::Ragged {
            row: 4,
            expected: 6,
            found: 5,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Row 4"));
        assert!(msg.contains("5 cells"));
        assert!(msg.contains("expected 6"));
    }

    #[test]
    fn test_render_error_display_unterminated() {
        let err = RenderError::UnterminatedPlaceholder { offset: 12 };
        let msg = format!("{}", err);
        assert!(msg.contains("Unterminated placeholder"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "worker_threads".to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("worker_threads"));
        assert!(msg.contains("must be at least 1"));
    }

    #[test]
    fn test_specnotes_error_from_variants() {
        let table = SpecNotesError::from(TableError::EmptyColumnName);
        assert!(matches!(table, SpecNotesError::Table(_)));

        let row = SpecNotesError::from(RowError::Aborted {
            row: 0,
            message: "boom".to_string(),
        });
        assert!(matches!(row, SpecNotesError::Row(_)));

        let render = SpecNotesError::from(RenderError::Aborted {
            message: "boom".to_string(),
        });
        assert!(matches!(render, SpecNotesError::Render(_)));

        let rules = SpecNotesError::from(RuleSetError::IndexOutOfBounds { index: 3, len: 1 });
        assert!(matches!(rules, SpecNotesError::RuleSet(_)));

        let config = SpecNotesError::from(ConfigError::Parse {
            reason: "bad toml".to_string(),
        });
        assert!(matches!(config, SpecNotesError::Config(_)));
    }
}
