//! specnotes Core - Data Types
//!
//! Pure data structures shared by the DSL and the annotation engine:
//! typed field values, the table snapshot, rules, errors and configuration.
//! This crate contains no evaluation logic.

pub mod config;
pub mod error;
pub mod rule;
pub mod table;
pub mod value;

pub use config::*;
pub use error::*;
pub use rule::*;
pub use table::*;
pub use value::*;

/// Name of the derived column when no configuration overrides it.
pub const DEFAULT_NOTES_COLUMN: &str = "Notes";

/// Columns of a freshly created piping notes sheet, Notes last.
pub const DEFAULT_COLUMNS: [&str; 6] = [
    "TagNumber",
    "lineNumber",
    "boltAndNutMaterial",
    "sour",
    "toxic",
    DEFAULT_NOTES_COLUMN,
];
