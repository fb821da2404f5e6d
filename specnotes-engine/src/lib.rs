//! specnotes Engine - Rule-driven Notes annotation
//!
//! Evaluates an ordered rule set against every row of a table and writes the
//! rendered, numbered output into the row's Notes column. Also provides the
//! recompute policy and an editable sheet session built on top of it.

pub mod engine;
pub mod sheet;
pub mod trigger;

pub use engine::*;
pub use sheet::*;
pub use trigger::*;

pub use specnotes_dsl::{validate, Validation};

use specnotes_core::{RuleSet, Table};
use std::collections::BTreeSet;

/// Full recompute with the default configuration.
pub fn annotate(table: &Table, rules: &RuleSet) -> Table {
    AnnotationEngine::default().annotate(table, rules)
}

/// Recompute only `rows` with the default configuration.
pub fn annotate_rows(table: &Table, rules: &RuleSet, rows: &BTreeSet<usize>) -> Table {
    AnnotationEngine::default().annotate_rows(table, rules, rows)
}
