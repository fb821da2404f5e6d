//! Editable notes sheet
//!
//! Owns a table and its rule set, records every edit with the recompute
//! trigger, and runs full or partial passes on demand. Results computed
//! elsewhere from a [`NotesSheet::snapshot`] are accepted only while the
//! sheet is unchanged since that snapshot.

use crate::engine::{AnnotationEngine, AnnotationReport};
use crate::trigger::{RecomputeEvent, RecomputeScope, RecomputeTrigger};
use specnotes_core::{
    EngineConfig, Rule, RuleSet, SpecNotesResult, Table, TableError, DEFAULT_COLUMNS,
    DEFAULT_NOTES_COLUMN,
};
use specnotes_dsl::{unresolved_placeholders, validate_with_depth, Validation};
use std::collections::BTreeSet;

/// Everything an off-thread annotation pass needs.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationJob {
    pub table: Table,
    pub rules: RuleSet,
    pub generation: u64,
}

impl AnnotationJob {
    /// Run a full pass over the snapshot.
    pub fn run(&self, engine: &AnnotationEngine) -> Table {
        engine.annotate(&self.table, &self.rules)
    }
}

/// Authoring feedback for one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDiagnostic {
    pub index: usize,
    pub validation: Validation,
    /// Placeholders in the template that name no column.
    pub unresolved_placeholders: Vec<String>,
}

/// A table, its rules, and the pending recompute.
#[derive(Debug, Clone)]
pub struct NotesSheet {
    table: Table,
    rules: RuleSet,
    engine: AnnotationEngine,
    trigger: RecomputeTrigger,
    generation: u64,
    last_report: Option<AnnotationReport>,
}

impl NotesSheet {
    /// Create a sheet. The first [`NotesSheet::recompute`] is a full pass.
    pub fn new(table: Table, rules: RuleSet, config: EngineConfig) -> SpecNotesResult<Self> {
        let engine = AnnotationEngine::new(config)?;
        let mut trigger = RecomputeTrigger::new();
        trigger.record(RecomputeEvent::RuleSetChanged);
        Ok(Self {
            table,
            rules,
            engine,
            trigger,
            generation: 0,
            last_report: None,
        })
    }

    /// A sheet with the default piping columns, `rows` empty rows and no
    /// rules.
    pub fn blank(rows: usize, config: EngineConfig) -> SpecNotesResult<Self> {
        let columns: Vec<String> = DEFAULT_COLUMNS
            .iter()
            .map(|c| {
                if *c == DEFAULT_NOTES_COLUMN {
                    config.notes_column.clone()
                } else {
                    c.to_string()
                }
            })
            .collect();
        let table = Table::blank(columns, rows)?;
        Self::new(table, RuleSet::new(), config)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn engine(&self) -> &AnnotationEngine {
        &self.engine
    }

    /// Bumped by every edit.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending(&self) -> &RecomputeScope {
        self.trigger.pending()
    }

    pub fn last_report(&self) -> Option<&AnnotationReport> {
        self.last_report.as_ref()
    }

    pub fn notes_index(&self) -> Option<usize> {
        self.table.column_index(&self.engine.config().notes_column)
    }

    fn changed(&mut self, event: Option<RecomputeEvent>) {
        self.generation += 1;
        if let Some(event) = event {
            self.trigger.record(event);
        }
    }

    fn check_not_notes(&self, index: usize) -> Result<(), TableError> {
        if Some(index) == self.notes_index() {
            return Err(TableError::NotesColumnLocked {
                name: self.engine.config().notes_column.clone(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Cell and row edits
    // ========================================================================

    /// Edit one cell. Returns `false` when the value was already there.
    ///
    /// A Notes edit is kept until the next recompute of that row.
    pub fn set_cell(&mut self, row: usize, column: usize, value: impl Into<String>) -> SpecNotesResult<bool> {
        let value = value.into();
        if self.table.cell(row, column) == Some(value.as_str()) {
            return Ok(false);
        }
        self.table.set_cell(row, column, value)?;
        let event = if Some(column) == self.notes_index() {
            None
        } else {
            Some(RecomputeEvent::RowDataChanged(BTreeSet::from([row])))
        };
        self.changed(event);
        Ok(true)
    }

    /// Append `count` empty rows, returning the index of the first.
    pub fn insert_rows(&mut self, count: usize) -> usize {
        let first = self.table.push_blank_rows(count);
        if count > 0 {
            self.changed(Some(RecomputeEvent::RowDataChanged((first..first + count).collect())));
        }
        first
    }

    // ========================================================================
    // Column edits
    // ========================================================================

    /// Insert `Column <n>` just before the Notes column, where `n` is the
    /// new column count. Returns the new column's name.
    pub fn add_column(&mut self) -> SpecNotesResult<String> {
        let mut n = self.table.columns().len() + 1;
        let mut name = format!("Column {}", n);
        while self.table.column_index(&name).is_some() {
            n += 1;
            name = format!("Column {}", n);
        }
        let at = self.notes_index().unwrap_or(self.table.columns().len());
        self.table.insert_column(at, name.clone())?;
        self.changed(Some(RecomputeEvent::ColumnsChanged));
        Ok(name)
    }

    /// Rename a non-Notes column, returning its previous name.
    pub fn rename_column(&mut self, index: usize, name: impl Into<String>) -> SpecNotesResult<String> {
        self.check_not_notes(index)?;
        let name = name.into();
        let previous = self.table.rename_column(index, name.clone())?;
        if previous != name {
            self.changed(Some(RecomputeEvent::ColumnsChanged));
        }
        Ok(previous)
    }

    /// Remove a non-Notes column, returning its name.
    pub fn remove_column(&mut self, index: usize) -> SpecNotesResult<String> {
        self.check_not_notes(index)?;
        let name = self.table.remove_column(index)?;
        self.changed(Some(RecomputeEvent::ColumnsChanged));
        Ok(name)
    }

    // ========================================================================
    // Rule edits
    // ========================================================================

    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
        self.changed(Some(RecomputeEvent::RuleSetChanged));
    }

    /// Replace a rule, returning the old one.
    pub fn update_rule(&mut self, index: usize, rule: Rule) -> SpecNotesResult<Rule> {
        let unchanged = self.rules.get(index) == Some(&rule);
        let previous = self.rules.replace(index, rule)?;
        if !unchanged {
            self.changed(Some(RecomputeEvent::RuleSetChanged));
        }
        Ok(previous)
    }

    pub fn remove_rule(&mut self, index: usize) -> SpecNotesResult<Rule> {
        let removed = self.rules.remove(index)?;
        self.changed(Some(RecomputeEvent::RuleSetChanged));
        Ok(removed)
    }

    /// Replace the whole rule set. Returns `false` if it was identical.
    pub fn set_rules(&mut self, rules: RuleSet) -> bool {
        if rules.fingerprint() == self.rules.fingerprint() {
            return false;
        }
        self.rules = rules;
        self.changed(Some(RecomputeEvent::RuleSetChanged));
        true
    }

    /// Validation and unresolved placeholders for every rule, in order.
    pub fn rule_diagnostics(&self) -> Vec<RuleDiagnostic> {
        let notes = self.notes_index();
        let columns: Vec<String> = self
            .table
            .columns()
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != notes)
            .map(|(_, c)| c.clone())
            .collect();
        let depth = self.engine.config().max_condition_depth;

        self.rules
            .iter()
            .enumerate()
            .map(|(index, rule)| RuleDiagnostic {
                index,
                validation: validate_with_depth(&rule.condition, depth),
                unresolved_placeholders: unresolved_placeholders(&rule.template, &columns)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            })
            .collect()
    }

    // ========================================================================
    // Recompute
    // ========================================================================

    /// Run whatever the pending edits require and return the scope that ran.
    pub fn recompute(&mut self) -> RecomputeScope {
        let scope = self.trigger.take();
        let rows = match &scope {
            RecomputeScope::None => return RecomputeScope::None,
            RecomputeScope::Full => None,
            RecomputeScope::Rows(rows) => Some(rows),
        };
        let report = self.engine.annotate_with_report(&self.table, &self.rules, rows);
        self.table = report.table.clone();
        self.last_report = Some(report);
        scope
    }

    /// Capture the current state for a pass run elsewhere.
    pub fn snapshot(&self) -> AnnotationJob {
        AnnotationJob {
            table: self.table.clone(),
            rules: self.rules.clone(),
            generation: self.generation,
        }
    }

    /// Install a table computed from the snapshot at `generation`.
    ///
    /// Returns `false` and discards `table` if the sheet has been edited
    /// since; the newest edit wins.
    pub fn apply_result(&mut self, generation: u64, table: Table) -> bool {
        if generation != self.generation {
            tracing::debug!(
                job = generation,
                current = self.generation,
                "discarding stale annotation result"
            );
            return false;
        }
        self.table = table;
        self.trigger.take();
        true
    }
}

// ============================================================================
// TESTS
// ============================================================================
