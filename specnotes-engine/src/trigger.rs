//! Recompute policy: which rows a change invalidates

use specnotes_core::Table;
use std::collections::BTreeSet;

/// A change that may invalidate computed Notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecomputeEvent {
    /// Rules were added, edited, reordered or removed.
    RuleSetChanged,
    /// Non-Notes cells changed in these rows.
    RowDataChanged(BTreeSet<usize>),
    /// A column was added, removed or renamed.
    ColumnsChanged,
}

/// The rows a recompute must cover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RecomputeScope {
    #[default]
    None,
    Rows(BTreeSet<usize>),
    Full,
}

impl RecomputeScope {
    /// Combine two scopes. `Full` absorbs everything; row sets union.
    pub fn merge(self, other: RecomputeScope) -> RecomputeScope {
        match (self, other) {
            (RecomputeScope::Full, _) | (_, RecomputeScope::Full) => RecomputeScope::Full,
            (RecomputeScope::None, scope) | (scope, RecomputeScope::None) => scope,
            (RecomputeScope::Rows(mut a), RecomputeScope::Rows(b)) => {
                a.extend(b);
                RecomputeScope::Rows(a)
            }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, RecomputeScope::None)
    }

    pub fn is_full(&self) -> bool {
        matches!(self, RecomputeScope::Full)
    }
}

impl From<RecomputeEvent> for RecomputeScope {
    fn from(event: RecomputeEvent) -> Self {
        match event {
            RecomputeEvent::RuleSetChanged | RecomputeEvent::ColumnsChanged => RecomputeScope::Full,
            RecomputeEvent::RowDataChanged(rows) if rows.is_empty() => RecomputeScope::None,
            RecomputeEvent::RowDataChanged(rows) => RecomputeScope::Rows(rows),
        }
    }
}

/// Accumulates events until the next recompute drains them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecomputeTrigger {
    pending: RecomputeScope,
}

impl RecomputeTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: RecomputeEvent) {
        tracing::trace!(?event, "recompute event");
        let pending = std::mem::take(&mut self.pending);
        self.pending = pending.merge(event.into());
    }

    pub fn pending(&self) -> &RecomputeScope {
        &self.pending
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    /// Take the pending scope, leaving the trigger idle.
    pub fn take(&mut self) -> RecomputeScope {
        std::mem::take(&mut self.pending)
    }
}

/// Compare two snapshots of a table and report what needs recomputing.
///
/// A different column list is a column change. Otherwise every row whose
/// non-Notes cells differ, or that did not exist before, is reported.
/// Edits confined to the Notes column report nothing.
pub fn detect_changes(before: &Table, after: &Table, notes_column: &str) -> Option<RecomputeEvent> {
    if before.columns() != after.columns() {
        return Some(RecomputeEvent::ColumnsChanged);
    }

    let notes_index = after.column_index(notes_column);
    let changed: BTreeSet<usize> = after
        .rows()
        .iter()
        .enumerate()
        .filter(|(i, row)| match before.row(*i) {
            None => true,
            Some(old) => {
                let width = old.cells.len().max(row.cells.len());
                (0..width)
                    .filter(|c| Some(*c) != notes_index)
                    .any(|c| old.cell(c) != row.cell(c))
            }
        })
        .map(|(i, _)| i)
        .collect();

    if changed.is_empty() {
        None
    } else {
        Some(RecomputeEvent::RowDataChanged(changed))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use specnotes_core::Row;

    fn rows(set: &[usize]) -> BTreeSet<usize> {
        set.iter().copied().collect()
    }

    fn table(rows: &[&[&str]]) -> Table {
        Table::new(
            vec!["sour".into(), "toxic".into(), "Notes".into()],
            rows.iter().map(|r| r.iter().copied().collect::<Row>()).collect(),
        )
        .expect("valid test table")
    }

    #[test]
    fn test_scope_merge() {
        let a = RecomputeScope::Rows(rows(&[1, 3]));
        let b = RecomputeScope::Rows(rows(&[2, 3]));
        assert_eq!(a.clone().merge(b), RecomputeScope::Rows(rows(&[1, 2, 3])));
        assert_eq!(a.clone().merge(RecomputeScope::Full), RecomputeScope::Full);
        assert_eq!(RecomputeScope::None.merge(a.clone()), a);
        assert!(RecomputeScope::None.merge(RecomputeScope::None).is_none());
    }

    #[test]
    fn test_trigger_rule_change_is_full() {
        let mut trigger = RecomputeTrigger::new();
        trigger.record(RecomputeEvent::RowDataChanged(rows(&[4])));
        trigger.record(RecomputeEvent::RuleSetChanged);
        trigger.record(RecomputeEvent::RowDataChanged(rows(&[5])));
        assert!(trigger.pending().is_full());
        assert_eq!(trigger.take(), RecomputeScope::Full);
        assert!(trigger.is_idle());
    }

    #[test]
    fn test_trigger_row_changes_accumulate() {
        let mut trigger = RecomputeTrigger::new();
        trigger.record(RecomputeEvent::RowDataChanged(rows(&[2])));
        trigger.record(RecomputeEvent::RowDataChanged(rows(&[0, 2])));
        trigger.record(RecomputeEvent::RowDataChanged(BTreeSet::new()));
        assert_eq!(trigger.take(), RecomputeScope::Rows(rows(&[0, 2])));
    }

    #[test]
    fn test_trigger_columns_change_is_full() {
        let mut trigger = RecomputeTrigger::new();
        trigger.record(RecomputeEvent::ColumnsChanged);
        assert_eq!(trigger.take(), RecomputeScope::Full);
    }

    #[test]
    fn test_detect_cell_change() {
        let before = table(&[&["true", "false", ""], &["false", "false", ""]]);
        let after = table(&[&["true", "false", ""], &["true", "false", ""]]);
        assert_eq!(
            detect_changes(&before, &after, "Notes"),
            Some(RecomputeEvent::RowDataChanged(rows(&[1])))
        );
    }

    #[test]
    fn test_detect_notes_only_change() {
        let before = table(&[&["true", "false", ""]]);
        let after = table(&[&["true", "false", "hand edit"]]);
        assert_eq!(detect_changes(&before, &after, "Notes"), None);
    }

    #[test]
    fn test_detect_new_rows() {
        let before = table(&[&["true", "false", ""]]);
        let after = table(&[&["true", "false", ""], &["", "", ""]]);
        assert_eq!(
            detect_changes(&before, &after, "Notes"),
            Some(RecomputeEvent::RowDataChanged(rows(&[1])))
        );
    }

    #[test]
    fn test_detect_column_change() -> Result<(), specnotes_core::TableError> {
        let before = table(&[&["true", "false", ""]]);
        let mut after = before.clone();
        after.rename_column(1, "h2s")?;
        assert_eq!(
            detect_changes(&before, &after, "Notes"),
            Some(RecomputeEvent::ColumnsChanged)
        );
        Ok(())
    }
}
