//! Table snapshot types

use crate::{Fields, RowError, TableError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One grid row: raw cell strings aligned with the table's columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    pub cells: Vec<String>,
}

impl Row {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    /// A row of `width` empty cells.
    pub fn blank(width: usize) -> Self {
        Self {
            cells: vec![String::new(); width],
        }
    }

    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Row {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            cells: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// An ordered set of named columns and the rows under them.
///
/// Column names are unique. Rows are expected to have one cell per column;
/// a row that does not is kept as-is and reported by [`Table::row_fields`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create a table, rejecting empty or duplicate column names.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self, TableError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if name.trim().is_empty() {
                return Err(TableError::EmptyColumnName);
            }
            if !seen.insert(name.as_str()) {
                return Err(TableError::DuplicateColumn { name: name.clone() });
            }
        }
        Ok(Self { columns, rows })
    }

    /// A table of `row_count` empty rows.
    pub fn blank<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        row_count: usize,
    ) -> Result<Self, TableError> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let width = columns.len();
        Self::new(columns, vec![Row::blank(width); row_count])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.cell(column))
    }

    /// The coerced fields of one row, excluding the column at `skip`.
    ///
    /// `skip` is the derived Notes column: a row's notes never feed back into
    /// its own conditions or templates.
    pub fn row_fields(&self, index: usize, skip: Option<usize>) -> Result<Fields, RowError> {
        let row = self.rows.get(index).ok_or_else(|| RowError::Aborted {
            row: index,
            message: format!("row out of bounds for {} rows", self.rows.len()),
        })?;
        if row.cells.len() != self.columns.len() {
            return Err(RowError::Ragged {
                row: index,
                expected: self.columns.len(),
                found: row.cells.len(),
            });
        }
        Ok(Fields::from_raw(
            self.columns
                .iter()
                .zip(&row.cells)
                .enumerate()
                .filter(|(i, _)| Some(*i) != skip)
                .map(|(_, (name, cell))| (name.as_str(), cell.as_str())),
        ))
    }

    /// Replace one cell, returning the previous value.
    pub fn set_cell(
        &mut self,
        row: usize,
        column: usize,
        value: impl Into<String>,
    ) -> Result<String, TableError> {
        let width = self.columns.len();
        if column >= width {
            return Err(TableError::ColumnOutOfBounds { index: column, len: width });
        }
        let len = self.rows.len();
        let target = self
            .rows
            .get_mut(row)
            .ok_or(TableError::RowOutOfBounds { index: row, len })?;
        if target.cells.len() < width {
            target.cells.resize(width, String::new());
        }
        Ok(std::mem::replace(&mut target.cells[column], value.into()))
    }

    /// Insert a column at `index`, giving every row an empty cell there.
    pub fn insert_column(&mut self, index: usize, name: impl Into<String>) -> Result<(), TableError> {
        let name = name.into();
        self.check_new_name(&name, None)?;
        if index > self.columns.len() {
            return Err(TableError::ColumnOutOfBounds {
                index,
                len: self.columns.len(),
            });
        }
        self.columns.insert(index, name);
        for row in &mut self.rows {
            let at = index.min(row.cells.len());
            row.cells.insert(at, String::new());
        }
        Ok(())
    }

    /// Rename the column at `index`, returning its previous name.
    pub fn rename_column(&mut self, index: usize, name: impl Into<String>) -> Result<String, TableError> {
        let name = name.into();
        if index >= self.columns.len() {
            return Err(TableError::ColumnOutOfBounds {
                index,
                len: self.columns.len(),
            });
        }
        self.check_new_name(&name, Some(index))?;
        Ok(std::mem::replace(&mut self.columns[index], name))
    }

    /// Remove the column at `index` and its cells, returning its name.
    pub fn remove_column(&mut self, index: usize) -> Result<String, TableError> {
        if index >= self.columns.len() {
            return Err(TableError::ColumnOutOfBounds {
                index,
                len: self.columns.len(),
            });
        }
        for row in &mut self.rows {
            if index < row.cells.len() {
                row.cells.remove(index);
            }
        }
        Ok(self.columns.remove(index))
    }

    /// Append `count` empty rows, returning the index of the first new row.
    pub fn push_blank_rows(&mut self, count: usize) -> usize {
        let first = self.rows.len();
        let width = self.columns.len();
        self.rows.extend(std::iter::repeat_with(|| Row::blank(width)).take(count));
        first
    }

    fn check_new_name(&self, name: &str, renaming: Option<usize>) -> Result<(), TableError> {
        if name.trim().is_empty() {
            return Err(TableError::EmptyColumnName);
        }
        let clash = self
            .columns
            .iter()
            .enumerate()
            .any(|(i, c)| c == name && Some(i) != renaming);
        if clash {
            return Err(TableError::DuplicateColumn {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldValue;

    fn sample() -> Table {
        Table::new(
            vec!["sour".into(), "toxic".into(), "Notes".into()],
            vec![
                Row::from_iter(["true", "false", ""]),
                Row::from_iter(["false", "1", "stale"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let err = Table::new(vec!["a".into(), "a".into()], vec![]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn { name: "a".into() });
    }

    #[test]
    fn test_new_rejects_empty_column_name() {
        let err = Table::new(vec!["a".into(), "  ".into()], vec![]).unwrap_err();
        assert_eq!(err, TableError::EmptyColumnName);
    }

    #[test]
    fn test_row_fields_skips_notes() {
        let table = sample();
        let fields = table.row_fields(0, Some(2)).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.lookup("sour"), &FieldValue::Bool(true));
        assert!(!fields.contains("Notes"));
    }

    #[test]
    fn test_row_fields_reports_ragged_row() {
        let table = Table::new(
            vec!["a".into(), "b".into()],
            vec![Row::from_iter(["only"])],
        )
        .unwrap();
        assert_eq!(
            table.row_fields(0, None).unwrap_err(),
            RowError::Ragged {
                row: 0,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_set_cell_returns_previous() {
        let mut table = sample();
        let old = table.set_cell(1, 1, "0").unwrap();
        assert_eq!(old, "1");
        assert_eq!(table.cell(1, 1), Some("0"));
        assert!(matches!(
            table.set_cell(9, 0, "x"),
            Err(TableError::RowOutOfBounds { index: 9, len: 2 })
        ));
    }

    #[test]
    fn test_insert_column_pads_rows() {
        let mut table = sample();
        table.insert_column(2, "Column 3").unwrap();
        assert_eq!(table.columns(), &["sour", "toxic", "Column 3", "Notes"]);
        assert_eq!(table.row(1).unwrap().cells, vec!["false", "1", "", "stale"]);
    }

    #[test]
    fn test_rename_column_rejects_clash_but_allows_same_name() {
        let mut table = sample();
        assert!(matches!(
            table.rename_column(0, "toxic"),
            Err(TableError::DuplicateColumn { .. })
        ));
        assert_eq!(table.rename_column(0, "sour").unwrap(), "sour");
        assert_eq!(table.rename_column(0, "sourService").unwrap(), "sour");
        assert_eq!(table.column_index("sourService"), Some(0));
    }

    #[test]
    fn test_remove_column_drops_cells() {
        let mut table = sample();
        assert_eq!(table.remove_column(1).unwrap(), "toxic");
        assert_eq!(table.row(0).unwrap().cells, vec!["true", ""]);
    }

    #[test]
    fn test_push_blank_rows() {
        let mut table = sample();
        let first = table.push_blank_rows(3);
        assert_eq!(first, 2);
        assert_eq!(table.row_count(), 5);
        assert_eq!(table.row(4).unwrap().cells.len(), 3);
    }
}
