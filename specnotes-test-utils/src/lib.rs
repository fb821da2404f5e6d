//! specnotes Test Utilities
//!
//! Shared test infrastructure for the specnotes workspace:
//! - Proptest generators for rules, rule sets, conditions and tables
//! - Fixtures for the piping notes sheet
//! - Assertions over annotated tables

pub use specnotes_core::{
    EngineConfig, FieldValue, Fields, Row, Rule, RuleSet, SpecNotesError, SpecNotesResult, Table,
    TableError, DEFAULT_COLUMNS, DEFAULT_NOTES_COLUMN,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for specnotes types.

    use super::*;
    use proptest::prelude::*;

    /// Data columns used by generated tables, Notes excluded.
    pub const FIELD_NAMES: [&str; 4] = ["sour", "toxic", "rating", "material"];

    /// A raw cell as the grid would hand it over.
    pub fn arb_cell() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            prop_oneof![Just("true"), Just("false"), Just("TRUE"), Just(" False ")]
                .prop_map(String::from),
            (-5i32..1000).prop_map(|n| n.to_string()),
            prop_oneof![Just("CS"), Just("SS316"), Just("B7M"), Just("L7M")].prop_map(String::from),
        ]
    }

    fn arb_field() -> impl Strategy<Value = String> {
        prop_oneof![
            proptest::sample::select(FIELD_NAMES.to_vec()).prop_map(String::from),
            Just("missing".to_string()),
        ]
    }

    fn arb_operand() -> impl Strategy<Value = String> {
        prop_oneof![
            arb_field(),
            (-5i32..1000).prop_map(|n| n.to_string()),
            prop_oneof![Just("\"CS\""), Just("'SS316'"), Just("true"), Just("false")]
                .prop_map(String::from),
        ]
    }

    fn arb_comparison() -> impl Strategy<Value = String> {
        (
            arb_field(),
            proptest::sample::select(vec!["==", "!=", "<", "<=", ">", ">=", "==="]),
            arb_operand(),
        )
            .prop_map(|(lhs, op, rhs)| format!("{} {} {}", lhs, op, rhs))
    }

    /// Condition source: usually well-formed, sometimes not.
    pub fn arb_condition() -> impl Strategy<Value = String> {
        let atom = prop_oneof![arb_field(), arb_comparison()];
        let expr = atom.prop_recursive(3, 12, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{} && {}", a, b)),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{} || {}", a, b)),
                inner.clone().prop_map(|a| format!("!({})", a)),
                inner.prop_map(|a| format!("({})", a)),
            ]
        });
        prop_oneof![
            8 => expr,
            1 => Just(String::new()),
            1 => prop_oneof![Just("sour &&"), Just("a = 1"), Just("(sour"), Just("true")]
                .prop_map(String::from),
        ]
    }

    /// Template text with placeholders, literal text and line breaks.
    pub fn arb_template() -> impl Strategy<Value = String> {
        let piece = prop_oneof![
            "[A-Za-z ,.]{1,8}",
            arb_field().prop_map(|f| format!("{{${}}}", f)),
            Just("\n".to_string()),
        ];
        prop::collection::vec(piece, 0..6).prop_map(|pieces| pieces.concat())
    }

    pub fn arb_rule() -> impl Strategy<Value = Rule> {
        (arb_condition(), arb_template(), any::<bool>()).prop_map(|(condition, template, numbered)| {
            Rule {
                condition,
                template,
                numbered,
            }
        })
    }

    pub fn arb_rule_set() -> impl Strategy<Value = RuleSet> {
        prop::collection::vec(arb_rule(), 0..8).prop_map(RuleSet::from_rules)
    }

    pub fn arb_row() -> impl Strategy<Value = Row> {
        (prop::collection::vec(arb_cell(), FIELD_NAMES.len()), arb_cell()).prop_map(
            |(mut cells, notes)| {
                cells.push(notes);
                Row::new(cells)
            },
        )
    }

    /// A table over [`FIELD_NAMES`] plus a trailing Notes column.
    pub fn arb_table() -> impl Strategy<Value = Table> {
        prop::collection::vec(arb_row(), 0..12).prop_map(|rows| {
            let mut columns: Vec<String> = FIELD_NAMES.iter().map(|c| c.to_string()).collect();
            columns.push(DEFAULT_NOTES_COLUMN.to_string());
            Table::new(columns, rows).unwrap_or_default()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built tables and rule sets for common scenarios.

    use super::*;

    /// Build a table from string slices. Panics on invalid columns.
    #[track_caller]
    pub fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter().map(|r| r.iter().copied().collect::<Row>()).collect(),
        )
        .unwrap_or_else(|e| panic!("invalid fixture table: {}", e))
    }

    /// `[sour, toxic, Notes]` with one sour, non-toxic row.
    pub fn sour_row() -> Table {
        table(&["sour", "toxic", "Notes"], &[&["true", "false", ""]])
    }

    /// A piping sheet on the default columns.
    pub fn piping_sheet() -> Table {
        table(
            &DEFAULT_COLUMNS,
            &[
                &["PV-1001", "12-P-3301", "B7M", "true", "false", ""],
                &["PV-1002", "12-P-3302", "B7", "false", "false", ""],
                &["PV-1003", "8-P-1105", "L7M", "true", "true", ""],
                &["", "", "", "", "", ""],
            ],
        )
    }

    /// Rules typical for a piping notes sheet, mixing numbered and plain output.
    pub fn piping_rules() -> RuleSet {
        RuleSet::from_rules(vec![
            Rule::numbered("sour && !toxic", "Sour service only"),
            Rule::new("toxic", "TOXIC SERVICE"),
            Rule::numbered(
                "sour",
                "Bolting {$boltAndNutMaterial} per NACE MR0175\nHardness max 22 HRC",
            ),
            Rule::numbered("boltAndNutMaterial == \"B7\"", "Line {$lineNumber}: standard bolting"),
            Rule::numbered("sour &&", "never rendered"),
        ])
    }

    pub fn serial_config() -> EngineConfig {
        EngineConfig {
            parallel_row_threshold: 0,
            ..EngineConfig::default()
        }
    }

    pub fn parallel_config(workers: usize) -> EngineConfig {
        EngineConfig {
            parallel_row_threshold: 1,
            worker_threads: workers,
            ..EngineConfig::default()
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over annotated tables.

    use super::*;

    /// The Notes cell of `row`, panicking if the table has no Notes column.
    #[track_caller]
    pub fn notes_of(table: &Table, row: usize) -> &str {
        let column = table
            .column_index(DEFAULT_NOTES_COLUMN)
            .unwrap_or_else(|| panic!("table has no {} column", DEFAULT_NOTES_COLUMN));
        table
            .cell(row, column)
            .unwrap_or_else(|| panic!("row {} has no notes cell", row))
    }

    /// Assert the Notes cell of `row`.
    #[track_caller]
    pub fn assert_notes(table: &Table, row: usize, expected: &str) {
        assert_eq!(notes_of(table, row), expected, "notes of row {}", row);
    }

    /// Assert that every non-Notes cell is unchanged between two tables.
    #[track_caller]
    pub fn assert_data_unchanged(before: &Table, after: &Table) {
        assert_eq!(before.columns(), after.columns(), "columns changed");
        assert_eq!(before.row_count(), after.row_count(), "row count changed");
        let notes = before.column_index(DEFAULT_NOTES_COLUMN);
        for (i, (a, b)) in before.rows().iter().zip(after.rows()).enumerate() {
            for c in 0..a.cells.len().max(b.cells.len()) {
                if Some(c) != notes {
                    assert_eq!(a.cell(c), b.cell(c), "row {} column {} changed", i, c);
                }
            }
        }
    }

    /// Assert that a result is a specific table error.
    #[track_caller]
    pub fn assert_table_error<T: std::fmt::Debug>(result: &SpecNotesResult<T>, expected: &TableError) {
        match result {
            Err(SpecNotesError::Table(err)) => assert_eq!(err, expected),
            other => panic!("Expected table error {:?}, got: {:?}", expected, other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
