//! End-to-end annotation scenarios and properties.

use proptest::prelude::*;
use specnotes_core::{Row, Rule, RuleSet, Table};
use specnotes_engine::*;
use specnotes_test_utils::assertions::*;
use specnotes_test_utils::fixtures::*;
use specnotes_test_utils::generators::*;
use std::collections::BTreeSet;

#[test]
fn sour_service_only() {
    let rules = RuleSet::from_rules(vec![Rule::numbered("sour && !toxic", "Sour service only")]);
    let out = annotate(&sour_row(), &rules);
    assert_notes(&out, 0, "1. Sour service only");
}

#[test]
fn multiline_numbered_indent() {
    let rules = RuleSet::from_rules(vec![Rule::numbered("sour", "Line A\nLine B")]);
    let out = annotate(&sour_row(), &rules);
    assert_notes(&out, 0, "1. Line A\n   Line B");
}

#[test]
fn invalid_condition_contributes_nothing() {
    assert!(!validate("sour &&").valid);
    let rules = RuleSet::from_rules(vec![
        Rule::numbered("sour &&", "never"),
        Rule::numbered("sour", "Sour"),
    ]);
    let out = annotate(&sour_row(), &rules);
    // The invalid rule neither renders nor takes number 1.
    assert_notes(&out, 0, "1. Sour");
}

#[test]
fn unnumbered_matches_do_not_consume_numbers() {
    let rules = RuleSet::from_rules(vec![
        Rule::numbered("sour", "first"),
        Rule::new("sour", "plain one"),
        Rule::new("!toxic", "plain two\nwrapped"),
        Rule::numbered("sour", "second"),
    ]);
    let out = annotate(&sour_row(), &rules);
    assert_notes(&out, 0, "1. first\nplain one\nplain two\nwrapped\n2. second");
}

#[test]
fn piping_sheet_annotation() {
    let out = annotate(&piping_sheet(), &piping_rules());
    assert_notes(
        &out,
        0,
        "1. Sour service only\n2. Bolting B7M per NACE MR0175\n   Hardness max 22 HRC",
    );
    assert_notes(&out, 1, "1. Line 12-P-3302: standard bolting");
    assert_notes(
        &out,
        2,
        "TOXIC SERVICE\n1. Bolting L7M per NACE MR0175\n   Hardness max 22 HRC",
    );
    assert_notes(&out, 3, "");
    assert_data_unchanged(&piping_sheet(), &out);
}

#[test]
fn placeholders_render_coerced_values() {
    let table = table(
        &["rating", "sour", "Notes"],
        &[&["0600", "TRUE", ""], &["2.50", "no", ""]],
    );
    let rules = RuleSet::from_rules(vec![Rule::new(
        "rating",
        "Class {$rating}, sour={$sour}, {$unknown}",
    )]);
    let out = annotate(&table, &rules);
    assert_notes(&out, 0, "Class 600, sour=true, {$unknown}");
    assert_notes(&out, 1, "Class 2.5, sour=no, {$unknown}");
}

#[test]
fn partial_recompute_leaves_other_rows() {
    let mut table = piping_sheet();
    let notes = table.column_index("Notes").expect("notes column");
    for row in 0..table.row_count() {
        table.set_cell(row, notes, "stale").expect("cell");
    }
    let out = annotate_rows(&table, &piping_rules(), &BTreeSet::from([1]));
    assert_notes(&out, 0, "stale");
    assert_notes(&out, 1, "1. Line 12-P-3302: standard bolting");
    assert_notes(&out, 2, "stale");
}

#[test]
fn row_failure_keeps_prior_notes_and_continues() {
    let table = Table::new(
        vec!["sour".into(), "Notes".into()],
        vec![
            Row::new(vec!["true".into(), "".into()]),
            Row::new(vec!["prior".into()]),
            Row::new(vec!["true".into(), "".into(), "extra".into()]),
            Row::new(vec!["true".into(), "old".into()]),
        ],
    )
    .expect("table");
    let rules = RuleSet::from_rules(vec![Rule::new("sour", "Sour")]);
    let report = AnnotationEngine::default().annotate_with_report(&table, &rules, None);
    assert_eq!(report.rows_annotated, 2);
    assert_eq!(report.row_failures.len(), 2);
    assert_eq!(report.table.row(1), table.row(1));
    assert_eq!(report.table.row(2), table.row(2));
    assert_eq!(report.table.cell(3, 1), Some("Sour"));
}

#[test]
fn sheet_session_end_to_end() -> specnotes_core::SpecNotesResult<()> {
    let mut sheet = NotesSheet::blank(100, serial_config())?;
    sheet.set_rules(piping_rules());
    sheet.recompute();

    let sour = sheet.table().column_index("sour").expect("sour column");
    sheet.set_cell(42, sour, "true")?;
    assert_eq!(sheet.recompute(), RecomputeScope::Rows(BTreeSet::from([42])));
    assert_notes(
        sheet.table(),
        42,
        "1. Sour service only\n2. Bolting  per NACE MR0175\n   Hardness max 22 HRC",
    );
    assert_notes(sheet.table(), 41, "");

    let added = sheet.add_column()?;
    assert_eq!(sheet.table().columns().last().map(String::as_str), Some("Notes"));
    sheet.push_rule(Rule::numbered(format!("`{}` >= 10", added), "Extra {$Column 7}"));
    assert!(sheet.pending().is_full());
    sheet.recompute();
    assert!(sheet.pending().is_none());
    Ok(())
}

#[test]
fn detect_changes_feeds_trigger() {
    let before = piping_sheet();
    let mut after = before.clone();
    after.set_cell(3, 3, "true").expect("cell");
    after.set_cell(0, 5, "hand edit").expect("cell");

    let mut trigger = RecomputeTrigger::new();
    if let Some(event) = detect_changes(&before, &after, "Notes") {
        trigger.record(event);
    }
    assert_eq!(trigger.take(), RecomputeScope::Rows(BTreeSet::from([3])));
}

proptest! {
    #[test]
    fn prop_annotate_is_deterministic(table in arb_table(), rules in arb_rule_set()) {
        let once = annotate(&table, &rules);
        let twice = annotate(&table, &rules);
        prop_assert_eq!(&once, &twice);
        // Annotating the output again gives the same Notes: Notes never feed back.
        prop_assert_eq!(annotate(&once, &rules), once);
    }

    #[test]
    fn prop_parallel_matches_serial(table in arb_table(), rules in arb_rule_set(), workers in 1usize..5) {
        let serial = AnnotationEngine::new(serial_config()).expect("config");
        let parallel = AnnotationEngine::new(parallel_config(workers)).expect("config");
        prop_assert_eq!(serial.annotate(&table, &rules), parallel.annotate(&table, &rules));
    }

    #[test]
    fn prop_partial_agrees_with_full(
        table in arb_table(),
        rules in arb_rule_set(),
        picks in prop::collection::btree_set(0usize..12, 0..6),
    ) {
        let full = annotate(&table, &rules);
        let partial = annotate_rows(&table, &rules, &picks);
        for row in 0..table.row_count() {
            if picks.contains(&row) {
                prop_assert_eq!(full.row(row), partial.row(row));
            } else {
                prop_assert_eq!(table.row(row), partial.row(row));
            }
        }
    }

    #[test]
    fn prop_numbering_is_sequential(table in arb_table(), rules in arb_rule_set()) {
        let engine = AnnotationEngine::default();
        let compiled = engine.compile(&rules);
        let notes_index = table.column_index("Notes").unwrap_or(0);
        for row in 0..table.row_count() {
            let fields = table.row_fields(row, Some(notes_index)).expect("well-formed row");
            let notes = engine.annotate_fields(&compiled, &fields, row);
            let numbered_matches = notes
                .matched_rules
                .iter()
                .filter(|&&i| rules.get(i).map(|r| r.numbered).unwrap_or(false))
                .count();
            let mut expected = 1;
            for line in notes.text.split('\n') {
                if line.starts_with(&format!("{}. ", expected)) {
                    expected += 1;
                }
            }
            // Every numbered match produced the next label, in order.
            prop_assert!(expected - 1 >= numbered_matches);
        }
    }

    #[test]
    fn prop_unmatched_rules_contribute_nothing(table in arb_table(), rules in arb_rule_set()) {
        let never = RuleSet::from_rules(
            rules.iter().map(|r| Rule { condition: "sour &&".to_string(), ..r.clone() }).collect(),
        );
        let out = annotate(&table, &never);
        for row in 0..out.row_count() {
            assert_notes(&out, row, "");
        }
    }
}
