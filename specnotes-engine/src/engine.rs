//! Annotation engine
//!
//! Applies a rule set to every row of a table and writes the rendered,
//! numbered notes into the Notes column. Each row is a pure function of its
//! own non-Notes fields and the rule set, so rows may be processed in any
//! order and on any thread.

use specnotes_core::{
    EngineConfig, Fields, RenderError, RowError, RuleSet, SpecNotesResult, Table,
};
use specnotes_dsl::{render, render_checked, Condition, ConditionCache};
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Prefix of the text that replaces a rule whose template failed to render.
pub const RENDER_FALLBACK_PREFIX: &str = "Error processing template: ";

/// The text a failed template contributes in place of its rendering.
pub fn render_fallback(template: &str) -> String {
    format!("{}{}", RENDER_FALLBACK_PREFIX, template)
}

// ============================================================================
// COMPILED RULE SET
// ============================================================================

/// A rule with its condition parsed once for the whole pass.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub condition: Arc<Condition>,
    pub template: String,
    pub numbered: bool,
}

/// A rule set ready for evaluation; order matches the source rule set.
#[derive(Debug, Clone, Default)]
pub struct CompiledRuleSet {
    rules: Vec<CompiledRule>,
}

impl CompiledRuleSet {
    /// Compile every rule, sharing parses between rules with identical
    /// condition text.
    pub fn compile(rules: &RuleSet, cache: &mut ConditionCache) -> Self {
        let rules = rules
            .iter()
            .map(|rule| CompiledRule {
                condition: cache.get_or_compile(&rule.condition),
                template: rule.template.clone(),
                numbered: rule.numbered,
            })
            .collect();
        Self { rules }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompiledRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of rules whose condition can never match.
    pub fn invalid_count(&self) -> usize {
        self.rules.iter().filter(|r| !r.condition.is_valid()).count()
    }
}

// ============================================================================
// NUMBERING
// ============================================================================

/// Per-row fold state: the lines produced so far and the next number to
/// hand out. Only matched numbered rules advance the counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesAccumulator {
    lines: Vec<String>,
    next_number: usize,
}

impl Default for NotesAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl NotesAccumulator {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            next_number: 1,
        }
    }

    /// Append one rule's rendered text.
    ///
    /// Numbered text gets `"<n>. "` on its first line and `len(n) + 2`
    /// spaces on every continuation line. Unnumbered text is appended as-is.
    pub fn push(mut self, text: &str, numbered: bool) -> Self {
        if !numbered {
            self.lines.extend(text.split('\n').map(str::to_string));
            return self;
        }

        let number = self.next_number;
        self.next_number += 1;
        let label = number.to_string();
        let indent = " ".repeat(label.len() + 2);
        for (i, line) in text.split('\n').enumerate() {
            if i == 0 {
                self.lines.push(format!("{}. {}", label, line));
            } else {
                self.lines.push(format!("{}{}", indent, line));
            }
        }
        self
    }

    /// How many numbers have been handed out.
    pub fn numbers_used(&self) -> usize {
        self.next_number - 1
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Join the accumulated lines into the Notes value.
    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// A rule whose template failed to render for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFallback {
    pub row: usize,
    pub rule: usize,
    pub error: RenderError,
}

/// The notes computed for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowNotes {
    pub text: String,
    pub matched_rules: Vec<usize>,
    pub fallbacks: Vec<RenderFallback>,
}

/// Result of an annotation pass with everything that was recovered from.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationReport {
    pub table: Table,
    /// Rows whose Notes were rewritten.
    pub rows_annotated: usize,
    /// Rows left at their prior Notes value.
    pub row_failures: Vec<RowError>,
    pub render_fallbacks: Vec<RenderFallback>,
}

impl AnnotationReport {
    fn unchanged(table: &Table) -> Self {
        Self {
            table: table.clone(),
            rows_annotated: 0,
            row_failures: Vec::new(),
            render_fallbacks: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.row_failures.is_empty() && self.render_fallbacks.is_empty()
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Annotation engine that writes rule output into the Notes column.
/// Inputs are never modified; every pass returns a new table.
#[derive(Debug, Clone, Default)]
pub struct AnnotationEngine {
    config: EngineConfig,
}

impl AnnotationEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: EngineConfig) -> SpecNotesResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse every condition in `rules` once.
    pub fn compile(&self, rules: &RuleSet) -> CompiledRuleSet {
        let mut cache = ConditionCache::with_max_depth(self.config.max_condition_depth);
        CompiledRuleSet::compile(rules, &mut cache)
    }

    /// Recompute the Notes of every row.
    pub fn annotate(&self, table: &Table, rules: &RuleSet) -> Table {
        self.annotate_with_report(table, rules, None).table
    }

    /// Recompute the Notes of the listed rows only. Indices past the end of
    /// the table are ignored.
    pub fn annotate_rows(&self, table: &Table, rules: &RuleSet, rows: &BTreeSet<usize>) -> Table {
        self.annotate_with_report(table, rules, Some(rows)).table
    }

    /// Recompute Notes for `rows` (all rows when `None`) and report every
    /// row failure and template fallback.
    pub fn annotate_with_report(
        &self,
        table: &Table,
        rules: &RuleSet,
        rows: Option<&BTreeSet<usize>>,
    ) -> AnnotationReport {
        let row_count = table.row_count();
        let targets: Vec<usize> = match rows {
            None => (0..row_count).collect(),
            Some(set) => set.iter().copied().filter(|&i| i < row_count).collect(),
        };

        let span = tracing::debug_span!("annotate", rows = targets.len(), rules = rules.len());
        let _enter = span.enter();

        let Some(notes_index) = table.column_index(&self.config.notes_column) else {
            tracing::warn!(
                notes_column = %self.config.notes_column,
                "table has no notes column, nothing to annotate"
            );
            return AnnotationReport::unchanged(table);
        };

        let compiled = self.compile(rules);
        if compiled.invalid_count() > 0 {
            tracing::debug!(
                invalid = compiled.invalid_count(),
                "rule set contains conditions that never match"
            );
        }

        let outcomes = self.run_rows(table, &compiled, notes_index, &targets);

        let mut report = AnnotationReport::unchanged(table);
        for (index, outcome) in outcomes {
            let notes = match outcome {
                Ok(notes) => notes,
                Err(err) => {
                    tracing::warn!(row = index, error = %err, "row kept its previous notes");
                    report.row_failures.push(err);
                    continue;
                }
            };
            match report.table.set_cell(index, notes_index, notes.text) {
                Ok(_) => {
                    report.rows_annotated += 1;
                    report.render_fallbacks.extend(notes.fallbacks);
                }
                Err(err) => {
                    let err = RowError::Aborted {
                        row: index,
                        message: err.to_string(),
                    };
                    tracing::warn!(row = index, error = %err, "row kept its previous notes");
                    report.row_failures.push(err);
                }
            }
        }

        tracing::debug!(
            annotated = report.rows_annotated,
            failures = report.row_failures.len(),
            fallbacks = report.render_fallbacks.len(),
            "annotation pass complete"
        );
        report
    }

    /// Compute the notes for a single row's fields.
    pub fn annotate_fields(&self, compiled: &CompiledRuleSet, fields: &Fields, row: usize) -> RowNotes {
        let mut matched_rules = Vec::new();
        let mut fallbacks = Vec::new();

        let acc = compiled
            .iter()
            .enumerate()
            .fold(NotesAccumulator::new(), |acc, (rule_index, rule)| {
                let matched = panic::catch_unwind(AssertUnwindSafe(|| rule.condition.matches(fields)));
                match matched {
                    Ok(true) => {}
                    Ok(false) => return acc,
                    Err(payload) => {
                        tracing::warn!(
                            row,
                            rule = rule_index,
                            error = %panic_message(payload.as_ref()),
                            "condition evaluation aborted, rule skipped"
                        );
                        return acc;
                    }
                }
                matched_rules.push(rule_index);

                let text = match self.render_rule(&rule.template, fields) {
                    Ok(text) => text,
                    Err(error) => {
                        tracing::warn!(row, rule = rule_index, error = %error, "template fallback");
                        fallbacks.push(RenderFallback {
                            row,
                            rule: rule_index,
                            error,
                        });
                        render_fallback(&rule.template)
                    }
                };
                acc.push(&text, rule.numbered)
            });

        RowNotes {
            text: acc.finish(),
            matched_rules,
            fallbacks,
        }
    }

    fn render_rule(&self, template: &str, fields: &Fields) -> Result<String, RenderError> {
        let strict = self.config.strict_placeholders;
        panic::catch_unwind(AssertUnwindSafe(|| {
            if strict {
                render_checked(template, fields)
            } else {
                Ok(render(template, fields))
            }
        }))
        .unwrap_or_else(|payload| {
            Err(RenderError::Aborted {
                message: panic_message(payload.as_ref()),
            })
        })
    }

    fn process_row(
        &self,
        table: &Table,
        compiled: &CompiledRuleSet,
        notes_index: usize,
        index: usize,
    ) -> Result<RowNotes, RowError> {
        let fields = table.row_fields(index, Some(notes_index))?;
        panic::catch_unwind(AssertUnwindSafe(|| self.annotate_fields(compiled, &fields, index)))
            .map_err(|payload| RowError::Aborted {
                row: index,
                message: panic_message(payload.as_ref()),
            })
    }

    /// Process `targets`, fanning out across scoped threads for large passes.
    /// Results come back in `targets` order.
    fn run_rows(
        &self,
        table: &Table,
        compiled: &CompiledRuleSet,
        notes_index: usize,
        targets: &[usize],
    ) -> Vec<(usize, Result<RowNotes, RowError>)> {
        let threshold = self.config.parallel_row_threshold;
        let workers = self.config.worker_threads.max(1);
        let sequential = threshold == 0 || targets.len() < threshold || workers == 1;

        if sequential {
            return targets
                .iter()
                .map(|&i| (i, self.process_row(table, compiled, notes_index, i)))
                .collect();
        }

        let chunk_size = targets.len().div_ceil(workers);
        tracing::debug!(workers, chunk_size, "fanning out annotation pass");

        std::thread::scope(|s| {
            let handles: Vec<_> = targets
                .chunks(chunk_size)
                .map(|chunk| {
                    let handle = s.spawn(move || {
                        chunk
                            .iter()
                            .map(|&i| (i, self.process_row(table, compiled, notes_index, i)))
                            .collect::<Vec<_>>()
                    });
                    (chunk, handle)
                })
                .collect();

            let mut merged = Vec::with_capacity(targets.len());
            for (chunk, handle) in handles {
                match handle.join() {
                    Ok(results) => merged.extend(results),
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        merged.extend(chunk.iter().map(|&i| {
                            (
                                i,
                                Err(RowError::Aborted {
                                    row: i,
                                    message: message.clone(),
                                }),
                            )
                        }));
                    }
                }
            }
            merged
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use specnotes_core::{Row, Rule};

    fn sheet(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter().map(|r| r.iter().copied().collect::<Row>()).collect(),
        )
        .expect("valid test table")
    }

    fn notes(table: &Table, row: usize) -> &str {
        let idx = table.column_index("Notes").expect("notes column");
        table.cell(row, idx).expect("notes cell")
    }

    #[test]
    fn test_accumulator_numbering() {
        let acc = NotesAccumulator::new()
            .push("first", true)
            .push("plain\nlines", false)
            .push("second\ncontinued", true);
        assert_eq!(acc.numbers_used(), 2);
        assert_eq!(acc.finish(), "1. first\nplain\nlines\n2. second\n   continued");
    }

    #[test]
    fn test_accumulator_wide_numbers_indent() {
        let mut acc = NotesAccumulator::new();
        for _ in 0..9 {
            acc = acc.push("x", true);
        }
        let acc = acc.push("ten\nmore", true);
        assert_eq!(acc.lines()[9], "10. ten");
        assert_eq!(acc.lines()[10], "    more");
    }

    #[test]
    fn test_accumulator_empty() {
        assert_eq!(NotesAccumulator::new().finish(), "");
    }

    #[test]
    fn test_sour_service_scenario() {
        let table = sheet(&["sour", "toxic", "Notes"], &[&["true", "false", ""]]);
        let rules = RuleSet::from_rules(vec![Rule::numbered("sour && !toxic", "Sour service only")]);
        let out = AnnotationEngine::default().annotate(&table, &rules);
        assert_eq!(notes(&out, 0), "1. Sour service only");
        // Input untouched.
        assert_eq!(notes(&table, 0), "");
    }

    #[test]
    fn test_multiline_scenario() {
        let table = sheet(&["sour", "toxic", "Notes"], &[&["true", "false", ""]]);
        let rules = RuleSet::from_rules(vec![Rule::numbered("sour", "Line A\nLine B")]);
        let out = AnnotationEngine::default().annotate(&table, &rules);
        assert_eq!(notes(&out, 0), "1. Line A\n   Line B");
    }

    #[test]
    fn test_no_match_clears_notes() {
        let table = sheet(&["sour", "Notes"], &[&["false", "stale"]]);
        let rules = RuleSet::from_rules(vec![Rule::numbered("sour", "Sour")]);
        let out = AnnotationEngine::default().annotate(&table, &rules);
        assert_eq!(notes(&out, 0), "");
    }

    #[test]
    fn test_notes_not_visible_to_rules() {
        let table = sheet(&["sour", "Notes"], &[&["true", "old"]]);
        let rules = RuleSet::from_rules(vec![
            Rule::new("Notes == \"old\"", "saw notes"),
            Rule::new("sour", "notes={$Notes}"),
        ]);
        let out = AnnotationEngine::default().annotate(&table, &rules);
        assert_eq!(notes(&out, 0), "notes={$Notes}");
    }

    #[test]
    fn test_ragged_row_keeps_notes() {
        let mut table = sheet(&["sour", "Notes"], &[&["true", ""], &["true", "prior"]]);
        // Simulate a row that lost a cell.
        let rows: Vec<Row> = vec![
            table.row(0).cloned().unwrap_or_default(),
            Row::new(vec!["prior".to_string()]),
        ];
        table = Table::new(table.columns().to_vec(), rows).expect("table");
        let rules = RuleSet::from_rules(vec![Rule::new("sour", "Sour")]);
        let report = AnnotationEngine::default().annotate_with_report(&table, &rules, None);
        assert_eq!(notes(&report.table, 0), "Sour");
        assert_eq!(report.table.row(1), table.row(1));
        assert_eq!(
            report.row_failures,
            vec![RowError::Ragged {
                row: 1,
                expected: 2,
                found: 1
            }]
        );
        assert_eq!(report.rows_annotated, 1);
    }

    #[test]
    fn test_strict_placeholder_fallback_keeps_other_rules() -> SpecNotesResult<()> {
        let config = EngineConfig {
            strict_placeholders: true,
            ..EngineConfig::default()
        };
        let engine = AnnotationEngine::new(config)?;
        let table = sheet(&["sour", "Notes"], &[&["true", ""]]);
        let rules = RuleSet::from_rules(vec![
            Rule::numbered("sour", "Good"),
            Rule::numbered("sour", "Broken {$sour"),
            Rule::numbered("sour", "Also good"),
        ]);
        let report = engine.annotate_with_report(&table, &rules, None);
        assert_eq!(
            notes(&report.table, 0),
            "1. Good\n2. Error processing template: Broken {$sour\n3. Also good"
        );
        assert_eq!(report.render_fallbacks.len(), 1);
        assert_eq!(report.render_fallbacks[0].rule, 1);
        assert!(!report.is_clean());
        Ok(())
    }

    #[test]
    fn test_lenient_placeholders_pass_through() {
        let table = sheet(&["sour", "Notes"], &[&["true", ""]]);
        let rules = RuleSet::from_rules(vec![Rule::new("sour", "Broken {$sour")]);
        let report = AnnotationEngine::default().annotate_with_report(&table, &rules, None);
        assert_eq!(notes(&report.table, 0), "Broken {$sour");
        assert!(report.is_clean());
    }

    #[test]
    fn test_missing_notes_column_returns_input() {
        let table = sheet(&["sour"], &[&["true"]]);
        let rules = RuleSet::from_rules(vec![Rule::new("sour", "Sour")]);
        let report = AnnotationEngine::default().annotate_with_report(&table, &rules, None);
        assert_eq!(report.table, table);
        assert_eq!(report.rows_annotated, 0);
    }

    #[test]
    fn test_annotate_rows_only_touches_selected() {
        let table = sheet(
            &["sour", "Notes"],
            &[&["true", "a"], &["true", "b"], &["true", "c"]],
        );
        let rules = RuleSet::from_rules(vec![Rule::new("sour", "Sour")]);
        let rows: BTreeSet<usize> = [1, 99].into_iter().collect();
        let out = AnnotationEngine::default().annotate_rows(&table, &rules, &rows);
        assert_eq!(notes(&out, 0), "a");
        assert_eq!(notes(&out, 1), "Sour");
        assert_eq!(notes(&out, 2), "c");
    }

    #[test]
    fn test_parallel_matches_sequential() -> SpecNotesResult<()> {
        let rows: Vec<Vec<String>> = (0..200)
            .map(|i| vec![(i % 2 == 0).to_string(), i.to_string(), String::new()])
            .collect();
        let table = Table::new(
            vec!["sour".into(), "rating".into(), "Notes".into()],
            rows.into_iter().map(Row::new).collect(),
        )?;
        let rules = RuleSet::from_rules(vec![
            Rule::numbered("sour", "Sour {$rating}"),
            Rule::numbered("rating >= 100", "High"),
        ]);
        let sequential = AnnotationEngine::new(EngineConfig {
            parallel_row_threshold: 0,
            ..EngineConfig::default()
        })?;
        let parallel = AnnotationEngine::new(EngineConfig {
            parallel_row_threshold: 10,
            worker_threads: 3,
            ..EngineConfig::default()
        })?;
        assert_eq!(
            sequential.annotate(&table, &rules),
            parallel.annotate(&table, &rules)
        );
        Ok(())
    }

    #[test]
    fn test_custom_notes_column() -> SpecNotesResult<()> {
        let engine = AnnotationEngine::new(EngineConfig {
            notes_column: "Remarks".to_string(),
            ..EngineConfig::default()
        })?;
        let table = sheet(&["sour", "Remarks"], &[&["true", ""]]);
        let rules = RuleSet::from_rules(vec![Rule::new("sour", "Sour")]);
        let out = engine.annotate(&table, &rules);
        assert_eq!(out.cell(0, 1), Some("Sour"));
        Ok(())
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            worker_threads: 0,
            ..EngineConfig::default()
        };
        assert!(AnnotationEngine::new(config).is_err());
    }

    #[test]
    fn test_compile_shares_identical_conditions() {
        let rules = RuleSet::from_rules(vec![
            Rule::new("sour", "a"),
            Rule::new("sour", "b"),
            Rule::new("sour &&", "c"),
        ]);
        let compiled = AnnotationEngine::default().compile(&rules);
        let conds: Vec<_> = compiled.iter().map(|r| Arc::clone(&r.condition)).collect();
        assert!(Arc::ptr_eq(&conds[0], &conds[1]));
        assert_eq!(compiled.invalid_count(), 1);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static");
    }
}
