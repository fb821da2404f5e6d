//! Condition evaluation against a row's fields
//!
//! Evaluation is total: a condition that is empty, fails to parse, or
//! references no fields never matches.

use crate::parser::*;
use crate::validate::Validation;
use specnotes_core::{FieldValue, Fields};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// CONDITION
// ============================================================================

/// A condition compiled once and evaluated against many rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    compiled: Result<Expr, ParseError>,
}

impl Condition {
    pub fn compile(source: impl Into<String>) -> Self {
        Self::compile_with_depth(source, DEFAULT_MAX_DEPTH)
    }

    pub fn compile_with_depth(source: impl Into<String>, max_depth: usize) -> Self {
        let source = source.into();
        let compiled = compile_source(&source, max_depth);
        if let Err(err) = &compiled {
            tracing::debug!(condition = %source, error = %err, "condition never matches");
        }
        Self { source, compiled }
    }

    /// Evaluate against `fields`. Invalid conditions are false.
    pub fn matches(&self, fields: &Fields) -> bool {
        match &self.compiled {
            Ok(expr) => evaluate_expr(expr, fields),
            Err(_) => false,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> Option<&Expr> {
        self.compiled.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ParseError> {
        self.compiled.as_ref().err()
    }

    pub fn is_valid(&self) -> bool {
        self.compiled.is_ok()
    }

    pub fn validation(&self) -> Validation {
        match &self.compiled {
            Ok(_) => Validation::ok(),
            Err(err) => Validation::invalid(err.to_string()),
        }
    }
}

fn compile_source(source: &str, max_depth: usize) -> Result<Expr, ParseError> {
    if source.trim().is_empty() {
        return Err(ParseError {
            message: "Condition is empty".to_string(),
            line: 1,
            column: 1,
        });
    }
    let expr = parse_with_max_depth(source, max_depth)?;
    if !expr.references_fields() {
        return Err(ParseError {
            message: "Condition references no fields".to_string(),
            line: 1,
            column: 1,
        });
    }
    Ok(expr)
}

/// Parse and evaluate `source` in one step.
pub fn evaluate(source: &str, fields: &Fields) -> bool {
    Condition::compile(source).matches(fields)
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Evaluate an expression in boolean context, short-circuiting `&&` and `||`.
pub fn evaluate_expr(expr: &Expr, fields: &Fields) -> bool {
    match expr {
        Expr::Literal(lit) => literal_value(lit).is_truthy(),
        Expr::FieldRef(name) => fields.lookup(name).is_truthy(),
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => !evaluate_expr(operand, fields),
        Expr::Binary { op, lhs, rhs } => match op {
            BinaryOp::And => evaluate_expr(lhs, fields) && evaluate_expr(rhs, fields),
            BinaryOp::Or => evaluate_expr(lhs, fields) || evaluate_expr(rhs, fields),
            _ => {
                let left = operand_value(lhs, fields);
                let right = operand_value(rhs, fields);
                compare(*op, &left, &right)
            }
        },
    }
}

fn literal_value(lit: &Literal) -> FieldValue {
    match lit {
        Literal::Bool(b) => FieldValue::Bool(*b),
        Literal::Number(n) => FieldValue::Number(*n),
        Literal::String(s) => FieldValue::Text(s.clone()),
    }
}

fn operand_value<'a>(expr: &Expr, fields: &'a Fields) -> Cow<'a, FieldValue> {
    match expr {
        Expr::Literal(lit) => Cow::Owned(literal_value(lit)),
        Expr::FieldRef(name) => Cow::Borrowed(fields.lookup(name)),
        _ => Cow::Owned(FieldValue::Bool(evaluate_expr(expr, fields))),
    }
}

/// Compare two values.
///
/// Absent takes the zero of the other side (`0`, `false`, `""`). Booleans
/// order as `false < true` and compare to numbers as `0`/`1`. Text against
/// a number or boolean is equal only when the other side prints the same
/// text, and never ordered.
pub fn compare(op: BinaryOp, lhs: &FieldValue, rhs: &FieldValue) -> bool {
    let (lhs, rhs) = fill_absent(lhs, rhs);
    match ordering(&lhs, &rhs) {
        Some(ord) => match op {
            BinaryOp::Eq => ord == Ordering::Equal,
            BinaryOp::Ne => ord != Ordering::Equal,
            BinaryOp::Lt => ord == Ordering::Less,
            BinaryOp::Le => ord != Ordering::Greater,
            BinaryOp::Gt => ord == Ordering::Greater,
            BinaryOp::Ge => ord != Ordering::Less,
            BinaryOp::And | BinaryOp::Or => false,
        },
        None => {
            let same_text = lhs.to_string() == rhs.to_string();
            match op {
                BinaryOp::Eq => same_text,
                BinaryOp::Ne => !same_text,
                _ => false,
            }
        }
    }
}

fn fill_absent<'a>(
    lhs: &'a FieldValue,
    rhs: &'a FieldValue,
) -> (Cow<'a, FieldValue>, Cow<'a, FieldValue>) {
    match (lhs, rhs) {
        (FieldValue::Absent, FieldValue::Absent) => (
            Cow::Owned(FieldValue::Bool(false)),
            Cow::Owned(FieldValue::Bool(false)),
        ),
        (FieldValue::Absent, other) => (Cow::Owned(zero_like(other)), Cow::Borrowed(rhs)),
        (other, FieldValue::Absent) => (Cow::Borrowed(lhs), Cow::Owned(zero_like(other))),
        _ => (Cow::Borrowed(lhs), Cow::Borrowed(rhs)),
    }
}

fn zero_like(value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::Number(_) => FieldValue::Number(0.0),
        FieldValue::Bool(_) | FieldValue::Absent => FieldValue::Bool(false),
        FieldValue::Text(_) => FieldValue::Text(String::new()),
    }
}

fn ordering(lhs: &FieldValue, rhs: &FieldValue) -> Option<Ordering> {
    match (lhs, rhs) {
        (FieldValue::Number(a), FieldValue::Number(b)) => a.partial_cmp(b),
        (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
        (FieldValue::Bool(a), FieldValue::Number(b)) => bool_number(*a).partial_cmp(b),
        (FieldValue::Number(a), FieldValue::Bool(b)) => a.partial_cmp(&bool_number(*b)),
        (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn bool_number(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

// ============================================================================
// CONDITION CACHE
// ============================================================================

/// Compiled conditions keyed by source text.
#[derive(Debug, Clone)]
pub struct ConditionCache {
    max_depth: usize,
    entries: HashMap<String, Arc<Condition>>,
}

impl Default for ConditionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionCache {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            entries: HashMap::new(),
        }
    }

    pub fn get_or_compile(&mut self, source: &str) -> Arc<Condition> {
        if let Some(cond) = self.entries.get(source) {
            return Arc::clone(cond);
        }
        let cond = Arc::new(Condition::compile_with_depth(source, self.max_depth));
        self.entries.insert(source.to_string(), Arc::clone(&cond));
        cond
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
