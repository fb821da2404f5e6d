//! Pretty printer for condition ASTs
//!
//! Output uses the minimum parentheses needed for [`crate::parse`] to
//! rebuild the same tree.

use crate::parser::*;
use std::fmt::Write;

/// Binding strength of `!` relative to [`BinaryOp::precedence`].
const NOT_PRECEDENCE: u8 = 3;
const ATOM_PRECEDENCE: u8 = 5;

/// Pretty-print an expression back to condition source.
pub fn pretty_print(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Literal(_) | Expr::FieldRef(_) => ATOM_PRECEDENCE,
        Expr::Unary { .. } => NOT_PRECEDENCE,
        Expr::Binary { op, .. } => op.precedence(),
    }
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Literal(lit) => write_literal(out, lit),
        Expr::FieldRef(name) => write_field(out, name),
        Expr::Unary { operand, .. } => {
            out.push('!');
            // `!a == b` already reads as `!(a == b)`.
            let wrap = matches!(operand.as_ref(), Expr::Binary { op, .. } if op.is_logical());
            write_wrapped(out, operand, wrap);
        }
        Expr::Binary { op, lhs, rhs } => {
            if op.is_logical() {
                let prec = op.precedence();
                write_wrapped(out, lhs, precedence(lhs) < prec);
                let _ = write!(out, " {} ", op.symbol());
                write_wrapped(out, rhs, precedence(rhs) <= prec);
            } else {
                // Comparisons do not chain, so any compound operand is grouped.
                write_wrapped(out, lhs, precedence(lhs) != ATOM_PRECEDENCE);
                let _ = write!(out, " {} ", op.symbol());
                write_wrapped(out, rhs, precedence(rhs) != ATOM_PRECEDENCE);
            }
        }
    }
}

fn write_wrapped(out: &mut String, expr: &Expr, wrap: bool) {
    if wrap {
        out.push('(');
        write_expr(out, expr);
        out.push(')');
    } else {
        write_expr(out, expr);
    }
}

fn write_literal(out: &mut String, lit: &Literal) {
    match lit {
        Literal::Bool(b) => {
            let _ = write!(out, "{}", b);
        }
        Literal::Number(n) => {
            let _ = write!(out, "{}", n);
        }
        Literal::String(s) => {
            let _ = write!(out, "\"{}\"", escape_string(s));
        }
    }
}

fn write_field(out: &mut String, name: &str) {
    if is_plain_identifier(name) {
        out.push_str(name);
    } else {
        let _ = write!(out, "`{}`", name);
    }
}

/// Whether `name` can be written without backticks.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        .unwrap_or(false);
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && name != "true"
        && name != "false"
}

/// Escape a string for inclusion in a double-quoted literal.
pub fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            c => result.push(c),
        }
    }
    result
}

// ============================================================================
// TESTS
// ============================================================================
