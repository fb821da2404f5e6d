//! Authoring-time validation of condition text

use crate::eval::Condition;
use crate::parser::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};

/// Outcome of [`validate`]. `message` is empty when the condition is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    pub message: String,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Check whether `source` would ever be evaluated.
///
/// An invalid condition is still a legal rule value; it simply never matches.
pub fn validate(source: &str) -> Validation {
    validate_with_depth(source, DEFAULT_MAX_DEPTH)
}

pub fn validate_with_depth(source: &str, max_depth: usize) -> Validation {
    Condition::compile_with_depth(source, max_depth).validation()
}
