//! Rules and rule sets

use crate::RuleSetError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A user-authored annotation rule.
///
/// `condition` is stored as written. An unparsable condition is a valid
/// rule that never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub condition: String,
    pub template: String,
    #[serde(default)]
    pub numbered: bool,
}

impl Rule {
    /// An unnumbered rule.
    pub fn new(condition: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            template: template.into(),
            numbered: false,
        }
    }

    /// A numbered rule.
    pub fn numbered(condition: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            numbered: true,
            ..Self::new(condition, template)
        }
    }
}

/// Ordered rules. Order drives both evaluation and numbering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Parse a JSON array of rules.
    pub fn from_json(json: &str) -> Result<Self, RuleSetError> {
        serde_json::from_str(json).map_err(|e| RuleSetError::InvalidDocument {
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String, RuleSetError> {
        serde_json::to_string_pretty(self).map_err(|e| RuleSetError::InvalidDocument {
            reason: e.to_string(),
        })
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Replace the rule at `index`, returning the old one.
    pub fn replace(&mut self, index: usize, rule: Rule) -> Result<Rule, RuleSetError> {
        let len = self.rules.len();
        let slot = self
            .rules
            .get_mut(index)
            .ok_or(RuleSetError::IndexOutOfBounds { index, len })?;
        Ok(std::mem::replace(slot, rule))
    }

    pub fn remove(&mut self, index: usize) -> Result<Rule, RuleSetError> {
        if index >= self.rules.len() {
            return Err(RuleSetError::IndexOutOfBounds {
                index,
                len: self.rules.len(),
            });
        }
        Ok(self.rules.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn as_slice(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// SHA-256 over every rule's fields, hex encoded.
    ///
    /// Each string is length-prefixed so `("ab", "c")` and `("a", "bc")`
    /// hash differently.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.rules.len() as u64).to_le_bytes());
        for rule in &self.rules {
            for part in [&rule.condition, &rule.template] {
                hasher.update((part.len() as u64).to_le_bytes());
                hasher.update(part.as_bytes());
            }
            hasher.update([rule.numbered as u8]);
        }
        hex::encode(hasher.finalize())
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

// =============================================================================
// TESTS
// =============================================================================
