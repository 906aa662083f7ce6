/// Token selectors — category plus tag constraints.
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::LazyLock;

use crate::schema::token::Token;

/// One constraint clause: `key`, `key=value` or `key!=value`.
static CLAUSE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)(\w+)((!?=)(\w+))?").expect("clause pattern is valid"));

/// A structured query for tokens: the category to draw from and the tag
/// characteristics a token must (or must not) carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    pub category: String,
    pub require: FxHashMap<String, String>,
    pub exclude: FxHashMap<String, String>,
    pub exists: FxHashSet<String>,
}

impl Selector {
    /// An unconstrained selector over `category`.
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Self::default()
        }
    }

    /// Parse a clause list such as `type=mammal,env!=water,extant`.
    ///
    /// Clauses are found left to right anywhere in the string; separators
    /// and any other non-matching characters are skipped.
    pub fn parse(category: impl Into<String>, clauses: &str) -> Self {
        let mut selector = Self::new(category);

        for caps in CLAUSE_PATTERN.captures_iter(clauses) {
            let key = caps[1].to_string();
            match (caps.get(3).map(|m| m.as_str()), caps.get(4)) {
                (Some("="), Some(value)) => {
                    selector.require.insert(key, value.as_str().to_string());
                }
                (Some("!="), Some(value)) => {
                    selector.exclude.insert(key, value.as_str().to_string());
                }
                _ => {
                    selector.exists.insert(key);
                }
            }
        }

        selector
    }

    /// Require tag `key` to equal `value`.
    pub fn require(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.require.insert(key.into(), value.into());
        self
    }

    /// Reject tokens whose tag `key` equals `value`.
    pub fn exclude(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.exclude.insert(key.into(), value.into());
        self
    }

    /// Require tag `key` to be present with any value.
    pub fn exists(mut self, key: impl Into<String>) -> Self {
        self.exists.insert(key.into());
        self
    }

    /// True when the selector constrains nothing but the category.
    pub fn is_simple(&self) -> bool {
        self.require.is_empty() && self.exclude.is_empty() && self.exists.is_empty()
    }

    /// Whether `token`'s tags satisfy every constraint.
    ///
    /// A missing tag never equals a required value, and never triggers an
    /// exclusion.
    pub fn matches_token(&self, token: &Token) -> bool {
        let required = self
            .require
            .iter()
            .all(|(k, v)| token.tags.get(k) == Some(v));
        let not_excluded = self
            .exclude
            .iter()
            .all(|(k, v)| token.tags.get(k) != Some(v));
        let present = self.exists.iter().all(|k| token.tags.contains_key(k));

        required && not_excluded && present
    }
}
