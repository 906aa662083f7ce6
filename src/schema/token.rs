/// Tokens — the weighted content fragments a corpus is made of.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Descriptive key/value tags attached to a token.
pub type Tags = HashMap<String, String>;

/// Weight given to tokens whose configured weight is zero or negative.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// A single piece of content that can be substituted into generated output.
///
/// Tokens are immutable once added to an [`Inventory`](crate::core::inventory::Inventory);
/// the inventory only hands out shared borrows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub category: String,
    pub content: String,
    pub weight: f64,
    #[serde(default)]
    pub tags: Tags,
    /// State variables assigned when this token is rendered.
    #[serde(default)]
    pub on_select: HashMap<String, String>,
}

impl Token {
    pub fn new(
        category: impl Into<String>,
        content: impl Into<String>,
        weight: f64,
        tags: Tags,
    ) -> Self {
        Self {
            category: category.into(),
            content: content.into(),
            weight,
            tags,
            on_select: HashMap::new(),
        }
    }

    /// Set `variable` to `value` in the run state whenever this token is rendered.
    pub fn on_select(mut self, variable: impl Into<String>, value: impl Into<String>) -> Self {
        self.on_select.insert(variable.into(), value.into());
        self
    }

    /// Bring the token in line with the required invariants.
    ///
    /// The category is trimmed of surrounding whitespace and a non-positive
    /// weight is replaced by [`DEFAULT_WEIGHT`]. Content is left untouched.
    pub fn normalize(&mut self) {
        let trimmed = self.category.trim();
        if trimmed.len() != self.category.len() {
            self.category = trimmed.to_string();
        }
        if self.weight <= 0.0 {
            self.weight = DEFAULT_WEIGHT;
        }
    }

    /// Whether the token is usable for generation.
    ///
    /// Untrusted input should be passed through [`normalize`](Self::normalize)
    /// first; a token that fails here may become valid afterwards.
    pub fn is_valid(&self) -> bool {
        !self.category.is_empty()
            && !self.content.is_empty()
            && self.weight.is_finite()
            && self.weight > 0.0
    }
}
