/// The token corpus — storage, tag queries, weighted picks and loading.
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

use crate::core::selector::Selector;
use crate::schema::token::{Tags, Token};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("YAML deserialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported corpus format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// All tokens known to a generator, grouped by category.
///
/// Within a category tokens keep their insertion order; that order is the
/// tie-break for weighted selection.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    dictionary: FxHashMap<String, Vec<Token>>,
    total_weight: FxHashMap<String, f64>,
}

// Corpus records are looser than `Token`: every field may be missing, and
// the legacy `rarity`/`properties`/`set`/`setvars` spellings are accepted.

#[derive(Debug, Deserialize)]
struct TokenRecord {
    #[serde(default)]
    category: String,
    #[serde(default)]
    content: String,
    #[serde(default, alias = "weight")]
    rarity: f64,
    #[serde(default, alias = "properties")]
    tags: Tags,
    #[serde(default, alias = "on_select", alias = "setvars")]
    set: HashMap<String, String>,
}

impl From<TokenRecord> for Token {
    fn from(record: TokenRecord) -> Self {
        Token {
            category: record.category,
            content: record.content,
            weight: record.rarity,
            tags: record.tags,
            on_select: record.set,
        }
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token to its category. No de-duplication is done.
    pub fn add(&mut self, token: Token) -> &Token {
        *self
            .total_weight
            .entry(token.category.clone())
            .or_insert(0.0) += token.weight;

        let list = self.dictionary.entry(token.category.clone()).or_default();
        list.push(token);
        &list[list.len() - 1]
    }

    /// Build and append a token.
    pub fn add_token(
        &mut self,
        category: &str,
        content: &str,
        weight: f64,
        tags: Tags,
    ) -> &Token {
        self.add(Token::new(category, content, weight, tags))
    }

    /// Append every token of `other`, keeping their per-category order.
    pub fn merge(&mut self, other: Inventory) {
        for (_, tokens) in other.dictionary {
            for token in tokens {
                self.add(token);
            }
        }
    }

    /// Tokens under `category`, in insertion order.
    pub fn tokens(&self, category: &str) -> &[Token] {
        self.dictionary
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.dictionary.keys().map(String::as_str)
    }

    /// Every token in the inventory, category by category.
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.dictionary.values().flatten()
    }

    /// Summed weight of every token under `category`, ignoring tags.
    pub fn total_weight(&self, category: &str) -> f64 {
        self.total_weight.get(category).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.dictionary.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dictionary.is_empty()
    }

    /// Candidate tokens for `selector` and their combined weight.
    ///
    /// Simple selectors are answered from the precomputed category total;
    /// constrained ones scan the category in insertion order.
    pub fn query(&self, selector: &Selector) -> (Vec<&Token>, f64) {
        let Some(list) = self.dictionary.get(&selector.category) else {
            return (Vec::new(), 0.0);
        };

        if selector.is_simple() {
            return (list.iter().collect(), self.total_weight(&selector.category));
        }

        let mut total = 0.0;
        let candidates: Vec<&Token> = list
            .iter()
            .filter(|t| selector.matches_token(t))
            .inspect(|t| total += t.weight)
            .collect();

        (candidates, total)
    }

    /// Weighted pick by inverse CDF over the ordered candidates.
    ///
    /// `offset` is expected in `[0, 1)`: zero always yields the first
    /// candidate and values approaching one yield the last. Returns `None`
    /// when nothing matches.
    pub fn pick(&self, selector: &Selector, offset: f64) -> Option<&Token> {
        let (candidates, total) = self.query(selector);
        let mut target = offset * total;
        // An infinite weight turns offset zero into NaN; keep it on the first candidate.
        if target.is_nan() {
            target = 0.0;
        }
        trace!(
            category = %selector.category,
            candidates = candidates.len(),
            target,
            "picking token"
        );

        let mut picked = None;
        for token in candidates {
            if target < 0.0 {
                break;
            }
            picked = Some(token);
            target -= token.weight;
        }
        picked
    }

    /// Content of the picked token, or an empty string on no match.
    pub fn pick_value(&self, selector: &Selector, offset: f64) -> String {
        self.pick(selector, offset)
            .map(|t| t.content.clone())
            .unwrap_or_default()
    }

    /// Build an inventory from a single corpus file.
    pub fn from_file(path: &Path) -> Result<Inventory, InventoryError> {
        let mut inventory = Inventory::new();
        inventory.load(path)?;
        Ok(inventory)
    }

    /// Load a corpus file, picking the format from its extension
    /// (`.ron`, `.yml` or `.yaml`). Returns the number of tokens accepted.
    pub fn load(&mut self, path: &Path) -> Result<usize, InventoryError> {
        let format = path.extension().and_then(|s| s.to_str());
        if !matches!(format, Some("ron" | "yml" | "yaml")) {
            return Err(InventoryError::UnsupportedFormat(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let accepted = if format == Some("ron") {
            self.load_ron_str(&contents)?
        } else {
            self.load_yaml_str(&contents)?
        };

        debug!(path = %path.display(), accepted, "loaded corpus file");
        Ok(accepted)
    }

    /// Load tokens from a RON list of records.
    pub fn load_ron_str(&mut self, input: &str) -> Result<usize, InventoryError> {
        if input.trim().is_empty() {
            return Ok(0);
        }
        let records: Vec<TokenRecord> = ron::from_str(input)?;
        Ok(self.accept_records(records))
    }

    /// Load tokens from a YAML sequence of records.
    pub fn load_yaml_str(&mut self, input: &str) -> Result<usize, InventoryError> {
        if input.trim().is_empty() {
            return Ok(0);
        }
        let records: Option<Vec<TokenRecord>> = serde_yaml::from_str(input)?;
        Ok(self.accept_records(records.unwrap_or_default()))
    }

    /// Normalize each record and keep the valid ones; the rest are dropped.
    fn accept_records(&mut self, records: Vec<TokenRecord>) -> usize {
        let mut accepted = 0;
        for record in records {
            let mut token = Token::from(record);
            token.normalize();
            if token.is_valid() {
                self.add(token);
                accepted += 1;
            } else {
                debug!(
                    category = %token.category,
                    content = %token.content,
                    "dropped invalid token record"
                );
            }
        }
        accepted
    }
}
