/// The generator façade: instructions + inventory + offset source.
///
/// Wires together the render loop, run state and randomness, and provides
/// a builder that can load corpus files.
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::core::inventory::{Inventory, InventoryError};
use crate::core::random::RandomSource;
use crate::core::render::{render_with_config, RenderConfig};
use crate::schema::state::State;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("inventory error: {0}")]
    Inventory(#[from] InventoryError),
    #[error("no instructions were provided")]
    MissingInstructions,
}

/// A reusable text generator. Each run may produce different output.
#[derive(Debug, Clone)]
pub struct Generator {
    instructions: String,
    inventory: Arc<Inventory>,
    source: RandomSource,
    config: RenderConfig,
}

/// Builder for constructing a `Generator`.
#[derive(Debug, Default)]
pub struct GeneratorBuilder {
    instructions: Option<String>,
    inventory: Option<Arc<Inventory>>,
    corpus_files: Vec<PathBuf>,
    seed: Option<u64>,
    source: Option<RandomSource>,
    config: RenderConfig,
}

impl Generator {
    /// Bind `instructions` to `inventory`, drawing offsets from the system source.
    pub fn new(instructions: impl Into<String>, inventory: impl Into<Arc<Inventory>>) -> Self {
        Self {
            instructions: instructions.into(),
            inventory: inventory.into(),
            source: RandomSource::system(),
            config: RenderConfig::default(),
        }
    }

    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder::default()
    }

    /// Render the instructions with a fresh, empty state.
    pub fn run(&mut self) -> String {
        let mut state = State::new();
        self.run_with_state(&mut state)
    }

    /// Render the instructions with caller-supplied state.
    ///
    /// Pre-set variables are visible to `[$name]` references, and variables
    /// set by selected tokens remain in `state` afterwards.
    pub fn run_with_state(&mut self, state: &mut State) -> String {
        let output = render_with_config(
            &self.instructions,
            &self.inventory,
            state,
            &mut self.source,
            &self.config,
        );
        debug!(instructions = %self.instructions, %output, "generated");
        output
    }

    /// Run `count` independent generations.
    pub fn run_many(&mut self, count: usize) -> Vec<String> {
        (0..count).map(|_| self.run()).collect()
    }

    /// Replace the offset source for all subsequent runs.
    pub fn use_random_source(&mut self, source: RandomSource) {
        self.source = source;
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn inventory(&self) -> &Arc<Inventory> {
        &self.inventory
    }

    pub fn random_source(&self) -> &RandomSource {
        &self.source
    }

    pub fn random_source_mut(&mut self) -> &mut RandomSource {
        &mut self.source
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }
}

impl GeneratorBuilder {
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Provide an inventory directly (for use without corpus files).
    pub fn inventory(mut self, inventory: impl Into<Arc<Inventory>>) -> Self {
        self.inventory = Some(inventory.into());
        self
    }

    /// Add a corpus file; files are loaded in order on top of any inventory.
    pub fn corpus_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.corpus_files.push(path.into());
        self
    }

    /// Use a seeded system source. Ignored when `random_source` is set.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn random_source(mut self, source: RandomSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn max_rounds(mut self, max_rounds: u32) -> Self {
        self.config.max_rounds = max_rounds;
        self
    }

    pub fn var_scan_limit(mut self, limit: usize) -> Self {
        self.config.var_scan_limit = limit;
        self
    }

    pub fn config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Generator, GeneratorError> {
        let instructions = self
            .instructions
            .ok_or(GeneratorError::MissingInstructions)?;

        let inventory = if self.corpus_files.is_empty() {
            self.inventory.unwrap_or_default()
        } else {
            let mut inventory = self
                .inventory
                .map(Arc::unwrap_or_clone)
                .unwrap_or_default();
            for path in &self.corpus_files {
                inventory.load(path)?;
            }
            Arc::new(inventory)
        };

        let source = match (self.source, self.seed) {
            (Some(source), _) => source,
            (None, Some(seed)) => RandomSource::seeded(seed),
            (None, None) => RandomSource::system(),
        };

        Ok(Generator {
            instructions,
            inventory,
            source,
            config: self.config,
        })
    }
}
