/// Offset sources driving weighted selection.
///
/// Every token placeholder draws exactly one offset in `[0, 1)`. Swapping
/// the source is how generation is made reproducible under test.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Where selection offsets come from.
#[derive(Debug, Clone)]
pub enum RandomSource {
    /// Pseudo-random offsets from a standard RNG, entropy- or seed-initialized.
    System(StdRng),
    /// The same offset on every draw.
    Fixed(f64),
    /// A finite queue of offsets supplied by the caller, consumed FIFO.
    Manual(ManualQueue),
}

impl RandomSource {
    /// Nondeterministic source seeded from OS entropy.
    pub fn system() -> Self {
        Self::System(StdRng::from_entropy())
    }

    /// Pseudo-random source with a reproducible sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::System(StdRng::seed_from_u64(seed))
    }

    pub fn fixed(value: f64) -> Self {
        Self::Fixed(value)
    }

    pub fn manual<I: IntoIterator<Item = f64>>(values: I) -> Self {
        Self::Manual(ManualQueue::new(values))
    }

    /// Draw the next offset.
    ///
    /// # Panics
    ///
    /// Panics when a manual source has run out of values. That means a
    /// caller supplied fewer controlled values than the render consumed.
    pub fn next_offset(&mut self) -> f64 {
        match self {
            Self::System(rng) => rng.gen::<f64>(),
            Self::Fixed(value) => *value,
            Self::Manual(queue) => queue.next(),
        }
    }

    /// The manual queue, if this is a manual source.
    pub fn as_manual_mut(&mut self) -> Option<&mut ManualQueue> {
        match self {
            Self::Manual(queue) => Some(queue),
            _ => None,
        }
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::system()
    }
}

/// Caller-controlled offsets for deterministic playback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualQueue {
    values: VecDeque<f64>,
}

impl ManualQueue {
    pub fn new<I: IntoIterator<Item = f64>>(values: I) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Append values to the back of the queue.
    pub fn add<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        self.values.extend(values);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    fn next(&mut self) -> f64 {
        match self.values.pop_front() {
            Some(value) => value,
            None => panic!("attempt to read from empty random source"),
        }
    }
}
