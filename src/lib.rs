//! Textforge — weighted, tag-filtered template expansion.
//!
//! Expands instruction strings such as `"A [Description] [Animal:type=mammal]"`
//! against a weighted corpus of tokens and a run-scoped variable store,
//! resolving nested placeholders innermost-first over bounded rounds.

pub mod core;
pub mod schema;

pub use crate::core::generator::{Generator, GeneratorBuilder, GeneratorError};
pub use crate::core::inventory::{Inventory, InventoryError};
pub use crate::core::random::RandomSource;
pub use crate::core::render::RenderConfig;
pub use crate::core::selector::Selector;
pub use crate::schema::state::State;
pub use crate::schema::token::{Tags, Token};
