pub mod generator;
pub mod inventory;
pub mod random;
pub mod render;
pub mod selector;
