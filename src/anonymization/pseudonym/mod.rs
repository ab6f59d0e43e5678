//! Identity-scoped pseudonym generation and lookup

pub mod generator;
pub mod resolver;

pub use generator::{Generated, PseudonymGenerator, PLACEHOLDER_GENERATOR};
pub use resolver::{MappingScope, PseudonymResolver, Resolution};
