//! JSON document anonymization

pub mod keys;
pub mod transform;

pub use keys::{classify_key, KeyClass, KEY_RULES_VERSION};
pub use transform::{deanonymize, Folded, JsonTransformer};
