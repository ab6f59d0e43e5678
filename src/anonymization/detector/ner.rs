//! External named-entity recognition collaborator
//!
//! A recognizer only ever enriches the pattern library. If it fails, the
//! detector logs the failure and continues with pattern matches alone.

use crate::anonymization::models::Entity;
use crate::domain::Result;

/// External NER service returning entities in Harbor's own shape
///
/// Implementations are responsible for mapping their label set onto
/// [`EntityType`](crate::anonymization::models::EntityType) and for dropping
/// clinical labels (conditions, medications, procedures) that have no
/// identifier counterpart.
pub trait EntityRecognizer: Send + Sync {
    /// Service name used in log events
    fn name(&self) -> &str;

    /// Detect entities in `text`; offsets are byte offsets into `text`
    fn detect_entities(&self, text: &str) -> Result<Vec<Entity>>;
}

/// Keep only entities whose span is valid for `text` and matches its value
pub(crate) fn validated(text: &str, entities: Vec<Entity>) -> Vec<Entity> {
    entities
        .into_iter()
        .filter(|e| {
            e.begin < e.end
                && e.end <= text.len()
                && text.is_char_boundary(e.begin)
                && text.is_char_boundary(e.end)
                && text[e.begin..e.end] == e.original_value
        })
        .map(Entity::from_ner)
        .collect()
}
