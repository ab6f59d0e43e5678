//! PHI detection
//!
//! Detection runs in two stages. A detector produces raw candidate spans
//! (possibly overlapping); [`resolver::resolve_overlaps`] collapses them into
//! the final, position-ordered entity list.

pub mod ner;
pub mod patterns;
pub mod regex;
pub mod resolver;

use crate::anonymization::models::Entity;

pub use ner::EntityRecognizer;
pub use patterns::PatternRegistry;
pub use regex::RegexDetector;
pub use resolver::resolve_overlaps;

/// Trait for PHI detectors
pub trait PhiDetector: Send + Sync {
    /// Raw candidate spans, unordered and possibly overlapping
    fn detect_candidates(&self, text: &str) -> Vec<Entity>;

    /// Minimum score a candidate must reach
    fn confidence_threshold(&self) -> f32;

    /// Final entity list: non-overlapping, sorted by begin offset
    fn detect(&self, text: &str) -> Vec<Entity> {
        resolve_overlaps(self.detect_candidates(text))
    }

    /// True when the whole of `text` names a provider and is exempt from NAME treatment
    fn is_provider_reference(&self, _text: &str) -> bool {
        false
    }

    /// Version of the rules this detector runs, reported with detections
    fn version(&self) -> &str {
        "custom"
    }
}
