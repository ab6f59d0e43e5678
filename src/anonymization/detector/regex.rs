//! Pattern-library detector with provider exemption

use super::ner::{self, EntityRecognizer};
use super::patterns::{CompiledMatcher, Exemption, PatternRegistry};
use super::PhiDetector;
use crate::anonymization::models::{Entity, EntityType};
use crate::domain::Result;
use std::sync::Arc;

/// Regex-based PHI detector
pub struct RegexDetector {
    pattern_registry: Arc<PatternRegistry>,
    confidence_threshold: f32,
    preserve_provider_names: bool,
    recognizer: Option<Arc<dyn EntityRecognizer>>,
}

impl RegexDetector {
    /// Create a detector over the built-in pattern library
    pub fn new() -> Result<Self> {
        Ok(Self::with_registry(PatternRegistry::default_patterns()?))
    }

    /// Create a detector over a custom pattern registry
    pub fn with_registry(registry: PatternRegistry) -> Self {
        Self {
            pattern_registry: Arc::new(registry),
            confidence_threshold: 0.8,
            preserve_provider_names: true,
            recognizer: None,
        }
    }

    /// Set the confidence threshold
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Toggle the provider-name exemption
    pub fn with_provider_exemption(mut self, enabled: bool) -> Self {
        self.preserve_provider_names = enabled;
        self
    }

    /// Attach an external NER collaborator
    pub fn with_recognizer(mut self, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Pattern registry in use
    pub fn registry(&self) -> &PatternRegistry {
        &self.pattern_registry
    }

    fn run_matcher(
        &self,
        matcher: &CompiledMatcher,
        text: &str,
        provider_spans: &[(usize, usize)],
        out: &mut Vec<Entity>,
    ) {
        for captures in matcher.regex.captures_iter(text) {
            let captures = match captures {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(
                        entity_type = %matcher.entity_type,
                        error = %e,
                        "Matcher failed, skipping its remaining matches"
                    );
                    return;
                }
            };
            let Some(found) = captures.get(matcher.group) else {
                continue;
            };
            if found.start() == found.end()
                || !matcher.context_satisfied(text, found.start(), found.end())
            {
                continue;
            }

            let entity = Entity::new(
                matcher.entity_type,
                found.as_str(),
                found.start(),
                found.end(),
                matcher.score,
            );
            if matcher.exemption == Some(Exemption::Provider)
                && self.inside_provider_span(&entity, provider_spans)
            {
                continue;
            }
            if self.is_acceptable(&entity) {
                out.push(entity);
            }
        }
    }

    fn inside_provider_span(&self, entity: &Entity, provider_spans: &[(usize, usize)]) -> bool {
        self.preserve_provider_names
            && provider_spans
                .iter()
                .any(|&(begin, end)| entity.within(begin, end))
    }

    /// Reject names built from clinical vocabulary, form labels or street words
    fn is_acceptable(&self, entity: &Entity) -> bool {
        if entity.entity_type != EntityType::Name {
            return true;
        }
        !entity
            .original_value
            .split_whitespace()
            .any(|token| self.pattern_registry.is_non_name_term(token))
    }

    fn recognizer_candidates(
        &self,
        recognizer: &dyn EntityRecognizer,
        text: &str,
        provider_spans: &[(usize, usize)],
    ) -> Vec<Entity> {
        match recognizer.detect_entities(text) {
            Ok(entities) => ner::validated(text, entities)
                .into_iter()
                .filter(|e| e.score >= self.confidence_threshold)
                .filter(|e| {
                    e.entity_type != EntityType::Name
                        || !self.inside_provider_span(e, provider_spans)
                })
                .filter(|e| self.is_acceptable(e))
                .collect(),
            Err(e) => {
                tracing::warn!(
                    recognizer = recognizer.name(),
                    error = %e,
                    "Entity recognizer unavailable, using pattern library only"
                );
                Vec::new()
            }
        }
    }
}

impl PhiDetector for RegexDetector {
    fn detect_candidates(&self, text: &str) -> Vec<Entity> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let provider_spans = if self.preserve_provider_names {
            self.pattern_registry.provider_spans(text)
        } else {
            Vec::new()
        };

        let mut candidates = Vec::new();
        for matcher in self.pattern_registry.matchers() {
            if matcher.score < self.confidence_threshold {
                continue;
            }
            self.run_matcher(matcher, text, &provider_spans, &mut candidates);
        }

        if let Some(ref recognizer) = self.recognizer {
            candidates.extend(self.recognizer_candidates(recognizer.as_ref(), text, &provider_spans));
        }

        tracing::debug!(candidates = candidates.len(), "Detection pass complete");
        candidates
    }

    fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    fn is_provider_reference(&self, text: &str) -> bool {
        if !self.preserve_provider_names {
            return false;
        }
        let value = text.trim_matches(|c: char| !c.is_alphanumeric());
        if value.is_empty() {
            return false;
        }
        let begin = text.len() - text.trim_start_matches(|c: char| !c.is_alphanumeric()).len();
        let end = begin + value.len();

        // the provider spans together must cover the whole value
        let mut spans = self.pattern_registry.provider_spans(text);
        spans.sort_unstable();
        let mut covered = begin;
        for (span_begin, span_end) in spans {
            if span_begin > covered {
                break;
            }
            covered = covered.max(span_end);
        }
        covered >= end
    }

    fn version(&self) -> &str {
        self.pattern_registry.version()
    }
}
