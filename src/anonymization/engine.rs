//! Pseudonymization core
//!
//! [`Pseudonymizer`] wires the detector, the overlap resolver, the pseudonym
//! generator and the substitution passes together. It performs no I/O: the
//! caller supplies the identity's stored mappings and persists the proposals
//! it returns. [`PseudonymizationService`](super::service::PseudonymizationService)
//! does exactly that against the store collaborators.
//!
//! # Examples
//!
//! ```
//! use harbor::anonymization::{AnonymizationConfig, Pseudonymizer};
//! use harbor::domain::IdentityId;
//!
//! # fn example() -> harbor::domain::Result<()> {
//! let core = Pseudonymizer::from_config(&AnonymizationConfig::default())?;
//! let identity = IdentityId::new_v4();
//!
//! let text = "Patient: John Smith, DOB: 03/15/1975, MRN: ABC-123456";
//! let anonymized = core.anonymize_text(identity, text, &[]);
//! assert!(anonymized.text.contains("XX/XX/1975"));
//!
//! let restored = core.deanonymize_text(&anonymized.text, &anonymized.proposed);
//! assert_eq!(restored.value, text);
//! # Ok(())
//! # }
//! ```

use crate::anonymization::compliance::SafeHarborRules;
use crate::anonymization::config::AnonymizationConfig;
use crate::anonymization::detector::{PatternRegistry, PhiDetector, RegexDetector};
use crate::anonymization::json::{self, Folded, JsonTransformer};
use crate::anonymization::models::{Entity, EntityType, PseudonymMapping};
use crate::anonymization::pseudonym::{MappingScope, PseudonymGenerator, PseudonymResolver};
use crate::anonymization::report::DetectionReport;
use crate::anonymization::substitution::{self, Decision};
use crate::domain::{HarborError, IdentityId, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Result of anonymizing one text
#[derive(Debug, Clone, Default)]
pub struct TextAnonymization {
    pub text: String,
    /// Entities detected in the input, ascending by offset
    pub entities: Vec<Entity>,
    /// One decision per entity
    pub decisions: Vec<Decision>,
    /// Mappings this call generated; not yet persisted
    pub proposed: Vec<PseudonymMapping>,
}

impl TextAnonymization {
    /// Number of values replaced in the output
    pub fn substituted_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_substituted()).count()
    }

    /// Distinct types of the replaced values, sorted
    pub fn substituted_types(&self) -> Vec<EntityType> {
        self.decisions
            .iter()
            .filter(|d| d.is_substituted())
            .map(Decision::entity_type)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Result of restoring original values
#[derive(Debug, Clone, PartialEq)]
pub struct Restoration<T> {
    pub value: T,
    /// Number of fake values replaced by their original
    pub restored_count: usize,
}

impl<T> Restoration<T> {
    /// Input returned as-is, nothing restored
    pub fn unchanged(value: T) -> Self {
        Self {
            value,
            restored_count: 0,
        }
    }
}

/// Stateless detection and pseudonymization core
///
/// Holds no mutable state, so one instance can be shared behind an `Arc`
/// by any number of concurrent callers.
pub struct Pseudonymizer {
    detector: Arc<dyn PhiDetector>,
    generator: PseudonymGenerator,
}

impl Pseudonymizer {
    /// Create a core over an arbitrary detector
    pub fn new(detector: Arc<dyn PhiDetector>, rules: SafeHarborRules) -> Self {
        Self {
            detector,
            generator: PseudonymGenerator::new(rules),
        }
    }

    /// Build the regex detector and Safe Harbor rules described by `config`
    ///
    /// # Errors
    ///
    /// Returns [`HarborError::Configuration`] when `config` fails validation
    /// and [`HarborError::PatternLibrary`] when the pattern library cannot be
    /// loaded.
    pub fn from_config(config: &AnonymizationConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| HarborError::Configuration(format!("{e:#}")))?;

        let registry = match config.detection.pattern_library {
            Some(ref path) => PatternRegistry::from_file(path)?,
            None => PatternRegistry::default_patterns()?,
        };
        let detector = RegexDetector::with_registry(registry)
            .with_confidence_threshold(config.detection.confidence_threshold)
            .with_provider_exemption(config.safe_harbor.preserve_provider_names);

        tracing::debug!(
            pattern_version = detector.version(),
            confidence_threshold = config.detection.confidence_threshold,
            "Pseudonymizer initialized"
        );

        Ok(Self::new(
            Arc::new(detector),
            SafeHarborRules::new(&config.safe_harbor),
        ))
    }

    pub fn detector(&self) -> &dyn PhiDetector {
        self.detector.as_ref()
    }

    pub fn generator(&self) -> &PseudonymGenerator {
        &self.generator
    }

    /// Detect entities: non-overlapping and sorted by begin offset
    pub fn detect(&self, text: &str) -> Vec<Entity> {
        self.detector.detect(text)
    }

    /// Detection summary without any values
    pub fn report(&self, text: &str) -> DetectionReport {
        DetectionReport::new(self.detector.version(), text, &self.detect(text))
    }

    /// Replace every detected identifier in `text`
    ///
    /// `stored` holds the identity's persisted mappings; they take precedence
    /// over anything generated here.
    pub fn anonymize_text(
        &self,
        identity_id: IdentityId,
        text: &str,
        stored: &[PseudonymMapping],
    ) -> TextAnonymization {
        let entities = self.detect(text);
        self.anonymize_entities(identity_id, text, entities, stored)
    }

    /// Same as [`anonymize_text`](Self::anonymize_text), over entities the caller detected
    pub fn anonymize_entities(
        &self,
        identity_id: IdentityId,
        text: &str,
        entities: Vec<Entity>,
        stored: &[PseudonymMapping],
    ) -> TextAnonymization {
        let resolver = PseudonymResolver::new(identity_id, &self.generator);
        let scope = MappingScope::root(stored);
        let substitution = substitution::anonymize(text, &entities, &resolver, &scope);

        TextAnonymization {
            text: substitution.text,
            entities,
            decisions: substitution.decisions,
            proposed: substitution.proposed,
        }
    }

    /// Restore original values in `text`
    pub fn deanonymize_text(
        &self,
        text: &str,
        mappings: &[PseudonymMapping],
    ) -> Restoration<String> {
        let (value, restored_count) = substitution::deanonymize(text, mappings);
        Restoration {
            value,
            restored_count,
        }
    }

    /// Anonymize a JSON value, keeping its shape
    pub fn anonymize_json(
        &self,
        identity_id: IdentityId,
        value: &Value,
        stored: &[PseudonymMapping],
    ) -> Folded {
        let resolver = PseudonymResolver::new(identity_id, &self.generator);
        JsonTransformer::new(self.detector.as_ref(), resolver)
            .anonymize(value, &MappingScope::root(stored))
    }

    /// Restore original values in every string of `value`
    pub fn deanonymize_json(
        &self,
        value: &Value,
        mappings: &[PseudonymMapping],
    ) -> Restoration<Value> {
        let (value, restored_count) = json::deanonymize(value, mappings);
        Restoration {
            value,
            restored_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCENARIO: &str = "Patient: John Smith, DOB: 03/15/1975, MRN: ABC-123456";

    fn core() -> Pseudonymizer {
        Pseudonymizer::from_config(&AnonymizationConfig::default()).unwrap()
    }

    #[test]
    fn test_scenario_round_trip() {
        let core = core();
        let identity = IdentityId::new_v4();

        let anonymized = core.anonymize_text(identity, SCENARIO, &[]);
        assert_ne!(anonymized.text, SCENARIO);
        assert!(!anonymized.text.contains("John Smith"));
        assert!(!anonymized.text.contains("ABC-123456"));
        assert!(anonymized.text.contains("XX/XX/1975"));
        assert_eq!(anonymized.proposed.len(), 3);
        assert_eq!(
            anonymized.substituted_types(),
            vec![EntityType::Name, EntityType::Date, EntityType::Mrn]
        );

        let restored = core.deanonymize_text(&anonymized.text, &anonymized.proposed);
        assert_eq!(restored.value, SCENARIO);
        assert_eq!(restored.restored_count, 3);
    }

    #[test]
    fn test_stored_mappings_are_reused() {
        let core = core();
        let identity = IdentityId::new_v4();

        let first = core.anonymize_text(identity, "Contact: jsmith@email.com", &[]);
        let second = core.anonymize_text(identity, "Email jsmith@email.com again", &first.proposed);
        assert!(second.proposed.is_empty());
        let fake = &first.proposed[0].fake_value;
        assert!(second.text.contains(fake.as_str()));
    }

    #[test]
    fn test_stored_row_beats_generator() {
        let core = core();
        let identity = IdentityId::new_v4();
        let stored = vec![PseudonymMapping::new(
            identity,
            EntityType::Ssn,
            "123-45-6789",
            "pool_ssn",
            "900-00-0001",
        )];

        let anonymized = core.anonymize_text(identity, "SSN: 123-45-6789", &stored);
        assert_eq!(anonymized.text, "SSN: 900-00-0001");
        assert!(anonymized.proposed.is_empty());
    }

    #[test]
    fn test_age_rule() {
        let core = core();
        let identity = IdentityId::new_v4();

        let old = core.anonymize_text(identity, "He is 92 years old", &[]);
        assert!(old.text.contains("90 or older"));

        let young = core.anonymize_text(identity, "She is 85 years old", &[]);
        assert_eq!(young.text, "She is 85 years old");
        assert!(young.proposed.is_empty());
        assert!(matches!(
            young.decisions.as_slice(),
            [Decision::ExemptPassthrough { .. }]
        ));
    }

    #[test]
    fn test_text_without_identifiers_is_unchanged() {
        let core = core();
        let text = "Medications: Metformin 1000mg BID";
        let anonymized = core.anonymize_text(IdentityId::new_v4(), text, &[]);
        assert_eq!(anonymized.text, text);
        assert!(anonymized.entities.is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let core = core();
        let identity = IdentityId::new_v4();
        let document = json!({
            "patient": {"name": "John Smith", "ssn": "123-45-6789"},
            "notes": "Seen by Dr. Jane Doe"
        });

        let folded = core.anonymize_json(identity, &document, &[]);
        assert_eq!(folded.value["notes"], "Seen by Dr. Jane Doe");
        assert_ne!(folded.value["patient"]["name"], "John Smith");

        let restored = core.deanonymize_json(&folded.value, &folded.proposed);
        assert_eq!(restored.value, document);
        assert_eq!(restored.restored_count, 2);
    }

    #[test]
    fn test_report_has_pattern_version() {
        let report = core().report(SCENARIO);
        assert_eq!(report.pattern_version, "2025.1");
        assert_eq!(report.total_entities, 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AnonymizationConfig::default();
        config.detection.confidence_threshold = -0.5;
        assert!(matches!(
            Pseudonymizer::from_config(&config),
            Err(HarborError::Configuration(_))
        ));
    }
}
