//! Shape-preserving JSON anonymization
//!
//! The walk is a fold: every node returns its transformed value together with
//! the mappings it proposed, and siblings see the proposals of earlier
//! siblings through a [`MappingScope`] chain. Object key order and array
//! length are never changed.

use super::keys::{classify_key, KeyClass};
use crate::anonymization::detector::PhiDetector;
use crate::anonymization::models::{EntityType, PseudonymMapping};
use crate::anonymization::pseudonym::{MappingScope, PseudonymResolver};
use crate::anonymization::substitution::{self, Decision};
use serde_json::{Map, Value};

/// Anonymized node plus what it took to produce it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Folded {
    pub value: Value,
    /// Mappings generated inside this node
    pub proposed: Vec<PseudonymMapping>,
    /// Type of every value replaced inside this node
    pub redacted: Vec<EntityType>,
}

impl Folded {
    fn unchanged(value: &Value) -> Self {
        Self {
            value: value.clone(),
            ..Self::default()
        }
    }
}

/// What the key path above a node says about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Treatment {
    /// Scan string content with the detector
    Scan,
    /// Redact the whole value as this type
    Typed(EntityType),
    /// Scan, and redact as OTHER when nothing is found
    Generic,
}

#[derive(Debug, Clone, Copy)]
struct NodeContext {
    treatment: Treatment,
    provider: bool,
    clinical: bool,
}

impl NodeContext {
    fn root() -> Self {
        Self {
            treatment: Treatment::Scan,
            provider: false,
            clinical: false,
        }
    }

    fn child(self, key: &str) -> Self {
        let inherited = match self.treatment {
            Treatment::Typed(entity_type) => Treatment::Typed(entity_type),
            _ => Treatment::Scan,
        };
        match classify_key(key, self.clinical) {
            KeyClass::Provider => Self {
                treatment: Treatment::Scan,
                provider: true,
                ..self
            },
            KeyClass::Typed(EntityType::Name) if self.provider => Self {
                treatment: Treatment::Scan,
                ..self
            },
            KeyClass::Typed(entity_type) => Self {
                treatment: Treatment::Typed(entity_type),
                ..self
            },
            KeyClass::Generic => Self {
                treatment: Treatment::Generic,
                ..self
            },
            KeyClass::ClinicalContainer => Self {
                treatment: Treatment::Scan,
                clinical: true,
                ..self
            },
            KeyClass::Neutral => Self {
                treatment: Treatment::Scan,
                ..self
            },
            KeyClass::Unrecognized => Self {
                treatment: inherited,
                ..self
            },
        }
    }

    /// Free-text NAME hits are ignored under provider or clinical keys
    fn allows_name_detection(&self) -> bool {
        !self.provider && !self.clinical
    }
}

/// Anonymizes JSON values for one identity
pub struct JsonTransformer<'a> {
    detector: &'a dyn PhiDetector,
    resolver: PseudonymResolver<'a>,
}

impl<'a> JsonTransformer<'a> {
    pub fn new(detector: &'a dyn PhiDetector, resolver: PseudonymResolver<'a>) -> Self {
        Self { detector, resolver }
    }

    /// Anonymize `value` against the mappings in `scope`
    pub fn anonymize(&self, value: &Value, scope: &MappingScope<'_>) -> Folded {
        self.walk(value, NodeContext::root(), scope)
    }

    fn walk(&self, value: &Value, context: NodeContext, scope: &MappingScope<'_>) -> Folded {
        match value {
            Value::Object(map) => self.walk_object(map, context, scope),
            Value::Array(items) => self.walk_array(items, context, scope),
            Value::String(text) => self.transform_string(text, context, scope),
            Value::Number(number) => self.transform_number(value, number, context),
            Value::Bool(_) | Value::Null => Folded::unchanged(value),
        }
    }

    fn walk_object(
        &self,
        map: &Map<String, Value>,
        context: NodeContext,
        scope: &MappingScope<'_>,
    ) -> Folded {
        let mut out = Map::with_capacity(map.len());
        let mut proposed = Vec::new();
        let mut redacted = Vec::new();

        for (key, child) in map {
            let folded = self.walk(child, context.child(key), &scope.extend(&proposed));
            out.insert(key.clone(), folded.value);
            proposed.extend(folded.proposed);
            redacted.extend(folded.redacted);
        }

        Folded {
            value: Value::Object(out),
            proposed,
            redacted,
        }
    }

    fn walk_array(&self, items: &[Value], context: NodeContext, scope: &MappingScope<'_>) -> Folded {
        let mut out = Vec::with_capacity(items.len());
        let mut proposed = Vec::new();
        let mut redacted = Vec::new();

        for item in items {
            let folded = self.walk(item, context, &scope.extend(&proposed));
            out.push(folded.value);
            proposed.extend(folded.proposed);
            redacted.extend(folded.redacted);
        }

        Folded {
            value: Value::Array(out),
            proposed,
            redacted,
        }
    }

    fn transform_string(&self, text: &str, context: NodeContext, scope: &MappingScope<'_>) -> Folded {
        if text.trim().is_empty() {
            return Folded::unchanged(&Value::String(text.to_string()));
        }

        match context.treatment {
            Treatment::Typed(entity_type) => self.redact_whole(text, entity_type, scope),
            Treatment::Scan => self.scan(text, context, scope),
            Treatment::Generic => {
                let scanned = self.scan(text, context, scope);
                if scanned.redacted.is_empty() {
                    self.redact_whole(text, EntityType::Other, scope)
                } else {
                    scanned
                }
            }
        }
    }

    fn redact_whole(&self, text: &str, entity_type: EntityType, scope: &MappingScope<'_>) -> Folded {
        if entity_type == EntityType::Name && self.detector.is_provider_reference(text) {
            return Folded::unchanged(&Value::String(text.to_string()));
        }

        let resolution = self.resolver.resolve(scope, entity_type, text);
        let Some(fake) = resolution.replacement().map(str::to_string) else {
            return Folded::unchanged(&Value::String(text.to_string()));
        };
        Folded {
            value: Value::String(fake),
            proposed: resolution.into_proposal().into_iter().collect(),
            redacted: vec![entity_type],
        }
    }

    fn scan(&self, text: &str, context: NodeContext, scope: &MappingScope<'_>) -> Folded {
        let entities: Vec<_> = self
            .detector
            .detect(text)
            .into_iter()
            .filter(|e| e.entity_type != EntityType::Name || context.allows_name_detection())
            .collect();
        if entities.is_empty() {
            return Folded::unchanged(&Value::String(text.to_string()));
        }

        let result = substitution::anonymize(text, &entities, &self.resolver, scope);
        Folded {
            value: Value::String(result.text),
            proposed: result.proposed,
            redacted: result
                .decisions
                .iter()
                .filter(|d| d.is_substituted())
                .map(Decision::entity_type)
                .collect(),
        }
    }

    fn transform_number(
        &self,
        value: &Value,
        number: &serde_json::Number,
        context: NodeContext,
    ) -> Folded {
        if context.treatment != Treatment::Typed(EntityType::Age) {
            return Folded::unchanged(value);
        }
        let rules = self.resolver.generator().rules();
        let capped = number
            .as_f64()
            .and_then(|age| rules.cap_numeric_age(age))
            .map(|_| Value::from(rules.age_threshold()));
        match capped {
            Some(capped) => Folded {
                value: capped,
                proposed: Vec::new(),
                redacted: vec![EntityType::Age],
            },
            None => Folded::unchanged(value),
        }
    }
}

/// Restore original values in every string of `value`
///
/// Keys and non-string scalars are left untouched. Returns the restored value
/// and the number of replacements made.
pub fn deanonymize(value: &Value, mappings: &[PseudonymMapping]) -> (Value, usize) {
    match value {
        Value::Object(map) => {
            let mut restored = 0;
            let out = map
                .iter()
                .map(|(key, child)| {
                    let (child, count) = deanonymize(child, mappings);
                    restored += count;
                    (key.clone(), child)
                })
                .collect::<Map<_, _>>();
            (Value::Object(out), restored)
        }
        Value::Array(items) => {
            let mut restored = 0;
            let out = items
                .iter()
                .map(|item| {
                    let (item, count) = deanonymize(item, mappings);
                    restored += count;
                    item
                })
                .collect();
            (Value::Array(out), restored)
        }
        Value::String(text) => {
            let (text, count) = substitution::deanonymize(text, mappings);
            (Value::String(text), count)
        }
        other => (other.clone(), 0),
    }
}
