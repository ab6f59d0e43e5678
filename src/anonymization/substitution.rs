//! Text substitution and its inverse

use crate::anonymization::models::{Entity, EntityType, PseudonymMapping};
use crate::anonymization::pseudonym::{MappingScope, PseudonymResolver, Resolution};
use serde::Serialize;

/// Terminal state of one redaction decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Decision {
    /// Replaced with a pseudonym or generalized value
    Substituted { entity_type: EntityType },

    /// A Safe Harbor rule exempted the value
    ExemptPassthrough { entity_type: EntityType },

    /// The entity span does not describe the input and was ignored
    UnrecognizedPassthrough { entity_type: EntityType },
}

impl Decision {
    pub fn is_substituted(&self) -> bool {
        matches!(self, Self::Substituted { .. })
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Substituted { entity_type }
            | Self::ExemptPassthrough { entity_type }
            | Self::UnrecognizedPassthrough { entity_type } => *entity_type,
        }
    }
}

/// Result of anonymizing one string
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    pub text: String,
    /// One decision per input entity, in ascending offset order
    pub decisions: Vec<Decision>,
    /// Mappings generated by this call
    pub proposed: Vec<PseudonymMapping>,
}

/// Replace every entity span in `text` with its resolved value
///
/// `entities` must be non-overlapping, as produced by the overlap resolver.
/// Values are resolved in ascending offset order so repeated values share a
/// pseudonym; replacements are then spliced from the highest offset down so
/// earlier offsets stay valid.
pub fn anonymize(
    text: &str,
    entities: &[Entity],
    resolver: &PseudonymResolver<'_>,
    scope: &MappingScope<'_>,
) -> Substitution {
    let mut ordered: Vec<&Entity> = entities.iter().collect();
    ordered.sort_by_key(|e| e.begin);

    let mut proposed: Vec<PseudonymMapping> = Vec::new();
    let mut decisions = Vec::with_capacity(ordered.len());
    let mut replacements: Vec<(usize, usize, String)> = Vec::new();

    for entity in ordered {
        if !span_matches(text, entity) {
            decisions.push(Decision::UnrecognizedPassthrough {
                entity_type: entity.entity_type,
            });
            continue;
        }

        let resolution = {
            let current = scope.extend(&proposed);
            resolver.resolve(&current, entity.entity_type, &entity.original_value)
        };
        match resolution {
            Resolution::Passthrough => decisions.push(Decision::ExemptPassthrough {
                entity_type: entity.entity_type,
            }),
            resolution => {
                if let Some(fake) = resolution.replacement() {
                    replacements.push((entity.begin, entity.end, fake.to_string()));
                }
                if let Some(mapping) = resolution.into_proposal() {
                    proposed.push(mapping);
                }
                decisions.push(Decision::Substituted {
                    entity_type: entity.entity_type,
                });
            }
        }
    }

    let mut output = text.to_string();
    for (begin, end, fake) in replacements.iter().rev() {
        output.replace_range(*begin..*end, fake);
    }

    Substitution {
        text: output,
        decisions,
        proposed,
    }
}

fn span_matches(text: &str, entity: &Entity) -> bool {
    entity.begin < entity.end
        && entity.end <= text.len()
        && text.is_char_boundary(entity.begin)
        && text.is_char_boundary(entity.end)
        && text[entity.begin..entity.end] == entity.original_value
}

/// Restore original values in `text`
///
/// Mappings are tried longest fake value first at every position, so a short
/// fake that is a substring of a longer one is never replaced first. Restored
/// text is never rescanned. Matching is a single left-to-right pass, so an
/// earlier match wins over a longer fake starting inside it; fakes are drawn
/// from disjoint pools and do not overlap in practice. Returns the restored
/// text and the number of replacements made.
pub fn deanonymize(text: &str, mappings: &[PseudonymMapping]) -> (String, usize) {
    let mut ordered: Vec<&PseudonymMapping> =
        mappings.iter().filter(|m| !m.fake_value.is_empty()).collect();
    ordered.sort_by(|a, b| {
        b.fake_value
            .len()
            .cmp(&a.fake_value.len())
            .then_with(|| a.fake_value.cmp(&b.fake_value))
            .then_with(|| a.original_value.cmp(&b.original_value))
    });

    if ordered.is_empty() {
        return (text.to_string(), 0);
    }

    let mut output = String::with_capacity(text.len());
    let mut restored = 0;
    let mut position = 0;
    while position < text.len() {
        let rest = &text[position..];
        match ordered.iter().find(|m| rest.starts_with(m.fake_value.as_str())) {
            Some(mapping) => {
                output.push_str(&mapping.original_value);
                position += mapping.fake_value.len();
                restored += 1;
            }
            None => {
                let Some(ch) = rest.chars().next() else {
                    break;
                };
                output.push(ch);
                position += ch.len_utf8();
            }
        }
    }

    (output, restored)
}
