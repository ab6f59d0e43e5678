//! Pseudonym mappings and identity records

use super::entity::EntityType;
use crate::domain::{IdentityId, IdentityKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The unit of reversible redaction
///
/// For a fixed `(identity_id, entity_type, original_value)` there is at most
/// one mapping and it never changes once stored. Original values compare
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PseudonymMapping {
    pub identity_id: IdentityId,
    pub entity_type: EntityType,
    pub original_value: String,
    /// Name of the generator that produced `fake_value`
    pub generator_name: String,
    pub fake_value: String,
}

impl PseudonymMapping {
    pub fn new(
        identity_id: IdentityId,
        entity_type: EntityType,
        original_value: impl Into<String>,
        generator_name: impl Into<String>,
        fake_value: impl Into<String>,
    ) -> Self {
        Self {
            identity_id,
            entity_type,
            original_value: original_value.into(),
            generator_name: generator_name.into(),
            fake_value: fake_value.into(),
        }
    }

    /// True when this mapping covers `(entity_type, original)`
    pub fn matches(&self, entity_type: EntityType, original: &str) -> bool {
        self.entity_type == entity_type
            && self.original_value.to_lowercase() == original.to_lowercase()
    }

    /// Storage key: identity, type and lower-cased original value
    pub fn natural_key(&self) -> (IdentityId, EntityType, String) {
        (
            self.identity_id,
            self.entity_type,
            self.original_value.to_lowercase(),
        )
    }
}

/// Maps an external identity to its opaque scoping id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub identity_id: IdentityId,
    pub key: IdentityKey,
    pub created_at: DateTime<Utc>,
}

impl IdentityRecord {
    pub fn new(key: IdentityKey) -> Self {
        Self {
            identity_id: IdentityId::new_v4(),
            key,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_is_case_insensitive() {
        let mapping = PseudonymMapping::new(
            IdentityId::new_v4(),
            EntityType::Name,
            "John Smith",
            "faker_name",
            "Mark Jones",
        );
        assert!(mapping.matches(EntityType::Name, "john smith"));
        assert!(mapping.matches(EntityType::Name, "JOHN SMITH"));
        assert!(!mapping.matches(EntityType::Email, "John Smith"));
        assert!(!mapping.matches(EntityType::Name, "John Smyth"));
    }

    #[test]
    fn test_natural_key_lowercases_original() {
        let id = IdentityId::new_v4();
        let a = PseudonymMapping::new(id, EntityType::Email, "A@X.ORG", "faker_email", "b@y.org");
        let b = PseudonymMapping::new(id, EntityType::Email, "a@x.org", "faker_email", "c@y.org");
        assert_eq!(a.natural_key(), b.natural_key());
    }
}
