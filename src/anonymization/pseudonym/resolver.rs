//! Resolve-or-generate for one operation
//!
//! Lookups consult stored mappings first, then mappings proposed earlier in
//! the same operation, and only then generate. Proposals are threaded through
//! [`MappingScope`] chains rather than a shared mutable list, so each step of
//! a transform returns the mappings it created.

use super::generator::{Generated, PseudonymGenerator};
use crate::anonymization::models::{EntityType, PseudonymMapping};
use crate::domain::IdentityId;

/// Read-only view of the mappings known at one point of an operation
#[derive(Debug, Clone, Copy)]
pub struct MappingScope<'a> {
    mappings: &'a [PseudonymMapping],
    parent: Option<&'a MappingScope<'a>>,
}

impl<'a> MappingScope<'a> {
    /// Root scope over the identity's stored mappings
    pub fn root(stored: &'a [PseudonymMapping]) -> Self {
        Self {
            mappings: stored,
            parent: None,
        }
    }

    /// Child scope adding `proposed` in front of this one
    pub fn extend<'b>(&'b self, proposed: &'b [PseudonymMapping]) -> MappingScope<'b> {
        MappingScope {
            mappings: proposed,
            parent: Some(self),
        }
    }

    /// Find the mapping for `(entity_type, original)`, outermost scope first
    pub fn find(&self, entity_type: EntityType, original: &str) -> Option<&'a PseudonymMapping> {
        let mut scope = Some(self);
        let mut chain = Vec::new();
        while let Some(current) = scope {
            chain.push(current.mappings);
            scope = current.parent;
        }
        // stored mappings sit at the root and take precedence
        chain
            .into_iter()
            .rev()
            .find_map(|mappings| mappings.iter().find(|m| m.matches(entity_type, original)))
    }
}

/// Outcome of resolving one detected value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Already mapped, either stored or proposed earlier in this operation
    Known(String),

    /// Newly generated; must be persisted with the operation's proposals
    Proposed(PseudonymMapping),

    /// Left as is by a Safe Harbor rule
    Passthrough,
}

impl Resolution {
    /// Replacement text, if any
    pub fn replacement(&self) -> Option<&str> {
        match self {
            Self::Known(fake) => Some(fake),
            Self::Proposed(mapping) => Some(&mapping.fake_value),
            Self::Passthrough => None,
        }
    }

    /// The new mapping, if one was generated
    pub fn into_proposal(self) -> Option<PseudonymMapping> {
        match self {
            Self::Proposed(mapping) => Some(mapping),
            _ => None,
        }
    }
}

/// Pseudonym lookup bound to one identity
#[derive(Debug, Clone, Copy)]
pub struct PseudonymResolver<'g> {
    identity_id: IdentityId,
    generator: &'g PseudonymGenerator,
}

impl<'g> PseudonymResolver<'g> {
    pub fn new(identity_id: IdentityId, generator: &'g PseudonymGenerator) -> Self {
        Self {
            identity_id,
            generator,
        }
    }

    pub fn identity_id(&self) -> IdentityId {
        self.identity_id
    }

    pub fn generator(&self) -> &'g PseudonymGenerator {
        self.generator
    }

    /// Resolve `original` against `scope`, generating if unseen
    pub fn resolve(
        &self,
        scope: &MappingScope<'_>,
        entity_type: EntityType,
        original: &str,
    ) -> Resolution {
        if let Some(existing) = scope.find(entity_type, original) {
            return Resolution::Known(existing.fake_value.clone());
        }

        match self.generator.generate(entity_type, original) {
            Generated::Value {
                generator_name,
                fake_value,
            } => Resolution::Proposed(PseudonymMapping::new(
                self.identity_id,
                entity_type,
                original,
                generator_name,
                fake_value,
            )),
            Generated::Passthrough => Resolution::Passthrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::compliance::SafeHarborRules;
    use crate::anonymization::config::SafeHarborConfig;

    fn generator() -> PseudonymGenerator {
        PseudonymGenerator::new(SafeHarborRules::new(&SafeHarborConfig::default()))
    }

    #[test]
    fn test_stored_mapping_wins() {
        let id = IdentityId::new_v4();
        let stored = vec![PseudonymMapping::new(
            id,
            EntityType::Name,
            "John Smith",
            "faker_name",
            "Stored Name",
        )];
        let generator = generator();
        let resolver = PseudonymResolver::new(id, &generator);
        let scope = MappingScope::root(&stored);

        assert_eq!(
            resolver.resolve(&scope, EntityType::Name, "JOHN SMITH"),
            Resolution::Known("Stored Name".to_string())
        );
    }

    #[test]
    fn test_proposals_consulted_before_generation() {
        let id = IdentityId::new_v4();
        let generator = generator();
        let resolver = PseudonymResolver::new(id, &generator);
        let root = MappingScope::root(&[]);

        let first = resolver.resolve(&root, EntityType::Email, "a@b.org");
        let proposed = vec![first.clone().into_proposal().unwrap()];
        let child = root.extend(&proposed);
        let second = resolver.resolve(&child, EntityType::Email, "a@b.org");

        assert_eq!(second, Resolution::Known(proposed[0].fake_value.clone()));
        assert_eq!(first.replacement(), second.replacement());
    }

    #[test]
    fn test_root_precedence_over_proposals() {
        let id = IdentityId::new_v4();
        let stored = vec![PseudonymMapping::new(id, EntityType::Mrn, "X1", "pool_mrn", "MRN-1")];
        let proposed = vec![PseudonymMapping::new(id, EntityType::Mrn, "x1", "pool_mrn", "MRN-2")];
        let root = MappingScope::root(&stored);
        let child = root.extend(&proposed);
        assert_eq!(child.find(EntityType::Mrn, "X1").unwrap().fake_value, "MRN-1");
    }

    #[test]
    fn test_passthrough_creates_nothing() {
        let generator = generator();
        let resolver = PseudonymResolver::new(IdentityId::new_v4(), &generator);
        let resolution = resolver.resolve(&MappingScope::root(&[]), EntityType::Age, "85");
        assert_eq!(resolution, Resolution::Passthrough);
        assert!(resolution.into_proposal().is_none());
    }
}
