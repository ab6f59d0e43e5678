//! Identifier types for identity scoping
//!
//! Every pseudonym mapping is scoped by an opaque [`IdentityId`]. Callers
//! never see that id directly; they address subjects through an
//! [`IdentityKey`] (an external identity plus its type, e.g. an email address
//! and `"EMAIL"`), which the identity store resolves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque scoping key for all mappings of one real-world subject
///
/// # Examples
///
/// ```
/// use harbor::domain::ids::IdentityId;
/// use std::str::FromStr;
///
/// let id = IdentityId::from_str("7d44b88c-4199-4bad-97dc-d78268e01398").unwrap();
/// assert_eq!(id.to_string(), "7d44b88c-4199-4bad-97dc-d78268e01398");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(Uuid);

impl IdentityId {
    /// Generates a fresh random identity id
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IdentityId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| format!("Invalid identity id '{s}': {e}"))
    }
}

/// External identity of a subject, as supplied by callers
///
/// The identity type is normalised to upper case so `"email"` and `"EMAIL"`
/// address the same subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    identity: String,
    identity_type: String,
}

impl IdentityKey {
    /// Creates a new identity key
    ///
    /// # Errors
    ///
    /// Returns `Err` if either part is blank.
    pub fn new(identity: impl Into<String>, identity_type: impl Into<String>) -> Result<Self, String> {
        let identity = identity.into();
        let identity_type = identity_type.into();
        if identity.trim().is_empty() {
            return Err("Identity cannot be empty".to_string());
        }
        if identity_type.trim().is_empty() {
            return Err("Identity type cannot be empty".to_string());
        }
        Ok(Self {
            identity: identity.trim().to_string(),
            identity_type: identity_type.trim().to_uppercase(),
        })
    }

    /// The external identity value (e.g. an email address)
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The identity type (e.g. `EMAIL`)
    pub fn identity_type(&self) -> &str {
        &self.identity_type
    }
}

impl fmt::Display for IdentityKey {
    // The identity value itself is PHI, so only the type is rendered.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:<redacted>", self.identity_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_id_roundtrip() {
        let id = IdentityId::new_v4();
        let parsed = IdentityId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_identity_id_invalid() {
        assert!(IdentityId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_identity_key_normalises_type() {
        let key = IdentityKey::new(" jane@example.com ", "email").unwrap();
        assert_eq!(key.identity(), "jane@example.com");
        assert_eq!(key.identity_type(), "EMAIL");
    }

    #[test]
    fn test_identity_key_empty() {
        assert!(IdentityKey::new("", "EMAIL").is_err());
        assert!(IdentityKey::new("jane@example.com", "  ").is_err());
    }

    #[test]
    fn test_identity_key_display_hides_value() {
        let key = IdentityKey::new("jane@example.com", "EMAIL").unwrap();
        assert!(!key.to_string().contains("jane"));
    }
}
