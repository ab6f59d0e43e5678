//! Regulatory rules
//!
//! Safe Harbor value transforms for dates, ZIP codes and ages, and the
//! processing-purpose check applied before any operation touches PHI. The
//! provider-name exemption is enforced at detection time by the pattern
//! library's provider spans.
//!
//! # Examples
//!
//! ```
//! use harbor::anonymization::compliance::{RuleOutcome, SafeHarborRules};
//! use harbor::anonymization::config::SafeHarborConfig;
//! use harbor::anonymization::models::EntityType;
//!
//! let rules = SafeHarborRules::new(&SafeHarborConfig::default());
//! assert_eq!(
//!     rules.apply(EntityType::Date, "03/15/1975"),
//!     Some(RuleOutcome::Generalized("XX/XX/1975".to_string()))
//! );
//! assert_eq!(rules.apply(EntityType::Age, "85"), Some(RuleOutcome::Exempt));
//! ```

pub mod consent;
pub mod hipaa;

pub use consent::ConsentPolicy;
pub use hipaa::SafeHarborRules;

/// Result of applying a Safe Harbor rule to one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Replace the value with this generalized form
    Generalized(String),

    /// The rule leaves this value untouched
    Exempt,
}
