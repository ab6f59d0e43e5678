//! Pattern library for PHI detection
//!
//! The library is one ordered, declarative rule table: entity type, matcher,
//! base score and exemption predicate. The built-in table is embedded from
//! `patterns/phi_patterns.toml`; a deployment can replace it with its own file.

use crate::anonymization::models::EntityType;
use crate::domain::{HarborError, Result};
use fancy_regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

/// Backtracking budget per match attempt; exceeding it disables the matcher
/// for the rest of the scanned string.
const BACKTRACK_LIMIT: usize = 200_000;

/// Exemption predicate attached to a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exemption {
    /// Suppress matches inside a provider-title span
    Provider,
}

/// Require one of `keywords` near the match
#[derive(Debug, Clone, Deserialize)]
pub struct ContextRequirement {
    pub keywords: Vec<String>,
    #[serde(default = "default_context_window")]
    pub window: usize,
}

fn default_context_window() -> usize {
    20
}

/// One regex inside a rule
#[derive(Debug, Clone, Deserialize)]
pub struct PatternDefinition {
    pub regex: String,
    /// Capture group forming the entity span (0 = whole match)
    #[serde(default)]
    pub group: usize,
    /// Overrides the rule score
    pub score: Option<f32>,
    pub context: Option<ContextRequirement>,
}

/// Rule definition from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDefinition {
    pub entity_type: String,
    pub score: f32,
    pub exemption: Option<Exemption>,
    pub patterns: Vec<PatternDefinition>,
}

/// Pattern library file layout
#[derive(Debug, Deserialize)]
struct PatternLibrary {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    provider_patterns: Vec<String>,
    #[serde(default)]
    non_name_terms: Vec<String>,
    #[serde(default)]
    rules: Vec<RuleDefinition>,
}

fn default_version() -> String {
    "unversioned".to_string()
}

/// Compiled matcher with its rule metadata
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    pub regex: Regex,
    pub entity_type: EntityType,
    pub score: f32,
    pub group: usize,
    pub exemption: Option<Exemption>,
    pub context: Option<ContextRequirement>,
}

impl CompiledMatcher {
    /// Check the context requirement around `[begin, end)`
    pub fn context_satisfied(&self, text: &str, begin: usize, end: usize) -> bool {
        let Some(ref context) = self.context else {
            return true;
        };

        let mut start = begin.saturating_sub(context.window);
        while !text.is_char_boundary(start) {
            start -= 1;
        }
        let mut stop = (end + context.window).min(text.len());
        while !text.is_char_boundary(stop) {
            stop += 1;
        }

        let window = text[start..stop].to_lowercase();
        context
            .keywords
            .iter()
            .any(|keyword| window.contains(&keyword.to_lowercase()))
    }
}

/// Pattern registry for PHI detection
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    version: String,
    matchers: Vec<CompiledMatcher>,
    provider_patterns: Vec<Regex>,
    non_name_terms: HashSet<String>,
}

impl PatternRegistry {
    /// Create a registry from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            HarborError::PatternLibrary(format!(
                "Failed to read pattern library {}: {e}",
                path.as_ref().display()
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Create a registry from TOML content
    ///
    /// A regex that fails to compile is skipped with a warning. Unknown
    /// entity types and out-of-range scores are rejected.
    pub fn from_toml(content: &str) -> Result<Self> {
        let library: PatternLibrary = toml::from_str(content).map_err(|e| {
            HarborError::PatternLibrary(format!("Failed to parse pattern library TOML: {e}"))
        })?;

        let mut matchers = Vec::new();
        for rule in library.rules {
            let entity_type = EntityType::from_str(&rule.entity_type)
                .map_err(HarborError::PatternLibrary)?;
            validate_score(rule.score, entity_type)?;

            for pattern in rule.patterns {
                let score = pattern.score.unwrap_or(rule.score);
                validate_score(score, entity_type)?;

                let Some(regex) = compile(&pattern.regex, entity_type.label()) else {
                    continue;
                };

                matchers.push(CompiledMatcher {
                    regex,
                    entity_type,
                    score,
                    group: pattern.group,
                    exemption: rule.exemption,
                    context: pattern.context,
                });
            }
        }

        let provider_patterns = library
            .provider_patterns
            .iter()
            .filter_map(|p| compile(p, "provider"))
            .collect();

        let non_name_terms = library
            .non_name_terms
            .iter()
            .map(|t| t.to_lowercase())
            .collect();

        tracing::debug!(
            version = %library.version,
            matchers = matchers.len(),
            "Loaded pattern library"
        );

        Ok(Self {
            version: library.version,
            matchers,
            provider_patterns,
            non_name_terms,
        })
    }

    /// Create the registry from the built-in rule table
    pub fn default_patterns() -> Result<Self> {
        let default_toml = include_str!("../../../../patterns/phi_patterns.toml");
        Self::from_toml(default_toml)
    }

    /// Library version string
    pub fn version(&self) -> &str {
        &self.version
    }

    /// All matchers in rule order
    pub fn matchers(&self) -> &[CompiledMatcher] {
        &self.matchers
    }

    /// Matchers registered for one entity type
    pub fn matchers_for(&self, entity_type: EntityType) -> impl Iterator<Item = &CompiledMatcher> {
        self.matchers
            .iter()
            .filter(move |m| m.entity_type == entity_type)
    }

    /// Byte spans of provider titles and the names they qualify
    pub fn provider_spans(&self, text: &str) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        for regex in &self.provider_patterns {
            for found in regex.find_iter(text) {
                match found {
                    Ok(m) => spans.push((m.start(), m.end())),
                    Err(e) => {
                        tracing::warn!(error = %e, "Provider pattern aborted");
                        break;
                    }
                }
            }
        }
        spans
    }

    /// True when `token` can never be part of a person name
    pub fn is_non_name_term(&self, token: &str) -> bool {
        let trimmed = token.trim_matches(|c: char| !c.is_alphanumeric());
        self.non_name_terms.contains(&trimmed.to_lowercase())
    }
}

fn validate_score(score: f32, entity_type: EntityType) -> Result<()> {
    if !(0.0..=1.0).contains(&score) {
        return Err(HarborError::PatternLibrary(format!(
            "Score {score} for {entity_type} must be between 0.0 and 1.0"
        )));
    }
    Ok(())
}

fn compile(pattern: &str, label: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern)
        .backtrack_limit(BACKTRACK_LIMIT)
        .build()
    {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(rule = label, error = %e, "Skipping invalid pattern");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_match(registry: &PatternRegistry, entity_type: EntityType, text: &str) -> Option<String> {
        registry.matchers_for(entity_type).find_map(|m| {
            m.regex
                .captures(text)
                .ok()
                .flatten()
                .and_then(|c| c.get(m.group).map(|g| g.as_str().to_string()))
        })
    }

    #[test]
    fn test_load_default_patterns() {
        let registry = PatternRegistry::default_patterns().unwrap();
        assert!(!registry.matchers().is_empty());
        assert_eq!(registry.version(), "2025.1");
    }

    #[test]
    fn test_default_scores_in_range() {
        let registry = PatternRegistry::default_patterns().unwrap();
        for matcher in registry.matchers() {
            assert!(
                (0.80..=0.99).contains(&matcher.score),
                "{} score {}",
                matcher.entity_type,
                matcher.score
            );
        }
    }

    #[test]
    fn test_email_pattern() {
        let registry = PatternRegistry::default_patterns().unwrap();
        assert_eq!(
            first_match(&registry, EntityType::Email, "contact: test@example.com").as_deref(),
            Some("test@example.com")
        );
        assert!(first_match(&registry, EntityType::Email, "not-an-email").is_none());
    }

    #[test]
    fn test_mrn_pattern_uses_value_group() {
        let registry = PatternRegistry::default_patterns().unwrap();
        assert_eq!(
            first_match(&registry, EntityType::Mrn, "MRN: ABC-123456").as_deref(),
            Some("ABC-123456")
        );
    }

    #[test]
    fn test_provider_spans() {
        let registry = PatternRegistry::default_patterns().unwrap();
        let text = "Seen by Dr. John Smith today";
        let spans = registry.provider_spans(text);
        assert!(spans
            .iter()
            .any(|&(b, e)| &text[b..e] == "Dr. John Smith"));

        let text = "Nurse: Patricia Brown, RN";
        let spans = registry.provider_spans(text);
        assert!(spans.iter().any(|&(b, e)| text[b..e].contains("Patricia Brown")));
    }

    #[test]
    fn test_non_name_terms() {
        let registry = PatternRegistry::default_patterns().unwrap();
        assert!(registry.is_non_name_term("Hypertension"));
        assert!(registry.is_non_name_term("street,"));
        assert!(!registry.is_non_name_term("Johnson"));
    }

    #[test]
    fn test_invalid_regex_is_skipped() {
        let toml = r#"
[[rules]]
entity_type = "EMAIL"
score = 0.9
patterns = [{ regex = '(unclosed' }, { regex = '\S+@\S+' }]
"#;
        let registry = PatternRegistry::from_toml(toml).unwrap();
        assert_eq!(registry.matchers().len(), 1);
    }

    #[test]
    fn test_unknown_entity_type_rejected() {
        let toml = r#"
[[rules]]
entity_type = "DIAGNOSIS"
score = 0.9
patterns = [{ regex = 'x' }]
"#;
        assert!(matches!(
            PatternRegistry::from_toml(toml),
            Err(HarborError::PatternLibrary(_))
        ));
    }

    #[test]
    fn test_score_out_of_range_rejected() {
        let toml = r#"
[[rules]]
entity_type = "EMAIL"
score = 1.5
patterns = [{ regex = 'x' }]
"#;
        assert!(PatternRegistry::from_toml(toml).is_err());
    }

    #[test]
    fn test_context_requirement() {
        let toml = r#"
[[rules]]
entity_type = "PHONE_NUMBER"
score = 0.85
patterns = [{ regex = '\d{10}', context = { keywords = ["phone"], window = 10 } }]
"#;
        let registry = PatternRegistry::from_toml(toml).unwrap();
        let matcher = &registry.matchers()[0];
        let text = "phone: 5551234567";
        assert!(matcher.context_satisfied(text, 7, 17));
        let text = "order 5551234567 shipped to the warehouse";
        assert!(!matcher.context_satisfied(text, 6, 16));
    }
}
