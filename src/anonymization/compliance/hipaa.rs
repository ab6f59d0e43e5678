//! HIPAA Safe Harbor value transforms
//!
//! Dates keep only their year, ZIP codes keep their first three digits unless
//! the prefix is on the restricted list, and ages above the threshold collapse
//! into a single bucket.

use super::RuleOutcome;
use crate::anonymization::config::SafeHarborConfig;
use crate::anonymization::models::EntityType;
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;

/// Fully masked date used when no configured format parses
pub const MASKED_DATE: &str = "XX/XX/XXXX";

/// Replacement for a ZIP in a restricted prefix
pub const SUPPRESSED_ZIP: &str = "00000";

/// HIPAA Safe Harbor identifier categories mapped onto entity types
pub fn hipaa_identifiers() -> Vec<EntityType> {
    vec![
        EntityType::Name,
        EntityType::Address,
        EntityType::Zip,
        EntityType::Date,
        EntityType::Age,
        EntityType::PhoneNumber,
        EntityType::FaxNumber,
        EntityType::Email,
        EntityType::Ssn,
        EntityType::Mrn,
        EntityType::InsuranceId,
        EntityType::AccountNumber,
        EntityType::CreditDebitNumber,
        EntityType::LicenseNumber,
        EntityType::VehicleId,
        EntityType::DeviceId,
        EntityType::Url,
        EntityType::IpAddress,
        EntityType::BiometricId,
        EntityType::Photo,
        EntityType::ClinicalTrialId,
        EntityType::EmployeeId,
        EntityType::Other,
    ]
}

/// Safe Harbor transforms for dates, ZIP codes and ages
#[derive(Debug, Clone)]
pub struct SafeHarborRules {
    age_threshold: u32,
    restricted_zip_prefixes: HashSet<String>,
    date_formats: Vec<String>,
}

impl SafeHarborRules {
    pub fn new(config: &SafeHarborConfig) -> Self {
        Self {
            age_threshold: config.age_threshold,
            restricted_zip_prefixes: config.restricted_zip_prefixes.iter().cloned().collect(),
            date_formats: config.date_formats.clone(),
        }
    }

    /// Configured age threshold
    pub fn age_threshold(&self) -> u32 {
        self.age_threshold
    }

    /// Apply the rule for `entity_type`, if one exists
    ///
    /// Returns `None` for types without a Safe Harbor transform; those are
    /// pseudonymized by the generator instead.
    pub fn apply(&self, entity_type: EntityType, value: &str) -> Option<RuleOutcome> {
        match entity_type {
            EntityType::Date => Some(RuleOutcome::Generalized(self.generalize_date(value))),
            EntityType::Zip => Some(RuleOutcome::Generalized(self.suppress_zip(value))),
            EntityType::Age => Some(match self.cap_age(value) {
                Some(capped) => RuleOutcome::Generalized(capped),
                None => RuleOutcome::Exempt,
            }),
            _ => None,
        }
    }

    /// Generalize a date to `XX/XX/<year>`
    pub fn generalize_date(&self, value: &str) -> String {
        match self.parse_year(value) {
            Some(year) => format!("XX/XX/{year:04}"),
            None => MASKED_DATE.to_string(),
        }
    }

    fn parse_year(&self, value: &str) -> Option<i32> {
        let normalized = normalize_date(value);
        let candidates = [
            normalized.clone(),
            // date part of an ISO timestamp
            normalized
                .split(['T', ' '])
                .next()
                .unwrap_or_default()
                .to_string(),
        ];

        candidates.iter().find_map(|candidate| {
            self.date_formats.iter().find_map(|format| {
                NaiveDate::parse_from_str(candidate, format)
                    .ok()
                    .map(|d| d.year())
                    .filter(|year| *year >= 1000)
            })
        })
    }

    /// Keep the first three ZIP digits, or suppress a restricted prefix entirely
    pub fn suppress_zip(&self, value: &str) -> String {
        let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() < 3 {
            return SUPPRESSED_ZIP.to_string();
        }
        let prefix = &digits[..3];
        if self.restricted_zip_prefixes.contains(prefix) {
            SUPPRESSED_ZIP.to_string()
        } else {
            format!("{prefix}**")
        }
    }

    /// Generalize an age above the threshold; `None` means pass through
    pub fn cap_age(&self, value: &str) -> Option<String> {
        let digits: String = value
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let age: u32 = digits.parse().ok()?;
        (age > self.age_threshold).then(|| self.capped_age_label())
    }

    /// Numeric form of the age cap, for JSON number fields
    pub fn cap_numeric_age(&self, age: f64) -> Option<f64> {
        (age > f64::from(self.age_threshold)).then_some(f64::from(self.age_threshold))
    }

    fn capped_age_label(&self) -> String {
        format!("{} or older", self.age_threshold)
    }
}

/// Strip ordinal suffixes and trailing periods so chrono can parse the value
fn normalize_date(value: &str) -> String {
    value
        .split_whitespace()
        .map(|token| {
            let (body, comma) = match token.strip_suffix(',') {
                Some(body) => (body, ","),
                None => (token, ""),
            };
            let body = body.trim_end_matches('.');
            let body = if body.eq_ignore_ascii_case("sept") {
                "Sep"
            } else {
                body
            };
            let stripped = ["st", "nd", "rd", "th"]
                .iter()
                .find_map(|suffix| {
                    body.strip_suffix(suffix)
                        .filter(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()))
                })
                .unwrap_or(body);
            format!("{stripped}{comma}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}
