//! Detected identifier entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of identifier kinds Harbor detects and pseudonymizes
///
/// Covers the HIPAA Safe Harbor identifier categories. Clinical content
/// (diagnoses, medications, lab values) deliberately has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// Person names (patients, relatives, household members)
    Name,
    /// Street addresses
    Address,
    /// ZIP codes
    Zip,
    /// All date elements except year
    Date,
    /// Ages
    Age,
    /// Telephone numbers
    PhoneNumber,
    /// Fax numbers
    FaxNumber,
    /// Email addresses
    Email,
    /// Social Security Numbers
    Ssn,
    /// Medical Record Numbers
    Mrn,
    /// Health plan beneficiary / insurance member numbers
    InsuranceId,
    /// Payment card numbers
    CreditDebitNumber,
    /// Account numbers
    AccountNumber,
    /// Certificate and license numbers
    LicenseNumber,
    /// Vehicle identifiers and plates
    VehicleId,
    /// Device identifiers and serial numbers
    DeviceId,
    /// Web URLs
    Url,
    /// IP addresses
    IpAddress,
    /// Biometric identifiers
    BiometricId,
    /// Full-face photographs and comparable images
    Photo,
    /// Clinical trial registration numbers
    ClinicalTrialId,
    /// Employee identifiers
    EmployeeId,
    /// Any other unique identifying number or code
    Other,
}

impl EntityType {
    /// Every variant, in declaration order
    pub const ALL: [EntityType; 23] = [
        Self::Name,
        Self::Address,
        Self::Zip,
        Self::Date,
        Self::Age,
        Self::PhoneNumber,
        Self::FaxNumber,
        Self::Email,
        Self::Ssn,
        Self::Mrn,
        Self::InsuranceId,
        Self::CreditDebitNumber,
        Self::AccountNumber,
        Self::LicenseNumber,
        Self::VehicleId,
        Self::DeviceId,
        Self::Url,
        Self::IpAddress,
        Self::BiometricId,
        Self::Photo,
        Self::ClinicalTrialId,
        Self::EmployeeId,
        Self::Other,
    ];

    /// Canonical upper-case label, identical to the serialized form
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::Address => "ADDRESS",
            Self::Zip => "ZIP",
            Self::Date => "DATE",
            Self::Age => "AGE",
            Self::PhoneNumber => "PHONE_NUMBER",
            Self::FaxNumber => "FAX_NUMBER",
            Self::Email => "EMAIL",
            Self::Ssn => "SSN",
            Self::Mrn => "MRN",
            Self::InsuranceId => "INSURANCE_ID",
            Self::CreditDebitNumber => "CREDIT_DEBIT_NUMBER",
            Self::AccountNumber => "ACCOUNT_NUMBER",
            Self::LicenseNumber => "LICENSE_NUMBER",
            Self::VehicleId => "VEHICLE_ID",
            Self::DeviceId => "DEVICE_ID",
            Self::Url => "URL",
            Self::IpAddress => "IP_ADDRESS",
            Self::BiometricId => "BIOMETRIC_ID",
            Self::Photo => "PHOTO",
            Self::ClinicalTrialId => "CLINICAL_TRIAL_ID",
            Self::EmployeeId => "EMPLOYEE_ID",
            Self::Other => "OTHER",
        }
    }

    /// Placeholder used when no generator exists for this type
    pub fn redaction_placeholder(&self) -> String {
        format!("[REDACTED-{}]", self.label())
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        let parsed = match normalized.as_str() {
            "PHONE" => Self::PhoneNumber,
            "FAX" => Self::FaxNumber,
            "MEDICAL_RECORD_NUMBER" => Self::Mrn,
            "HEALTH_PLAN_NUMBER" => Self::InsuranceId,
            "CREDIT_CARD" => Self::CreditDebitNumber,
            "IP" => Self::IpAddress,
            "ZIP_CODE" | "POSTAL_CODE" => Self::Zip,
            other => *Self::ALL
                .iter()
                .find(|t| t.label() == other)
                .ok_or_else(|| format!("Unknown entity type: {s}"))?,
        };
        Ok(parsed)
    }
}

/// Where a detection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Built-in or configured pattern library
    Pattern,
    /// External named-entity recognition service
    Ner,
}

/// A detected identifier occurrence in a source string
///
/// Offsets are byte offsets into the scanned string, `[begin, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Identifier kind
    pub entity_type: EntityType,
    /// Matched text, equal to `source[begin..end]`
    pub original_value: String,
    /// Start byte offset (inclusive)
    pub begin: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Confidence score (0.0 - 1.0)
    pub score: f32,
    /// Detection source
    pub method: DetectionMethod,
}

impl Entity {
    /// Create a pattern-detected entity
    pub fn new(
        entity_type: EntityType,
        original_value: impl Into<String>,
        begin: usize,
        end: usize,
        score: f32,
    ) -> Self {
        Self {
            entity_type,
            original_value: original_value.into(),
            begin,
            end,
            score: score.clamp(0.0, 1.0),
            method: DetectionMethod::Pattern,
        }
    }

    /// Mark the entity as produced by the NER collaborator
    pub fn from_ner(mut self) -> Self {
        self.method = DetectionMethod::Ner;
        self
    }

    /// Span length in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    /// True when the span is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Half-open interval overlap test
    pub fn overlaps(&self, other: &Entity) -> bool {
        self.begin < other.end && self.end > other.begin
    }

    /// True when `[begin, end)` lies entirely inside `[outer_begin, outer_end)`
    pub fn within(&self, outer_begin: usize, outer_end: usize) -> bool {
        self.begin >= outer_begin && self.end <= outer_end
    }
}
