//! Deterministic fake-value generation
//!
//! Every generator is seeded from the SHA-256 digest of the lower-cased
//! original value, so the same input yields the same output in any process
//! without a shared cache.

use crate::anonymization::compliance::{RuleOutcome, SafeHarborRules};
use crate::anonymization::models::EntityType;
use fake::faker::address::en::{BuildingNumber, StreetName};
use fake::faker::internet::en::{SafeEmail, IPv4};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Generator name recorded when a type has no handler
pub const PLACEHOLDER_GENERATOR: &str = "redaction_placeholder";

const HONORIFICS: [&str; 5] = ["mr", "mrs", "ms", "miss", "mx"];
const INSURANCE_PREFIXES: [&str; 3] = ["POL", "MEM", "GRP"];
const VIN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPRSTUVWXYZ0123456789";
const LICENSE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Outcome of generating a replacement for one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    /// Replace with `fake_value`, recording which generator produced it
    Value {
        generator_name: &'static str,
        fake_value: String,
    },

    /// Safe Harbor leaves the value untouched
    Passthrough,
}

impl Generated {
    fn value(generator_name: &'static str, fake_value: impl Into<String>) -> Self {
        Self::Value {
            generator_name,
            fake_value: fake_value.into(),
        }
    }
}

/// Produces fake values per entity type
#[derive(Debug, Clone)]
pub struct PseudonymGenerator {
    rules: SafeHarborRules,
}

impl PseudonymGenerator {
    pub fn new(rules: SafeHarborRules) -> Self {
        Self { rules }
    }

    /// Safe Harbor rules used for dates, ZIP codes and ages
    pub fn rules(&self) -> &SafeHarborRules {
        &self.rules
    }

    /// Generate the replacement for `original`
    pub fn generate(&self, entity_type: EntityType, original: &str) -> Generated {
        if let Some(outcome) = self.rules.apply(entity_type, original) {
            return match outcome {
                RuleOutcome::Generalized(value) => {
                    Generated::value(safe_harbor_generator(entity_type), value)
                }
                RuleOutcome::Exempt => Generated::Passthrough,
            };
        }

        let mut rng = seeded_rng(original);
        match entity_type {
            EntityType::Name => Generated::value("faker_name", fake_name(original, &mut rng)),
            EntityType::Address => {
                let number: String = BuildingNumber().fake_with_rng(&mut rng);
                let street: String = StreetName().fake_with_rng(&mut rng);
                Generated::value("faker_address", format!("{number} {street}"))
            }
            EntityType::Email => {
                Generated::value("faker_email", SafeEmail().fake_with_rng::<String, _>(&mut rng))
            }
            EntityType::IpAddress => {
                Generated::value("faker_ipv4", IPv4().fake_with_rng::<String, _>(&mut rng))
            }
            EntityType::PhoneNumber => Generated::value(
                "pool_phone",
                format!("555-{}-{}", digits(&mut rng, 3), digits(&mut rng, 4)),
            ),
            EntityType::FaxNumber => Generated::value(
                "pool_fax",
                format!("555-{}-{}", digits(&mut rng, 3), digits(&mut rng, 4)),
            ),
            EntityType::Ssn => Generated::value(
                "pool_ssn",
                format!(
                    "9{}-{}-{}",
                    digits(&mut rng, 2),
                    digits(&mut rng, 2),
                    digits(&mut rng, 4)
                ),
            ),
            EntityType::Mrn => {
                Generated::value("pool_mrn", format!("MRN-{}", digits(&mut rng, 8)))
            }
            EntityType::InsuranceId => {
                let prefix = INSURANCE_PREFIXES[rng.gen_range(0..INSURANCE_PREFIXES.len())];
                Generated::value("pool_insurance", format!("{prefix}{}", digits(&mut rng, 9)))
            }
            EntityType::CreditDebitNumber => Generated::value(
                "pool_card",
                format!(
                    "4000-{}-{}-{}",
                    digits(&mut rng, 4),
                    digits(&mut rng, 4),
                    digits(&mut rng, 4)
                ),
            ),
            EntityType::AccountNumber => {
                Generated::value("pool_account", format!("ACCT-{}", digits(&mut rng, 8)))
            }
            EntityType::LicenseNumber => Generated::value(
                "pool_license",
                format!("LIC-{}", pick(&mut rng, LICENSE_ALPHABET, 7)),
            ),
            EntityType::VehicleId => Generated::value("pool_vin", pick(&mut rng, VIN_ALPHABET, 17)),
            EntityType::DeviceId => {
                Generated::value("pool_device", format!("SN-{}", digits(&mut rng, 10)))
            }
            EntityType::Url => Generated::value(
                "pool_url",
                format!("https://example.org/r/{}", hex(&mut rng, 8)),
            ),
            EntityType::BiometricId => {
                Generated::value("pool_biometric", format!("BIO-{}", digits(&mut rng, 12)))
            }
            EntityType::ClinicalTrialId => {
                Generated::value("pool_trial", format!("NCT{}", digits(&mut rng, 8)))
            }
            EntityType::EmployeeId => {
                Generated::value("pool_employee", format!("EMP{}", digits(&mut rng, 6)))
            }
            EntityType::Other => {
                Generated::value("pool_other", format!("ID-{}", hex(&mut rng, 10)))
            }
            EntityType::Photo | EntityType::Date | EntityType::Zip | EntityType::Age => {
                tracing::warn!(
                    entity_type = %entity_type,
                    "No generator for entity type, using redaction placeholder"
                );
                Generated::value(PLACEHOLDER_GENERATOR, entity_type.redaction_placeholder())
            }
        }
    }
}

fn safe_harbor_generator(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Date => "hipaa_date",
        EntityType::Zip => "hipaa_zip",
        _ => "hipaa_age",
    }
}

fn seeded_rng(original: &str) -> StdRng {
    let digest = Sha256::digest(original.to_lowercase().as_bytes());
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest);
    StdRng::from_seed(seed)
}

/// Keep a leading honorific and the one-token/full-name shape
fn fake_name(original: &str, rng: &mut StdRng) -> String {
    let tokens: Vec<&str> = original.split_whitespace().collect();
    let (honorific, rest) = match tokens.split_first() {
        Some((first, rest))
            if HONORIFICS.contains(&first.trim_end_matches('.').to_lowercase().as_str()) =>
        {
            (Some(*first), rest)
        }
        _ => (None, tokens.as_slice()),
    };

    let last: String = LastName().fake_with_rng(rng);
    let generated = if rest.len() >= 2 {
        let first: String = FirstName().fake_with_rng(rng);
        format!("{first} {last}")
    } else {
        last
    };

    match honorific {
        Some(title) => format!("{title} {generated}"),
        None => generated,
    }
}

fn digits(rng: &mut StdRng, count: usize) -> String {
    (0..count)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn hex(rng: &mut StdRng, count: usize) -> String {
    (0..count)
        .map(|_| char::from(b"0123456789abcdef"[rng.gen_range(0..16)]))
        .collect()
}

fn pick(rng: &mut StdRng, alphabet: &[u8], count: usize) -> String {
    (0..count)
        .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
        .collect()
}
