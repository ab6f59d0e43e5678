//! Key-name rule set for JSON documents
//!
//! Keys are split into lower-case tokens on `_`, `-`, `.`, whitespace and
//! camelCase boundaries (`dateOfBirth` -> `date`, `of`, `birth`). The tables
//! below are versioned as a unit; changing any of them changes which fields
//! get redacted, so bump [`KEY_RULES_VERSION`] with them.
//!
//! Precedence, highest first:
//!
//! 1. provider/clinician keys are never key-sensitive
//! 2. explicit key -> type table
//! 3. generic identifier keywords (content scan, then `OTHER`)
//! 4. free-text content scan

use crate::anonymization::models::EntityType;

/// Version of the key rule tables
pub const KEY_RULES_VERSION: &str = "2025.1";

/// Tokens marking a provider or clinician field
const PROVIDER_TOKENS: &[&str] = &[
    "provider",
    "doctor",
    "physician",
    "clinician",
    "practitioner",
    "nurse",
    "therapist",
    "psychiatrist",
    "psychologist",
    "counselor",
    "surgeon",
    "attending",
    "referring",
    "prescriber",
    "consultant",
];

/// Keys whose children describe clinical items, not people
const CLINICAL_CONTAINERS: &[&str] = &[
    "medication",
    "medications",
    "diagnosis",
    "diagnoses",
    "allergy",
    "allergies",
    "procedure",
    "procedures",
    "condition",
    "conditions",
    "problem",
    "problems",
    "lab",
    "labs",
    "labresults",
    "immunization",
    "immunizations",
    "vitals",
    "observation",
    "observations",
    "orders",
];

/// Recognised keys that are not sensitive and stop type inheritance
const NEUTRAL_KEYS: &[&str] = &[
    "state",
    "country",
    "type",
    "use",
    "system",
    "code",
    "status",
    "relationship",
    "gender",
    "sex",
];

/// Whole-key matches, checked before the token table
const EXACT_KEYS: &[(&str, EntityType)] = &[
    ("dob", EntityType::Date),
    ("dateofbirth", EntityType::Date),
    ("birthdate", EntityType::Date),
    ("birthday", EntityType::Date),
    ("dateofdeath", EntityType::Date),
    ("placeofbirth", EntityType::Address),
    ("birthplace", EntityType::Address),
    ("email", EntityType::Email),
    ("emailaddress", EntityType::Email),
    ("ipaddress", EntityType::IpAddress),
    ("socialsecurity", EntityType::Ssn),
    ("socialsecuritynumber", EntityType::Ssn),
    ("medicalrecord", EntityType::Mrn),
    ("medicalrecordnumber", EntityType::Mrn),
    ("patientid", EntityType::Mrn),
    ("groupnumber", EntityType::InsuranceId),
    ("healthplan", EntityType::InsuranceId),
    ("creditcard", EntityType::CreditDebitNumber),
    ("debitcard", EntityType::CreditDebitNumber),
    ("cardnumber", EntityType::CreditDebitNumber),
    ("cellphone", EntityType::PhoneNumber),
    ("cellnumber", EntityType::PhoneNumber),
    ("image", EntityType::Photo),
    ("imageurl", EntityType::Photo),
    ("profileimage", EntityType::Photo),
    ("patientimage", EntityType::Photo),
    ("licenseplate", EntityType::VehicleId),
    ("clinicaltrialid", EntityType::ClinicalTrialId),
    ("trialid", EntityType::ClinicalTrialId),
    ("zipcode", EntityType::Zip),
    ("postcode", EntityType::Zip),
];

/// Token matches, first hit wins
const TOKEN_KEYS: &[(&str, EntityType)] = &[
    ("ssn", EntityType::Ssn),
    ("mrn", EntityType::Mrn),
    ("chart", EntityType::Mrn),
    ("name", EntityType::Name),
    ("surname", EntityType::Name),
    ("forename", EntityType::Name),
    ("firstname", EntityType::Name),
    ("lastname", EntityType::Name),
    ("fullname", EntityType::Name),
    ("email", EntityType::Email),
    ("fax", EntityType::FaxNumber),
    ("phone", EntityType::PhoneNumber),
    ("telephone", EntityType::PhoneNumber),
    ("mobile", EntityType::PhoneNumber),
    ("tel", EntityType::PhoneNumber),
    ("vin", EntityType::VehicleId),
    ("plate", EntityType::VehicleId),
    ("vehicle", EntityType::VehicleId),
    ("photo", EntityType::Photo),
    ("picture", EntityType::Photo),
    ("avatar", EntityType::Photo),
    ("headshot", EntityType::Photo),
    ("fingerprint", EntityType::BiometricId),
    ("biometric", EntityType::BiometricId),
    ("retina", EntityType::BiometricId),
    ("voiceprint", EntityType::BiometricId),
    ("nct", EntityType::ClinicalTrialId),
    ("employee", EntityType::EmployeeId),
    ("badge", EntityType::EmployeeId),
    ("insurance", EntityType::InsuranceId),
    ("policy", EntityType::InsuranceId),
    ("member", EntityType::InsuranceId),
    ("subscriber", EntityType::InsuranceId),
    ("beneficiary", EntityType::InsuranceId),
    ("medicaid", EntityType::InsuranceId),
    ("medicare", EntityType::InsuranceId),
    ("iban", EntityType::AccountNumber),
    ("account", EntityType::AccountNumber),
    ("routing", EntityType::AccountNumber),
    ("license", EntityType::LicenseNumber),
    ("licence", EntityType::LicenseNumber),
    ("passport", EntityType::LicenseNumber),
    ("certificate", EntityType::LicenseNumber),
    ("serial", EntityType::DeviceId),
    ("imei", EntityType::DeviceId),
    ("udid", EntityType::DeviceId),
    ("device", EntityType::DeviceId),
    ("ip", EntityType::IpAddress),
    ("ipv4", EntityType::IpAddress),
    ("ipv6", EntityType::IpAddress),
    ("url", EntityType::Url),
    ("uri", EntityType::Url),
    ("website", EntityType::Url),
    ("homepage", EntityType::Url),
    ("zip", EntityType::Zip),
    ("postal", EntityType::Zip),
    ("address", EntityType::Address),
    ("addr", EntityType::Address),
    ("street", EntityType::Address),
    ("city", EntityType::Address),
    ("county", EntityType::Address),
    ("town", EntityType::Address),
    ("dob", EntityType::Date),
    ("date", EntityType::Date),
    ("age", EntityType::Age),
];

/// Generic identifier keywords
const GENERIC_TOKENS: &[&str] = &["id", "identifier", "identity", "contact", "personal"];

/// How a key's own name classifies its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// Provider or clinician field
    Provider,
    /// The key names an identifier type
    Typed(EntityType),
    /// The key suggests an identifier without naming its type
    Generic,
    /// Container of clinical items
    ClinicalContainer,
    /// Recognised non-sensitive key
    Neutral,
    /// Nothing known about the key
    Unrecognized,
}

/// Classify `key`; `in_clinical` is set when an ancestor is a clinical container
pub fn classify_key(key: &str, in_clinical: bool) -> KeyClass {
    let tokens = tokenize(key);
    if tokens.is_empty() {
        return KeyClass::Unrecognized;
    }
    let compact = tokens.concat();

    if tokens.iter().any(|t| PROVIDER_TOKENS.contains(&t.as_str())) {
        return KeyClass::Provider;
    }

    // inside a clinical container a bare `name` is the item's name
    let clinical_item_name = in_clinical && compact == "name";
    if !clinical_item_name {
        if let Some(entity_type) = explicit_type(&tokens, &compact) {
            return KeyClass::Typed(entity_type);
        }
    }

    if tokens.iter().any(|t| GENERIC_TOKENS.contains(&t.as_str())) {
        return if in_clinical {
            KeyClass::Unrecognized
        } else {
            KeyClass::Generic
        };
    }

    if CLINICAL_CONTAINERS.contains(&compact.as_str())
        || tokens.iter().any(|t| CLINICAL_CONTAINERS.contains(&t.as_str()))
    {
        return KeyClass::ClinicalContainer;
    }

    if NEUTRAL_KEYS.contains(&compact.as_str()) || clinical_item_name {
        return KeyClass::Neutral;
    }

    KeyClass::Unrecognized
}

fn explicit_type(tokens: &[String], compact: &str) -> Option<EntityType> {
    EXACT_KEYS
        .iter()
        .find(|(key, _)| *key == compact)
        .or_else(|| {
            TOKEN_KEYS
                .iter()
                .find(|(token, _)| tokens.iter().any(|t| t == token))
        })
        .map(|(_, entity_type)| *entity_type)
}

/// Split a key into lower-case tokens
pub fn tokenize(key: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut previous: Option<char> = None;

    for ch in key.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            previous = None;
            continue;
        }
        let boundary = ch.is_uppercase()
            && previous.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
        if boundary && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        current.extend(ch.to_lowercase());
        previous = Some(ch);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("dateOfBirth", &["date", "of", "birth"] ; "camel case")]
    #[test_case("patient_name", &["patient", "name"] ; "snake case")]
    #[test_case("Zip-Code", &["zip", "code"] ; "kebab case")]
    #[test_case("MRN", &["mrn"] ; "acronym")]
    #[test_case("address.line1", &["address", "line1"] ; "dotted")]
    fn test_tokenize(key: &str, expected: &[&str]) {
        assert_eq!(tokenize(key), expected);
    }

    #[test_case("email", KeyClass::Typed(EntityType::Email) ; "email")]
    #[test_case("dateOfBirth", KeyClass::Typed(EntityType::Date) ; "camel dob")]
    #[test_case("DOB", KeyClass::Typed(EntityType::Date) ; "dob")]
    #[test_case("ssn", KeyClass::Typed(EntityType::Ssn) ; "ssn")]
    #[test_case("phone_number", KeyClass::Typed(EntityType::PhoneNumber) ; "phone")]
    #[test_case("zip_code", KeyClass::Typed(EntityType::Zip) ; "zip")]
    #[test_case("license_plate", KeyClass::Typed(EntityType::VehicleId) ; "plate before license")]
    #[test_case("email_address", KeyClass::Typed(EntityType::Email) ; "email before address")]
    #[test_case("patientName", KeyClass::Typed(EntityType::Name) ; "patient name")]
    #[test_case("age", KeyClass::Typed(EntityType::Age) ; "age")]
    #[test_case("attending_physician", KeyClass::Provider ; "provider")]
    #[test_case("doctor_name", KeyClass::Provider ; "provider beats name")]
    #[test_case("id", KeyClass::Generic ; "generic id")]
    #[test_case("contact", KeyClass::Generic ; "generic contact")]
    #[test_case("medications", KeyClass::ClinicalContainer ; "clinical container")]
    #[test_case("gender", KeyClass::Neutral ; "neutral")]
    #[test_case("notes", KeyClass::Unrecognized ; "unrecognized")]
    #[test_case("cell_phone", KeyClass::Typed(EntityType::PhoneNumber) ; "cell phone")]
    #[test_case("cellNumber", KeyClass::Typed(EntityType::PhoneNumber) ; "cell number")]
    #[test_case("white_cell_count", KeyClass::Unrecognized ; "lab cell count")]
    #[test_case("cell_type", KeyClass::Unrecognized ; "cell type")]
    #[test_case("image_count", KeyClass::Unrecognized ; "imaging count")]
    #[test_case("profile_image", KeyClass::Typed(EntityType::Photo) ; "profile image")]
    #[test_case("card_number", KeyClass::Typed(EntityType::CreditDebitNumber) ; "card number")]
    #[test_case("report_card", KeyClass::Unrecognized ; "report card")]
    fn test_classify_key(key: &str, expected: KeyClass) {
        assert_eq!(classify_key(key, false), expected);
    }

    #[test]
    fn test_clinical_container_rules() {
        assert_eq!(classify_key("name", true), KeyClass::Neutral);
        assert_eq!(classify_key("id", true), KeyClass::Unrecognized);
        assert_eq!(classify_key("patient_name", true), KeyClass::Typed(EntityType::Name));
    }
}
