//! Compliance behavior: Safe Harbor transforms, processing-purpose checks and
//! custom pattern libraries

use harbor::anonymization::audit::NoopAuditLogger;
use harbor::anonymization::config::ConsentConfig;
use harbor::anonymization::{
    AnonymizationConfig, ConsentPolicy, EntityType, MemoryStore, PseudonymizationService,
    Pseudonymizer, RequestContext,
};
use harbor::domain::{HarborError, IdentityKey};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use test_case::test_case;

fn service_with(config: &AnonymizationConfig) -> (PseudonymizationService, Arc<MemoryStore>) {
    let core = Arc::new(Pseudonymizer::from_config(config).unwrap());
    let store = Arc::new(MemoryStore::new());
    let service = PseudonymizationService::with_store(core, store.clone(), Arc::new(NoopAuditLogger))
        .with_consent(ConsentPolicy::new(&config.consent));
    (service, store)
}

fn key() -> IdentityKey {
    IdentityKey::new("P-20931", "patient_id").unwrap()
}

fn enforcing() -> AnonymizationConfig {
    let mut config = AnonymizationConfig::default();
    config.consent = ConsentConfig {
        enforce: true,
        ..ConsentConfig::default()
    };
    config
}

#[test_case("DOB: 03/15/1975", "DOB: XX/XX/1975" ; "us date")]
#[test_case("Admitted 2024-01-15T10:30:00Z", "Admitted XX/XX/2024" ; "iso timestamp")]
#[test_case("Seen on March 15, 1975", "Seen on XX/XX/1975" ; "long month")]
#[test_case("Boston, MA 02101", "Boston, MA 021**" ; "zip keeps prefix")]
#[test_case("Hanover, NH 03698", "Hanover, NH 00000" ; "restricted zip")]
#[test_case("He is 92 years old", "He is 90 or older" ; "age above threshold")]
#[test_case("She is 85 years old", "She is 85 years old" ; "age below threshold")]
#[tokio::test]
async fn test_safe_harbor_text(input: &str, expected: &str) {
    let (service, _store) = service_with(&AnonymizationConfig::default());
    let out = service
        .anonymize_text(&key(), input, &RequestContext::new())
        .await
        .unwrap();
    assert_eq!(out.value, expected);
}

#[tokio::test]
async fn test_generalized_values_round_trip() {
    let (service, _store) = service_with(&AnonymizationConfig::default());
    let text = "DOB: 03/15/1975, lives in Boston, MA 02101";
    let out = service
        .anonymize_text(&key(), text, &RequestContext::new())
        .await
        .unwrap();
    assert_eq!(out.entity_types, vec![EntityType::Zip, EntityType::Date]);

    let restored = service
        .deanonymize_text(&key(), &out.value, &RequestContext::new())
        .await
        .unwrap();
    assert_eq!(restored.value, text);
}

#[tokio::test]
async fn test_custom_age_threshold() {
    let mut config = AnonymizationConfig::default();
    config.safe_harbor.age_threshold = 80;
    let (service, _store) = service_with(&config);

    let out = service
        .anonymize_json(&key(), &json!({"age": 85, "note": "85 years old"}), &RequestContext::new())
        .await
        .unwrap();
    assert_eq!(out.value["age"], 80);
    assert_eq!(out.value["note"], "80 or older");
}

#[test_case(Some("healthcare_provision"), true ; "allowed purpose")]
#[test_case(Some("Emergency_Care"), true ; "case insensitive")]
#[test_case(Some("  quality_improvement "), true ; "surrounding whitespace")]
#[test_case(Some("marketing"), false ; "unlisted purpose")]
#[test_case(Some(""), false ; "blank purpose")]
#[test_case(None, false ; "missing purpose")]
#[tokio::test]
async fn test_consent_enforcement(purpose: Option<&str>, allowed: bool) {
    let (service, store) = service_with(&enforcing());
    let mut context = RequestContext::new();
    if let Some(purpose) = purpose {
        context = context.with_purpose(purpose);
    }

    let outcome = service
        .anonymize_text(&key(), "SSN: 123-45-6789", &context)
        .await;
    if allowed {
        assert!(outcome.is_ok());
        assert_eq!(store.mapping_count().await, 1);
    } else {
        assert!(matches!(outcome, Err(HarborError::ConsentDenied(_))));
        assert_eq!(store.mapping_count().await, 0);
        assert!(store.operations().await.is_empty());
    }
}

#[tokio::test]
async fn test_consent_applies_to_every_operation() {
    let (service, _store) = service_with(&enforcing());
    let context = RequestContext::new();

    assert!(matches!(
        service.detect("SSN: 123-45-6789", &context).await,
        Err(HarborError::ConsentDenied(_))
    ));
    assert!(matches!(
        service.deanonymize_text(&key(), "x", &context).await,
        Err(HarborError::ConsentDenied(_))
    ));
    assert!(matches!(
        service.anonymize_json(&key(), &json!({"ssn": "123-45-6789"}), &context).await,
        Err(HarborError::ConsentDenied(_))
    ));
    assert!(matches!(
        service.deanonymize_json_str(&key(), "{}", &context).await,
        Err(HarborError::ConsentDenied(_))
    ));
}

#[tokio::test]
async fn test_legal_basis_recorded() {
    let mut config = enforcing();
    config.consent.legal_basis = "Article 9(2)(i)".to_string();
    let (service, store) = service_with(&config);

    service
        .anonymize_text(
            &key(),
            "SSN: 123-45-6789",
            &RequestContext::new().with_purpose("quality_improvement"),
        )
        .await
        .unwrap();
    let operations = store.operations().await;
    assert_eq!(operations[0].metadata.legal_basis, "Article 9(2)(i)");
    assert_eq!(operations[0].metadata.purpose, "quality_improvement");
}

const CUSTOM_LIBRARY: &str = r#"
version = "site-7"

[[rules]]
entity_type = "EMPLOYEE_ID"
score = 0.9
patterns = [
    { regex = '\bEMP-\d{5}\b' },
]

[[rules]]
entity_type = "MRN"
score = 0.95
patterns = [
    { regex = '\b(H\d{7})\b', group = 1, context = { keywords = ["chart"], window = 12 } },
]
"#;

fn library_file() -> NamedTempFile {
    tempfile::Builder::new().suffix(".toml").tempfile().unwrap()
}

fn custom_library() -> NamedTempFile {
    let mut file = library_file();
    file.write_all(CUSTOM_LIBRARY.as_bytes()).unwrap();
    file
}

#[test]
fn test_custom_pattern_library() {
    let library = custom_library();
    let mut config = AnonymizationConfig::default();
    config.detection.pattern_library = Some(library.path().to_path_buf());

    let core = Pseudonymizer::from_config(&config).unwrap();
    assert_eq!(core.detector().version(), "site-7");

    let entities = core.detect("Badge EMP-48213, chart H1234567, SSN 123-45-6789");
    let types: Vec<EntityType> = entities.iter().map(|e| e.entity_type).collect();
    assert_eq!(types, vec![EntityType::EmployeeId, EntityType::Mrn]);

    // keyword outside the window
    assert!(core.detect("H1234567 was never mentioned near the word chart").is_empty());
}

#[tokio::test]
async fn test_custom_library_round_trip() {
    let library = custom_library();
    let mut config = AnonymizationConfig::default();
    config.detection.pattern_library = Some(library.path().to_path_buf());
    let (service, _store) = service_with(&config);

    let text = "Badge EMP-48213 scanned at gate";
    let out = service
        .anonymize_text(&key(), text, &RequestContext::new())
        .await
        .unwrap();
    assert!(!out.value.contains("EMP-48213"));
    assert_eq!(out.entity_types, vec![EntityType::EmployeeId]);

    let restored = service
        .deanonymize_text(&key(), &out.value, &RequestContext::new())
        .await
        .unwrap();
    assert_eq!(restored.value, text);
}

#[test]
fn test_missing_pattern_library() {
    let mut config = AnonymizationConfig::default();
    config.detection.pattern_library = Some("/nonexistent/harbor/patterns.toml".into());
    assert!(matches!(
        Pseudonymizer::from_config(&config),
        Err(HarborError::Configuration(_))
    ));
}

#[test]
fn test_unknown_entity_type_in_library() {
    let mut file = library_file();
    file.write_all(
        br#"
[[rules]]
entity_type = "FAVOURITE_COLOUR"
score = 0.9
patterns = [{ regex = 'blue' }]
"#,
    )
    .unwrap();
    let mut config = AnonymizationConfig::default();
    config.detection.pattern_library = Some(file.path().to_path_buf());
    assert!(matches!(
        Pseudonymizer::from_config(&config),
        Err(HarborError::PatternLibrary(_))
    ));
}
