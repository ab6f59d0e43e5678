//! Integration tests for configuration loading and validation
//!
//! Tests that modify environment variables hold ENV_MUTEX so they do not
//! interfere with each other.

use harbor::config::{load_config, LogRotation};
use harbor::domain::HarborError;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("HARBOR_APPLICATION_LOG_LEVEL");
    std::env::remove_var("HARBOR_LOGGING_LOCAL_ENABLED");
    std::env::remove_var("HARBOR_LOGGING_LOCAL_ROTATION");
    std::env::remove_var("HARBOR_ANONYMIZATION_AGE_THRESHOLD");
    std::env::remove_var("HARBOR_ANONYMIZATION_CONSENT_ENFORCE");
    std::env::remove_var("HARBOR_ANONYMIZATION_AUDIT_ENABLED");
    std::env::remove_var("TEST_HARBOR_AUDIT_DIR");
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
[application]
log_level = "debug"

[anonymization.detection]
confidence_threshold = 0.9

[anonymization.safe_harbor]
age_threshold = 89
restricted_zip_prefixes = ["036", "059"]
preserve_provider_names = false

[anonymization.consent]
enforce = true
allowed_purposes = ["research"]
legal_basis = "Article 6(1)(a)"

[anonymization.audit]
enabled = true
log_path = "/var/log/harbor/audit.log"
json_format = false

[logging]
local_enabled = true
local_path = "/var/log/harbor"
local_rotation = "hourly"
"#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.anonymization.detection.confidence_threshold, 0.9);
    assert_eq!(config.anonymization.safe_harbor.age_threshold, 89);
    assert_eq!(config.anonymization.safe_harbor.restricted_zip_prefixes.len(), 2);
    assert!(!config.anonymization.safe_harbor.preserve_provider_names);
    assert!(config.anonymization.consent.enforce);
    assert_eq!(config.anonymization.consent.legal_basis, "Article 6(1)(a)");
    assert!(!config.anonymization.audit.json_format);
    assert_eq!(
        config.anonymization.audit.log_path,
        PathBuf::from("/var/log/harbor/audit.log")
    );
    assert!(config.logging.local_enabled);
    assert_eq!(config.logging.local_rotation, LogRotation::Hourly);
}

#[test]
fn test_load_empty_config_with_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("");
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.application.log_level, "info");
    assert_eq!(config.anonymization.detection.confidence_threshold, 0.8);
    assert!(config.anonymization.detection.pattern_library.is_none());
    assert_eq!(config.anonymization.safe_harbor.age_threshold, 90);
    assert_eq!(config.anonymization.safe_harbor.restricted_zip_prefixes.len(), 17);
    assert!(!config.anonymization.consent.enforce);
    assert!(config.anonymization.audit.enabled);
    assert!(!config.logging.local_enabled);
    assert_eq!(config.logging.local_rotation, LogRotation::Daily);
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("TEST_HARBOR_AUDIT_DIR", "/srv/audit");

    let file = write_config(
        r#"
# audit directory comes from ${TEST_HARBOR_AUDIT_DIR}
[anonymization.audit]
log_path = "${TEST_HARBOR_AUDIT_DIR}/harbor-audit.log"
"#,
    );
    let config = load_config(file.path()).unwrap();
    assert_eq!(
        config.anonymization.audit.log_path,
        PathBuf::from("/srv/audit/harbor-audit.log")
    );

    cleanup_env_vars();
}

#[test]
fn test_missing_env_vars_are_listed() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
[anonymization.audit]
log_path = "${TEST_HARBOR_UNSET_DIR}/${TEST_HARBOR_UNSET_FILE}"
"#,
    );
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, HarborError::Configuration(_)));
    let message = err.to_string();
    assert!(message.contains("TEST_HARBOR_UNSET_DIR"));
    assert!(message.contains("TEST_HARBOR_UNSET_FILE"));
}

#[test]
fn test_env_var_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("HARBOR_APPLICATION_LOG_LEVEL", "WARN");
    std::env::set_var("HARBOR_ANONYMIZATION_AGE_THRESHOLD", "85");
    std::env::set_var("HARBOR_ANONYMIZATION_CONSENT_ENFORCE", "true");
    std::env::set_var("HARBOR_ANONYMIZATION_AUDIT_ENABLED", "false");
    std::env::set_var("HARBOR_LOGGING_LOCAL_ROTATION", "hourly");

    let file = write_config("[anonymization.safe_harbor]\nage_threshold = 90\n");
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.application.log_level, "warn");
    assert_eq!(config.anonymization.safe_harbor.age_threshold, 85);
    assert!(config.anonymization.consent.enforce);
    assert!(!config.anonymization.audit.enabled);
    assert_eq!(config.logging.local_rotation, LogRotation::Hourly);

    cleanup_env_vars();
}

#[test]
fn test_unparseable_override_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("HARBOR_ANONYMIZATION_AGE_THRESHOLD", "ninety");

    let file = write_config("");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("HARBOR_ANONYMIZATION_AGE_THRESHOLD"));

    cleanup_env_vars();
}

#[test]
fn test_invalid_config_validation() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    for content in [
        "[application]\nlog_level = \"verbose\"\n",
        "[anonymization.detection]\nconfidence_threshold = 1.5\n",
        "[anonymization.safe_harbor]\nrestricted_zip_prefixes = [\"12\"]\n",
        "[anonymization.consent]\nenforce = true\nallowed_purposes = []\n",
        "[anonymization.detection]\npattern_library = \"/nonexistent/patterns.toml\"\n",
        "[logging]\nlocal_rotation = \"weekly\"\n",
    ] {
        let file = write_config(content);
        let err = load_config(file.path()).unwrap_err();
        assert!(
            matches!(err, HarborError::Configuration(_)),
            "{content}: {err}"
        );
    }
}

#[test]
fn test_missing_file() {
    let err = load_config("/nonexistent/harbor.toml").unwrap_err();
    assert!(err.to_string().contains("not found"));
}
