//! Configuration loading with `${VAR}` substitution and `HARBOR_*` overrides

use super::schema::HarborConfig;
use crate::domain::{HarborError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// Reads the file, substitutes `${VAR}` references in non-comment lines,
/// parses it, applies `HARBOR_<SECTION>_<KEY>` overrides and validates the
/// result.
///
/// # Errors
///
/// Returns [`HarborError::Configuration`] if the file is missing or
/// unreadable, references unset variables, fails to parse, carries an
/// unparseable override, or fails validation.
///
/// # Examples
///
/// ```no_run
/// use harbor::config::load_config;
///
/// let config = load_config("harbor.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<HarborConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(HarborError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        HarborError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;

    load_config_str(&contents)
}

/// Same as [`load_config`], starting from TOML text
pub fn load_config_str(contents: &str) -> Result<HarborConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: HarborConfig = toml::from_str(&contents)
        .map_err(|e| HarborError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        HarborError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    tracing::debug!(
        confidence_threshold = config.anonymization.detection.confidence_threshold,
        audit_enabled = config.anonymization.audit.enabled,
        "Configuration loaded"
    );
    Ok(config)
}

/// Replace `${VAR}` with the variable's value; comment lines are left alone
fn substitute_env_vars(input: &str) -> Result<String> {
    let placeholder = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| HarborError::Configuration(format!("Invalid placeholder pattern: {e}")))?;
    let mut missing: Vec<String> = Vec::new();

    let lines: Vec<String> = input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return line.to_string();
            }
            placeholder
                .replace_all(line, |caps: &regex::Captures<'_>| {
                    let name = &caps[1];
                    std::env::var(name).unwrap_or_else(|_| {
                        if !missing.iter().any(|m| m == name) {
                            missing.push(name.to_string());
                        }
                        String::new()
                    })
                })
                .into_owned()
        })
        .collect();

    if !missing.is_empty() {
        return Err(HarborError::Configuration(format!(
            "Missing required environment variables: {}",
            missing.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Apply `HARBOR_*` environment overrides
fn apply_env_overrides(config: &mut HarborConfig) -> Result<()> {
    if let Ok(val) = std::env::var("HARBOR_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val.to_lowercase();
    }

    if let Ok(val) = std::env::var("HARBOR_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("HARBOR_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("HARBOR_LOGGING_LOCAL_PATH") {
        config.logging.local_path = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("HARBOR_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = parse_override("HARBOR_LOGGING_LOCAL_ROTATION", &val)?;
    }

    config
        .anonymization
        .apply_env_overrides()
        .map_err(|e| HarborError::Configuration(format!("{e:#}")))
}

fn parse_override<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| HarborError::Configuration(format!("Invalid {name} value '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("HARBOR_TEST_SUBST_PATH", "/var/log/harbor");
        let out = substitute_env_vars("log_path = \"${HARBOR_TEST_SUBST_PATH}/audit.log\"").unwrap();
        assert_eq!(out, "log_path = \"/var/log/harbor/audit.log\"");
        std::env::remove_var("HARBOR_TEST_SUBST_PATH");
    }

    #[test]
    fn test_substitute_skips_comments() {
        let out = substitute_env_vars("# uses ${HARBOR_TEST_UNSET_IN_COMMENT}\nx = 1").unwrap();
        assert!(out.contains("${HARBOR_TEST_UNSET_IN_COMMENT}"));
    }

    #[test]
    fn test_missing_vars_listed_once() {
        let err = substitute_env_vars(
            "a = \"${HARBOR_TEST_MISSING_ONE}\"\nb = \"${HARBOR_TEST_MISSING_ONE}\"\nc = \"${HARBOR_TEST_MISSING_TWO}\"",
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("HARBOR_TEST_MISSING_ONE, HARBOR_TEST_MISSING_TWO"), "{err}");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[application]
log_level = "debug"

[anonymization.safe_harbor]
age_threshold = 89

[anonymization.audit]
enabled = false
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.anonymization.safe_harbor.age_threshold, 89);
        assert!(!config.anonymization.audit.enabled);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/nonexistent/harbor.toml").unwrap_err();
        assert!(matches!(err, HarborError::Configuration(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = load_config_str("[application]\nlog_level = \"chatty\"").unwrap_err();
        assert!(err.to_string().contains("chatty"));
    }
}
