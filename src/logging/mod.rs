//! Logging and observability
//!
//! Structured logging via `tracing`, with a console layer and an optional
//! JSON rolling-file layer. Identifier values are never logged; events carry
//! counts, entity types and identity ids only.
//!
//! # Example
//!
//! ```no_run
//! use harbor::logging::init_logging;
//! use harbor::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a pseudonymization operation
///
/// # Example
///
/// ```no_run
/// use harbor::log_operation_start;
///
/// log_operation_start!("anonymize", "EMAIL");
/// ```
#[macro_export]
macro_rules! log_operation_start {
    ($method:expr, $identity_type:expr) => {
        tracing::debug!(
            method = %$method,
            identity_type = %$identity_type,
            "Starting operation"
        );
    };
}

/// Log the completion of a pseudonymization operation
///
/// # Example
///
/// ```no_run
/// use harbor::log_operation_complete;
/// use std::time::Duration;
///
/// log_operation_complete!("anonymize", 3, Duration::from_millis(12));
/// ```
#[macro_export]
macro_rules! log_operation_complete {
    ($method:expr, $count:expr, $duration:expr) => {
        tracing::info!(
            method = %$method,
            count = $count,
            duration_ms = $duration.as_millis() as u64,
            "Operation completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use harbor::log_error_with_context;
/// use harbor::domain::HarborError;
///
/// let error = HarborError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
