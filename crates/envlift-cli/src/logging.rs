// crates/envlift-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: tracing subscriber installation from config and environment.
// Purpose: Emit diagnostic logs to stderr in text or JSON form.
// Dependencies: envlift-config, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! `ENVLIFT_LOG` overrides the configured `logging.level` filter when set and
//! non-empty. Logs always go to stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use envlift_config::LogFormat;
use envlift_config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable overriding the log filter.
pub const LOG_ENV_VAR: &str = "ENVLIFT_LOG";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive is malformed.
    #[error("invalid log filter '{directive}': {message}")]
    InvalidFilter {
        /// Rejected directive.
        directive: String,
        /// Parser detail.
        message: String,
    },
    /// A global subscriber was already installed.
    #[error("install subscriber: {0}")]
    Install(String),
}

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Returns the filter directive in effect.
#[must_use]
pub fn filter_directive(env_value: Option<&str>, configured: &str) -> String {
    env_value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(configured)
        .to_string()
}

/// Builds the filter for a directive.
///
/// # Errors
///
/// Returns [`LoggingError::InvalidFilter`] when the directive does not parse.
pub fn build_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|err| LoggingError::InvalidFilter {
        directive: directive.to_string(),
        message: err.to_string(),
    })
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`LoggingError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(&filter_directive(env_value.as_deref(), &config.level))?;
    let builder =
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| LoggingError::Install(err.to_string()))
}
