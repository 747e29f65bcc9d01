// crates/envlift-cli/src/tests/logging.rs
// ============================================================================
// Module: CLI Logging Tests
// Description: Unit tests for log filter selection.
// Purpose: Ensure the environment override and filter validation behave.
// Dependencies: envlift-cli logging module
// ============================================================================

//! ## Overview
//! Covers the precedence of `ENVLIFT_LOG` over the configured level without
//! installing a global subscriber.

use crate::logging::LoggingError;
use crate::logging::build_filter;
use crate::logging::filter_directive;

#[test]
fn environment_overrides_configured_level() {
    assert_eq!(filter_directive(Some("envlift_core=debug"), "info"), "envlift_core=debug");
}

#[test]
fn blank_environment_value_is_ignored() {
    assert_eq!(filter_directive(Some("  "), "warn"), "warn");
    assert_eq!(filter_directive(None, "warn"), "warn");
}

#[test]
fn valid_directives_build() {
    assert!(build_filter("info,envlift_aws=debug").is_ok());
}

#[test]
fn malformed_directives_are_rejected() {
    let result = build_filter("envlift_core=loud");
    assert!(matches!(
        result,
        Err(LoggingError::InvalidFilter { ref directive, .. }) if directive == "envlift_core=loud"
    ));
}
