// crates/envlift-core/src/runtime/comparator.rs
// ============================================================================
// Module: envlift Version Comparator
// Description: Upgrade decision from current and latest template versions.
// Purpose: Decide between upgrading, skipping as current, and skipping on skew.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The comparator is a pure function over semantic-version precedence. An
//! environment ahead of the operator's target was upgraded by a newer release
//! of the tool; that is reported as version skew and skipped, never treated as
//! an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use crate::core::TemplateVersion;
use crate::core::VersionError;

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Outcome of comparing an environment's version with the target version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeDecision {
    /// The environment is behind the target and should be upgraded.
    Upgrade,
    /// The environment already runs the target version.
    SkipUpToDate,
    /// The environment runs a newer version than the target.
    SkipVersionSkew,
}

/// Decides whether `current` should be upgraded to `latest`.
#[must_use]
pub fn decide(current: &TemplateVersion, latest: &TemplateVersion) -> UpgradeDecision {
    match current.cmp_precedence(latest) {
        Ordering::Less => UpgradeDecision::Upgrade,
        Ordering::Equal => UpgradeDecision::SkipUpToDate,
        Ordering::Greater => UpgradeDecision::SkipVersionSkew,
    }
}

/// Parses both versions and decides.
///
/// # Errors
///
/// Returns [`VersionError::Malformed`] when either string is not a
/// `v`-prefixed semantic version.
pub fn decide_versions(current: &str, latest: &str) -> Result<UpgradeDecision, VersionError> {
    Ok(decide(&TemplateVersion::parse(current)?, &TemplateVersion::parse(latest)?))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn documented_pairs() {
        assert_eq!(decide_versions("v1.8.0", "v1.9.0").expect("decide"), UpgradeDecision::Upgrade);
        assert_eq!(
            decide_versions("v1.9.0", "v1.9.0").expect("decide"),
            UpgradeDecision::SkipUpToDate
        );
        assert_eq!(
            decide_versions("v1.10.0", "v1.9.0").expect("decide"),
            UpgradeDecision::SkipVersionSkew
        );
    }

    #[test]
    fn prerelease_precedes_release() {
        assert_eq!(
            decide_versions("v1.14.0-rc.1", "v1.14.0").expect("decide"),
            UpgradeDecision::Upgrade
        );
    }

    #[test]
    fn malformed_versions_are_errors() {
        assert!(decide_versions("1.9.0", "v1.9.0").is_err());
        assert!(decide_versions("v1.9.0", "latest").is_err());
    }
}
