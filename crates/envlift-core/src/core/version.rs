// crates/envlift-core/src/core/version.rs
// ============================================================================
// Module: envlift Template Versions
// Description: Semantic versions stamped into environment templates.
// Purpose: Parse `v`-prefixed template versions and expose the known releases.
// Dependencies: semver, thiserror
// ============================================================================

//! ## Overview
//! Environment templates carry a `v`-prefixed semantic version
//! (`v1.9.0`). Ordering follows semantic-version precedence, including
//! pre-release rules. Strings that do not parse are never partially trusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;
use thiserror::Error;

// ============================================================================
// SECTION: Known Releases
// ============================================================================

/// Version reported for templates deployed before versioning existed.
pub const LEGACY_ENV_TEMPLATE_VERSION: &str = "v0.0.0";
/// First template release granting the manager role artifact-upload permission.
pub const UPLOAD_PERMISSION_MIN_VERSION: &str = "v1.9.0";
/// Template version this release of the tool upgrades environments to.
pub const LATEST_ENV_TEMPLATE_VERSION: &str = "v1.14.0";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Parsed template version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateVersion(Version);

/// Version parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The string is not a `v`-prefixed semantic version.
    #[error("malformed template version '{0}'")]
    Malformed(String),
}

impl TemplateVersion {
    /// Parses a `v`-prefixed semantic version.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Malformed`] when the prefix is missing or the
    /// remainder is not a semantic version.
    pub fn parse(value: &str) -> Result<Self, VersionError> {
        let malformed = || VersionError::Malformed(value.to_string());
        let raw = value.strip_prefix('v').ok_or_else(malformed)?;
        Version::parse(raw).map(Self).map_err(|_| malformed())
    }

    /// Returns the legacy (pre-versioning) marker version.
    #[must_use]
    pub const fn legacy() -> Self {
        Self(Version::new(0, 0, 0))
    }

    /// Returns the first release granting the manager role upload permission.
    #[must_use]
    pub const fn upload_permission_min() -> Self {
        Self(Version::new(1, 9, 0))
    }

    /// Returns the template version this release upgrades to by default.
    #[must_use]
    pub const fn latest() -> Self {
        Self(Version::new(1, 14, 0))
    }

    /// Returns true when this is the legacy marker version.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        *self == Self::legacy()
    }

    /// Compares by semantic-version precedence, ignoring build metadata.
    #[must_use]
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        self.0.cmp_precedence(&other.0)
    }
}

impl FromStr for TemplateVersion {
    type Err = VersionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for TemplateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
