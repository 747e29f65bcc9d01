// crates/envlift-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Message catalog and placeholder substitution for CLI output.
// Purpose: Keep every user-facing string in one place.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The envlift CLI stores user-facing strings in a small catalog keyed by
//! dotted names. All runtime output is routed through the [`t!`](crate::t)
//! macro.
//!
//! ## Invariants
//! - The catalog is built once and read-only thereafter.
//! - Missing keys fall back to the key itself.
//! - Placeholders are `{name}` with `name` in `[a-z0-9_]`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"env"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Catalog entries.
const CATALOG: &[(&str, &str)] = &[
    ("main.version", "envlift {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("logging.init_failed", "Failed to initialize logging: {error}"),
    ("aws.session_failed", "Failed to create AWS session: {error}"),
    ("resources.load_failed", "Failed to load custom resources: {error}"),
    ("env.upgrade.failed", "{error}"),
    ("env.upgrade.report.upgraded", "Upgraded environment {env} from {from} to {to}."),
    ("env.upgrade.report.up_to_date", "Environment {env} is already on the latest version {to}."),
    (
        "env.upgrade.report.version_skew",
        "Environment {env} runs version {current}, newer than {to}. Upgrade envlift to manage it.",
    ),
    ("env.upgrade.report.none", "No environments found in application {app}."),
    ("env.manifest.failed", "Failed to build manifest for environment {env}: {error}"),
    ("progress.patch.start", "Updating the manager role of environment {env}."),
    ("progress.patch.done", "Updated the manager role of environment {env}."),
    ("progress.patch.failed", "Failed to update the manager role of environment {env}."),
    ("progress.upgrade.start", "Upgrading environment {env} from {from} to {to}."),
    ("progress.upgrade.done", "Upgraded environment {env} to {to}."),
    ("progress.upgrade.failed", "Failed to upgrade environment {env} to {to}."),
    (
        "progress.version_skew",
        "Environment {env} runs version {current}, newer than {to}. Upgrade envlift to manage it.",
    ),
];

/// Returns the message catalog.
pub(crate) fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    CATALOG_MAP.get_or_init(|| CATALOG.iter().copied().collect())
}

/// Returns every catalog entry in declaration order.
#[must_use]
pub fn catalog_entries() -> &'static [(&'static str, &'static str)] {
    CATALOG
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Looks up `key` and substitutes `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
