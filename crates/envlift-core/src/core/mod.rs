// crates/envlift-core/src/core/mod.rs
// ============================================================================
// Module: envlift Core Types
// Description: Records, versions, templates, and upgrade inputs.
// Purpose: Provide the typed data model consumed by the upgrade runtime.
// Dependencies: semver, serde, yaml-rust2
// ============================================================================

//! ## Overview
//! Core types describe what the configuration store holds, what an environment
//! template declares, and what a stack upgrade needs. They carry no I/O.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod manifest;
pub mod records;
pub mod template;
pub mod upgrade_input;
pub mod version;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::AppName;
pub use identifiers::EnvName;
pub use manifest::EnvironmentManifest;
pub use manifest::ManifestError;
pub use records::ApplicationRecord;
pub use records::CustomConfig;
pub use records::EnvironmentRecord;
pub use records::ImportedVpc;
pub use records::ManagedVpc;
pub use records::NetworkOverride;
pub use records::RecordError;
pub use records::StoredApplication;
pub use records::StoredEnvironment;
pub use records::StoredWorkload;
pub use records::Telemetry;
pub use records::WorkloadRecord;
pub use records::WorkloadType;
pub use template::SourcePosition;
pub use template::TemplateDocument;
pub use template::TemplateError;
pub use template::extract_version;
pub use template::locate_policy_statement_anchor;
pub use upgrade_input::ArtifactBucket;
pub use upgrade_input::CUSTOM_RESOURCE_KEY_PREFIX;
pub use upgrade_input::CustomResource;
pub use upgrade_input::DEFAULT_PARTITION;
pub use upgrade_input::NamedBinary;
pub use upgrade_input::ResourceSet;
pub use upgrade_input::UpgradeInput;
pub use version::LATEST_ENV_TEMPLATE_VERSION;
pub use version::LEGACY_ENV_TEMPLATE_VERSION;
pub use version::TemplateVersion;
pub use version::UPLOAD_PERMISSION_MIN_VERSION;
pub use version::VersionError;
