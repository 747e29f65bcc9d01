// crates/envlift-core/src/lib.rs
// ============================================================================
// Module: envlift Core Library
// Description: Public API surface for environment template upgrades.
// Purpose: Expose records, collaborator interfaces, and the upgrade runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! envlift core upgrades a deployed environment's infrastructure template to a
//! newer schema version. It patches the manager role when older templates lack
//! upload permission, publishes custom resources, compares versions, and
//! submits versioned or legacy upgrades. It performs no I/O of its own; every
//! remote effect goes through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ClientError;
pub use interfaces::ClientFactory;
pub use interfaces::ConfigStore;
pub use interfaces::DiscoveryError;
pub use interfaces::LegacyTemplater;
pub use interfaces::ObjectStore;
pub use interfaces::ObjectStoreError;
pub use interfaces::ProgressEvent;
pub use interfaces::ProgressSink;
pub use interfaces::ResourceDiscovery;
pub use interfaces::StackClient;
pub use interfaces::StackError;
pub use interfaces::StoreError;
pub use interfaces::TemplaterError;
pub use interfaces::VersionDescriber;
pub use runtime::EnvironmentOutcome;
pub use runtime::EnvironmentReport;
pub use runtime::EnvironmentUpgrader;
pub use runtime::UpgradeDecision;
pub use runtime::UpgradeError;
pub use runtime::UpgradeReport;
pub use runtime::UpgradeRequest;
pub use runtime::UpgradeTarget;
pub use runtime::UpgraderConfig;
