// crates/envlift-core/src/runtime/mod.rs
// ============================================================================
// Module: envlift Runtime
// Description: Upgrade decision, patching, publishing, and orchestration.
// Purpose: Execute environment upgrades against injected collaborators.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the upgrade steps and the orchestrator that
//! sequences them. Every remote effect goes through [`crate::interfaces`];
//! [`memory`] provides in-memory collaborators for tests and demos.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod comparator;
pub mod legacy;
pub mod memory;
pub mod orchestrator;
pub mod patcher;
pub mod publisher;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use comparator::UpgradeDecision;
pub use comparator::decide;
pub use comparator::decide_versions;
pub use legacy::LegacyError;
pub use legacy::LegacyShape;
pub use legacy::LegacyUpgradePlan;
pub use legacy::resolve_legacy_upgrade;
pub use memory::InMemoryClientFactory;
pub use memory::InMemoryConfigStore;
pub use memory::InMemoryObjectStore;
pub use memory::InMemoryResourceDiscovery;
pub use memory::InMemoryStackClient;
pub use memory::InMemoryVersionDescriber;
pub use memory::RecordingProgressSink;
pub use memory::StaticLegacyTemplater;
pub use orchestrator::EnvironmentOutcome;
pub use orchestrator::EnvironmentReport;
pub use orchestrator::EnvironmentUpgrader;
pub use orchestrator::UpgradeError;
pub use orchestrator::UpgradeReport;
pub use orchestrator::UpgradeRequest;
pub use orchestrator::UpgradeTarget;
pub use orchestrator::UpgraderConfig;
pub use patcher::PatchError;
pub use patcher::PatchOutcome;
pub use patcher::ensure_upload_permission;
pub use patcher::splice_upload_permission;
pub use publisher::PublishError;
pub use publisher::publish;
