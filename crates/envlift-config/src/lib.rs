// crates/envlift-config/src/lib.rs
// ============================================================================
// Module: envlift Config Library
// Description: Configuration model and on-disk resource loading.
// Purpose: Give the CLI one validated view of operator configuration.
// Dependencies: crate::{config, resources}
// ============================================================================

//! ## Overview
//! `envlift-config` owns the `envlift.toml` model and the loader for the
//! custom resource set published ahead of every upgrade.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod resources;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AwsConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::ConfigSource;
pub use config::DEFAULT_CONFIG_NAME;
pub use config::EnvliftConfig;
pub use config::LogFormat;
pub use config::LoggingConfig;
pub use config::ResourcesConfig;
pub use config::StoreConfig;
pub use config::TemplatesConfig;
pub use config::UpgradeSettings;
pub use resources::HANDLER_FILE_NAME;
pub use resources::ResourceLoadError;
pub use resources::load_resource_set;
