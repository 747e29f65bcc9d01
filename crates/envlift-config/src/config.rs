// crates/envlift-config/src/config.rs
// ============================================================================
// Module: envlift Configuration
// Description: envlift.toml model, path resolution, and validation.
// Purpose: Load operator configuration strictly and fail closed on bad input.
// Dependencies: envlift-core, serde, toml, thiserror
// ============================================================================

//! ## Overview
//! The configuration file is resolved from an explicit path, then the
//! `ENVLIFT_CONFIG` environment variable, then `./envlift.toml`. Only the
//! default location may be absent; it then yields [`EnvliftConfig::default`].
//! Unknown keys are rejected, file size and path lengths are bounded, and
//! every value is validated before the configuration is handed out.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use envlift_core::DEFAULT_PARTITION;
use envlift_core::LATEST_ENV_TEMPLATE_VERSION;
use envlift_core::TemplateVersion;
use envlift_core::UpgraderConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default configuration filename.
pub const DEFAULT_CONFIG_NAME: &str = "envlift.toml";
/// Environment variable naming the configuration path.
pub const CONFIG_ENV_VAR: &str = "ENVLIFT_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Allowed stack polling interval in milliseconds.
const POLL_INTERVAL_RANGE_MS: std::ops::RangeInclusive<u64> = 100 ..= 60_000;
/// Allowed stack update timeout in seconds.
const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 60 ..= 21_600;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// The file is not valid TOML for the model.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A value failed validation.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Source Resolution
// ============================================================================

/// Where the configuration path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicit path from the command line.
    Explicit(PathBuf),
    /// Path taken from [`CONFIG_ENV_VAR`].
    Environment(PathBuf),
    /// The default file in the working directory.
    Default(PathBuf),
}

impl ConfigSource {
    /// Resolves the source from an explicit path or an environment value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the resolved path exceeds the
    /// length limits.
    pub fn resolve(
        explicit: Option<&Path>,
        env_value: Option<String>,
    ) -> Result<Self, ConfigError> {
        let source = match (explicit, env_value) {
            (Some(path), _) => Self::Explicit(path.to_path_buf()),
            (None, Some(value)) if !value.trim().is_empty() => {
                Self::Environment(PathBuf::from(value))
            }
            (None, _) => Self::Default(PathBuf::from(DEFAULT_CONFIG_NAME)),
        };
        validate_path("config path", source.path())?;
        Ok(source)
    }

    /// Returns the resolved path.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Explicit(path) | Self::Environment(path) | Self::Default(path) => path,
        }
    }
}

// ============================================================================
// SECTION: Model
// ============================================================================

/// Root of `envlift.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvliftConfig {
    /// AWS session settings.
    #[serde(default)]
    pub aws: AwsConfig,
    /// Configuration store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Template source settings.
    #[serde(default)]
    pub templates: TemplatesConfig,
    /// Custom resource settings.
    #[serde(default)]
    pub resources: ResourcesConfig,
    /// Stack update settings.
    #[serde(default)]
    pub upgrade: UpgradeSettings,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// AWS session settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsConfig {
    /// Region of the default session; the SDK chain decides when absent.
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint URL.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// ARN partition.
    #[serde(default = "default_partition")]
    pub partition: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            partition: default_partition(),
        }
    }
}

/// Configuration store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Parameter path prefix under which records live.
    #[serde(default = "default_parameter_prefix")]
    pub parameter_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            parameter_prefix: default_parameter_prefix(),
        }
    }
}

/// Template source settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Directory holding `environment/<version>.yml` and `environment/legacy.yml`.
    #[serde(default = "default_templates_dir")]
    pub dir: PathBuf,
    /// Version every environment is upgraded to.
    #[serde(default = "default_latest_version")]
    pub latest_version: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_templates_dir(),
            latest_version: default_latest_version(),
        }
    }
}

/// Custom resource settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourcesConfig {
    /// Directory holding `<logical-name>/index.js` sources.
    #[serde(default = "default_resources_dir")]
    pub dir: PathBuf,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            dir: default_resources_dir(),
        }
    }
}

/// Stack update settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpgradeSettings {
    /// Stack status polling interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum wait for a stack update in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpgradeSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl UpgradeSettings {
    /// Returns the polling interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the update timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default log filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default ARN partition.
fn default_partition() -> String {
    DEFAULT_PARTITION.to_string()
}

/// Default parameter prefix.
fn default_parameter_prefix() -> String {
    "/copilot".to_string()
}

/// Default template directory.
fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

/// Default target version.
fn default_latest_version() -> String {
    LATEST_ENV_TEMPLATE_VERSION.to_string()
}

/// Default custom resource directory.
fn default_resources_dir() -> PathBuf {
    PathBuf::from("custom-resources")
}

/// Default polling interval.
const fn default_poll_interval_ms() -> u64 {
    5_000
}

/// Default update timeout.
const fn default_timeout_secs() -> u64 {
    3_600
}

/// Default log filter.
fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl EnvliftConfig {
    /// Loads configuration, consulting [`CONFIG_ENV_VAR`] when no path is given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let source = ConfigSource::resolve(path, env::var(CONFIG_ENV_VAR).ok())?;
        Self::load_from(&source)
    }

    /// Loads configuration from a resolved source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load_from(source: &ConfigSource) -> Result<Self, ConfigError> {
        let path = source.path();
        if matches!(source, ConfigSource::Default(_)) && !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] for out-of-bounds values.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.aws.validate()?;
        self.store.validate()?;
        validate_path("templates.dir", &self.templates.dir)?;
        TemplateVersion::parse(&self.templates.latest_version).map_err(|err| {
            ConfigError::Invalid(format!("templates.latest_version: {err}"))
        })?;
        validate_path("resources.dir", &self.resources.dir)?;
        self.upgrade.validate()?;
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.level must not be empty".to_string()));
        }
        Ok(())
    }

    /// Returns the target template version.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the version is malformed.
    pub fn latest_version(&self) -> Result<TemplateVersion, ConfigError> {
        TemplateVersion::parse(&self.templates.latest_version)
            .map_err(|err| ConfigError::Invalid(format!("templates.latest_version: {err}")))
    }

    /// Builds the orchestrator configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the target version is malformed.
    pub fn upgrader_config(&self) -> Result<UpgraderConfig, ConfigError> {
        Ok(UpgraderConfig {
            latest_version: self.latest_version()?,
            partition: self.aws.partition.clone(),
        })
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

impl AwsConfig {
    /// Validates session settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(region) = &self.region
            && !is_region_name(region)
        {
            return Err(ConfigError::Invalid(format!("aws.region '{region}' is not a region name")));
        }
        if let Some(endpoint) = &self.endpoint
            && !(endpoint.starts_with("https://") || endpoint.starts_with("http://"))
        {
            return Err(ConfigError::Invalid(
                "aws.endpoint must be an http or https url".to_string(),
            ));
        }
        if self.partition.is_empty()
            || !self.partition.chars().all(|c| c.is_ascii_lowercase() || c == '-')
        {
            return Err(ConfigError::Invalid(format!(
                "aws.partition '{}' is not a partition name",
                self.partition
            )));
        }
        Ok(())
    }
}

impl StoreConfig {
    /// Validates the parameter prefix.
    fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.parameter_prefix;
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            return Err(ConfigError::Invalid(
                "store.parameter_prefix must start with '/' and not end with '/'".to_string(),
            ));
        }
        if prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "store.parameter_prefix must not contain whitespace".to_string(),
            ));
        }
        Ok(())
    }
}

impl UpgradeSettings {
    /// Validates polling bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if !POLL_INTERVAL_RANGE_MS.contains(&self.poll_interval_ms) {
            return Err(ConfigError::Invalid(format!(
                "upgrade.poll_interval_ms must be within {}..={}",
                POLL_INTERVAL_RANGE_MS.start(),
                POLL_INTERVAL_RANGE_MS.end()
            )));
        }
        if !TIMEOUT_RANGE_SECS.contains(&self.timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "upgrade.timeout_secs must be within {}..={}",
                TIMEOUT_RANGE_SECS.start(),
                TIMEOUT_RANGE_SECS.end()
            )));
        }
        Ok(())
    }
}

/// Returns true for names like `us-west-2`.
fn is_region_name(region: &str) -> bool {
    !region.is_empty()
        && region.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Validates path length and component lengths.
fn validate_path(label: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.is_empty() {
        return Err(ConfigError::Invalid(format!("{label} must not be empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{label} exceeds max length")));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{label} component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn explicit_path_wins_over_environment() {
        let source =
            ConfigSource::resolve(Some(Path::new("a.toml")), Some("b.toml".to_string()))
                .expect("resolve");
        assert_eq!(source, ConfigSource::Explicit(PathBuf::from("a.toml")));
    }

    #[test]
    fn environment_wins_over_default() {
        let source = ConfigSource::resolve(None, Some("b.toml".to_string())).expect("resolve");
        assert_eq!(source, ConfigSource::Environment(PathBuf::from("b.toml")));
        let source = ConfigSource::resolve(None, Some("  ".to_string())).expect("resolve");
        assert_eq!(source, ConfigSource::Default(PathBuf::from(DEFAULT_CONFIG_NAME)));
    }

    #[test]
    fn durations_follow_settings() {
        let settings = UpgradeSettings::default();
        assert_eq!(settings.poll_interval(), Duration::from_secs(5));
        assert_eq!(settings.timeout(), Duration::from_secs(3_600));
    }
}
