// crates/envlift-aws/src/session.rs
// ============================================================================
// Module: envlift AWS Sessions
// Description: Default and role-assumed SDK configurations.
// Purpose: Build the shared SDK config and per-environment assumed-role configs.
// Dependencies: aws-config, tokio
// ============================================================================

//! ## Overview
//! The default session serves the configuration store and regional discovery.
//! Environment-scoped clients use credentials from assuming the environment's
//! manager role in the environment's region.

// ============================================================================
// SECTION: Imports
// ============================================================================

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::SdkConfig;
use aws_config::sts::AssumeRoleProvider;
use aws_sdk_s3::config::SharedCredentialsProvider;
use tracing::debug;

use crate::runtime::AwsRuntime;
use crate::runtime::BridgeError;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Session name attached to assumed-role credentials.
const ASSUMED_SESSION_NAME: &str = "envlift";

/// Inputs for the default session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    /// Region override; the SDK chain decides when absent.
    pub region: Option<String>,
    /// Custom endpoint URL.
    pub endpoint: Option<String>,
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Default SDK configuration plus the runtime that drives it.
#[derive(Debug, Clone)]
pub struct AwsSession {
    /// Shared runtime.
    runtime: AwsRuntime,
    /// Default SDK configuration.
    config: SdkConfig,
}

impl AwsSession {
    /// Loads the default session from the SDK provider chain.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError`] when the runtime cannot be started.
    pub fn load(settings: &SessionSettings) -> Result<Self, BridgeError> {
        let runtime = AwsRuntime::new()?;
        let region = settings.region.clone();
        let endpoint = settings.endpoint.clone();
        let config = runtime.block_on(async move {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(Region::new(region));
            }
            if let Some(endpoint) = endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            Ok::<_, BridgeError>(loader.load().await)
        })?;
        Ok(Self {
            runtime,
            config,
        })
    }

    /// Returns the shared runtime.
    #[must_use]
    pub const fn runtime(&self) -> &AwsRuntime {
        &self.runtime
    }

    /// Returns the default SDK configuration.
    #[must_use]
    pub const fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Returns the region of the default session, if one resolved.
    #[must_use]
    pub fn region(&self) -> Option<String> {
        self.config.region().map(ToString::to_string)
    }

    /// Returns the default configuration pinned to `region`.
    #[must_use]
    pub fn regional(&self, region: &str) -> SdkConfig {
        self.config.to_builder().region(Region::new(region.to_string())).build()
    }

    /// Builds a configuration using credentials from assuming `role_arn`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError`] when the runtime is unavailable.
    pub fn assume_role(&self, role_arn: &str, region: &str) -> Result<SdkConfig, BridgeError> {
        let base = self.regional(region);
        let role = role_arn.to_string();
        let region = region.to_string();
        debug!(role = %role, region = %region, "assuming environment manager role");
        self.runtime.block_on(async move {
            let provider = AssumeRoleProvider::builder(role)
                .session_name(ASSUMED_SESSION_NAME)
                .region(Region::new(region.clone()))
                .configure(&base)
                .build()
                .await;
            Ok(base
                .to_builder()
                .credentials_provider(SharedCredentialsProvider::new(provider))
                .region(Region::new(region))
                .build())
        })
    }
}
