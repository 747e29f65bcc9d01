// crates/envlift-aws/src/factory.rs
// ============================================================================
// Module: envlift AWS Client Factory
// Description: Environment-scoped clients built from assumed manager-role sessions.
// Purpose: Implement the client factory for the upgrade runtime.
// Dependencies: aws-sdk-cloudformation, aws-sdk-s3, envlift-core
// ============================================================================

//! ## Overview
//! Each environment is managed through its manager role in its own region.
//! Assumed-role configurations are cached per `(role, region)` so the stack
//! client, object store, and describer of one environment share credentials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use aws_config::SdkConfig;
use envlift_core::ClientError;
use envlift_core::ClientFactory;
use envlift_core::EnvironmentRecord;

use crate::cloudformation::CfnStackClient;
use crate::cloudformation::CfnVersionDescriber;
use crate::cloudformation::WaitSettings;
use crate::renderer::DirectoryRenderer;
use crate::s3_store::S3ObjectStore;
use crate::session::AwsSession;

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Cache key of an assumed-role configuration.
type SessionKey = (String, String);

/// Builds AWS clients scoped to one environment.
#[derive(Debug)]
pub struct AwsClientFactory {
    /// Default session.
    session: AwsSession,
    /// Template renderer shared by stack clients.
    renderer: Arc<DirectoryRenderer>,
    /// Stack polling bounds.
    wait: WaitSettings,
    /// Assumed-role configurations.
    sessions: Mutex<BTreeMap<SessionKey, SdkConfig>>,
}

impl AwsClientFactory {
    /// Creates a factory over the default session.
    #[must_use]
    pub fn new(session: AwsSession, renderer: Arc<DirectoryRenderer>, wait: WaitSettings) -> Self {
        Self {
            session,
            renderer,
            wait,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the manager-role configuration of an environment.
    fn environment_config(
        &self,
        client: &'static str,
        env: &EnvironmentRecord,
    ) -> Result<SdkConfig, ClientError> {
        let session_error = |message: String| ClientError::Session {
            client,
            role: env.manager_role_arn.clone(),
            region: env.region.clone(),
            message,
        };
        let key = (env.manager_role_arn.clone(), env.region.clone());
        let mut sessions =
            self.sessions.lock().map_err(|_| session_error("session cache poisoned".to_string()))?;
        if let Some(config) = sessions.get(&key) {
            return Ok(config.clone());
        }
        let config = self
            .session
            .assume_role(&env.manager_role_arn, &env.region)
            .map_err(|err| session_error(err.to_string()))?;
        sessions.insert(key, config.clone());
        Ok(config)
    }
}

impl ClientFactory for AwsClientFactory {
    type Describer = CfnVersionDescriber;
    type Objects = S3ObjectStore;
    type Stack = CfnStackClient;

    fn stack_client(&self, env: &EnvironmentRecord) -> Result<Self::Stack, ClientError> {
        let config = self.environment_config("cloudformation", env)?;
        Ok(CfnStackClient::new(
            aws_sdk_cloudformation::Client::new(&config),
            self.session.runtime().clone(),
            Arc::clone(&self.renderer),
            self.wait,
        ))
    }

    fn object_store(&self, env: &EnvironmentRecord) -> Result<Self::Objects, ClientError> {
        let config = self.environment_config("s3", env)?;
        Ok(S3ObjectStore::new(
            aws_sdk_s3::Client::new(&config),
            self.session.runtime().clone(),
            env.region.clone(),
        ))
    }

    fn version_describer(&self, env: &EnvironmentRecord) -> Result<Self::Describer, ClientError> {
        let config = self.environment_config("describer", env).map_err(|err| {
            ClientError::Describer {
                app: env.app.clone(),
                env: env.name.clone(),
                message: err.to_string(),
            }
        })?;
        Ok(CfnVersionDescriber::new(
            aws_sdk_cloudformation::Client::new(&config),
            self.session.runtime().clone(),
            &env.app,
            &env.name,
            self.wait,
        ))
    }
}
