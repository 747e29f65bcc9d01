// crates/envlift-aws/src/ssm_store.rs
// ============================================================================
// Module: envlift SSM Configuration Store
// Description: Application, environment, and workload records from Parameter Store.
// Purpose: Implement the configuration store over SSM parameters.
// Dependencies: aws-sdk-ssm, envlift-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Records are JSON documents stored as parameters:
//!
//! - `<prefix>/applications/<app>`
//! - `<prefix>/applications/<app>/environments/<env>`
//! - `<prefix>/applications/<app>/components/<workload>`
//!
//! Missing parameters map to the store's not-found variants. Listings follow
//! every page and are returned sorted by name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use aws_sdk_ssm::Client;
use envlift_core::AppName;
use envlift_core::ApplicationRecord;
use envlift_core::ConfigStore;
use envlift_core::EnvName;
use envlift_core::EnvironmentRecord;
use envlift_core::StoreError;
use envlift_core::StoredApplication;
use envlift_core::StoredEnvironment;
use envlift_core::StoredWorkload;
use envlift_core::WorkloadRecord;
use serde::de::DeserializeOwned;

use crate::runtime::AwsRuntime;
use crate::session::AwsSession;

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Returns the application parameter path.
#[must_use]
pub fn application_path(prefix: &str, app: &AppName) -> String {
    format!("{prefix}/applications/{app}")
}

/// Returns the environment parameter path.
#[must_use]
pub fn environment_path(prefix: &str, app: &AppName, env: &EnvName) -> String {
    format!("{}/environments/{env}", application_path(prefix, app))
}

/// Returns the path listing every environment of an application.
#[must_use]
pub fn environments_dir(prefix: &str, app: &AppName) -> String {
    format!("{}/environments/", application_path(prefix, app))
}

/// Returns the path listing every workload of an application.
#[must_use]
pub fn workloads_dir(prefix: &str, app: &AppName) -> String {
    format!("{}/components/", application_path(prefix, app))
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Parses a stored JSON document.
fn decode<T: DeserializeOwned>(path: &str, value: &str) -> Result<T, StoreError> {
    serde_json::from_str(value).map_err(|err| StoreError::Invalid {
        path: path.to_string(),
        message: err.to_string(),
    })
}

/// Decodes an application parameter value.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] when the document is malformed.
pub fn decode_application(path: &str, value: &str) -> Result<ApplicationRecord, StoreError> {
    decode::<StoredApplication>(path, value).map(ApplicationRecord::from)
}

/// Decodes an environment parameter value.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] when the document is malformed or stores
/// both network alternatives.
pub fn decode_environment(path: &str, value: &str) -> Result<EnvironmentRecord, StoreError> {
    let stored = decode::<StoredEnvironment>(path, value)?;
    EnvironmentRecord::try_from(stored).map_err(|err| StoreError::Invalid {
        path: path.to_string(),
        message: err.to_string(),
    })
}

/// Decodes a workload parameter value.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] when the document is malformed.
pub fn decode_workload(path: &str, value: &str) -> Result<WorkloadRecord, StoreError> {
    decode::<StoredWorkload>(path, value).map(WorkloadRecord::from)
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Parameter-Store-backed configuration store.
#[derive(Debug, Clone)]
pub struct SsmConfigStore {
    /// SSM client.
    client: Client,
    /// Shared runtime.
    runtime: AwsRuntime,
    /// Parameter path prefix.
    prefix: String,
}

impl SsmConfigStore {
    /// Creates a store reading parameters under `prefix`.
    #[must_use]
    pub fn new(client: Client, runtime: AwsRuntime, prefix: impl Into<String>) -> Self {
        Self {
            client,
            runtime,
            prefix: prefix.into(),
        }
    }

    /// Creates a store over the default session.
    #[must_use]
    pub fn from_session(session: &AwsSession, prefix: impl Into<String>) -> Self {
        Self::new(Client::new(session.config()), session.runtime().clone(), prefix)
    }

    /// Reads one parameter value; `Ok(None)` when the parameter does not exist.
    fn get_value(&self, path: String) -> Result<Option<String>, StoreError> {
        let client = self.client.clone();
        self.runtime.block_on(async move {
            match client.get_parameter().name(&path).send().await {
                Ok(output) => Ok(output.parameter().and_then(|p| p.value()).map(str::to_string)),
                Err(err) => {
                    let err = err.into_service_error();
                    if err.is_parameter_not_found() {
                        Ok(None)
                    } else {
                        Err(StoreError::Backend(format!("get parameter {path}: {err}")))
                    }
                }
            }
        })
    }

    /// Reads every parameter directly under `path` as `(name, value)` pairs.
    fn list_values(&self, path: String) -> Result<Vec<(String, String)>, StoreError> {
        let client = self.client.clone();
        self.runtime.block_on(async move {
            let mut values = Vec::new();
            let mut next_token: Option<String> = None;
            loop {
                let output = client
                    .get_parameters_by_path()
                    .path(&path)
                    .recursive(false)
                    .set_next_token(next_token.take())
                    .send()
                    .await
                    .map_err(|err| {
                        StoreError::Backend(format!(
                            "list parameters under {path}: {}",
                            err.into_service_error()
                        ))
                    })?;
                for parameter in output.parameters() {
                    if let (Some(name), Some(value)) = (parameter.name(), parameter.value()) {
                        values.push((name.to_string(), value.to_string()));
                    }
                }
                match output.next_token() {
                    Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                    _ => break,
                }
            }
            Ok(values)
        })
    }
}

impl ConfigStore for SsmConfigStore {
    fn get_application(&self, app: &AppName) -> Result<ApplicationRecord, StoreError> {
        let path = application_path(&self.prefix, app);
        let value = self.get_value(path.clone())?.ok_or_else(|| StoreError::ApplicationNotFound {
            app: app.clone(),
        })?;
        decode_application(&path, &value)
    }

    fn get_environment(
        &self,
        app: &AppName,
        env: &EnvName,
    ) -> Result<EnvironmentRecord, StoreError> {
        let path = environment_path(&self.prefix, app, env);
        let value = self.get_value(path.clone())?.ok_or_else(|| StoreError::EnvironmentNotFound {
            app: app.clone(),
            env: env.clone(),
        })?;
        decode_environment(&path, &value)
    }

    fn list_environments(&self, app: &AppName) -> Result<Vec<EnvironmentRecord>, StoreError> {
        let mut records = self
            .list_values(environments_dir(&self.prefix, app))?
            .iter()
            .map(|(path, value)| decode_environment(path, value))
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    fn list_workloads(&self, app: &AppName) -> Result<Vec<WorkloadRecord>, StoreError> {
        let mut records = self
            .list_values(workloads_dir(&self.prefix, app))?
            .iter()
            .map(|(path, value)| decode_workload(path, value))
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
