// crates/envlift-core/src/runtime/memory.rs
// ============================================================================
// Module: envlift In-Memory Collaborators
// Description: Deterministic collaborator implementations for tests and demos.
// Purpose: Exercise the upgrade runtime without a live cloud account.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Every collaborator the upgrade runtime needs has an in-memory counterpart
//! here. Handles share state through `Arc<Mutex<..>>`, so a test can keep a
//! clone and inspect recorded calls after handing another clone to the
//! upgrader. They are not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::ApplicationRecord;
use crate::core::ArtifactBucket;
use crate::core::EnvironmentRecord;
use crate::core::NamedBinary;
use crate::core::UpgradeInput;
use crate::core::WorkloadRecord;
use crate::core::identifiers::AppName;
use crate::core::identifiers::EnvName;
use crate::interfaces::ClientError;
use crate::interfaces::ClientFactory;
use crate::interfaces::ConfigStore;
use crate::interfaces::DiscoveryError;
use crate::interfaces::LegacyTemplater;
use crate::interfaces::ObjectStore;
use crate::interfaces::ObjectStoreError;
use crate::interfaces::ProgressEvent;
use crate::interfaces::ProgressSink;
use crate::interfaces::ResourceDiscovery;
use crate::interfaces::StackClient;
use crate::interfaces::StackError;
use crate::interfaces::StoreError;
use crate::interfaces::TemplaterError;
use crate::interfaces::VersionDescriber;

// ============================================================================
// SECTION: Configuration Store
// ============================================================================

/// In-memory configuration store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigStore {
    /// Applications keyed by name.
    applications: BTreeMap<AppName, ApplicationRecord>,
    /// Environments in insertion order.
    environments: Vec<EnvironmentRecord>,
    /// Workloads in insertion order.
    workloads: Vec<WorkloadRecord>,
}

impl InMemoryConfigStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an application.
    #[must_use]
    pub fn with_application(mut self, app: ApplicationRecord) -> Self {
        self.applications.insert(app.name.clone(), app);
        self
    }

    /// Adds an environment.
    #[must_use]
    pub fn with_environment(mut self, env: EnvironmentRecord) -> Self {
        self.environments.push(env);
        self
    }

    /// Adds a workload.
    #[must_use]
    pub fn with_workload(mut self, workload: WorkloadRecord) -> Self {
        self.workloads.push(workload);
        self
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn get_application(&self, app: &AppName) -> Result<ApplicationRecord, StoreError> {
        self.applications.get(app).cloned().ok_or_else(|| StoreError::ApplicationNotFound {
            app: app.clone(),
        })
    }

    fn get_environment(
        &self,
        app: &AppName,
        env: &EnvName,
    ) -> Result<EnvironmentRecord, StoreError> {
        self.environments
            .iter()
            .find(|record| record.app == *app && record.name == *env)
            .cloned()
            .ok_or_else(|| StoreError::EnvironmentNotFound {
                app: app.clone(),
                env: env.clone(),
            })
    }

    fn list_environments(&self, app: &AppName) -> Result<Vec<EnvironmentRecord>, StoreError> {
        Ok(self.environments.iter().filter(|record| record.app == *app).cloned().collect())
    }

    fn list_workloads(&self, app: &AppName) -> Result<Vec<WorkloadRecord>, StoreError> {
        Ok(self.workloads.iter().filter(|record| record.app == *app).cloned().collect())
    }
}

// ============================================================================
// SECTION: Stack Client
// ============================================================================

/// Template update recorded by [`InMemoryStackClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateUpdate {
    /// Environment name.
    pub env: EnvName,
    /// Submitted body.
    pub body: String,
    /// Execution role attached to the update.
    pub execution_role_arn: String,
}

/// Upgrade call recorded by [`InMemoryStackClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedUpgrade {
    /// Versioned upgrade.
    Versioned(UpgradeInput),
    /// Legacy upgrade with the load-balanced workloads passed along.
    Legacy {
        /// Submitted input.
        input: UpgradeInput,
        /// Load-balanced web services.
        lb_workloads: Vec<String>,
    },
}

impl RecordedUpgrade {
    /// Returns the submitted input.
    #[must_use]
    pub const fn input(&self) -> &UpgradeInput {
        match self {
            Self::Versioned(input)
            | Self::Legacy {
                input, ..
            } => input,
        }
    }
}

/// Shared state behind [`InMemoryStackClient`].
#[derive(Debug, Default)]
struct StackState {
    /// Deployed templates keyed by environment.
    templates: BTreeMap<EnvName, String>,
    /// Recorded template updates.
    updates: Vec<TemplateUpdate>,
    /// Recorded upgrades.
    upgrades: Vec<RecordedUpgrade>,
    /// Error returned by the next template update.
    update_error: Option<StackError>,
    /// Error returned by upgrades of a given environment.
    upgrade_errors: BTreeMap<EnvName, StackError>,
}

/// In-memory stack client recording every update and upgrade.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStackClient {
    /// Shared state.
    state: Arc<Mutex<StackState>>,
}

impl InMemoryStackClient {
    /// Creates a client with no deployed templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deployed template of an environment.
    #[must_use]
    pub fn with_template(self, env: impl Into<EnvName>, body: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.templates.insert(env.into(), body.into());
        }
        self
    }

    /// Makes the next template update fail with `error`.
    #[must_use]
    pub fn with_update_error(self, error: StackError) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.update_error = Some(error);
        }
        self
    }

    /// Makes upgrades of `env` fail with `error`.
    #[must_use]
    pub fn with_upgrade_error(self, env: impl Into<EnvName>, error: StackError) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.upgrade_errors.insert(env.into(), error);
        }
        self
    }

    /// Returns the recorded template updates.
    #[must_use]
    pub fn updates(&self) -> Vec<TemplateUpdate> {
        self.state.lock().map(|state| state.updates.clone()).unwrap_or_default()
    }

    /// Returns the recorded upgrades.
    #[must_use]
    pub fn upgrades(&self) -> Vec<RecordedUpgrade> {
        self.state.lock().map(|state| state.upgrades.clone()).unwrap_or_default()
    }

    /// Records an upgrade unless one is configured to fail.
    fn record_upgrade(&self, upgrade: RecordedUpgrade) -> Result<(), StackError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if let Some(error) = state.upgrade_errors.get(&upgrade.input().env) {
            return Err(error.clone());
        }
        state.upgrades.push(upgrade);
        drop(state);
        Ok(())
    }
}

/// Error reported when shared state is poisoned.
fn poisoned() -> StackError {
    StackError::Backend("in-memory stack state mutex poisoned".to_string())
}

impl StackClient for InMemoryStackClient {
    fn environment_template(&self, app: &AppName, env: &EnvName) -> Result<String, StackError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        state.templates.get(env).cloned().ok_or_else(|| StackError::StackNotFound {
            stack: format!("{app}-{env}"),
        })
    }

    fn update_environment_template(
        &self,
        app: &AppName,
        env: &EnvName,
        body: &str,
        execution_role_arn: &str,
    ) -> Result<(), StackError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if let Some(error) = state.update_error.take() {
            return Err(error);
        }
        if state.templates.get(env).is_some_and(|current| current == body) {
            return Err(StackError::EmptyChangeSet {
                stack: format!("{app}-{env}"),
            });
        }
        state.templates.insert(env.clone(), body.to_string());
        state.updates.push(TemplateUpdate {
            env: env.clone(),
            body: body.to_string(),
            execution_role_arn: execution_role_arn.to_string(),
        });
        drop(state);
        Ok(())
    }

    fn upgrade_environment(&self, input: &UpgradeInput) -> Result<(), StackError> {
        self.record_upgrade(RecordedUpgrade::Versioned(input.clone()))
    }

    fn upgrade_legacy_environment(
        &self,
        input: &UpgradeInput,
        lb_workloads: &[String],
    ) -> Result<(), StackError> {
        self.record_upgrade(RecordedUpgrade::Legacy {
            input: input.clone(),
            lb_workloads: lb_workloads.to_vec(),
        })
    }
}

// ============================================================================
// SECTION: Version Describer
// ============================================================================

/// In-memory version describer for a single environment.
#[derive(Debug, Clone)]
pub struct InMemoryVersionDescriber {
    /// Version or failure to report.
    version: Result<String, StackError>,
}

impl InMemoryVersionDescriber {
    /// Creates a describer reporting `version`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: Ok(version.into()),
        }
    }

    /// Creates a describer that fails with `error`.
    #[must_use]
    pub const fn failing(error: StackError) -> Self {
        Self {
            version: Err(error),
        }
    }
}

impl VersionDescriber for InMemoryVersionDescriber {
    fn current_version(&self) -> Result<String, StackError> {
        self.version.clone()
    }
}

// ============================================================================
// SECTION: Resource Discovery
// ============================================================================

/// In-memory resource discovery keyed by region.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceDiscovery {
    /// Buckets keyed by region.
    buckets: BTreeMap<String, ArtifactBucket>,
}

impl InMemoryResourceDiscovery {
    /// Creates an empty discovery.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the bucket for a region.
    #[must_use]
    pub fn with_bucket(mut self, region: impl Into<String>, bucket: ArtifactBucket) -> Self {
        self.buckets.insert(region.into(), bucket);
        self
    }
}

impl ResourceDiscovery for InMemoryResourceDiscovery {
    fn resources_for_region(
        &self,
        app: &ApplicationRecord,
        region: &str,
    ) -> Result<ArtifactBucket, DiscoveryError> {
        self.buckets.get(region).cloned().ok_or_else(|| DiscoveryError::NotFound {
            app: app.name.clone(),
            region: region.to_string(),
        })
    }
}

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// Upload recorded by [`InMemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Names of the packaged files.
    pub files: Vec<String>,
}

/// In-memory object store recording uploads.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    /// Recorded uploads.
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
    /// Fails every upload when set.
    failure: Option<String>,
}

impl InMemoryObjectStore {
    /// Creates an object store accepting every upload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every upload fail with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Returns the recorded uploads.
    #[must_use]
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().map(|uploads| uploads.clone()).unwrap_or_default()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn zip_and_upload(
        &self,
        bucket: &str,
        key: &str,
        files: &[NamedBinary],
    ) -> Result<String, ObjectStoreError> {
        let upload_error = |message: String| ObjectStoreError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };
        if let Some(message) = &self.failure {
            return Err(upload_error(message.clone()));
        }
        self.uploads
            .lock()
            .map_err(|_| upload_error("in-memory object store mutex poisoned".to_string()))?
            .push(RecordedUpload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                files: files.iter().map(|file| file.name.clone()).collect(),
            });
        Ok(format!("memory://{bucket}/{key}"))
    }
}

// ============================================================================
// SECTION: Legacy Templater
// ============================================================================

/// Legacy templater returning a fixed body.
#[derive(Debug, Clone, Default)]
pub struct StaticLegacyTemplater {
    /// Canonical body.
    body: String,
}

impl StaticLegacyTemplater {
    /// Creates a templater returning `body`.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
        }
    }
}

impl LegacyTemplater for StaticLegacyTemplater {
    fn default_template(&self, _app: &AppName) -> Result<String, TemplaterError> {
        Ok(self.body.clone())
    }
}

// ============================================================================
// SECTION: Client Factory
// ============================================================================

/// Client factory handing out clones of shared in-memory clients.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClientFactory {
    /// Stack client shared by every environment.
    stack: InMemoryStackClient,
    /// Object store shared by every environment.
    objects: InMemoryObjectStore,
    /// Version describers keyed by environment.
    describers: BTreeMap<EnvName, InMemoryVersionDescriber>,
}

impl InMemoryClientFactory {
    /// Creates a factory around shared clients.
    #[must_use]
    pub fn new(stack: InMemoryStackClient, objects: InMemoryObjectStore) -> Self {
        Self {
            stack,
            objects,
            describers: BTreeMap::new(),
        }
    }

    /// Registers the describer for an environment.
    #[must_use]
    pub fn with_describer(
        mut self,
        env: impl Into<EnvName>,
        describer: InMemoryVersionDescriber,
    ) -> Self {
        self.describers.insert(env.into(), describer);
        self
    }
}

impl ClientFactory for InMemoryClientFactory {
    type Describer = InMemoryVersionDescriber;
    type Objects = InMemoryObjectStore;
    type Stack = InMemoryStackClient;

    fn stack_client(&self, _env: &EnvironmentRecord) -> Result<Self::Stack, ClientError> {
        Ok(self.stack.clone())
    }

    fn object_store(&self, _env: &EnvironmentRecord) -> Result<Self::Objects, ClientError> {
        Ok(self.objects.clone())
    }

    fn version_describer(&self, env: &EnvironmentRecord) -> Result<Self::Describer, ClientError> {
        self.describers.get(&env.name).cloned().ok_or_else(|| ClientError::Describer {
            app: env.app.clone(),
            env: env.name.clone(),
            message: "no describer registered".to_string(),
        })
    }
}

// ============================================================================
// SECTION: Progress Sink
// ============================================================================

/// Progress call recorded by [`RecordingProgressSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressRecord {
    /// `start` was called.
    Start(ProgressEvent),
    /// `stop` was called.
    Stop(ProgressEvent),
    /// `notice` was called.
    Notice(ProgressEvent),
}

/// Progress sink recording every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingProgressSink {
    /// Recorded calls.
    records: Arc<Mutex<Vec<ProgressRecord>>>,
}

impl RecordingProgressSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded calls.
    #[must_use]
    pub fn records(&self) -> Vec<ProgressRecord> {
        self.records.lock().map(|records| records.clone()).unwrap_or_default()
    }

    /// Appends a record, dropping it if the state is poisoned.
    fn push(&self, record: ProgressRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

impl ProgressSink for RecordingProgressSink {
    fn start(&self, event: &ProgressEvent) {
        self.push(ProgressRecord::Start(event.clone()));
    }

    fn stop(&self, event: &ProgressEvent) {
        self.push(ProgressRecord::Stop(event.clone()));
    }

    fn notice(&self, event: &ProgressEvent) {
        self.push(ProgressRecord::Notice(event.clone()));
    }
}
