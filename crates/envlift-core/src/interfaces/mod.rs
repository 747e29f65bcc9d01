// crates/envlift-core/src/interfaces/mod.rs
// ============================================================================
// Module: envlift Interfaces
// Description: Backend-agnostic collaborator contracts for environment upgrades.
// Purpose: Define the surfaces the upgrade runtime drives without embedding AWS.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the upgrade runtime reaches the configuration store,
//! the stack service, the artifact store, and the operator's terminal. All
//! calls are synchronous and blocking; implementations own their own retry
//! and backoff. Production implementations live in `envlift-aws`; in-memory
//! implementations live in [`crate::runtime::memory`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ApplicationRecord;
use crate::core::ArtifactBucket;
use crate::core::EnvironmentRecord;
use crate::core::NamedBinary;
use crate::core::TemplateVersion;
use crate::core::UpgradeInput;
use crate::core::WorkloadRecord;
use crate::core::identifiers::AppName;
use crate::core::identifiers::EnvName;

// ============================================================================
// SECTION: Configuration Store
// ============================================================================

/// Configuration store errors.
///
/// # Invariants
/// - Not-found variants are distinguishable from backend failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The application does not exist.
    #[error("couldn't find an application named {app}")]
    ApplicationNotFound {
        /// Application name.
        app: AppName,
    },
    /// The environment does not exist in the application.
    #[error("couldn't find environment {env} in the application {app}")]
    EnvironmentNotFound {
        /// Application name.
        app: AppName,
        /// Environment name.
        env: EnvName,
    },
    /// A stored record could not be decoded or violates a record invariant.
    #[error("invalid stored record at {path}: {message}")]
    Invalid {
        /// Store path of the record.
        path: String,
        /// Decode failure detail.
        message: String,
    },
    /// The store backend failed.
    #[error("configuration store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true for the not-found variants.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ApplicationNotFound { .. } | Self::EnvironmentNotFound { .. })
    }
}

/// Read-only configuration store.
pub trait ConfigStore {
    /// Returns an application record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ApplicationNotFound`] when the application is absent.
    fn get_application(&self, app: &AppName) -> Result<ApplicationRecord, StoreError>;

    /// Returns an environment record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EnvironmentNotFound`] when the environment is absent.
    fn get_environment(&self, app: &AppName, env: &EnvName)
    -> Result<EnvironmentRecord, StoreError>;

    /// Lists every environment of an application.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn list_environments(&self, app: &AppName) -> Result<Vec<EnvironmentRecord>, StoreError>;

    /// Lists every workload of an application.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn list_workloads(&self, app: &AppName) -> Result<Vec<WorkloadRecord>, StoreError>;
}

// ============================================================================
// SECTION: Stack Service
// ============================================================================

/// Stack service errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// The update was accepted but contains no changes.
    #[error("no changes to deploy for stack {stack}")]
    EmptyChangeSet {
        /// Stack name.
        stack: String,
    },
    /// The stack does not exist.
    #[error("stack {stack} does not exist")]
    StackNotFound {
        /// Stack name.
        stack: String,
    },
    /// The stack ended in a failed or rolled-back state.
    #[error("stack {stack} ended in status {status}")]
    UpdateFailed {
        /// Stack name.
        stack: String,
        /// Terminal status reported by the service.
        status: String,
    },
    /// The stack did not reach a terminal status in time.
    #[error("timed out waiting for stack {stack} to finish updating")]
    Timeout {
        /// Stack name.
        stack: String,
    },
    /// The target template could not be rendered.
    #[error("render environment template: {0}")]
    Render(String),
    /// The stack service failed.
    #[error("stack service error: {0}")]
    Backend(String),
}

/// Stack client scoped to one environment's manager role.
pub trait StackClient {
    /// Returns the environment stack's current template body.
    ///
    /// # Errors
    ///
    /// Returns [`StackError`] when the template cannot be fetched.
    fn environment_template(&self, app: &AppName, env: &EnvName) -> Result<String, StackError>;

    /// Replaces the environment stack's template body, keeping parameters.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyChangeSet`] when the body introduces no
    /// change, or another [`StackError`] when the update fails.
    fn update_environment_template(
        &self,
        app: &AppName,
        env: &EnvName,
        body: &str,
        execution_role_arn: &str,
    ) -> Result<(), StackError>;

    /// Upgrades a versioned environment stack to the input's target version.
    ///
    /// # Errors
    ///
    /// Returns [`StackError`] when the upgrade fails.
    fn upgrade_environment(&self, input: &UpgradeInput) -> Result<(), StackError>;

    /// Upgrades a pre-versioning environment stack.
    ///
    /// `lb_workloads` names the application's load-balanced web services.
    ///
    /// # Errors
    ///
    /// Returns [`StackError`] when the upgrade fails.
    fn upgrade_legacy_environment(
        &self,
        input: &UpgradeInput,
        lb_workloads: &[String],
    ) -> Result<(), StackError>;
}

/// Reports the template version an environment currently runs.
pub trait VersionDescriber {
    /// Returns the current version string (`v0.0.0` for legacy templates).
    ///
    /// # Errors
    ///
    /// Returns [`StackError`] when the version cannot be determined.
    fn current_version(&self) -> Result<String, StackError>;
}

// ============================================================================
// SECTION: Resource Discovery
// ============================================================================

/// Regional resource discovery errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// The application has no resources in the region.
    #[error("no regional resources for application {app} in region {region}")]
    NotFound {
        /// Application name.
        app: AppName,
        /// Region.
        region: String,
    },
    /// Discovery failed.
    #[error("discover regional resources: {0}")]
    Backend(String),
}

/// Locates an application's regional artifact store.
pub trait ResourceDiscovery {
    /// Returns the artifact bucket for an application in a region.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the resources cannot be found.
    fn resources_for_region(
        &self,
        app: &ApplicationRecord,
        region: &str,
    ) -> Result<ArtifactBucket, DiscoveryError>;
}

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// Object store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectStoreError {
    /// The archive could not be built.
    #[error("package {key}: {message}")]
    Package {
        /// Object key.
        key: String,
        /// Failure detail.
        message: String,
    },
    /// The upload failed.
    #[error("upload {key} to bucket {bucket}: {message}")]
    Upload {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Failure detail.
        message: String,
    },
}

/// Object store scoped to one environment's manager role.
pub trait ObjectStore {
    /// Zips the named binaries and uploads the archive, returning its URL.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when packaging or upload fails.
    fn zip_and_upload(
        &self,
        bucket: &str,
        key: &str,
        files: &[NamedBinary],
    ) -> Result<String, ObjectStoreError>;
}

// ============================================================================
// SECTION: Legacy Templates
// ============================================================================

/// Legacy template generation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("generate default legacy environment template: {0}")]
pub struct TemplaterError(pub String);

/// Produces the canonical template a bare pre-versioning environment ran.
pub trait LegacyTemplater {
    /// Returns the default legacy template body for an application.
    ///
    /// # Errors
    ///
    /// Returns [`TemplaterError`] when the template cannot be generated.
    fn default_template(&self, app: &AppName) -> Result<String, TemplaterError>;
}

// ============================================================================
// SECTION: Client Factory
// ============================================================================

/// Client creation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A session for the environment's manager role could not be created.
    #[error("create {client} session from role {role} and region {region}: {message}")]
    Session {
        /// Client kind being created.
        client: &'static str,
        /// Role ARN.
        role: String,
        /// Region.
        region: String,
        /// Failure detail.
        message: String,
    },
    /// A version describer could not be created.
    #[error("new env describer for environment {env} in app {app}: {message}")]
    Describer {
        /// Application name.
        app: AppName,
        /// Environment name.
        env: EnvName,
        /// Failure detail.
        message: String,
    },
}

/// Creates clients scoped to a single environment.
pub trait ClientFactory {
    /// Stack client type.
    type Stack: StackClient;
    /// Object store type.
    type Objects: ObjectStore;
    /// Version describer type.
    type Describer: VersionDescriber;

    /// Creates a stack client using the environment's manager role.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the session cannot be created.
    fn stack_client(&self, env: &EnvironmentRecord) -> Result<Self::Stack, ClientError>;

    /// Creates an object store client using the environment's manager role.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the session cannot be created.
    fn object_store(&self, env: &EnvironmentRecord) -> Result<Self::Objects, ClientError>;

    /// Creates a version describer for the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the describer cannot be created.
    fn version_describer(&self, env: &EnvironmentRecord) -> Result<Self::Describer, ClientError>;
}

// ============================================================================
// SECTION: Progress
// ============================================================================

/// Operator-facing progress events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The manager role permission patch started.
    PatchingPermissions {
        /// Environment name.
        env: EnvName,
    },
    /// The manager role permission patch finished.
    PermissionsPatched {
        /// Environment name.
        env: EnvName,
    },
    /// The manager role permission patch failed.
    PermissionPatchFailed {
        /// Environment name.
        env: EnvName,
    },
    /// An environment upgrade started.
    UpgradeStarted {
        /// Environment name.
        env: EnvName,
        /// Current version.
        from: TemplateVersion,
        /// Target version.
        to: TemplateVersion,
    },
    /// An environment upgrade finished.
    UpgradeCompleted {
        /// Environment name.
        env: EnvName,
        /// Target version.
        to: TemplateVersion,
    },
    /// An environment upgrade failed.
    UpgradeFailed {
        /// Environment name.
        env: EnvName,
        /// Target version.
        to: TemplateVersion,
    },
    /// An environment runs a newer version than the configured target.
    VersionSkew {
        /// Environment name.
        env: EnvName,
        /// Deployed version.
        current: TemplateVersion,
        /// Configured target version.
        target: TemplateVersion,
    },
}

/// Fire-and-forget progress renderer.
pub trait ProgressSink {
    /// Signals the start of a long-running step.
    fn start(&self, event: &ProgressEvent);

    /// Signals the terminal outcome of the current step.
    fn stop(&self, event: &ProgressEvent);

    /// Reports an advisory that is not tied to a running step.
    fn notice(&self, event: &ProgressEvent);
}
