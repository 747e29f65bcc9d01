// crates/envlift-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: envlift Upgrade Orchestrator
// Description: Sequences permission patching, publishing, and stack upgrades.
// Purpose: Upgrade one or all environments of an application to the target version.
// Dependencies: crate::{core, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! [`EnvironmentUpgrader`] drives every collaborator for each target
//! environment, strictly in listed order and one at a time. The first failure
//! aborts the run; environments already upgraded stay upgraded.
//!
//! Per environment the steps are: discover the regional artifact bucket,
//! ensure the manager role may upload to it, publish custom resources, read
//! the current template version, decide, and submit the versioned or legacy
//! upgrade. Progress is bracketed so that every attempted upgrade produces
//! one start event and exactly one terminal event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::ApplicationRecord;
use crate::core::ArtifactBucket;
use crate::core::DEFAULT_PARTITION;
use crate::core::EnvironmentRecord;
use crate::core::ResourceSet;
use crate::core::TemplateVersion;
use crate::core::UpgradeInput;
use crate::core::VersionError;
use crate::core::identifiers::AppName;
use crate::core::identifiers::EnvName;
use crate::interfaces::ClientError;
use crate::interfaces::ClientFactory;
use crate::interfaces::ConfigStore;
use crate::interfaces::DiscoveryError;
use crate::interfaces::LegacyTemplater;
use crate::interfaces::ObjectStore;
use crate::interfaces::ProgressEvent;
use crate::interfaces::ProgressSink;
use crate::interfaces::ResourceDiscovery;
use crate::interfaces::StackClient;
use crate::interfaces::StackError;
use crate::interfaces::StoreError;
use crate::interfaces::VersionDescriber;
use crate::runtime::comparator::UpgradeDecision;
use crate::runtime::comparator::decide;
use crate::runtime::legacy::LegacyError;
use crate::runtime::legacy::resolve_legacy_upgrade;
use crate::runtime::patcher::PatchError;
use crate::runtime::patcher::ensure_upload_permission;
use crate::runtime::publisher::PublishError;
use crate::runtime::publisher::publish;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Upgrade configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgraderConfig {
    /// Version every environment is upgraded to.
    pub latest_version: TemplateVersion,
    /// ARN partition used for artifact bucket ARNs.
    pub partition: String,
}

impl Default for UpgraderConfig {
    fn default() -> Self {
        Self {
            latest_version: TemplateVersion::latest(),
            partition: DEFAULT_PARTITION.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Requests and Reports
// ============================================================================

/// Environments an upgrade applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeTarget {
    /// A single named environment.
    Named(EnvName),
    /// Every environment of the application.
    All,
}

/// Upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    /// Application name.
    pub app: AppName,
    /// Target environments.
    pub target: UpgradeTarget,
}

impl UpgradeRequest {
    /// Builds a request from command-line style flags.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError::ConflictingFlags`] when both a name and `all`
    /// are given, and [`UpgradeError::MissingTarget`] when neither is.
    pub fn from_flags(
        app: AppName,
        name: Option<EnvName>,
        all: bool,
    ) -> Result<Self, UpgradeError> {
        let target = match (name, all) {
            (Some(_), true) => return Err(UpgradeError::ConflictingFlags),
            (Some(name), false) => UpgradeTarget::Named(name),
            (None, true) => UpgradeTarget::All,
            (None, false) => return Err(UpgradeError::MissingTarget),
        };
        Ok(Self {
            app,
            target,
        })
    }
}

/// Outcome for a single environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentOutcome {
    /// The upgrade was submitted and completed.
    Upgraded {
        /// Version before the upgrade.
        from: TemplateVersion,
        /// Version after the upgrade.
        to: TemplateVersion,
    },
    /// The environment already ran the target version.
    UpToDate,
    /// The environment runs a newer version than the target.
    VersionSkew {
        /// Version the environment runs.
        current: TemplateVersion,
    },
}

/// Report line for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentReport {
    /// Environment name.
    pub env: EnvName,
    /// Outcome.
    pub outcome: EnvironmentOutcome,
}

/// Report for a completed upgrade run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeReport {
    /// Application name.
    pub app: AppName,
    /// Target version.
    pub target: TemplateVersion,
    /// Processed environments in order.
    pub environments: Vec<EnvironmentReport>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Upgrade errors.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// Both a named environment and `all` were requested.
    #[error("cannot specify both --all and --name flags")]
    ConflictingFlags,
    /// Neither a named environment nor `all` was requested.
    #[error("either --name or --all must be specified")]
    MissingTarget,
    /// Store lookup failed with a not-found error.
    #[error(transparent)]
    Store(StoreError),
    /// Environment lookup failed.
    #[error("get environment {env} configuration from application {app}: {source}")]
    GetEnvironment {
        /// Application name.
        app: AppName,
        /// Environment name.
        env: EnvName,
        /// Store failure.
        source: StoreError,
    },
    /// Environment listing failed.
    #[error("list environments in app {app}: {source}")]
    ListEnvironments {
        /// Application name.
        app: AppName,
        /// Store failure.
        source: StoreError,
    },
    /// Application lookup failed.
    #[error("get application {app}: {source}")]
    GetApplication {
        /// Application name.
        app: AppName,
        /// Store failure.
        source: StoreError,
    },
    /// Regional resources could not be discovered.
    #[error("get app resources: {source}")]
    Discovery {
        /// Discovery failure.
        source: DiscoveryError,
    },
    /// An environment-scoped client could not be created.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The permission patch failed.
    #[error(transparent)]
    Patch(#[from] PatchError),
    /// Custom resources could not be published.
    #[error("upload custom resources to bucket {bucket}: {source}")]
    Publish {
        /// Bucket name.
        bucket: String,
        /// Publish failure.
        source: PublishError,
    },
    /// The current version could not be read.
    #[error("get template version of environment {env} in app {app}: {source}")]
    DescribeVersion {
        /// Application name.
        app: AppName,
        /// Environment name.
        env: EnvName,
        /// Stack failure.
        source: StackError,
    },
    /// The current version is not a semantic version.
    #[error("environment {env} reports a {source}")]
    MalformedVersion {
        /// Environment name.
        env: EnvName,
        /// Version failure.
        source: VersionError,
    },
    /// Legacy resolution failed.
    #[error(transparent)]
    Legacy(#[from] LegacyError),
    /// The upgrade call failed.
    #[error("upgrade environment {env} from version {from} to version {to}: {source}")]
    Upgrade {
        /// Environment name.
        env: EnvName,
        /// Version before the upgrade.
        from: TemplateVersion,
        /// Target version.
        to: TemplateVersion,
        /// Stack failure.
        source: StackError,
    },
}

// ============================================================================
// SECTION: Upgrader
// ============================================================================

/// Upgrades environments through injected collaborators.
pub struct EnvironmentUpgrader<S, D, T, F, P> {
    /// Configuration store.
    store: S,
    /// Regional resource discovery.
    discovery: D,
    /// Canonical legacy template source.
    templater: T,
    /// Environment-scoped client factory.
    factory: F,
    /// Progress sink.
    progress: P,
    /// Custom resources published before every upgrade.
    resources: ResourceSet,
    /// Upgrade configuration.
    config: UpgraderConfig,
}

impl<S, D, T, F, P> EnvironmentUpgrader<S, D, T, F, P>
where
    S: ConfigStore,
    D: ResourceDiscovery,
    T: LegacyTemplater,
    F: ClientFactory,
    P: ProgressSink,
{
    /// Creates a new upgrader.
    pub fn new(
        store: S,
        discovery: D,
        templater: T,
        factory: F,
        progress: P,
        resources: ResourceSet,
        config: UpgraderConfig,
    ) -> Self {
        Self {
            store,
            discovery,
            templater,
            factory,
            progress,
            resources,
            config,
        }
    }

    /// Returns the upgrade configuration.
    #[must_use]
    pub const fn config(&self) -> &UpgraderConfig {
        &self.config
    }

    /// Checks that a named target environment exists.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError::Store`] when the environment does not exist and
    /// [`UpgradeError::GetEnvironment`] for other store failures.
    pub fn validate(&self, request: &UpgradeRequest) -> Result<(), UpgradeError> {
        if let UpgradeTarget::Named(name) = &request.target {
            self.get_environment(&request.app, name)?;
        }
        Ok(())
    }

    /// Upgrades every target environment in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError`] for the first environment that fails.
    pub fn execute(&self, request: &UpgradeRequest) -> Result<UpgradeReport, UpgradeError> {
        let environments = self.targets(request)?;
        let app = self.store.get_application(&request.app).map_err(|source| {
            UpgradeError::GetApplication {
                app: request.app.clone(),
                source,
            }
        })?;
        let mut report = UpgradeReport {
            app: request.app.clone(),
            target: self.config.latest_version.clone(),
            environments: Vec::with_capacity(environments.len()),
        };
        for env in &environments {
            let outcome = self.upgrade_environment(&app, env)?;
            report.environments.push(EnvironmentReport {
                env: env.name.clone(),
                outcome,
            });
        }
        Ok(report)
    }

    /// Resolves the ordered target list.
    fn targets(&self, request: &UpgradeRequest) -> Result<Vec<EnvironmentRecord>, UpgradeError> {
        match &request.target {
            UpgradeTarget::Named(name) => Ok(vec![self.get_environment(&request.app, name)?]),
            UpgradeTarget::All => self.store.list_environments(&request.app).map_err(|source| {
                UpgradeError::ListEnvironments {
                    app: request.app.clone(),
                    source,
                }
            }),
        }
    }

    /// Reads one environment, passing not-found errors through unchanged.
    fn get_environment(
        &self,
        app: &AppName,
        env: &EnvName,
    ) -> Result<EnvironmentRecord, UpgradeError> {
        self.store.get_environment(app, env).map_err(|source| {
            if source.is_not_found() {
                UpgradeError::Store(source)
            } else {
                UpgradeError::GetEnvironment {
                    app: app.clone(),
                    env: env.clone(),
                    source,
                }
            }
        })
    }

    /// Runs every step for one environment.
    fn upgrade_environment(
        &self,
        app: &ApplicationRecord,
        env: &EnvironmentRecord,
    ) -> Result<EnvironmentOutcome, UpgradeError> {
        let bucket = self.discovery.resources_for_region(app, &env.region).map_err(|source| {
            UpgradeError::Discovery {
                source,
            }
        })?;
        let bucket_arn = bucket.arn(&self.config.partition);

        let deployer = self.factory.stack_client(env)?;
        let patch = ensure_upload_permission(&deployer, &self.progress, env, &bucket_arn)?;
        debug!(env = %env.name, outcome = patch.as_str(), "manager role permission checked");

        let objects = self.factory.object_store(env)?;
        let urls = publish(&self.resources, |key, files| {
            objects.zip_and_upload(&bucket.name, key, files)
        })
        .map_err(|source| UpgradeError::Publish {
            bucket: bucket.name.clone(),
            source,
        })?;

        let current = self.current_version(env)?;
        let latest = &self.config.latest_version;
        match decide(&current, latest) {
            UpgradeDecision::Upgrade => {}
            UpgradeDecision::SkipUpToDate => {
                debug!(
                    env = %env.name,
                    version = %latest,
                    "environment is already on the latest version, skip upgrade"
                );
                return Ok(EnvironmentOutcome::UpToDate);
            }
            UpgradeDecision::SkipVersionSkew => {
                warn!(
                    env = %env.name,
                    current = %current,
                    target = %latest,
                    "environment runs a newer version than this release targets, skip upgrade"
                );
                self.progress.notice(&ProgressEvent::VersionSkew {
                    env: env.name.clone(),
                    current: current.clone(),
                    target: latest.clone(),
                });
                return Ok(EnvironmentOutcome::VersionSkew {
                    current,
                });
            }
        }

        self.progress.start(&ProgressEvent::UpgradeStarted {
            env: env.name.clone(),
            from: current.clone(),
            to: latest.clone(),
        });
        let result = self.submit_upgrade(app, env, &bucket, bucket_arn, urls, &current);
        match &result {
            Ok(()) => {
                self.progress.stop(&ProgressEvent::UpgradeCompleted {
                    env: env.name.clone(),
                    to: latest.clone(),
                });
                info!(
                    app = %app.name,
                    env = %env.name,
                    from = %current,
                    to = %latest,
                    "upgraded environment"
                );
            }
            Err(_) => self.progress.stop(&ProgressEvent::UpgradeFailed {
                env: env.name.clone(),
                to: latest.clone(),
            }),
        }
        result.map(|()| EnvironmentOutcome::Upgraded {
            from: current,
            to: latest.clone(),
        })
    }

    /// Reads and parses the environment's current template version.
    fn current_version(&self, env: &EnvironmentRecord) -> Result<TemplateVersion, UpgradeError> {
        let describer = self.factory.version_describer(env)?;
        let raw = describer.current_version().map_err(|source| UpgradeError::DescribeVersion {
            app: env.app.clone(),
            env: env.name.clone(),
            source,
        })?;
        TemplateVersion::parse(&raw).map_err(|source| UpgradeError::MalformedVersion {
            env: env.name.clone(),
            source,
        })
    }

    /// Builds the upgrade input and submits the versioned or legacy upgrade.
    fn submit_upgrade(
        &self,
        app: &ApplicationRecord,
        env: &EnvironmentRecord,
        bucket: &ArtifactBucket,
        bucket_arn: String,
        urls: BTreeMap<String, String>,
        current: &TemplateVersion,
    ) -> Result<(), UpgradeError> {
        let upgrader = self.factory.stack_client(env)?;
        let latest = &self.config.latest_version;
        let input = versioned_input(latest, app, env, bucket, bucket_arn, urls);
        let submitted = if current.is_legacy() {
            let plan = resolve_legacy_upgrade(&self.store, &upgrader, &self.templater, env, input)?;
            upgrader.upgrade_legacy_environment(&plan.input, &plan.lb_workloads)
        } else {
            upgrader.upgrade_environment(&input)
        };
        submitted.map_err(|source| UpgradeError::Upgrade {
            env: env.name.clone(),
            from: current.clone(),
            to: self.config.latest_version.clone(),
            source,
        })
    }
}

/// Builds the versioned upgrade input from the stored records.
fn versioned_input(
    version: &TemplateVersion,
    app: &ApplicationRecord,
    env: &EnvironmentRecord,
    bucket: &ArtifactBucket,
    bucket_arn: String,
    urls: BTreeMap<String, String>,
) -> UpgradeInput {
    let custom = env.custom_config.clone().unwrap_or_default();
    UpgradeInput {
        version: version.clone(),
        app: app.name.clone(),
        app_domain: app.domain.clone(),
        env: env.name.clone(),
        artifact_bucket_arn: bucket_arn,
        artifact_bucket_key_arn: bucket.kms_key_arn.clone(),
        custom_resource_urls: urls,
        network: custom.network,
        import_cert_arns: custom.import_cert_arns,
        internal_alb_subnets: custom.internal_alb_subnets,
        allow_vpc_ingress: custom.allow_vpc_ingress,
        execution_role_arn: env.execution_role_arn.clone(),
        telemetry: env.telemetry,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
