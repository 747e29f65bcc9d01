// crates/envlift-core/src/runtime/legacy.rs
// ============================================================================
// Module: envlift Legacy Resolver
// Description: Upgrade inputs for environments deployed before versioning.
// Purpose: Detect default legacy templates and recover stored network overrides.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! A pre-versioning environment either runs exactly the canonical legacy
//! template or carries customizations. The canonical template with only the
//! upload-permission patch applied still counts as canonical. The canonical
//! case upgrades with stock fields only. A customized environment can only be
//! upgraded when its customizations were persisted in the configuration store;
//! releases that predate that persistence left nothing to recover, and those
//! environments fail with [`LegacyError::MissingVpcConfiguration`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::core::EnvironmentRecord;
use crate::core::UpgradeInput;
use crate::core::WorkloadType;
use crate::core::identifiers::AppName;
use crate::core::identifiers::EnvName;
use crate::interfaces::ConfigStore;
use crate::interfaces::LegacyTemplater;
use crate::interfaces::StackClient;
use crate::interfaces::StackError;
use crate::interfaces::StoreError;
use crate::interfaces::TemplaterError;
use crate::runtime::patcher::splice_upload_permission;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Shape of a legacy environment's deployed template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyShape {
    /// Byte-identical to the canonical legacy template.
    Default,
    /// Differs from the canonical template.
    Customized,
}

/// Resolved legacy upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyUpgradePlan {
    /// Detected template shape.
    pub shape: LegacyShape,
    /// Upgrade input to submit.
    pub input: UpgradeInput,
    /// Load-balanced web services of the application.
    pub lb_workloads: Vec<String>,
}

/// Legacy resolution errors.
#[derive(Debug, Error)]
pub enum LegacyError {
    /// The canonical legacy template could not be generated.
    #[error(transparent)]
    Templater(#[from] TemplaterError),
    /// The deployed template could not be fetched.
    #[error("get environment {env} template body: {source}")]
    FetchTemplate {
        /// Environment name.
        env: EnvName,
        /// Stack failure.
        source: StackError,
    },
    /// The application's workloads could not be listed.
    #[error("list services in application {app}: {source}")]
    ListWorkloads {
        /// Application name.
        app: AppName,
        /// Store failure.
        source: StoreError,
    },
    /// The environment is customized but its customizations were never stored.
    #[error("cannot upgrade environment {env} in application {app} due to missing vpc configuration")]
    MissingVpcConfiguration {
        /// Application name.
        app: AppName,
        /// Environment name.
        env: EnvName,
    },
}

// ============================================================================
// SECTION: Detection
// ============================================================================

/// Classifies a deployed template against the canonical legacy template.
///
/// Only a byte-identical body is [`LegacyShape::Default`]; any difference,
/// including whitespace, makes the environment customized.
#[must_use]
pub fn classify_legacy_template(canonical: &str, deployed: &str) -> LegacyShape {
    if canonical == deployed { LegacyShape::Default } else { LegacyShape::Customized }
}

/// Classifies a deployed legacy template, accepting the upload permission
/// patch as part of the canonical body.
///
/// The permission patch runs before detection, so an untouched legacy
/// environment reaches this point as the canonical body with the upload
/// statement spliced in for `bucket_arn`. That body is
/// [`LegacyShape::Default`] as well; every other difference is customized.
#[must_use]
pub fn classify_deployed_template(
    canonical: &str,
    deployed: &str,
    bucket_arn: &str,
) -> LegacyShape {
    match classify_legacy_template(canonical, deployed) {
        LegacyShape::Customized
            if splice_upload_permission(canonical, bucket_arn)
                .is_ok_and(|patched| patched == deployed) =>
        {
            LegacyShape::Default
        }
        shape => shape,
    }
}

/// Returns the names of the application's load-balanced web services.
///
/// # Errors
///
/// Returns [`LegacyError::ListWorkloads`] when the store cannot be read.
pub fn list_lb_web_services<S>(store: &S, app: &AppName) -> Result<Vec<String>, LegacyError>
where
    S: ConfigStore + ?Sized,
{
    let workloads = store.list_workloads(app).map_err(|source| LegacyError::ListWorkloads {
        app: app.clone(),
        source,
    })?;
    Ok(workloads
        .into_iter()
        .filter(|workload| workload.workload_type == WorkloadType::LoadBalancedWebService)
        .map(|workload| workload.name)
        .collect())
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves the upgrade input for a legacy environment.
///
/// `stock` carries the target version, application, artifact addresses, and
/// execution role; customization fields on it are ignored and replaced by what
/// the environment record stores.
///
/// # Errors
///
/// Returns [`LegacyError`] when detection fails or the environment is
/// customized without stored customizations.
pub fn resolve_legacy_upgrade<S, C, T>(
    store: &S,
    stack: &C,
    templater: &T,
    env: &EnvironmentRecord,
    stock: UpgradeInput,
) -> Result<LegacyUpgradePlan, LegacyError>
where
    S: ConfigStore + ?Sized,
    C: StackClient + ?Sized,
    T: LegacyTemplater + ?Sized,
{
    let canonical = templater.default_template(&env.app)?;
    let deployed = stack.environment_template(&env.app, &env.name).map_err(|source| {
        LegacyError::FetchTemplate {
            env: env.name.clone(),
            source,
        }
    })?;
    let shape = classify_deployed_template(&canonical, &deployed, &stock.artifact_bucket_arn);
    let lb_workloads = list_lb_web_services(store, &env.app)?;
    let mut input = UpgradeInput {
        network: None,
        import_cert_arns: Vec::new(),
        internal_alb_subnets: Vec::new(),
        allow_vpc_ingress: false,
        ..stock
    };
    match shape {
        LegacyShape::Default => {
            debug!(app = %env.app, env = %env.name, "legacy environment uses the default template");
        }
        LegacyShape::Customized => {
            let Some(custom) = &env.custom_config else {
                warn!(
                    app = %env.app,
                    env = %env.name,
                    "environment has a customized vpc configuration that was never stored; add the \
                     vpc configuration to the configuration store or re-create the environment"
                );
                return Err(LegacyError::MissingVpcConfiguration {
                    app: env.app.clone(),
                    env: env.name.clone(),
                });
            };
            input.network.clone_from(&custom.network);
            input.import_cert_arns.clone_from(&custom.import_cert_arns);
            input.internal_alb_subnets.clone_from(&custom.internal_alb_subnets);
            input.allow_vpc_ingress = custom.allow_vpc_ingress;
        }
    }
    Ok(LegacyUpgradePlan {
        shape,
        input,
        lb_workloads,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
