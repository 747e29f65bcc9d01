// crates/envlift-core/src/runtime/patcher.rs
// ============================================================================
// Module: envlift Permission Patcher
// Description: Grants the manager role artifact-upload permission in place.
// Purpose: Splice a policy statement into old templates and resubmit them.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Templates older than the upload threshold release do not let the manager
//! role write to the artifact bucket. The stack service is the only principal
//! allowed to change that role, so the patch goes through a template update.
//! Sufficiency is derived from the template's declared version on every call;
//! nothing records whether a patch was applied.
//!
//! ## Invariants
//! - Lines before the statement list and after it are preserved byte for byte.
//! - An empty change set from the update is success.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use thiserror::Error;
use tracing::debug;
use tracing::info;

use crate::core::EnvironmentRecord;
use crate::core::TemplateDocument;
use crate::core::TemplateError;
use crate::core::TemplateVersion;
use crate::core::identifiers::AppName;
use crate::core::identifiers::EnvName;
use crate::interfaces::ProgressEvent;
use crate::interfaces::ProgressSink;
use crate::interfaces::StackClient;
use crate::interfaces::StackError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Statement identifier of the injected permission.
pub const UPLOAD_PERMISSION_SID: &str = "PatchPutObjectsToArtifactBucket";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of ensuring the upload permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The template version already grants the permission.
    AlreadyGranted,
    /// The patched template was applied.
    Patched,
    /// The stack service reported no changes to apply.
    NoChanges,
}

impl PatchOutcome {
    /// Returns a stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyGranted => "already_granted",
            Self::Patched => "patched",
            Self::NoChanges => "no_changes",
        }
    }
}

/// Permission patch errors.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The current template could not be fetched.
    #[error("get template of environment {env} in app {app}: {source}")]
    FetchTemplate {
        /// Application name.
        app: AppName,
        /// Environment name.
        env: EnvName,
        /// Stack failure.
        source: StackError,
    },
    /// The template could not be parsed or has no statement list.
    #[error("patch manager role of environment {env}: {source}")]
    Template {
        /// Environment name.
        env: EnvName,
        /// Template failure.
        source: TemplateError,
    },
    /// The template update failed.
    #[error("update environment template with PutObject permissions: {source}")]
    Update {
        /// Stack failure.
        source: StackError,
    },
}

// ============================================================================
// SECTION: Sufficiency
// ============================================================================

/// Returns true when the template's declared version grants upload permission.
///
/// # Errors
///
/// Returns [`TemplateError::Parse`] when the body is not well-formed.
pub fn is_upload_permission_granted(body: &str) -> Result<bool, TemplateError> {
    let document = TemplateDocument::parse(body)?;
    Ok(version_grants_upload(document.version().as_ref()))
}

/// Returns true when a declared version is at or above the upload threshold.
#[must_use]
pub fn version_grants_upload(version: Option<&TemplateVersion>) -> bool {
    version.is_some_and(|version| {
        version.cmp_precedence(&TemplateVersion::upload_permission_min()) != Ordering::Less
    })
}

// ============================================================================
// SECTION: Splice
// ============================================================================

/// Builds the permission statement indented to `indent` columns.
#[must_use]
pub fn upload_permission_block(bucket_arn: &str, indent: usize) -> Vec<String> {
    let pad = " ".repeat(indent);
    [
        format!("- Sid: {UPLOAD_PERMISSION_SID}"),
        "  Effect: Allow".to_string(),
        "  Action:".to_string(),
        "    - s3:PutObject".to_string(),
        "    - s3:PutObjectAcl".to_string(),
        "  Resource:".to_string(),
        format!("    - {bucket_arn}"),
        format!("    - {bucket_arn}/*"),
    ]
    .into_iter()
    .map(|line| format!("{pad}{line}"))
    .collect()
}

/// Inserts the permission statement as the first item of the manager role's
/// first policy statement list.
///
/// # Errors
///
/// Returns [`TemplateError`] when the body cannot be parsed or the statement
/// list does not exist.
pub fn splice_upload_permission(body: &str, bucket_arn: &str) -> Result<String, TemplateError> {
    let anchor = TemplateDocument::parse(body)?.policy_statement_anchor()?;
    let mut lines: Vec<&str> = body.split('\n').collect();
    let index = anchor.line.saturating_sub(1).min(lines.len());
    let block = upload_permission_block(bucket_arn, anchor.column.saturating_sub(1));
    let tail = lines.split_off(index);
    let mut patched: Vec<&str> = Vec::with_capacity(lines.len() + block.len() + tail.len());
    patched.extend(lines);
    patched.extend(block.iter().map(String::as_str));
    patched.extend(tail);
    Ok(patched.join("\n"))
}

// ============================================================================
// SECTION: Patch Step
// ============================================================================

/// Ensures the environment's manager role may upload to the artifact bucket.
///
/// # Errors
///
/// Returns [`PatchError`] when the template cannot be read, patched, or updated.
pub fn ensure_upload_permission<C, P>(
    stack: &C,
    progress: &P,
    env: &EnvironmentRecord,
    bucket_arn: &str,
) -> Result<PatchOutcome, PatchError>
where
    C: StackClient + ?Sized,
    P: ProgressSink + ?Sized,
{
    let body = stack.environment_template(&env.app, &env.name).map_err(|source| {
        PatchError::FetchTemplate {
            app: env.app.clone(),
            env: env.name.clone(),
            source,
        }
    })?;
    let template_error = |source| PatchError::Template {
        env: env.name.clone(),
        source,
    };
    if is_upload_permission_granted(&body).map_err(template_error)? {
        debug!(app = %env.app, env = %env.name, "manager role already allowed to upload artifacts");
        return Ok(PatchOutcome::AlreadyGranted);
    }
    let patched = splice_upload_permission(&body, bucket_arn).map_err(template_error)?;

    progress.start(&ProgressEvent::PatchingPermissions {
        env: env.name.clone(),
    });
    let submitted =
        stack.update_environment_template(&env.app, &env.name, &patched, &env.execution_role_arn);
    let outcome = match submitted {
        Ok(()) => PatchOutcome::Patched,
        Err(StackError::EmptyChangeSet {
            ..
        }) => PatchOutcome::NoChanges,
        Err(source) => {
            progress.stop(&ProgressEvent::PermissionPatchFailed {
                env: env.name.clone(),
            });
            return Err(PatchError::Update {
                source,
            });
        }
    };
    progress.stop(&ProgressEvent::PermissionsPatched {
        env: env.name.clone(),
    });
    if outcome == PatchOutcome::Patched {
        info!(
            app = %env.app,
            env = %env.name,
            bucket = bucket_arn,
            "granted manager role upload permission"
        );
    } else {
        info!(
            app = %env.app,
            env = %env.name,
            "manager role template update had no changes to apply"
        );
    }
    Ok(outcome)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
