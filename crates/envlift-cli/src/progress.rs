// crates/envlift-cli/src/progress.rs
// ============================================================================
// Module: CLI Progress Sink
// Description: Renders upgrade progress events to stderr.
// Purpose: Give operators step-by-step feedback while stacks update.
// Dependencies: envlift-core, crate::{i18n, output}
// ============================================================================

//! ## Overview
//! Progress lines go to stderr so stdout carries only the final report.
//! Write failures are dropped; progress is advisory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use envlift_core::ProgressEvent;
use envlift_core::ProgressSink;

use crate::output::write_stderr_line;
use crate::t;

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders one progress event as an operator-facing line.
#[must_use]
pub fn render_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::PatchingPermissions {
            env,
        } => t!("progress.patch.start", env = env),
        ProgressEvent::PermissionsPatched {
            env,
        } => t!("progress.patch.done", env = env),
        ProgressEvent::PermissionPatchFailed {
            env,
        } => t!("progress.patch.failed", env = env),
        ProgressEvent::UpgradeStarted {
            env,
            from,
            to,
        } => t!("progress.upgrade.start", env = env, from = from, to = to),
        ProgressEvent::UpgradeCompleted {
            env,
            to,
        } => t!("progress.upgrade.done", env = env, to = to),
        ProgressEvent::UpgradeFailed {
            env,
            to,
        } => t!("progress.upgrade.failed", env = env, to = to),
        ProgressEvent::VersionSkew {
            env,
            current,
            target,
        } => t!("progress.version_skew", env = env, current = current, to = target),
    }
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Progress sink writing one line per event to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn start(&self, event: &ProgressEvent) {
        let _ = write_stderr_line(&render_event(event));
    }

    fn stop(&self, event: &ProgressEvent) {
        let _ = write_stderr_line(&render_event(event));
    }

    fn notice(&self, event: &ProgressEvent) {
        let _ = write_stderr_line(&render_event(event));
    }
}
