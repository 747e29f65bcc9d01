// crates/envlift-cli/src/report.rs
// ============================================================================
// Module: CLI Upgrade Report
// Description: Renders the outcome of an upgrade run.
// Purpose: Print one line per processed environment on stdout.
// Dependencies: envlift-core, crate::i18n
// ============================================================================

//! ## Overview
//! The report is printed to stdout after a run finishes, one line per
//! processed environment in the order they were handled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use envlift_core::EnvironmentOutcome;
use envlift_core::UpgradeReport;

use crate::t;

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders an upgrade report as output lines.
#[must_use]
pub fn render_report(report: &UpgradeReport) -> Vec<String> {
    if report.environments.is_empty() {
        return vec![t!("env.upgrade.report.none", app = report.app)];
    }
    let to = &report.target;
    report
        .environments
        .iter()
        .map(|line| match &line.outcome {
            EnvironmentOutcome::Upgraded {
                from,
                to,
            } => t!("env.upgrade.report.upgraded", env = line.env, from = from, to = to),
            EnvironmentOutcome::UpToDate => {
                t!("env.upgrade.report.up_to_date", env = line.env, to = to)
            }
            EnvironmentOutcome::VersionSkew {
                current,
            } => t!("env.upgrade.report.version_skew", env = line.env, current = current, to = to),
        })
        .collect()
}
