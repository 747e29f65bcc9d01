// crates/envlift-cli/src/lib.rs
// ============================================================================
// Module: envlift CLI Library
// Description: Output, logging, and rendering helpers shared by the binary.
// Purpose: Keep the binary's testable pieces outside `main`.
// Dependencies: crate::{i18n, logging, output, progress, report}
// ============================================================================

//! ## Overview
//! Helpers behind the `envlift` binary: the message catalog, the tracing
//! setup, stdout/stderr writers, the progress sink, and report rendering.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod i18n;
pub mod logging;
pub mod output;
pub mod progress;
pub mod report;

#[cfg(test)]
mod tests {
    //! Unit tests for the CLI helpers.

    mod i18n;
    mod logging;
    mod rendering;
}
