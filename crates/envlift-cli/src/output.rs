// crates/envlift-cli/src/output.rs
// ============================================================================
// Module: CLI Output Helpers
// Description: Line-oriented writers for stdout and stderr.
// Purpose: Route CLI output through fallible writers instead of print macros.
// Dependencies: crate::i18n
// ============================================================================

//! ## Overview
//! Every line the CLI prints goes through these writers so that a closed
//! stream surfaces as an error instead of a panic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use crate::t;

// ============================================================================
// SECTION: Writers
// ============================================================================

/// Writes a single line to stdout.
///
/// # Errors
///
/// Returns the underlying I/O error when stdout is closed.
pub fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
///
/// # Errors
///
/// Returns the underlying I/O error when stderr is closed.
pub fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
#[must_use]
pub fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}
