//! Command-line behavior tests for the envlift binary.
// crates/envlift-cli/tests/cli_commands.rs
// =============================================================================
// Module: CLI Command Tests
// Description: Run the envlift binary for commands that need no AWS access.
// Purpose: Ensure flag validation, config checks, and exit codes behave.
// =============================================================================

use std::fs;
use std::process::Command;
use std::process::Output;

use tempfile::TempDir;

type TestResult = Result<(), String>;

fn envlift(args: &[&str]) -> Result<Output, String> {
    Command::new(env!("CARGO_BIN_EXE_envlift"))
        .args(args)
        .env_remove("ENVLIFT_CONFIG")
        .env_remove("ENVLIFT_LOG")
        .output()
        .map_err(|err| err.to_string())
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

#[test]
fn version_flag_prints_package_version() -> TestResult {
    let output = envlift(&["--version"])?;
    let expected = format!("envlift {}", env!("CARGO_PKG_VERSION"));
    if !output.status.success() || stdout(&output) != expected {
        return Err(format!("unexpected version output: {}", stdout(&output)));
    }
    Ok(())
}

#[test]
fn config_validate_accepts_valid_file() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("envlift.toml");
    fs::write(&path, "[templates]\nlatest_version = \"v1.14.0\"\n")
        .map_err(|err| err.to_string())?;
    let path = path.to_string_lossy().to_string();

    let output = envlift(&["--config", &path, "config", "validate"])?;

    if !output.status.success() || stdout(&output) != "Config valid." {
        return Err(format!("validate failed: {}", stderr(&output)));
    }
    Ok(())
}

#[test]
fn config_validate_rejects_unknown_keys() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("envlift.toml");
    fs::write(&path, "[templates]\nlatest = \"v1.14.0\"\n").map_err(|err| err.to_string())?;
    let path = path.to_string_lossy().to_string();

    let output = envlift(&["--config", &path, "config", "validate"])?;

    if output.status.success() {
        return Err("unknown key accepted".to_string());
    }
    if !stderr(&output).starts_with("Failed to load config: config parse error:") {
        return Err(format!("unexpected error: {}", stderr(&output)));
    }
    Ok(())
}

#[test]
fn upgrade_rejects_name_with_all() -> TestResult {
    let output = envlift(&["env", "upgrade", "--app", "phonetool", "--name", "test", "--all"])?;
    if output.status.success() || stderr(&output) != "cannot specify both --all and --name flags" {
        return Err(format!("unexpected result: {}", stderr(&output)));
    }
    Ok(())
}

#[test]
fn upgrade_requires_a_target() -> TestResult {
    let output = envlift(&["env", "upgrade", "--app", "phonetool"])?;
    if output.status.success() || stderr(&output) != "either --name or --all must be specified" {
        return Err(format!("unexpected result: {}", stderr(&output)));
    }
    Ok(())
}
