// crates/envlift-cli/src/main.rs
// ============================================================================
// Module: envlift CLI Entry Point
// Description: Command dispatcher for environment upgrades and config checks.
// Purpose: Wire AWS collaborators into the upgrader behind a small CLI.
// Dependencies: clap, envlift-aws, envlift-config, envlift-core, thiserror, tracing.
// ============================================================================

//! ## Overview
//! `envlift env upgrade` upgrades one or every environment of an application
//! to the configured template version. `envlift env manifest` prints the
//! manifest equivalent of an environment's stored configuration, and
//! `envlift config validate` checks `envlift.toml`. All user-facing strings
//! are routed through the message catalog.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use envlift_aws::AwsClientFactory;
use envlift_aws::AwsSession;
use envlift_aws::CfnResourceDiscovery;
use envlift_aws::DirectoryRenderer;
use envlift_aws::SessionSettings;
use envlift_aws::SsmConfigStore;
use envlift_aws::WaitSettings;
use envlift_cli::logging::init_logging;
use envlift_cli::output::output_error;
use envlift_cli::output::write_stderr_line;
use envlift_cli::output::write_stdout_line;
use envlift_cli::progress::StderrProgress;
use envlift_cli::report::render_report;
use envlift_cli::t;
use envlift_config::EnvliftConfig;
use envlift_config::load_resource_set;
use envlift_core::AppName;
use envlift_core::ConfigStore;
use envlift_core::EnvName;
use envlift_core::EnvironmentManifest;
use envlift_core::EnvironmentUpgrader;
use envlift_core::UpgradeRequest;
use thiserror::Error;
use tracing::info;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "envlift", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Path to `envlift.toml` (overrides `ENVLIFT_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Environment commands.
    Env {
        /// Selected environment subcommand.
        #[command(subcommand)]
        command: EnvCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Environment subcommands.
#[derive(Subcommand, Debug)]
enum EnvCommand {
    /// Upgrade environments to the latest template version.
    Upgrade(EnvUpgradeCommand),
    /// Print the manifest equivalent of an environment's stored configuration.
    Manifest(EnvManifestCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an envlift configuration file.
    Validate,
}

/// Arguments for `env upgrade`.
#[derive(Args, Debug)]
struct EnvUpgradeCommand {
    /// Name of the application.
    #[arg(long, short = 'a', value_name = "APP")]
    app: String,
    /// Name of the environment.
    #[arg(long, short = 'n', value_name = "ENV")]
    name: Option<String>,
    /// Upgrade all environments in the application.
    #[arg(long, action = ArgAction::SetTrue)]
    all: bool,
}

/// Arguments for `env manifest`.
#[derive(Args, Debug)]
struct EnvManifestCommand {
    /// Name of the application.
    #[arg(long, short = 'a', value_name = "APP")]
    app: String,
    /// Name of the environment.
    #[arg(long, short = 'n', value_name = "ENV")]
    name: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for catalog messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a catalog message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config_path = cli.config.as_deref();
    match command {
        Commands::Env {
            command,
        } => match command {
            EnvCommand::Upgrade(command) => command_env_upgrade(config_path, &command),
            EnvCommand::Manifest(command) => command_env_manifest(config_path, &command),
        },
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate => command_config_validate(config_path),
        },
    }
}

// ============================================================================
// SECTION: Environment Commands
// ============================================================================

/// Executes `env upgrade`.
fn command_env_upgrade(
    config_path: Option<&Path>,
    command: &EnvUpgradeCommand,
) -> CliResult<ExitCode> {
    let request = UpgradeRequest::from_flags(
        AppName::new(command.app.as_str()),
        command.name.as_deref().map(EnvName::new),
        command.all,
    )
    .map_err(|err| CliError::new(t!("env.upgrade.failed", error = err)))?;
    let config = load_config(config_path)?;
    let session = open_session(&config)?;

    let upgrader_config = config
        .upgrader_config()
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let resources = load_resource_set(&config.resources.dir)
        .map_err(|err| CliError::new(t!("resources.load_failed", error = err)))?;
    let renderer = DirectoryRenderer::new(&config.templates.dir);
    let wait = WaitSettings {
        poll_interval: config.upgrade.poll_interval(),
        timeout: config.upgrade.timeout(),
    };
    let upgrader = EnvironmentUpgrader::new(
        SsmConfigStore::from_session(&session, config.store.parameter_prefix.as_str()),
        CfnResourceDiscovery::new(session.clone()),
        renderer.clone(),
        AwsClientFactory::new(session, Arc::new(renderer), wait),
        StderrProgress,
        resources,
        upgrader_config,
    );

    upgrader
        .validate(&request)
        .map_err(|err| CliError::new(t!("env.upgrade.failed", error = err)))?;
    info!(app = %request.app, target = %upgrader.config().latest_version, "starting upgrade");
    let report = upgrader
        .execute(&request)
        .map_err(|err| CliError::new(t!("env.upgrade.failed", error = err)))?;
    for line in render_report(&report) {
        write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `env manifest`.
fn command_env_manifest(
    config_path: Option<&Path>,
    command: &EnvManifestCommand,
) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let session = open_session(&config)?;
    let store = SsmConfigStore::from_session(&session, config.store.parameter_prefix.as_str());
    let app = AppName::new(command.app.as_str());
    let env = EnvName::new(command.name.as_str());
    let manifest_error =
        |error: String| CliError::new(t!("env.manifest.failed", env = env, error = error));

    let record = store.get_environment(&app, &env).map_err(|err| manifest_error(err.to_string()))?;
    let body = EnvironmentManifest::from_env_config(&record)
        .to_yaml()
        .map_err(|err| manifest_error(err.to_string()))?;
    write_stdout_line(body.trim_end()).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes the config validation command.
fn command_config_validate(config_path: Option<&Path>) -> CliResult<ExitCode> {
    let _config = load_config(config_path)?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Loads and validates the configuration, then installs logging.
fn load_config(config_path: Option<&Path>) -> CliResult<EnvliftConfig> {
    let config = EnvliftConfig::load(config_path)
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    init_logging(&config.logging)
        .map_err(|err| CliError::new(t!("logging.init_failed", error = err)))?;
    Ok(config)
}

/// Opens the default AWS session.
fn open_session(config: &EnvliftConfig) -> CliResult<AwsSession> {
    let settings = SessionSettings {
        region: config.aws.region.clone(),
        endpoint: config.aws.endpoint.clone(),
    };
    AwsSession::load(&settings).map_err(|err| CliError::new(t!("aws.session_failed", error = err)))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Prints the generated help text.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_line(help.trim_end()).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
