// crates/tile-migrate-cli/src/main.rs
// ============================================================================
// Module: Tile Migrate CLI Entry Point
// Description: Command dispatcher for tile migration workflows.
// Purpose: Run, plan, verify, and inspect migrations from a config file.
// Dependencies: clap, serde, serde_jcs, thiserror, tokio, tile-migrate-*
// ============================================================================

//! ## Overview
//! The `tile-migrate` binary loads `tile-migrate.toml`, opens the configured
//! registries on a blocking worker, and prints machine-readable results as
//! canonical JSON. Progress events go to the configured sink, never stdout.
//!
//! Security posture: the destination may be irreversibly finalized by
//! operators after a run; only a `completed` result reports
//! `finalization_eligible = true`, and the CLI never finalizes by itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use thiserror::Error;
use tile_migrate_cli::AnyRegistry;
use tile_migrate_cli::open_event_sink;
use tile_migrate_config::MigrateConfig;
use tile_migrate_core::CancellationToken;
use tile_migrate_core::DestinationRegistry;
use tile_migrate_core::MigrationOrchestrator;
use tile_migrate_core::ReadError;
use tile_migrate_core::SourceRegistry;
use tile_migrate_core::TileId;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "tile-migrate", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (defaults to tile-migrate.toml or `TILE_MIGRATE_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Write the JSON result to this file instead of stdout.
    #[arg(long, value_name = "PATH", global = true)]
    output: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate pending records, then verify the destination.
    Run,
    /// List source ids still missing from the destination.
    Plan,
    /// Compare the destination against the source without writing.
    Verify,
    /// Show the destination finalize flag and both record counts.
    Status,
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a tile-migrate configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {}

/// Output of the `plan` command.
#[derive(Debug, Serialize)]
struct PlanOutput {
    /// Distinct ids enumerated from the source.
    source_ids: usize,
    /// Number of pending ids.
    pending_count: usize,
    /// Pending ids, in source order.
    pending: Vec<TileId>,
}

/// Output of the `status` command.
#[derive(Debug, Serialize)]
struct StatusOutput {
    /// Destination finalize flag.
    destination_finalized: bool,
    /// Records held by the source.
    source_count: u64,
    /// Records held by the destination.
    destination_count: u64,
}

/// Orchestrator over configured registries.
type ConfiguredOrchestrator = MigrationOrchestrator<AnyRegistry, AnyRegistry>;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for operator-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
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
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let output = cli.output.as_deref();
    match cli.command {
        Commands::Run => command_run(load_config(cli.config.as_deref())?, output).await,
        Commands::Plan => command_plan(load_config(cli.config.as_deref())?, output).await,
        Commands::Verify => command_verify(load_config(cli.config.as_deref())?, output).await,
        Commands::Status => command_status(load_config(cli.config.as_deref())?, output).await,
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(_) => command_config_validate(cli.config.as_deref()),
        },
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes a migration run; Ctrl-C cancels at the next batch boundary.
async fn command_run(config: MigrateConfig, output: Option<&Path>) -> CliResult<ExitCode> {
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();
    let mut task = tokio::task::spawn_blocking(move || {
        build_orchestrator(&config).map(|orchestrator| {
            orchestrator.with_cancellation(worker_cancel).run()
        })
    });
    let joined = tokio::select! {
        joined = &mut task => joined,
        signal = tokio::signal::ctrl_c() => {
            if signal.is_ok() {
                cancel.cancel();
                let _ = write_stderr_line(
                    "cancellation requested; stopping at the next batch boundary",
                );
            }
            task.await
        }
    };
    let result =
        joined.map_err(|err| CliError::new(format!("migration worker failed: {err}")))??;
    write_json(&result, output)?;
    Ok(if result.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Prints the pending ids without writing.
async fn command_plan(config: MigrateConfig, output: Option<&Path>) -> CliResult<ExitCode> {
    let plan = blocking(move || {
        let orchestrator = build_orchestrator(&config)?;
        orchestrator.plan().map_err(|err| CliError::new(format!("planning failed: {err}")))
    })
    .await?;
    write_json(
        &PlanOutput {
            source_ids: plan.source_ids,
            pending_count: plan.pending.len(),
            pending: plan.pending,
        },
        output,
    )?;
    Ok(ExitCode::SUCCESS)
}

/// Prints a verification report; exits non-zero unless verification passed.
async fn command_verify(config: MigrateConfig, output: Option<&Path>) -> CliResult<ExitCode> {
    let report = blocking(move || {
        let orchestrator = build_orchestrator(&config)?;
        orchestrator.verify().map_err(|err| CliError::new(format!("verification failed: {err}")))
    })
    .await?;
    write_json(&report, output)?;
    Ok(if report.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Prints the destination finalize flag and both record counts.
async fn command_status(config: MigrateConfig, output: Option<&Path>) -> CliResult<ExitCode> {
    let status = blocking(move || {
        let orchestrator = build_orchestrator(&config)?;
        let ctx = orchestrator.context();
        let source = orchestrator.source();
        let destination = orchestrator.destination();
        let read_failed = |err: ReadError| CliError::new(format!("status read failed: {err}"));
        let destination_finalized = ctx
            .read("destination_is_finalized", None, || destination.is_finalized())
            .map_err(read_failed)?
            .value;
        let source_count = ctx
            .read("source_total_count", None, || SourceRegistry::total_count(source))
            .map_err(read_failed)?
            .value;
        let destination_count = ctx
            .read("destination_total_count", None, || {
                DestinationRegistry::total_count(destination)
            })
            .map_err(read_failed)?
            .value;
        Ok(StatusOutput {
            destination_finalized,
            source_count,
            destination_count,
        })
    })
    .await?;
    write_json(&status, output)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the config validation command.
fn command_config_validate(path: Option<&Path>) -> CliResult<ExitCode> {
    let _config = load_config(path)?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<MigrateConfig> {
    MigrateConfig::load(path).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Opens both registries and the progress sink.
///
/// Must run on a blocking worker: HTTP registries own a blocking client.
fn build_orchestrator(config: &MigrateConfig) -> CliResult<ConfiguredOrchestrator> {
    let source = AnyRegistry::open_source(&config.source)
        .map_err(|err| CliError::new(format!("source registry open failed: {err}")))?;
    let destination = AnyRegistry::open_destination(&config.destination)
        .map_err(|err| CliError::new(format!("destination registry open failed: {err}")))?;
    let events = open_event_sink(&config.logging)
        .map_err(|err| CliError::new(format!("event sink open failed: {err}")))?;
    Ok(MigrationOrchestrator::new(source, destination, config.pipeline_config())
        .with_events(events))
}

/// Runs registry work on the blocking pool.
async fn blocking<T, F>(work: F) -> CliResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CliResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| CliError::new(format!("registry worker failed: {err}")))?
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes canonical JSON to `output`, or to stdout when unset.
fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> CliResult<()> {
    let mut bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(format!("json serialization failed: {err}")))?;
    bytes.push(b'\n');
    match output {
        Some(path) => fs::write(path, &bytes).map_err(|err| {
            CliError::new(format!("failed to write output {}: {err}", path.display()))
        }),
        None => write_stdout_bytes(&bytes)
            .map_err(|err| CliError::new(output_error("stdout", &err))),
    }
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
