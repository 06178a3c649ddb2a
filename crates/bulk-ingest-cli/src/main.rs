// crates/bulk-ingest-cli/src/main.rs
// ============================================================================
// Module: Bulk Ingest CLI Entry Point
// Description: Command dispatcher for the ingest server and offline tasks.
// Purpose: Run the HTTP server or import and query tables from the shell.
// Dependencies: clap, bulk-ingest-config, bulk-ingest-core, bulk-ingest-server, tokio.
// ============================================================================

//! ## Overview
//! `serve` starts the HTTP server. `import`, `validate`, `query`, and `tables`
//! open the configured store directly and print the same JSON bodies the HTTP
//! routes return, in canonical form on stdout. Errors go to stderr with a
//! non-zero exit code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use bulk_ingest_cli::csv_input::MAX_CSV_BYTES;
use bulk_ingest_cli::csv_input::read_csv_file;
use bulk_ingest_cli::filter_arg::parse_filters;
use bulk_ingest_config::IngestConfig;
use bulk_ingest_config::config_toml_example;
use bulk_ingest_core::ImportRequest;
use bulk_ingest_core::IngestService;
use bulk_ingest_core::QueryRequest;
use bulk_ingest_core::SortSpec;
use bulk_ingest_core::TableName;
use bulk_ingest_core::WriteMode;
use bulk_ingest_server::IngestServer;
use bulk_ingest_server::api::FilterResponse;
use bulk_ingest_server::api::ImportResponse;
use bulk_ingest_server::api::TablesResponse;
use bulk_ingest_server::api::ValidateResponse;
use bulk_ingest_server::build_service;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "bulk-ingest", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// List registered tables.
    Tables(ConfigArgs),
    /// Import a CSV file into a table.
    Import(ImportCommand),
    /// Validate a CSV file, optionally against a table schema.
    Validate(ValidateCommand),
    /// Query a table with filters, sorting, and pagination.
    Query(QueryCommand),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigArgs),
    /// Print a canonical example configuration.
    Example,
}

/// Shared `--config` argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Optional config file path (defaults to bulk-ingest.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `import`.
#[derive(Args, Debug)]
struct ImportCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Destination table.
    #[arg(long)]
    table: String,
    /// Write mode: insert, update, or upsert.
    #[arg(long, default_value = "insert")]
    mode: String,
    /// CSV file with a header row.
    #[arg(long, value_name = "PATH")]
    file: PathBuf,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
struct ValidateCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Table to validate against; structural checks only when absent.
    #[arg(long)]
    table: Option<String>,
    /// CSV file with a header row.
    #[arg(long, value_name = "PATH")]
    file: PathBuf,
}

/// Arguments for `query`.
#[derive(Args, Debug)]
struct QueryCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Table to query.
    #[arg(long)]
    table: String,
    /// Filter as `column=value` or `column:op=value` (repeatable).
    #[arg(long = "filter", value_name = "FILTER")]
    filters: Vec<String>,
    /// One-based page number.
    #[arg(long, default_value_t = 1)]
    page: usize,
    /// Rows per page (defaults to the configured page size).
    #[arg(long)]
    page_size: Option<usize>,
    /// Sort column.
    #[arg(long, default_value = "")]
    sort: String,
    /// Sort order: ascending or descending.
    #[arg(long, default_value = "")]
    order: String,
}

/// CLI error wrapper carrying a display message.
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
    match cli.command {
        Commands::Serve(args) => command_serve(args).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Tables(args) => command_tables(&args),
        Commands::Import(command) => command_import(command),
        Commands::Validate(command) => command_validate(&command),
        Commands::Query(command) => command_query(command),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(args: ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(&args)?;
    let server = tokio::task::spawn_blocking(move || IngestServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(args) => {
            let _config = load_config(&args)?;
            write_stdout_line("config ok")
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        ConfigCommand::Example => {
            write_stdout_bytes(config_toml_example().as_bytes())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `tables` command.
fn command_tables(args: &ConfigArgs) -> CliResult<ExitCode> {
    let service = open_service(args)?;
    let tables = service.list_tables().map_err(|err| CliError::new(err.to_string()))?;
    write_json(&TablesResponse::new(tables))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `import` command.
fn command_import(command: ImportCommand) -> CliResult<ExitCode> {
    let mode: WriteMode = command.mode.parse().map_err(CliError::new)?;
    let batch = read_csv_file(&command.file, MAX_CSV_BYTES)
        .map_err(|err| CliError::new(format!("{}: {err}", command.file.display())))?;
    let service = open_service(&command.config)?;
    let result = service
        .import(ImportRequest {
            table: TableName::new(command.table.trim()),
            mode,
            rows: batch.rows,
            columns: batch.columns,
        })
        .map_err(|err| CliError::new(err.to_string()))?;
    write_json(&ImportResponse::from(result))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `validate` command.
fn command_validate(command: &ValidateCommand) -> CliResult<ExitCode> {
    let batch = read_csv_file(&command.file, MAX_CSV_BYTES)
        .map_err(|err| CliError::new(format!("{}: {err}", command.file.display())))?;
    let service = open_service(&command.config)?;
    let table = command
        .table
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(TableName::new);
    let report = service
        .validate(table.as_ref(), &batch.rows, &batch.columns)
        .map_err(|err| CliError::new(err.to_string()))?;
    write_json(&ValidateResponse::from(report))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `query` command.
fn command_query(command: QueryCommand) -> CliResult<ExitCode> {
    let filters = parse_filters(&command.filters).map_err(CliError::new)?;
    let sort = SortSpec::from_labels(&command.sort, &command.order).map_err(CliError::new)?;
    let config = load_config(&command.config)?;
    let page_size = command.page_size.unwrap_or(config.limits.default_page_size);
    let service = service_for(&config)?;
    let page = service
        .query(&QueryRequest {
            table: TableName::new(command.table.trim()),
            filters,
            page: command.page,
            page_size,
            sort,
        })
        .map_err(|err| CliError::new(err.to_string()))?;
    write_json(&FilterResponse::from(page))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Service Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(args: &ConfigArgs) -> CliResult<IngestConfig> {
    IngestConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Loads configuration and opens the configured service.
fn open_service(args: &ConfigArgs) -> CliResult<IngestService> {
    service_for(&load_config(args)?)
}

/// Opens the service for loaded configuration.
fn service_for(config: &IngestConfig) -> CliResult<IngestService> {
    build_service(config).map_err(|err| CliError::new(err.to_string()))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a value to stdout as canonical JSON followed by a newline.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(format!("json serialization failed: {err}")))?;
    bytes.push(b'\n');
    write_stdout_bytes(&bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
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
    format!("failed to write {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
