// crates/parity-cli/src/main.rs
// ============================================================================
// Module: Parity CLI Entry Point
// Description: Command dispatcher for validation runs and offline tooling.
// Purpose: Start, resume, and inspect validation runs from a config file.
// Dependencies: clap, parity-config, parity-core, parity-providers,
//               parity-report, parity-store-sqlite, thiserror, tokio
// ============================================================================

//! ## Overview
//! The `parity` binary wires a validated `parity.toml` into a
//! [`ValidationEngine`] backed by the `SQLite` state store, a provider
//! executor, and the file report sinks. Every command maps its result onto a
//! [`CliExit`] code. All user-facing strings are routed through the message
//! catalog.
//!
//! Interrupts (Ctrl-C) request a cooperative stop: the engine finishes the
//! query in flight, commits it, and exits with the interrupted code so the
//! run can be resumed.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use parity_cli::CliExit;
use parity_cli::parse_query_list;
use parity_cli::t;
use parity_config::ConfigError;
use parity_config::DEFAULT_SAMPLE_ROWS;
use parity_config::ExecutorKind;
use parity_config::ExecutorSection;
use parity_config::LogSinkKind;
use parity_config::LoggingSection;
use parity_config::OutputSection;
use parity_config::ParityConfig;
use parity_config::TableSpec;
use parity_config::generate_catalog;
use parity_config::render_catalog;
use parity_core::EngineError;
use parity_core::ExecutionId;
use parity_core::ExecutionPlan;
use parity_core::QueryDefinition;
use parity_core::QueryId;
use parity_core::QueryOutcome;
use parity_core::RunAuditSink;
use parity_core::RunReport;
use parity_core::RunRequest;
use parity_core::RunSummary;
use parity_core::ValidationEngine;
use parity_core::ValidationStateStore;
use parity_core::runtime::FileAuditSink;
use parity_core::runtime::NoopAuditSink;
use parity_core::runtime::StderrAuditSink;
use parity_providers::JsonFixtureConfig;
use parity_providers::ProviderExecutor;
use parity_providers::SqliteExecutorConfig;
use parity_report::CompositeSink;
use parity_report::FileArtifactSink;
use parity_report::LedgerError;
use parity_report::LedgerSink;
use parity_report::SummaryFileSink;
use parity_report::ledger_file;
use parity_report::verify_ledger;
use parity_store_sqlite::SqliteValidationStore;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "parity", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a new validation run (or plan one with --dry-run).
    Run(RunCommand),
    /// Resume an interrupted or aborted run.
    Resume(ExecutionArgs),
    /// Re-run the failed and skipped queries of a finished run.
    RetryFailed(ExecutionArgs),
    /// Show the persisted state of a run.
    Status(ExecutionArgs),
    /// Ledger utilities.
    Ledger {
        /// Selected ledger subcommand.
        #[command(subcommand)]
        command: LedgerCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config file location shared by every command.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config file path (defaults to `PARITY_CONFIG`, then parity.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Config file location.
    #[command(flatten)]
    config: ConfigArgs,
    /// Comma-separated query ids to run; dependencies are added.
    #[arg(long, value_name = "IDS")]
    queries: Option<String>,
    /// Print the execution plan without running anything.
    #[arg(long)]
    dry_run: bool,
    /// Explicit execution id for the new run.
    #[arg(long, value_name = "ID")]
    execution_id: Option<String>,
}

/// Arguments naming an existing execution.
#[derive(Args, Debug)]
struct ExecutionArgs {
    /// Config file location.
    #[command(flatten)]
    config: ConfigArgs,
    /// Execution id (defaults to the most recent applicable run).
    #[arg(long, value_name = "ID")]
    execution_id: Option<String>,
}

/// Ledger subcommands.
#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Verify the hash chain of an execution's ledger file.
    Verify(LedgerVerifyCommand),
}

/// Arguments for `ledger verify`.
#[derive(Args, Debug)]
struct LedgerVerifyCommand {
    /// Config file location, used when --path is absent.
    #[command(flatten)]
    config: ConfigArgs,
    /// Ledger file to verify.
    #[arg(long, value_name = "PATH", conflicts_with = "execution_id")]
    path: Option<PathBuf>,
    /// Execution whose ledger is verified (defaults to the most recent run).
    #[arg(long, value_name = "ID")]
    execution_id: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigArgs),
    /// Draft a `[[queries]]` catalog from a list of tables.
    Generate(GenerateCommand),
}

/// Arguments for `config generate`.
#[derive(Args, Debug)]
struct GenerateCommand {
    /// Table to cover, as `name` or `name:key1,key2`; repeatable.
    #[arg(long = "table", value_name = "TABLE", required = true)]
    tables: Vec<TableSpec>,
    /// Keyed rows compared by each content query.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_SAMPLE_ROWS)]
    sample_rows: u64,
    /// File to write; the catalog is printed when absent.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a rendered message and its exit code.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Exit code for this failure.
    exit: CliExit,
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(exit: CliExit, message: String) -> Self {
        Self {
            exit,
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Engine type assembled from configuration.
type CliEngine = ValidationEngine<SqliteValidationStore, ProviderExecutor>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run(std::env::args_os()).await {
        Ok(exit) => exit.into(),
        Err(err) => emit_error(&err),
    }
}

/// Parses arguments and dispatches the selected command.
async fn run<I, T>(args: I) -> CliResult<CliExit>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => return render_clap_error(&err),
    };
    match cli.command {
        Commands::Run(command) => command_run(command).await,
        Commands::Resume(command) => {
            let config = load_config(command.config.config.as_deref())?;
            let request = RunRequest::Resume {
                execution_id: command.execution_id.map(ExecutionId::new),
            };
            execute(&config, request).await
        }
        Commands::RetryFailed(command) => {
            let config = load_config(command.config.config.as_deref())?;
            let request = RunRequest::RetryFailed {
                execution_id: command.execution_id.map(ExecutionId::new),
            };
            execute(&config, request).await
        }
        Commands::Status(command) => command_status(&command),
        Commands::Ledger {
            command: LedgerCommand::Verify(command),
        } => command_ledger_verify(&command),
        Commands::Config {
            command: ConfigCommand::Validate(command),
        } => command_config_validate(&command),
        Commands::Config {
            command: ConfigCommand::Generate(command),
        } => command_config_generate(&command),
    }
}

/// Routes clap help/version output to stdout and usage errors to exit 4.
fn render_clap_error(error: &clap::Error) -> CliResult<CliExit> {
    let rendered = error.render().to_string();
    if error.use_stderr() {
        return Err(CliError::new(
            CliExit::Usage,
            t!("usage.invalid", error = rendered.trim_end()),
        ));
    }
    print(rendered.trim_end())?;
    Ok(CliExit::Success)
}

// ============================================================================
// SECTION: Run Commands
// ============================================================================

/// Executes the `run` command.
async fn command_run(command: RunCommand) -> CliResult<CliExit> {
    let config = load_config(command.config.config.as_deref())?;
    let subset = command
        .queries
        .as_deref()
        .map(parse_query_list)
        .transpose()
        .map_err(|err| CliError::new(CliExit::Usage, t!("selection.invalid", error = err)))?;
    if command.dry_run {
        return command_dry_run(&config, subset.as_deref());
    }
    let request = RunRequest::Start {
        execution_id: command.execution_id.map(ExecutionId::new),
        queries: subset,
    };
    execute(&config, request).await
}

/// Prints the execution plan without touching the state store.
fn command_dry_run(config: &ParityConfig, subset: Option<&[QueryId]>) -> CliResult<CliExit> {
    let catalog = config.to_definitions();
    let plan = ExecutionPlan::build(&catalog, subset)
        .map_err(|err| CliError::new(CliExit::Usage, t!("engine.failed", error = err)))?;
    print(&t!("plan.header", count = plan.order.len()))?;
    for (index, query_id) in plan.order.iter().enumerate() {
        let position = index + 1;
        let line = if plan.added_dependencies.contains(query_id) {
            t!("plan.entry.added", position = position, query_id = query_id)
        } else {
            t!("plan.entry", position = position, query_id = query_id)
        };
        print(&line)?;
    }
    Ok(CliExit::Success)
}

/// Runs one engine pass with an interrupt handler installed.
async fn execute(config: &ParityConfig, request: RunRequest) -> CliResult<CliExit> {
    let engine = build_engine(config)?;
    let stop = engine.stop_signal().clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.request_stop();
        }
    });
    let result = engine.execute(request).await;
    watcher.abort();
    let report = result.map_err(|err| engine_error(&err))?;
    print_report(&report)?;
    Ok(CliExit::for_report(&report))
}

/// Converts an engine error into a CLI error.
fn engine_error(error: &EngineError) -> CliError {
    let message = match error {
        EngineError::ConcurrentRun {
            execution_id,
            holder,
        } => t!("engine.concurrent", execution_id = execution_id, holder = holder),
        other => t!("engine.failed", error = other),
    };
    CliError::new(CliExit::for_engine_error(error), message)
}

/// Prints the result of an engine pass.
fn print_report(report: &RunReport) -> CliResult<()> {
    print(&t!("run.header", execution_id = report.execution_id, status = report.status))?;
    print_counts(&report.summary)?;
    print(&t!("run.processed", processed = report.processed))?;
    if report.interrupted {
        print(&t!("run.interrupted", execution_id = report.execution_id))?;
    }
    Ok(())
}

/// Prints aggregate outcome counts.
fn print_counts(summary: &RunSummary) -> CliResult<()> {
    print(&t!(
        "run.counts",
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        pending = summary.pending,
        rate = format!("{:.1}", summary.success_rate),
    ))
}

// ============================================================================
// SECTION: Status Command
// ============================================================================

/// Executes the `status` command.
fn command_status(command: &ExecutionArgs) -> CliResult<CliExit> {
    let config = load_config(command.config.config.as_deref())?;
    let store = open_store(&config)?;
    let execution_id = match &command.execution_id {
        Some(id) => ExecutionId::new(id.as_str()),
        None => {
            let Some(latest) = store.latest().map_err(|err| store_read_error(&err))? else {
                print(&t!("status.none"))?;
                return Ok(CliExit::Success);
            };
            latest
        }
    };
    let Some(snapshot) = store.load(&execution_id).map_err(|err| store_read_error(&err))? else {
        return Err(CliError::new(
            CliExit::Usage,
            t!("status.not_found", execution_id = execution_id),
        ));
    };
    let run = &snapshot.run;
    print(&t!(
        "status.header",
        execution_id = run.execution_id,
        status = run.status,
        pass = run.pass,
        cursor = run.cursor,
        total = run.plan.len(),
    ))?;
    print_counts(&snapshot.summary())?;
    let ordered = run
        .plan
        .iter()
        .filter_map(|id| snapshot.outcomes.get(id))
        .chain(snapshot.outcomes.values().filter(|outcome| !run.plan.contains(&outcome.query_id)));
    for outcome in ordered {
        print(&t!(
            "status.entry",
            query_id = outcome.query_id,
            status = outcome.status,
            attempts = outcome.attempts,
            detail = outcome_detail(outcome),
        ))?;
    }
    Ok(CliExit::Success)
}

/// Renders the trailing detail of a status line.
fn outcome_detail(outcome: &QueryOutcome) -> String {
    if let Some(error) = &outcome.error {
        return format!(" [{}] {}", error.kind, error.message);
    }
    outcome.result.as_ref().map_or_else(String::new, |result| {
        let sampled = if result.provisional { ", sampled" } else { "" };
        format!(" ({:.2}% match{sampled})", result.match_percentage)
    })
}

/// Maps a store read failure.
fn store_read_error(error: &parity_core::StoreError) -> CliError {
    CliError::new(CliExit::Aborted, t!("store.read_failed", error = error))
}

// ============================================================================
// SECTION: Ledger and Config Commands
// ============================================================================

/// Executes the `ledger verify` command.
fn command_ledger_verify(command: &LedgerVerifyCommand) -> CliResult<CliExit> {
    let path = match &command.path {
        Some(path) => path.clone(),
        None => {
            let config = load_config(command.config.config.as_deref())?;
            let execution_id = match &command.execution_id {
                Some(id) => ExecutionId::new(id.as_str()),
                None => {
                    let store = open_store(&config)?;
                    let Some(latest) = store.latest().map_err(|err| store_read_error(&err))?
                    else {
                        print(&t!("status.none"))?;
                        return Ok(CliExit::Success);
                    };
                    latest
                }
            };
            ledger_file(&config.output.ledger_dir(), &execution_id)
        }
    };
    match verify_ledger(&path) {
        Ok(verification) => {
            let line = verification.last_hash.map_or_else(
                || t!("ledger.verify.empty"),
                |head| t!("ledger.verify.ok", entries = verification.entries, head = head),
            );
            print(&line)?;
            Ok(CliExit::Success)
        }
        Err(err @ LedgerError::Io(_)) => {
            Err(CliError::new(CliExit::Usage, t!("ledger.verify.failed", error = err)))
        }
        Err(err) => Err(CliError::new(
            CliExit::CompletedWithFailures,
            t!("ledger.verify.failed", error = err),
        )),
    }
}

/// Executes the `config validate` command.
fn command_config_validate(command: &ConfigArgs) -> CliResult<CliExit> {
    let config = load_config(command.config.as_deref())?;
    print(&t!("config.validate.ok", queries = config.queries.len()))?;
    Ok(CliExit::Success)
}

/// Executes the `config generate` command.
fn command_config_generate(command: &GenerateCommand) -> CliResult<CliExit> {
    let failed =
        |err: ConfigError| CliError::new(CliExit::Usage, t!("config.generate.failed", error = err));
    let queries = generate_catalog(&command.tables, command.sample_rows).map_err(failed)?;
    let text = render_catalog(&queries).map_err(failed)?;
    let Some(path) = &command.output else {
        print(text.trim_end())?;
        return Ok(CliExit::Success);
    };
    let mut file = std::fs::OpenOptions::new().write(true).create_new(true).open(path).map_err(
        |err| {
            let message = if err.kind() == std::io::ErrorKind::AlreadyExists {
                t!("config.generate.exists", path = path.display())
            } else {
                t!("config.generate.write_failed", path = path.display(), error = err)
            };
            CliError::new(CliExit::Usage, message)
        },
    )?;
    file.write_all(text.as_bytes()).map_err(|err| {
        CliError::new(
            CliExit::Aborted,
            t!("config.generate.write_failed", path = path.display(), error = err),
        )
    })?;
    print(&t!("config.generate.ok", queries = queries.len(), path = path.display()))?;
    Ok(CliExit::Success)
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<ParityConfig> {
    ParityConfig::load(path).map_err(|err| CliError::new(CliExit::Usage, config_error_message(&err)))
}

/// Renders a config error, listing every violation on its own line.
fn config_error_message(error: &ConfigError) -> String {
    let ConfigError::Violations(problems) = error else {
        return t!("config.load_failed", error = error);
    };
    let mut lines = vec![t!("config.invalid.header", count = problems.len())];
    lines.extend(problems.iter().map(|problem| t!("config.invalid.entry", problem = problem)));
    lines.join("\n")
}

/// Opens the configured `SQLite` state store.
fn open_store(config: &ParityConfig) -> CliResult<SqliteValidationStore> {
    let store_config = config.store_config();
    let path = store_config.path.clone();
    SqliteValidationStore::new(store_config).map_err(|err| {
        CliError::new(
            CliExit::Aborted,
            t!("store.open_failed", path = path.display(), error = err),
        )
    })
}

/// Assembles the engine with its store, executor, and sinks.
fn build_engine(config: &ParityConfig) -> CliResult<CliEngine> {
    let catalog = config.to_definitions();
    let store = open_store(config)?;
    let executor = build_executor(&config.executor);
    let sinks = build_report_sinks(&config.output, &catalog)?;
    let audit = build_audit_sink(&config.logging)?;
    let mut engine = ValidationEngine::new(catalog, store, executor, config.engine_config())
        .map_err(|err| engine_error(&err))?
        .with_audit_sink(audit);
    if !sinks.is_empty() {
        engine = engine.with_report_sink(Arc::new(sinks));
    }
    if config.output.artifacts {
        engine = engine.with_artifact_sink(Arc::new(FileArtifactSink::new(config.output.dir.clone())));
    }
    Ok(engine)
}

/// Builds the configured executor adapter.
fn build_executor(section: &ExecutorSection) -> ProviderExecutor {
    match section.kind {
        ExecutorKind::Sqlite => ProviderExecutor::sqlite(SqliteExecutorConfig::new(
            section.source.clone(),
            section.target.clone(),
        )),
        ExecutorKind::JsonFixture => ProviderExecutor::json_fixture(JsonFixtureConfig::new(
            section.source.clone(),
            section.target.clone(),
        )),
    }
}

/// Builds the ledger and summary sinks selected by `[output]`.
fn build_report_sinks(
    section: &OutputSection,
    catalog: &[QueryDefinition],
) -> CliResult<CompositeSink> {
    let mut sinks = CompositeSink::new();
    if section.ledger {
        let path = section.ledger_dir();
        let ledger = LedgerSink::open(&path).map_err(|err| {
            CliError::new(CliExit::Aborted, t!("sink.open_failed", sink = path.display(), error = err))
        })?;
        sinks = sinks.with_sink(Arc::new(ledger));
    }
    if section.summary {
        sinks = sinks
            .with_sink(Arc::new(SummaryFileSink::new(section.dir.clone()).with_catalog(catalog)));
    }
    Ok(sinks)
}

/// Builds the audit sink selected by `[logging]`.
fn build_audit_sink(section: &LoggingSection) -> CliResult<Arc<dyn RunAuditSink>> {
    match (section.sink, &section.path) {
        (LogSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (LogSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
        (LogSinkKind::File, Some(path)) => match FileAuditSink::new(path) {
            Ok(sink) => Ok(Arc::new(sink)),
            Err(err) => Err(CliError::new(
                CliExit::Usage,
                t!("sink.open_failed", sink = path.display(), error = err),
            )),
        },
        (LogSinkKind::File, None) => Err(CliError::new(
            CliExit::Usage,
            t!("config.load_failed", error = "logging.path is required for the file sink"),
        )),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Writes a line to stdout, mapping failures to a CLI error.
fn print(message: &str) -> CliResult<()> {
    write_stdout_line(message)
        .map_err(|err| CliError::new(CliExit::Aborted, output_error("stdout", &err)))
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns its exit code.
fn emit_error(error: &CliError) -> ExitCode {
    let _ = write_stderr_line(&error.message);
    error.exit.into()
}
