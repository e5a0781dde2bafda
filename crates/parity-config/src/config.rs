// crates/parity-config/src/config.rs
// ============================================================================
// Module: Parity Configuration
// Description: TOML configuration model, loader, and validation.
// Purpose: Provide fail-closed config wiring for the validation engine.
// Dependencies: parity-core, parity-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! [`ParityConfig`] is the single configuration document for a `parity`
//! deployment. It is loaded from TOML with strict path, size, and encoding
//! limits, then validated section by section before anything runs.
//!
//! Security posture: configuration is untrusted input; every limit is
//! enforced before parsing and unknown keys are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use parity_core::ComparisonParams;
use parity_core::ComparisonStrategy;
use parity_core::EngineConfig;
use parity_core::Priority;
use parity_core::QueryCategory;
use parity_core::QueryDefinition;
use parity_core::QueryId;
use parity_core::RetryPolicy;
use parity_core::query::DEFAULT_MAX_ATTEMPTS;
use parity_core::query::DEFAULT_TIMEOUT_MS;
use parity_core::runtime::DEFAULT_SAMPLE_DIFFERENCES_LIMIT;
use parity_core::runtime::engine::DEFAULT_COMMIT_RETRY_DELAY_MS;
use parity_core::runtime::engine::DEFAULT_LOCK_TTL_MS;
use parity_core::runtime::engine::DEFAULT_MAX_COMMIT_ATTEMPTS;
use parity_core::runtime::retry::DEFAULT_BACKOFF_BASE_MS;
use parity_core::runtime::retry::DEFAULT_BACKOFF_MAX_MS;
use parity_core::runtime::validate_catalog;
use parity_store_sqlite::SqliteStoreConfig;
use parity_store_sqlite::SqliteStoreMode;
use parity_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default config filename.
const DEFAULT_CONFIG_NAME: &str = "parity.toml";
/// Environment variable override for config path.
pub const CONFIG_ENV_VAR: &str = "PARITY_CONFIG";
/// Maximum allowed config file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length for config-related paths.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum number of queries in one catalog.
const MAX_QUERIES: usize = 10_000;
/// Maximum length of a query identifier.
const MAX_QUERY_ID_LENGTH: usize = 128;
/// Default state database path.
const DEFAULT_STORE_PATH: &str = "parity-state/parity.db";
/// Default output directory.
const DEFAULT_OUTPUT_DIR: &str = "parity-output";
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file is not valid TOML for the model.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Config failed validation in more than one place.
    #[error("invalid config ({} problems): {}", .0.len(), .0.join("; "))]
    Violations(Vec<String>),
}

/// Builds an [`ConfigError::Invalid`] from a message.
fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

/// Validation messages gathered across every section.
#[derive(Debug, Default)]
struct Violations(Vec<String>);

impl Violations {
    /// Records one violation.
    fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// Records the message of a failed check.
    fn check(&mut self, result: Result<(), ConfigError>) {
        if let Err(err) = result {
            match err {
                ConfigError::Invalid(message) => self.0.push(message),
                ConfigError::Violations(messages) => self.0.extend(messages),
                other => self.0.push(other.to_string()),
            }
        }
    }

    /// Returns true when nothing was recorded.
    const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the gathered messages into a result.
    fn into_result(mut self) -> Result<(), ConfigError> {
        match self.0.len() {
            0 => Ok(()),
            1 => Err(ConfigError::Invalid(self.0.remove(0))),
            _ => Err(ConfigError::Violations(self.0)),
        }
    }
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Parity configuration document.
///
/// # Invariants
/// - A value returned by [`ParityConfig::load`] has passed [`ParityConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParityConfig {
    /// Engine tuning.
    #[serde(default)]
    pub engine: EngineSection,
    /// State store settings.
    #[serde(default)]
    pub store: StoreSection,
    /// Report output settings.
    #[serde(default)]
    pub output: OutputSection,
    /// Audit logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
    /// Executor adapter settings.
    pub executor: ExecutorSection,
    /// Query catalog.
    #[serde(default)]
    pub queries: Vec<QueryConfig>,
}

impl ParityConfig {
    /// Loads configuration from disk.
    ///
    /// The path resolves from the argument, then `PARITY_CONFIG`, then
    /// `parity.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, parsing, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(invalid("config file exceeds size limit"));
        }
        let content =
            std::str::from_utf8(&bytes).map_err(|_| invalid("config file must be utf-8"))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(invalid("config file exceeds size limit"));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section and the query catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a single violation and
    /// [`ConfigError::Violations`] listing every violation otherwise.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut violations = Violations::default();
        self.engine.validate(&mut violations);
        self.store.validate(&mut violations);
        violations.check(self.output.validate());
        violations.check(self.logging.validate());
        self.executor.validate(&mut violations);
        self.validate_queries(&mut violations);
        self.validate_lease_window(&mut violations);
        violations.into_result()
    }

    /// Validates the query catalog.
    fn validate_queries(&self, violations: &mut Violations) {
        if self.queries.is_empty() {
            violations.push("config must declare at least one query");
            return;
        }
        if self.queries.len() > MAX_QUERIES {
            violations.push(format!("config declares more than {MAX_QUERIES} queries"));
            return;
        }
        let mut entries = Violations::default();
        let mut seen = BTreeSet::new();
        for query in &self.queries {
            entries.check(query.validate());
            if !seen.insert(query.id.as_str()) {
                entries.push(format!("duplicate query id: {}", query.id));
            }
        }
        for query in &self.queries {
            for dependency in &query.dependencies {
                if !seen.contains(dependency.as_str()) {
                    entries.push(format!(
                        "query {} depends on unknown query {dependency}",
                        query.id
                    ));
                }
            }
        }
        // Cycle detection only makes sense over well-formed entries.
        if entries.is_empty() {
            let catalog = validate_catalog(&self.to_definitions());
            entries.check(catalog.map(|_| ()).map_err(|err| invalid(err.to_string())));
        }
        violations.0.extend(entries.0);
    }

    /// Ensures the lease outlives the longest gap between two commits.
    ///
    /// The engine commits when an attempt starts, so one attempt plus the
    /// largest backoff delay must fit inside `store.lock_ttl_ms`.
    fn validate_lease_window(&self, violations: &mut Violations) {
        if self.store.lock_ttl_ms == 0 {
            return;
        }
        for query in &self.queries {
            let window = query.timeout_ms.saturating_add(self.engine.backoff_max_ms);
            if window >= self.store.lock_ttl_ms {
                violations.push(format!(
                    "store.lock_ttl_ms ({}) must exceed query {} timeout_ms plus \
                     engine.backoff_max_ms ({window})",
                    self.store.lock_ttl_ms, query.id
                ));
            }
        }
    }

    /// Converts the catalog into core query definitions.
    #[must_use]
    pub fn to_definitions(&self) -> Vec<QueryDefinition> {
        self.queries.iter().map(QueryConfig::to_definition).collect()
    }

    /// Builds the engine configuration.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig {
            retry: RetryPolicy {
                base_delay_ms: self.engine.backoff_base_ms,
                max_delay_ms: self.engine.backoff_max_ms,
            },
            max_commit_attempts: self.engine.max_commit_attempts,
            commit_retry_delay_ms: self.engine.commit_retry_delay_ms,
            lock_ttl_ms: self.store.lock_ttl_ms,
            sample_differences_limit: self.engine.sample_differences_limit,
            ..EngineConfig::default()
        };
        if let Some(holder) = &self.engine.holder {
            config.holder.clone_from(holder);
        }
        config
    }

    /// Builds the `SQLite` store configuration.
    #[must_use]
    pub fn store_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.store.path.clone(),
            busy_timeout_ms: self.store.busy_timeout_ms,
            journal_mode: self.store.journal_mode,
            sync_mode: self.store.sync_mode,
            max_versions: self.store.max_versions,
        }
    }
}

// ============================================================================
// SECTION: Engine Section
// ============================================================================

/// `[engine]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Attempts per state commit before the run aborts.
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,
    /// Delay between commit attempts (ms).
    #[serde(default = "default_commit_retry_delay_ms")]
    pub commit_retry_delay_ms: u64,
    /// Backoff delay after the first failed attempt (ms).
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Upper bound on any single backoff delay (ms).
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Cap on sample differences recorded per outcome.
    #[serde(default = "default_sample_differences_limit")]
    pub sample_differences_limit: usize,
    /// Optional lease holder identity override.
    #[serde(default)]
    pub holder: Option<String>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_commit_attempts: default_max_commit_attempts(),
            commit_retry_delay_ms: default_commit_retry_delay_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            sample_differences_limit: default_sample_differences_limit(),
            holder: None,
        }
    }
}

impl EngineSection {
    /// Validates engine tuning.
    fn validate(&self, violations: &mut Violations) {
        if self.max_commit_attempts == 0 {
            violations.push("engine.max_commit_attempts must be greater than zero");
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            violations.push("engine.backoff_base_ms must not exceed engine.backoff_max_ms");
        }
        if self.sample_differences_limit == 0 {
            violations.push("engine.sample_differences_limit must be greater than zero");
        }
        if let Some(holder) = &self.holder
            && holder.trim().is_empty()
        {
            violations.push("engine.holder must be non-empty when set");
        }
    }
}

/// Returns the default commit attempt limit.
const fn default_max_commit_attempts() -> u32 {
    DEFAULT_MAX_COMMIT_ATTEMPTS
}

/// Returns the default commit retry delay.
const fn default_commit_retry_delay_ms() -> u64 {
    DEFAULT_COMMIT_RETRY_DELAY_MS
}

/// Returns the default backoff base delay.
const fn default_backoff_base_ms() -> u64 {
    DEFAULT_BACKOFF_BASE_MS
}

/// Returns the default backoff cap.
const fn default_backoff_max_ms() -> u64 {
    DEFAULT_BACKOFF_MAX_MS
}

/// Returns the default sample difference cap.
const fn default_sample_differences_limit() -> usize {
    DEFAULT_SAMPLE_DIFFERENCES_LIMIT
}

// ============================================================================
// SECTION: Store Section
// ============================================================================

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Path to the `SQLite` state database.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Advisory lease duration (ms).
    #[serde(default = "default_lock_ttl_ms")]
    pub lock_ttl_ms: u64,
    /// Optional outcome history depth per query.
    #[serde(default)]
    pub max_versions: Option<u64>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            busy_timeout_ms: default_busy_timeout_ms(),
            lock_ttl_ms: default_lock_ttl_ms(),
            max_versions: None,
        }
    }
}

impl StoreSection {
    /// Validates store settings.
    fn validate(&self, violations: &mut Violations) {
        violations
            .check(validate_path(&self.path).map_err(|err| invalid(format!("store.path: {err}"))));
        if self.lock_ttl_ms == 0 {
            violations.push("store.lock_ttl_ms must be greater than zero");
        }
        if self.max_versions == Some(0) {
            violations.push("store.max_versions must be greater than zero");
        }
    }
}

/// Returns the default state database path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default lease duration.
const fn default_lock_ttl_ms() -> u64 {
    DEFAULT_LOCK_TTL_MS
}

// ============================================================================
// SECTION: Output Section
// ============================================================================

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// Root directory for reports.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Append outcomes to the hash-chained ledger.
    #[serde(default = "default_true")]
    pub ledger: bool,
    /// Write the run summary file.
    #[serde(default = "default_true")]
    pub summary: bool,
    /// Write per-query report artifacts.
    #[serde(default = "default_true")]
    pub artifacts: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            ledger: true,
            summary: true,
            artifacts: true,
        }
    }
}

impl OutputSection {
    /// Validates output settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path(&self.dir).map_err(|err| invalid(format!("output.dir: {err}")))
    }

    /// Returns the directory holding one ledger file per execution.
    #[must_use]
    pub fn ledger_dir(&self) -> PathBuf {
        self.dir.join("ledger")
    }
}

/// Returns the default output directory.
fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Returns `true` for serde defaults.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Logging Section
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Audit events are discarded.
    None,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Sink kind.
    #[serde(default)]
    pub sink: LogSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LoggingSection {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.sink, &self.path) {
            (LogSinkKind::File, None) => Err(invalid("logging.path is required for the file sink")),
            (LogSinkKind::File, Some(path)) => {
                validate_path(path).map_err(|err| invalid(format!("logging.path: {err}")))
            }
            (_, Some(_)) => Err(invalid("logging.path is only valid for the file sink")),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Executor Section
// ============================================================================

/// Executor adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    /// Run SQL against two `SQLite` database files.
    Sqlite,
    /// Read `<dir>/<query_id>.json` fixture files.
    JsonFixture,
}

/// `[executor]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorSection {
    /// Adapter kind.
    pub kind: ExecutorKind,
    /// Source database file or fixture directory.
    pub source: PathBuf,
    /// Target database file or fixture directory.
    pub target: PathBuf,
}

impl ExecutorSection {
    /// Validates executor settings.
    fn validate(&self, violations: &mut Violations) {
        violations.check(
            validate_path(&self.source).map_err(|err| invalid(format!("executor.source: {err}"))),
        );
        violations.check(
            validate_path(&self.target).map_err(|err| invalid(format!("executor.target: {err}"))),
        );
    }
}

// ============================================================================
// SECTION: Query Config
// ============================================================================

/// One `[[queries]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Unique query identifier.
    pub id: String,
    /// Display name (defaults to the id).
    #[serde(default)]
    pub name: Option<String>,
    /// Query category.
    pub category: QueryCategory,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: Priority,
    /// SQL executed against both sides.
    pub sql: String,
    /// Comparison strategy.
    pub strategy: ComparisonStrategy,
    /// Absolute numeric tolerance.
    #[serde(default)]
    pub tolerance: f64,
    /// Key columns identifying a row.
    #[serde(default)]
    pub key_columns: Vec<String>,
    /// Columns excluded from equality checks.
    #[serde(default)]
    pub ignore_columns: Vec<String>,
    /// Row-diff sample size.
    #[serde(default)]
    pub sample_size: Option<u64>,
    /// Forces a full comparison even when a sample matches.
    #[serde(default = "default_true")]
    pub full_validation: bool,
    /// Materialization timeout (ms).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum attempts for retryable failures.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Queries that must succeed first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Whether a failure blocks the migration.
    #[serde(default = "default_true")]
    pub required_for_migration: bool,
}

impl QueryConfig {
    /// Validates constraints that belong to the config surface.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(invalid("query id must be non-empty"));
        }
        if self.id.len() > MAX_QUERY_ID_LENGTH {
            return Err(invalid(format!("query id exceeds {MAX_QUERY_ID_LENGTH} characters")));
        }
        if !self.id.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.')) {
            return Err(invalid(format!("query {}: id must be [A-Za-z0-9_.-]", self.id)));
        }
        if !is_read_only_sql(&self.sql) {
            return Err(invalid(format!("query {}: sql must start with SELECT or WITH", self.id)));
        }
        self.to_definition().validate().map_err(|err| invalid(err.to_string()))
    }

    /// Converts the entry into a core definition.
    #[must_use]
    pub fn to_definition(&self) -> QueryDefinition {
        QueryDefinition {
            id: QueryId::new(self.id.clone()),
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            category: self.category,
            priority: self.priority,
            sql: self.sql.clone(),
            strategy: self.strategy,
            params: ComparisonParams {
                tolerance: self.tolerance,
                key_columns: self.key_columns.clone(),
                ignore_columns: self.ignore_columns.clone(),
                sample_size: self.sample_size,
                full_validation: self.full_validation,
            },
            timeout_ms: self.timeout_ms,
            max_attempts: self.max_attempts,
            dependencies: self.dependencies.iter().map(|dep| QueryId::new(dep.clone())).collect(),
            required_for_migration: self.required_for_migration,
        }
    }
}

/// Returns the default materialization timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Returns the default attempt limit.
const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Returns true when the statement opens with `SELECT` or `WITH`.
fn is_read_only_sql(sql: &str) -> bool {
    let keyword: String =
        sql.trim_start().chars().take_while(char::is_ascii_alphabetic).collect();
    keyword.eq_ignore_ascii_case("select") || keyword.eq_ignore_ascii_case("with")
}

// ============================================================================
// SECTION: Path Helpers
// ============================================================================

/// Resolves the config path from the argument, environment, or default.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(env_path);
    }
    PathBuf::from(DEFAULT_CONFIG_NAME)
}

/// Validates a config-related path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(invalid("config path must not be empty"));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(invalid("config path exceeds max length"));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(invalid("config path component too long"));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::is_read_only_sql;

    #[test]
    fn read_only_sql_detection_is_keyword_based() {
        assert!(is_read_only_sql("  select 1"));
        assert!(is_read_only_sql("WITH t AS (SELECT 1) SELECT * FROM t"));
        assert!(!is_read_only_sql("SELECTED"));
        assert!(!is_read_only_sql("DELETE FROM orders"));
        assert!(!is_read_only_sql(""));
    }
}
