// crates/parity-providers/src/fixture.rs
// ============================================================================
// Module: JSON Fixture Executor
// Description: Executor adapter reading pre-materialized JSON result sets.
// Purpose: Drive the engine from files for dry runs, demos, and tests.
// Dependencies: parity-core, serde, serde_json, tokio
// ============================================================================

//! ## Overview
//! [`JsonFixtureExecutor`] resolves `<dir>/<query_id>.json` under the source
//! or target directory and parses a JSON array of row objects. The query SQL
//! is not executed. Files are size-limited and query identifiers containing
//! path separators are rejected before any filesystem access.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use parity_core::Dataset;
use parity_core::ExecutorError;
use parity_core::MaterializedDataset;
use parity_core::QueryDefinition;
use parity_core::QueryExecutor;
use parity_core::TargetSide;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default maximum fixture file size in bytes.
const DEFAULT_MAX_FILE_BYTES: u64 = 64 * 1024 * 1024;

/// Configuration for the JSON fixture executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonFixtureConfig {
    /// Directory holding source fixtures.
    pub source_dir: PathBuf,
    /// Directory holding target fixtures.
    pub target_dir: PathBuf,
    /// Maximum fixture file size in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl JsonFixtureConfig {
    /// Creates a config with the default size limit.
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Returns the default fixture size limit.
const fn default_max_file_bytes() -> u64 {
    DEFAULT_MAX_FILE_BYTES
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Executor adapter reading JSON fixtures from two directories.
#[derive(Debug, Clone)]
pub struct JsonFixtureExecutor {
    /// Executor configuration.
    config: JsonFixtureConfig,
}

impl JsonFixtureExecutor {
    /// Creates a fixture executor.
    #[must_use]
    pub const fn new(config: JsonFixtureConfig) -> Self {
        Self {
            config,
        }
    }

    /// Resolves the fixture path for a query and side.
    fn fixture_path(
        &self,
        query: &QueryDefinition,
        side: TargetSide,
    ) -> Result<PathBuf, ExecutorError> {
        let id = query.id.as_str();
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(ExecutorError::query(side, format!("invalid fixture name: {id}")));
        }
        let dir = match side {
            TargetSide::Source => &self.config.source_dir,
            TargetSide::Target => &self.config.target_dir,
        };
        Ok(dir.join(format!("{id}.json")))
    }
}

#[async_trait]
impl QueryExecutor for JsonFixtureExecutor {
    async fn materialize(
        &self,
        query: &QueryDefinition,
        side: TargetSide,
    ) -> Result<Box<dyn Dataset>, ExecutorError> {
        let path = self.fixture_path(query, side)?;
        let metadata = tokio::fs::metadata(&path).await.map_err(|err| io_error(&err, side))?;
        if metadata.len() > self.config.max_file_bytes {
            return Err(ExecutorError::query(
                side,
                format!("fixture {} exceeds {} bytes", path.display(), self.config.max_file_bytes),
            ));
        }
        let bytes = tokio::fs::read(&path).await.map_err(|err| io_error(&err, side))?;
        let dataset = parse_fixture(&bytes).map_err(|message| {
            ExecutorError::query(side, format!("fixture {}: {message}", path.display()))
        })?;
        Ok(Box::new(dataset))
    }
}

/// Parses a JSON array of row objects.
fn parse_fixture(bytes: &[u8]) -> Result<MaterializedDataset, String> {
    let value: Value = serde_json::from_slice(bytes).map_err(|err| err.to_string())?;
    let Value::Array(items) = value else {
        return Err("expected a JSON array of row objects".to_string());
    };
    let mut records: Vec<Map<String, Value>> = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(record) = item else {
            return Err(format!("row {index} is not an object"));
        };
        records.push(record);
    }
    MaterializedDataset::from_records(records).map_err(|err| err.to_string())
}

/// Maps a filesystem error onto an executor failure class.
fn io_error(error: &std::io::Error, side: TargetSide) -> ExecutorError {
    match error.kind() {
        ErrorKind::NotFound => ExecutorError::query(side, format!("fixture not found: {error}")),
        ErrorKind::PermissionDenied => ExecutorError::permission(side, error.to_string()),
        _ => ExecutorError::connection(side, error.to_string()),
    }
}
