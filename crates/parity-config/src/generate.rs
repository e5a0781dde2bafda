// crates/parity-config/src/generate.rs
// ============================================================================
// Module: Catalog Generator
// Description: Builds a starter `[[queries]]` catalog from a list of tables.
// Purpose: Give operators a validated catalog to edit instead of a blank file.
// Dependencies: parity-core, serde, toml
// ============================================================================

//! ## Overview
//! [`generate_catalog`] emits up to three queries per table:
//!
//! | Query | Category | Strategy |
//! |---|---|---|
//! | `<table>_schema` | schema | exact match over `pragma_table_info` |
//! | `<table>_row_count` | volume | exact match over `COUNT(*)` |
//! | `<table>_content` | content | row diff over the first `sample_rows` keys |
//!
//! The content query needs key columns (`orders:id,region`); tables named
//! without keys get the schema and row-count checks only. Table and column
//! names are restricted to plain identifiers and quoted in the generated SQL.
//! [`render_catalog`] serializes the result as TOML that
//! [`crate::ParityConfig::from_toml_str`] accepts once an `[executor]`
//! section is added.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::str::FromStr;

use parity_core::ComparisonStrategy;
use parity_core::Priority;
use parity_core::QueryCategory;
use parity_core::query::DEFAULT_MAX_ATTEMPTS;
use serde::Serialize;

use crate::config::ConfigError;
use crate::config::QueryConfig;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default number of keyed rows compared by a generated content query.
pub const DEFAULT_SAMPLE_ROWS: u64 = 10_000;
/// Timeout for generated schema queries (ms).
const SCHEMA_TIMEOUT_MS: u64 = 60_000;
/// Timeout for generated row-count queries (ms).
const ROW_COUNT_TIMEOUT_MS: u64 = 300_000;
/// Timeout for generated content queries (ms).
const CONTENT_TIMEOUT_MS: u64 = 600_000;
/// Maximum length of a table or column identifier.
const MAX_IDENTIFIER_LENGTH: usize = 64;

// ============================================================================
// SECTION: Table Specs
// ============================================================================

/// A table named on the command line, with optional key columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Table name, optionally schema-qualified (`main.orders`).
    pub name: String,
    /// Key columns used by the content query.
    pub key_columns: Vec<String>,
}

impl TableSpec {
    /// Returns the query id prefix for this table.
    fn id_prefix(&self) -> String {
        self.name.to_ascii_lowercase().replace('.', "_")
    }

    /// Returns the table reference quoted for SQL.
    fn quoted(&self) -> String {
        self.name.split('.').map(quote_identifier).collect::<Vec<_>>().join(".")
    }
}

impl FromStr for TableSpec {
    type Err = ConfigError;

    /// Parses `table` or `table:key1,key2`.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (name, keys) = spec.split_once(':').unwrap_or((spec, ""));
        let name = name.trim();
        let mut parts = name.split('.');
        let valid_parts = parts.clone().count() <= 2 && parts.all(is_identifier);
        if !valid_parts {
            return Err(ConfigError::Invalid(format!("table {name:?} is not a plain identifier")));
        }
        let key_columns: Vec<String> = keys
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(ToString::to_string)
            .collect();
        if let Some(bad) = key_columns.iter().find(|key| !is_identifier(key)) {
            return Err(ConfigError::Invalid(format!(
                "table {name}: key column {bad:?} is not a plain identifier"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            key_columns,
        })
    }
}

/// Returns true for `[A-Za-z_][A-Za-z0-9_]*` within the length limit.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    name.len() <= MAX_IDENTIFIER_LENGTH
        && chars.next().is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Double-quotes an identifier.
fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Builds the query catalog for `tables`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when no tables are given, a table is
/// listed twice, or `sample_rows` is zero.
pub fn generate_catalog(
    tables: &[TableSpec],
    sample_rows: u64,
) -> Result<Vec<QueryConfig>, ConfigError> {
    if tables.is_empty() {
        return Err(ConfigError::Invalid("at least one table is required".to_string()));
    }
    if sample_rows == 0 {
        return Err(ConfigError::Invalid("sample rows must be greater than zero".to_string()));
    }
    let mut prefixes = BTreeSet::new();
    let mut queries = Vec::with_capacity(tables.len() * 3);
    for table in tables {
        let prefix = table.id_prefix();
        if !prefixes.insert(prefix.clone()) {
            return Err(ConfigError::Invalid(format!("table {} listed twice", table.name)));
        }
        queries.push(schema_query(table, &prefix));
        queries.push(row_count_query(table, &prefix));
        if !table.key_columns.is_empty() {
            queries.push(content_query(table, &prefix, sample_rows));
        }
    }
    Ok(queries)
}

/// Column layout check through `pragma_table_info`.
fn schema_query(table: &TableSpec, prefix: &str) -> QueryConfig {
    let arguments = match table.name.split_once('.') {
        Some((schema, name)) => format!("'{name}', '{schema}'"),
        None => format!("'{}'", table.name),
    };
    let sql = format!(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info({arguments}) \
         ORDER BY cid"
    );
    base_query(format!("{prefix}_schema"), format!("{} schema", table.name), sql)
        .with_shape(QueryCategory::Schema, Priority::High, SCHEMA_TIMEOUT_MS, true)
}

/// Total row count check.
fn row_count_query(table: &TableSpec, prefix: &str) -> QueryConfig {
    let sql = format!("SELECT COUNT(*) AS row_count FROM {}", table.quoted());
    base_query(format!("{prefix}_row_count"), format!("{} row count", table.name), sql)
        .with_shape(QueryCategory::Volume, Priority::High, ROW_COUNT_TIMEOUT_MS, true)
}

/// Keyed content check over the first `sample_rows` keys.
fn content_query(table: &TableSpec, prefix: &str, sample_rows: u64) -> QueryConfig {
    let ordering: Vec<String> =
        table.key_columns.iter().map(|key| quote_identifier(key)).collect();
    let sql = format!(
        "SELECT * FROM {} ORDER BY {} LIMIT {sample_rows}",
        table.quoted(),
        ordering.join(", ")
    );
    let mut query =
        base_query(format!("{prefix}_content"), format!("{} content", table.name), sql)
            .with_shape(QueryCategory::Content, Priority::Medium, CONTENT_TIMEOUT_MS, false);
    query.strategy = ComparisonStrategy::RowDiff;
    query.key_columns.clone_from(&table.key_columns);
    query
}

/// Exact-match entry with default parameters.
fn base_query(id: String, name: String, sql: String) -> QueryConfig {
    QueryConfig {
        id,
        name: Some(name),
        category: QueryCategory::Content,
        priority: Priority::Medium,
        sql,
        strategy: ComparisonStrategy::ExactMatch,
        tolerance: 0.0,
        key_columns: Vec::new(),
        ignore_columns: Vec::new(),
        sample_size: None,
        full_validation: true,
        timeout_ms: CONTENT_TIMEOUT_MS,
        max_attempts: DEFAULT_MAX_ATTEMPTS,
        dependencies: Vec::new(),
        required_for_migration: true,
    }
}

impl QueryConfig {
    /// Sets the scheduling shape of a generated entry.
    fn with_shape(
        mut self,
        category: QueryCategory,
        priority: Priority,
        timeout_ms: u64,
        required_for_migration: bool,
    ) -> Self {
        self.category = category;
        self.priority = priority;
        self.timeout_ms = timeout_ms;
        self.required_for_migration = required_for_migration;
        self
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Serialized catalog document.
#[derive(Serialize)]
struct CatalogDocument<'a> {
    /// Generated entries.
    queries: &'a [QueryConfig],
}

/// Renders queries as `[[queries]]` TOML tables.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] when TOML serialization fails.
pub fn render_catalog(queries: &[QueryConfig]) -> Result<String, ConfigError> {
    toml::to_string(&CatalogDocument {
        queries,
    })
    .map_err(|err| ConfigError::Parse(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::TableSpec;
    use super::is_identifier;

    #[test]
    fn table_specs_parse_keys() {
        let spec: TableSpec = "main.orders:id, region".parse().unwrap();
        assert_eq!(spec.name, "main.orders");
        assert_eq!(spec.key_columns, vec!["id".to_string(), "region".to_string()]);
        assert_eq!(spec.id_prefix(), "main_orders");
        assert_eq!(spec.quoted(), "\"main\".\"orders\"");

        let bare: TableSpec = "Customers".parse().unwrap();
        assert!(bare.key_columns.is_empty());
    }

    #[test]
    fn identifiers_reject_sql() {
        assert!(is_identifier("_orders2"));
        assert!(!is_identifier("2orders"));
        assert!(!is_identifier("orders; DROP TABLE x"));
        assert!("a.b.c".parse::<TableSpec>().is_err());
        assert!("orders:id)".parse::<TableSpec>().is_err());
    }
}
