// crates/parity-core/src/core/dataset.rs
// ============================================================================
// Module: Parity Datasets
// Description: Sequential-read dataset abstraction and canonical value ordering.
// Purpose: Let comparators stream materialized result sets without loading both sides.
// Dependencies: bigdecimal, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Dataset`] is a materialized result set exposed through a sequential
//! [`RowStream`]. Streams can be requested in natural order or ordered by key
//! columns; keyed streams must follow [`compare_keys`] so comparators can run
//! a sort-merge with a bounded buffer per side.
//!
//! Cells are JSON values. Numbers compare as exact decimals so `100.0` and
//! `100` order (and match) identically across backends.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One row of cells in column order.
pub type Row = Vec<Value>;

/// Logical column type reported by an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Integer values.
    Integer,
    /// Decimal or floating-point values.
    Decimal,
    /// Text values.
    Text,
    /// Boolean values.
    Boolean,
    /// Nested JSON values.
    Json,
    /// Type could not be determined.
    Unknown,
}

impl ColumnType {
    /// Infers the column type of a single cell.
    #[must_use]
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Unknown,
            Value::Bool(_) => Self::Boolean,
            Value::Number(number) => {
                if number.is_f64() {
                    Self::Decimal
                } else {
                    Self::Integer
                }
            }
            Value::String(_) => Self::Text,
            Value::Array(_) | Value::Object(_) => Self::Json,
        }
    }
}

/// Column name and type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Column type.
    pub data_type: ColumnType,
}

impl ColumnSchema {
    /// Creates a column schema entry.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Requested row order for a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOrder {
    /// Order produced by the backend.
    Natural,
    /// Ascending by the listed key columns under [`compare_keys`].
    ByKey(Vec<String>),
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Dataset access errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    /// A requested column does not exist.
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    /// Row width does not match the schema.
    #[error("dataset shape error: {0}")]
    Shape(String),
    /// Backend failed while reading rows.
    #[error("dataset read error: {0}")]
    Read(String),
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Sequential reader over dataset rows.
pub trait RowStream {
    /// Returns the next row, or `None` when exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] when the backend fails mid-stream.
    fn next_row(&mut self) -> Result<Option<Row>, DatasetError>;
}

/// Materialized result set exposed for sequential reads.
pub trait Dataset: Send + Sync {
    /// Returns the column schema.
    fn columns(&self) -> &[ColumnSchema];

    /// Returns the number of rows.
    fn row_count(&self) -> u64;

    /// Opens a sequential stream in the requested order.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::UnknownColumn`] when a key column is missing.
    fn rows(&self, order: &RowOrder) -> Result<Box<dyn RowStream + '_>, DatasetError>;

    /// Returns the index of a column by name.
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().iter().position(|column| column.name == name)
    }
}

// ============================================================================
// SECTION: Value Ordering
// ============================================================================

/// Returns the rank of a JSON value kind for cross-kind ordering.
const fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Parses a JSON number as an exact decimal.
#[must_use]
pub fn number_to_decimal(number: &Number) -> Option<BigDecimal> {
    BigDecimal::from_str(&number.to_string()).ok()
}

/// Compares two JSON numbers as exact decimals.
fn compare_numbers(left: &Number, right: &Number) -> Ordering {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        return a.cmp(&b);
    }
    match (number_to_decimal(left), number_to_decimal(right)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => left.to_string().cmp(&right.to_string()),
    }
}

/// Canonical total order over JSON cell values.
///
/// Nulls sort first, then booleans, numbers (by exact decimal value),
/// strings, arrays, and objects.
#[must_use]
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => compare_keys(a, b),
        (Value::Object(a), Value::Object(b)) => {
            let a: Vec<(&String, &Value)> = a.iter().collect();
            let b: Vec<(&String, &Value)> = b.iter().collect();
            for ((key_a, value_a), (key_b, value_b)) in a.iter().zip(b.iter()) {
                let ordering = key_a.cmp(key_b).then_with(|| compare_values(value_a, value_b));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.len().cmp(&b.len())
        }
        _ => kind_rank(left).cmp(&kind_rank(right)),
    }
}

/// Lexicographic order over composite keys.
#[must_use]
pub fn compare_keys(left: &[Value], right: &[Value]) -> Ordering {
    for (a, b) in left.iter().zip(right.iter()) {
        let ordering = compare_values(a, b);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.len().cmp(&right.len())
}

/// Returns true when two cells hold the same value under canonical ordering.
#[must_use]
pub fn values_equal(left: &Value, right: &Value) -> bool {
    compare_values(left, right) == Ordering::Equal
}

/// Renders a composite key for reports.
#[must_use]
pub fn render_key(key: &[Value]) -> String {
    key.iter()
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("|")
}

// ============================================================================
// SECTION: Materialized Dataset
// ============================================================================

/// Vector-backed dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterializedDataset {
    /// Column schema.
    columns: Vec<ColumnSchema>,
    /// Rows in natural order.
    rows: Vec<Row>,
}

impl MaterializedDataset {
    /// Creates a dataset from a schema and rows.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Shape`] when a row width differs from the schema.
    pub fn new(columns: Vec<ColumnSchema>, rows: Vec<Row>) -> Result<Self, DatasetError> {
        if let Some((index, row)) =
            rows.iter().enumerate().find(|(_, row)| row.len() != columns.len())
        {
            return Err(DatasetError::Shape(format!(
                "row {index} has {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self {
            columns,
            rows,
        })
    }

    /// Creates a dataset from JSON objects.
    ///
    /// Columns follow the first record's key order; column types are inferred
    /// from the first non-null value. Missing keys read as null.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Shape`] when a record introduces a new column.
    pub fn from_records(records: Vec<Map<String, Value>>) -> Result<Self, DatasetError> {
        let Some(first) = records.first() else {
            return Ok(Self::default());
        };
        let names: Vec<String> = first.keys().cloned().collect();
        let mut types: BTreeMap<&str, ColumnType> = BTreeMap::new();
        let mut rows = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if let Some(extra) = record.keys().find(|key| !names.contains(key)) {
                return Err(DatasetError::Shape(format!(
                    "record {index} has unexpected column {extra}"
                )));
            }
            let mut row = Vec::with_capacity(names.len());
            for name in &names {
                let value = record.get(name).cloned().unwrap_or(Value::Null);
                let inferred = ColumnType::of_value(&value);
                let entry = types.entry(name.as_str()).or_insert(ColumnType::Unknown);
                if *entry == ColumnType::Unknown
                    || (*entry == ColumnType::Integer && inferred == ColumnType::Decimal)
                {
                    *entry = inferred;
                }
                row.push(value);
            }
            rows.push(row);
        }
        let columns = names
            .iter()
            .map(|name| {
                let data_type = types.get(name.as_str()).copied().unwrap_or(ColumnType::Unknown);
                ColumnSchema::new(name.clone(), data_type)
            })
            .collect();
        Self::new(columns, rows)
    }
}

impl Dataset for MaterializedDataset {
    fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    fn row_count(&self) -> u64 {
        self.rows.len() as u64
    }

    fn rows(&self, order: &RowOrder) -> Result<Box<dyn RowStream + '_>, DatasetError> {
        let mut indices: Vec<usize> = (0 .. self.rows.len()).collect();
        if let RowOrder::ByKey(keys) = order {
            let key_indices = keys
                .iter()
                .map(|key| {
                    self.column_index(key).ok_or_else(|| DatasetError::UnknownColumn(key.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            indices.sort_by(|a, b| {
                let left = &self.rows[*a];
                let right = &self.rows[*b];
                key_indices
                    .iter()
                    .map(|index| compare_values(&left[*index], &right[*index]))
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        Ok(Box::new(IndexedRowStream {
            rows: &self.rows,
            indices,
            position: 0,
        }))
    }
}

/// Stream over a slice of rows following a precomputed index order.
struct IndexedRowStream<'a> {
    /// Backing rows.
    rows: &'a [Row],
    /// Row indices in stream order.
    indices: Vec<usize>,
    /// Next position in `indices`.
    position: usize,
}

impl RowStream for IndexedRowStream<'_> {
    fn next_row(&mut self) -> Result<Option<Row>, DatasetError> {
        let Some(index) = self.indices.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;
        Ok(self.rows.get(*index).cloned())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
