// crates/parity-core/src/runtime/comparator.rs
// ============================================================================
// Module: Parity Comparator Logic
// Description: Dataset comparison strategies (exact, tolerance, row diff).
// Purpose: Judge whether a source and target dataset agree under a strategy.
// Dependencies: crate::core, bigdecimal, serde_json
// ============================================================================

//! ## Overview
//! Comparators are a closed set selected by the query's strategy tag. All
//! strategies share one streaming engine:
//! - With key columns, both sides are read in key order and merged; rows are
//!   classified as matching, differing, source-only, or target-only.
//! - Without key columns (exact match and tolerance only), rows are paired by
//!   ordinal and surplus rows count as the row-count delta.
//!
//! Only one row per side is buffered. Keyed streams that go backwards are
//! rejected rather than silently mis-merged. Numeric cells compare as exact
//! decimals; the tolerance strategy accepts absolute differences up to the
//! declared tolerance. Ignored columns never count toward discrepancies but
//! are still reported as informational differences.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use bigdecimal::ToPrimitive;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::ColumnStats;
use crate::core::ComparisonResult;
use crate::core::ComparisonStrategy;
use crate::core::Dataset;
use crate::core::DatasetError;
use crate::core::FailureKind;
use crate::core::QueryDefinition;
use crate::core::Row;
use crate::core::RowOrder;
use crate::core::RowStream;
use crate::core::SampleDifference;
use crate::core::dataset::compare_keys;
use crate::core::dataset::number_to_decimal;
use crate::core::dataset::render_key;
use crate::core::dataset::values_equal;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default cap on reported sample differences.
pub const DEFAULT_SAMPLE_DIFFERENCES_LIMIT: usize = 10;
/// Column label used for whole-row differences.
const ROW_COLUMN_LABEL: &str = "*";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Comparator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComparatorError {
    /// Row diff requested without key columns.
    #[error("row_diff requires at least one key column")]
    MissingKeyColumns,
    /// Key column missing from one side.
    #[error("key column {column} not found in {side} dataset")]
    UnknownKeyColumn {
        /// Missing column name.
        column: String,
        /// Side lacking the column.
        side: &'static str,
    },
    /// Tolerance cannot be represented as a decimal.
    #[error("invalid tolerance: {0}")]
    InvalidTolerance(String),
    /// Keyed stream was not in ascending key order.
    #[error("{side} stream is not sorted by key (row {row})")]
    UnsortedStream {
        /// Side producing the out-of-order row.
        side: &'static str,
        /// One-based row number of the out-of-order row.
        row: u64,
    },
    /// Dataset failed while streaming.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

impl ComparatorError {
    /// Returns the outcome failure kind for this error.
    #[must_use]
    pub const fn failure_kind(&self) -> FailureKind {
        match self {
            Self::MissingKeyColumns | Self::UnknownKeyColumn { .. } | Self::InvalidTolerance(_) => {
                FailureKind::Query
            }
            Self::UnsortedStream { .. } | Self::Dataset(_) => FailureKind::Comparison,
        }
    }
}

// ============================================================================
// SECTION: Comparator
// ============================================================================

/// Closed set of comparison strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparator {
    /// Value-identical comparison.
    ExactMatch,
    /// Numeric differences up to `tolerance` are accepted.
    Tolerance {
        /// Absolute tolerance.
        tolerance: BigDecimal,
    },
    /// Keyed row diff with optional key-prefix sampling.
    RowDiff {
        /// Number of leading keys evaluated first.
        sample_size: Option<u64>,
        /// Always compare the full dataset.
        full_validation: bool,
    },
}

/// Column-level settings shared by all strategies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompareSettings {
    /// Key columns; empty selects ordinal pairing.
    pub key_columns: Vec<String>,
    /// Columns excluded from equality.
    pub ignore_columns: Vec<String>,
    /// Cap on reported sample differences.
    pub sample_differences_limit: usize,
}

impl Comparator {
    /// Builds the comparator declared by a query definition.
    ///
    /// # Errors
    ///
    /// Returns [`ComparatorError`] when the declared parameters are unusable.
    pub fn for_query(query: &QueryDefinition) -> Result<Self, ComparatorError> {
        match query.strategy {
            ComparisonStrategy::ExactMatch => Ok(Self::ExactMatch),
            ComparisonStrategy::Tolerance => {
                let tolerance = decimal_from_f64(query.params.tolerance)?;
                Ok(Self::Tolerance {
                    tolerance,
                })
            }
            ComparisonStrategy::RowDiff => {
                if query.params.key_columns.is_empty() {
                    return Err(ComparatorError::MissingKeyColumns);
                }
                Ok(Self::RowDiff {
                    sample_size: query.params.sample_size,
                    full_validation: query.params.full_validation,
                })
            }
        }
    }

    /// Compares two datasets.
    ///
    /// # Errors
    ///
    /// Returns [`ComparatorError`] when key columns are missing, a keyed
    /// stream is unsorted, or a dataset fails mid-stream.
    pub fn compare(
        &self,
        source: &dyn Dataset,
        target: &dyn Dataset,
        settings: &CompareSettings,
    ) -> Result<ComparisonResult, ComparatorError> {
        let layout = ColumnLayout::resolve(source, target, settings)?;
        let tolerance = match self {
            Self::Tolerance {
                tolerance,
            } => Some(tolerance),
            Self::ExactMatch | Self::RowDiff { .. } => None,
        };
        let mut result = match self {
            Self::RowDiff {
                sample_size: Some(sample_size),
                full_validation: false,
            } => {
                let limit = Some(*sample_size);
                let sample = compare_pass(source, target, &layout, settings, tolerance, limit)?;
                finish_sampled(sample, source, target, *sample_size)
            }
            Self::ExactMatch | Self::Tolerance { .. } | Self::RowDiff { .. } => {
                compare_pass(source, target, &layout, settings, tolerance, None)?.finish()
            }
        };
        layout.apply_schema_findings(&mut result);
        append_notes(&mut result, source, target);
        Ok(result)
    }
}

/// Compares two datasets using the strategy declared by the query.
///
/// # Errors
///
/// Returns [`ComparatorError`] when the comparison cannot be evaluated.
pub fn compare_datasets(
    query: &QueryDefinition,
    source: &dyn Dataset,
    target: &dyn Dataset,
    sample_differences_limit: usize,
) -> Result<ComparisonResult, ComparatorError> {
    let comparator = Comparator::for_query(query)?;
    let settings = CompareSettings {
        key_columns: query.params.key_columns.clone(),
        ignore_columns: query.params.ignore_columns.clone(),
        sample_differences_limit,
    };
    comparator.compare(source, target, &settings)
}

/// Parses a tolerance into an exact decimal via its shortest rendering.
fn decimal_from_f64(value: f64) -> Result<BigDecimal, ComparatorError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ComparatorError::InvalidTolerance(value.to_string()));
    }
    BigDecimal::from_str(&value.to_string())
        .map_err(|err| ComparatorError::InvalidTolerance(err.to_string()))
}

// ============================================================================
// SECTION: Column Layout
// ============================================================================

/// A column compared on both sides.
#[derive(Debug)]
struct ColumnPair {
    /// Column name.
    name: String,
    /// Index in the source row.
    source: usize,
    /// Index in the target row.
    target: usize,
    /// Ignored columns are informational only.
    ignored: bool,
}

/// Resolved column alignment between the two datasets.
#[derive(Debug)]
struct ColumnLayout {
    /// Key column indices in the source rows.
    source_keys: Vec<usize>,
    /// Key column indices in the target rows.
    target_keys: Vec<usize>,
    /// Non-key columns present on both sides.
    pairs: Vec<ColumnPair>,
    /// Columns present only in the source.
    source_only_columns: Vec<String>,
    /// Columns present only in the target.
    target_only_columns: Vec<String>,
    /// Columns excluded from equality.
    ignore_columns: Vec<String>,
    /// Source column names in schema order.
    source_names: Vec<String>,
    /// Target column names in schema order.
    target_names: Vec<String>,
}

impl ColumnLayout {
    /// Aligns source and target columns by name.
    fn resolve(
        source: &dyn Dataset,
        target: &dyn Dataset,
        settings: &CompareSettings,
    ) -> Result<Self, ComparatorError> {
        let mut source_keys = Vec::with_capacity(settings.key_columns.len());
        let mut target_keys = Vec::with_capacity(settings.key_columns.len());
        for key in &settings.key_columns {
            let source_index =
                source.column_index(key).ok_or_else(|| ComparatorError::UnknownKeyColumn {
                    column: key.clone(),
                    side: "source",
                })?;
            let target_index =
                target.column_index(key).ok_or_else(|| ComparatorError::UnknownKeyColumn {
                    column: key.clone(),
                    side: "target",
                })?;
            source_keys.push(source_index);
            target_keys.push(target_index);
        }

        let mut pairs = Vec::new();
        let mut source_only_columns = Vec::new();
        for (source_index, column) in source.columns().iter().enumerate() {
            if settings.key_columns.contains(&column.name) {
                continue;
            }
            match target.column_index(&column.name) {
                Some(target_index) => pairs.push(ColumnPair {
                    name: column.name.clone(),
                    source: source_index,
                    target: target_index,
                    ignored: settings.ignore_columns.contains(&column.name),
                }),
                None => source_only_columns.push(column.name.clone()),
            }
        }
        let target_only_columns = target
            .columns()
            .iter()
            .filter(|column| source.column_index(&column.name).is_none())
            .map(|column| column.name.clone())
            .collect();
        let source_names = source.columns().iter().map(|column| column.name.clone()).collect();
        let target_names = target.columns().iter().map(|column| column.name.clone()).collect();
        Ok(Self {
            source_keys,
            target_keys,
            pairs,
            source_only_columns,
            target_only_columns,
            ignore_columns: settings.ignore_columns.clone(),
            source_names,
            target_names,
        })
    }

    /// Returns true when rows are merged by key.
    const fn keyed(&self) -> bool {
        !self.source_keys.is_empty()
    }

    /// Records one discrepancy per unmatched, non-ignored column.
    fn apply_schema_findings(&self, result: &mut ComparisonResult) {
        let counted = |name: &&String| !self.ignore_columns.contains(*name);
        let mismatched = self.source_only_columns.iter().filter(counted).count()
            + self.target_only_columns.iter().filter(counted).count();
        if mismatched > 0 {
            result.discrepancy_count += mismatched as u64;
            result.matched = false;
        }
        if !self.source_only_columns.is_empty() {
            result.notes.push(format!(
                "Columns missing in target: {}",
                self.source_only_columns.join(", ")
            ));
        }
        if !self.target_only_columns.is_empty() {
            result.notes.push(format!(
                "Extra columns in target: {}",
                self.target_only_columns.join(", ")
            ));
        }
    }
}

// ============================================================================
// SECTION: Streaming Cursors
// ============================================================================

/// One side of a comparison with a single-row lookahead.
struct SideCursor<'a> {
    /// Underlying stream.
    stream: Box<dyn RowStream + 'a>,
    /// Key indices into the row (empty for ordinal pairing).
    key_indices: &'a [usize],
    /// Current row and its key.
    current: Option<(Vec<Value>, Row)>,
    /// Side label for errors.
    side: &'static str,
    /// Rows read so far.
    rows_read: u64,
}

impl<'a> SideCursor<'a> {
    /// Opens a cursor and reads the first row.
    fn open(
        dataset: &'a dyn Dataset,
        key_names: &[String],
        key_indices: &'a [usize],
        side: &'static str,
    ) -> Result<Self, ComparatorError> {
        let order = if key_names.is_empty() {
            RowOrder::Natural
        } else {
            RowOrder::ByKey(key_names.to_vec())
        };
        let mut cursor = Self {
            stream: dataset.rows(&order)?,
            key_indices,
            current: None,
            side,
            rows_read: 0,
        };
        cursor.advance()?;
        Ok(cursor)
    }

    /// Reads the next row, rejecting keys that go backwards.
    fn advance(&mut self) -> Result<(), ComparatorError> {
        let previous = self.current.take().map(|(key, _)| key);
        let Some(row) = self.stream.next_row()? else {
            return Ok(());
        };
        self.rows_read += 1;
        let key: Vec<Value> = self
            .key_indices
            .iter()
            .map(|index| row.get(*index).cloned().unwrap_or(Value::Null))
            .collect();
        if let Some(previous) = previous
            && compare_keys(&previous, &key) == Ordering::Greater
        {
            return Err(ComparatorError::UnsortedStream {
                side: self.side,
                row: self.rows_read,
            });
        }
        self.current = Some((key, row));
        Ok(())
    }
}

// ============================================================================
// SECTION: Comparison Pass
// ============================================================================

/// Running numeric statistics for one column.
#[derive(Debug, Default)]
struct StatsAccumulator {
    /// Differing values.
    count: u64,
    /// Differing values with a numeric difference.
    numeric: u64,
    /// Sum of absolute differences.
    sum: BigDecimal,
    /// Largest absolute difference.
    max: BigDecimal,
}

/// Mutable state for one comparison pass.
struct PassState<'a> {
    /// Column layout.
    layout: &'a ColumnLayout,
    /// Tolerance when the tolerance strategy is active.
    tolerance: Option<&'a BigDecimal>,
    /// Cap on reported sample differences.
    limit: usize,
    /// Accumulated result counters.
    result: ComparisonResult,
    /// Per-column accumulators.
    stats: BTreeMap<String, StatsAccumulator>,
    /// True when both streams were fully consumed.
    exhausted: bool,
}

impl PassState<'_> {
    /// Records a difference sample when the cap allows.
    fn push_sample(&mut self, sample: SampleDifference) {
        if self.result.sample_differences.len() < self.limit {
            self.result.sample_differences.push(sample);
        }
    }

    /// Records a row present only in the source.
    fn source_only(&mut self, row_key: String, row: &Row) {
        self.result.source_only += 1;
        let source_value = row_object(&self.layout.source_names, row);
        self.push_sample(SampleDifference {
            row_key,
            column: ROW_COLUMN_LABEL.to_string(),
            source_value,
            target_value: Value::Null,
            informational: false,
        });
    }

    /// Records a row present only in the target.
    fn target_only(&mut self, row_key: String, row: &Row) {
        self.result.target_only += 1;
        let target_value = row_object(&self.layout.target_names, row);
        self.push_sample(SampleDifference {
            row_key,
            column: ROW_COLUMN_LABEL.to_string(),
            source_value: Value::Null,
            target_value,
            informational: false,
        });
    }

    /// Compares a paired row and records matching or differing.
    fn paired(&mut self, row_key: &str, source: &Row, target: &Row) {
        let mut differs = false;
        let layout = self.layout;
        for pair in &layout.pairs {
            let left = source.get(pair.source).unwrap_or(&Value::Null);
            let right = target.get(pair.target).unwrap_or(&Value::Null);
            if values_equal(left, right) {
                continue;
            }
            let sample = SampleDifference {
                row_key: row_key.to_string(),
                column: pair.name.clone(),
                source_value: left.clone(),
                target_value: right.clone(),
                informational: pair.ignored,
            };
            if pair.ignored {
                self.push_sample(sample);
                continue;
            }
            let delta = numeric_delta(left, right);
            if let (Some(delta), Some(tolerance)) = (&delta, self.tolerance)
                && delta <= tolerance
            {
                continue;
            }
            differs = true;
            let entry = self.stats.entry(pair.name.clone()).or_default();
            entry.count += 1;
            if let Some(delta) = delta {
                entry.numeric += 1;
                entry.sum += delta.clone();
                if delta > entry.max {
                    entry.max = delta;
                }
            }
            self.push_sample(sample);
        }
        if differs {
            self.result.differing += 1;
        } else {
            self.result.matching += 1;
        }
    }

    /// Finalizes counters into a comparison result.
    fn finish(mut self) -> ComparisonResult {
        let result = &mut self.result;
        result.total_compared =
            result.matching + result.differing + result.source_only + result.target_only;
        result.discrepancy_count = result.differing + result.source_only + result.target_only;
        result.matched = result.discrepancy_count == 0;
        result.match_percentage = percentage(result.matching, result.total_compared);
        result.per_column_stats = self
            .stats
            .into_iter()
            .map(|(name, acc)| {
                let avg = if acc.numeric == 0 {
                    0.0
                } else {
                    (acc.sum / BigDecimal::from(acc.numeric)).to_f64().unwrap_or(0.0)
                };
                let stats = ColumnStats {
                    count: acc.count,
                    avg_abs_diff: avg,
                    max_abs_diff: acc.max.to_f64().unwrap_or(0.0),
                };
                (name, stats)
            })
            .collect();
        self.result
    }
}

/// Runs one merge (keyed) or zip (ordinal) pass over both datasets.
///
/// When `key_limit` is set the pass stops after that many distinct keys.
fn compare_pass<'a>(
    source: &'a dyn Dataset,
    target: &'a dyn Dataset,
    layout: &'a ColumnLayout,
    settings: &CompareSettings,
    tolerance: Option<&'a BigDecimal>,
    key_limit: Option<u64>,
) -> Result<PassState<'a>, ComparatorError> {
    let mut left = SideCursor::open(source, &settings.key_columns, &layout.source_keys, "source")?;
    let mut right = SideCursor::open(target, &settings.key_columns, &layout.target_keys, "target")?;
    let mut state = PassState {
        layout,
        tolerance,
        limit: settings.sample_differences_limit,
        result: ComparisonResult::default(),
        stats: BTreeMap::new(),
        exhausted: false,
    };
    let mut ordinal: u64 = 0;
    loop {
        if left.current.is_none() && right.current.is_none() {
            state.exhausted = true;
            break;
        }
        if key_limit.is_some_and(|limit| ordinal >= limit) {
            break;
        }
        let step = match (&left.current, &right.current) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((left_key, _)), Some((right_key, _))) => {
                if layout.keyed() {
                    compare_keys(left_key, right_key)
                } else {
                    Ordering::Equal
                }
            }
        };
        let row_key = |key: &[Value]| {
            if layout.keyed() { render_key(key) } else { format!("#{ordinal}") }
        };
        match step {
            Ordering::Less => {
                if let Some((key, row)) = &left.current {
                    state.source_only(row_key(key), row);
                }
                left.advance()?;
            }
            Ordering::Greater => {
                if let Some((key, row)) = &right.current {
                    state.target_only(row_key(key), row);
                }
                right.advance()?;
            }
            Ordering::Equal => {
                if let (Some((key, source_row)), Some((_, target_row))) =
                    (&left.current, &right.current)
                {
                    state.paired(&row_key(key), source_row, target_row);
                }
                left.advance()?;
                right.advance()?;
            }
        }
        ordinal += 1;
    }
    state.result.source_rows_read = left.rows_read;
    state.result.target_rows_read = right.rows_read;
    Ok(state)
}

/// Converts a sample pass into a provisional result.
fn finish_sampled(
    state: PassState<'_>,
    source: &dyn Dataset,
    target: &dyn Dataset,
    sample_size: u64,
) -> ComparisonResult {
    let exhausted = state.exhausted;
    let mut result = state.finish();
    if exhausted {
        return result;
    }
    result.provisional = true;
    let source_rows = source.row_count();
    let target_rows = target.row_count();
    if source_rows != target_rows {
        result.discrepancy_count += source_rows.abs_diff(target_rows);
        result.matched = false;
    }
    result.notes.push(format!(
        "Result derived from the first {sample_size} keys; enable full_validation for a complete \
         comparison"
    ));
    result
}

/// Appends human-readable recommendations to a result.
fn append_notes(result: &mut ComparisonResult, source: &dyn Dataset, target: &dyn Dataset) {
    let source_rows = source.row_count();
    let target_rows = target.row_count();
    if source_rows != target_rows {
        result.notes.push(format!(
            "Row count mismatch: source has {source_rows} rows, target has {target_rows}"
        ));
    }
    if result.differing > 0 {
        result.notes.push(format!(
            "{} rows differ in non-ignored columns; inspect sample differences",
            result.differing
        ));
    }
    if result.source_only > 0 || result.target_only > 0 {
        result.notes.push(format!(
            "{} rows missing in target, {} unexpected rows in target",
            result.source_only, result.target_only
        ));
    }
}

// ============================================================================
// SECTION: Numeric Helpers
// ============================================================================

/// Returns the absolute decimal difference between two numeric cells.
fn numeric_delta(left: &Value, right: &Value) -> Option<BigDecimal> {
    let (Value::Number(left), Value::Number(right)) = (left, right) else {
        return None;
    };
    let left = number_to_decimal(left)?;
    let right = number_to_decimal(right)?;
    Some((left - right).abs())
}

/// Returns `part / total` as a percentage; empty comparisons are 100%.
fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let ratio = BigDecimal::from(part) * BigDecimal::from(100) / BigDecimal::from(total);
    ratio.to_f64().unwrap_or(0.0)
}

/// Renders a whole row as a JSON object keyed by column name.
fn row_object(names: &[String], row: &Row) -> Value {
    let mut object = Map::new();
    for (name, value) in names.iter().zip(row.iter()) {
        object.insert(name.clone(), value.clone());
    }
    Value::Object(object)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use serde_json::json;

    use super::numeric_delta;
    use super::percentage;

    #[test]
    fn empty_comparison_is_full_match() {
        assert!((percentage(0, 0) - 100.0).abs() < f64::EPSILON);
        assert!((percentage(1, 4) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn numeric_delta_requires_two_numbers() {
        assert_eq!(numeric_delta(&json!("a"), &json!(1)), None);
        let delta = numeric_delta(&json!(100.0), &json!(100.004)).unwrap();
        assert_eq!(delta.to_string(), "0.004");
    }
}
