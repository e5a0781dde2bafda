// crates/parity-report/src/artifact.rs
// ============================================================================
// Module: Per-Query Report Artifacts
// Description: Writes one JSON report file per finished query.
// Purpose: Give reviewers a standalone document for each validation query.
// Dependencies: parity-core, serde, serde_json
// ============================================================================

//! ## Overview
//! [`FileArtifactSink`] renders a [`QueryReport`] for each terminal outcome
//! and writes it to `<output>/reports/<execution_id>/<query_id>.json`. The
//! returned [`ArtifactRef`] carries the file path and the hash of the bytes
//! written, so ledger entries pin the exact report content.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use parity_core::ArtifactError;
use parity_core::ArtifactRef;
use parity_core::ArtifactSink;
use parity_core::ComparisonResult;
use parity_core::ExecutionId;
use parity_core::ExecutionTimings;
use parity_core::OutcomeError;
use parity_core::OutcomeStatus;
use parity_core::QueryDefinition;
use parity_core::QueryOutcome;
use parity_core::SampleDifference;
use parity_core::Timestamp;
use parity_core::hashing::DEFAULT_HASH_ALGORITHM;
use parity_core::hashing::hash_bytes;
use serde::Deserialize;
use serde::Serialize;

use crate::summary::write_atomic;

// ============================================================================
// SECTION: Report Document
// ============================================================================

/// Static description of the validated query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInfo {
    /// Query identifier.
    pub query_id: String,
    /// Display name.
    pub name: String,
    /// Category label.
    pub category: String,
    /// Priority label.
    pub priority: String,
    /// Strategy label.
    pub strategy: String,
    /// Whether failure blocks migration.
    pub required_for_migration: bool,
    /// SQL executed on both sides.
    pub sql: String,
}

/// Execution details of the last attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDetails {
    /// Attempts used.
    pub attempts: u32,
    /// Start of the last attempt.
    pub started_at: Option<Timestamp>,
    /// End of the last attempt.
    pub ended_at: Option<Timestamp>,
    /// Elapsed ticks of the last attempt.
    pub duration_ms: Option<u64>,
    /// Per-phase timings.
    pub timings: Option<ExecutionTimings>,
}

/// Row counts on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSummary {
    /// Rows materialized from the source.
    pub source_rows: Option<u64>,
    /// Rows materialized from the target.
    pub target_rows: Option<u64>,
}

/// Headline validation verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// Final outcome status.
    pub status: OutcomeStatus,
    /// Whether the datasets matched, when a comparison ran.
    pub overall_match: Option<bool>,
    /// True when only a sample was compared.
    pub provisional: bool,
    /// Discrepancy count, when a comparison ran.
    pub discrepancy_count: Option<u64>,
    /// Match percentage, when a comparison ran.
    pub match_percentage: Option<f64>,
    /// Failure detail for failed or skipped queries.
    pub error: Option<OutcomeError>,
}

/// Per-query report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryReport {
    /// Execution identifier.
    pub execution_id: String,
    /// Query description.
    pub query: QueryInfo,
    /// Execution details.
    pub execution: ExecutionDetails,
    /// Row counts.
    pub data_summary: DataSummary,
    /// Verdict.
    pub validation_result: ValidationVerdict,
    /// Full comparison result, when a comparison ran.
    pub comparison: Option<ComparisonResult>,
    /// Bounded sample of differing cells.
    pub sample_differences: Vec<SampleDifference>,
    /// Operator-facing follow-up suggestions.
    pub recommendations: Vec<String>,
}

impl QueryReport {
    /// Builds a report for one query outcome.
    #[must_use]
    pub fn build(
        execution_id: &ExecutionId,
        query: &QueryDefinition,
        outcome: &QueryOutcome,
    ) -> Self {
        let result = outcome.result.as_ref();
        Self {
            execution_id: execution_id.to_string(),
            query: QueryInfo {
                query_id: query.id.to_string(),
                name: query.name.clone(),
                category: query.category.as_str().to_string(),
                priority: query.priority.as_str().to_string(),
                strategy: query.strategy.as_str().to_string(),
                required_for_migration: query.required_for_migration,
                sql: query.sql.clone(),
            },
            execution: ExecutionDetails {
                attempts: outcome.attempts,
                started_at: outcome.started_at,
                ended_at: outcome.ended_at,
                duration_ms: outcome.duration_ms,
                timings: outcome.timings,
            },
            data_summary: DataSummary {
                source_rows: outcome.source_rows,
                target_rows: outcome.target_rows,
            },
            validation_result: ValidationVerdict {
                status: outcome.status,
                overall_match: result.map(|result| result.matched),
                provisional: result.is_some_and(|result| result.provisional),
                discrepancy_count: result.map(|result| result.discrepancy_count),
                match_percentage: result.map(|result| result.match_percentage),
                error: outcome.error.clone(),
            },
            comparison: result.cloned(),
            sample_differences: result
                .map(|result| result.sample_differences.clone())
                .unwrap_or_default(),
            recommendations: recommendations(outcome),
        }
    }
}

/// Derives follow-up suggestions from an outcome.
#[must_use]
pub fn recommendations(outcome: &QueryOutcome) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(error) = &outcome.error {
        out.push(format!("Comparison failed ({}): {}", error.kind, error.message));
    }
    let Some(result) = &outcome.result else {
        return out;
    };
    out.extend(result.notes.iter().cloned());
    if result.source_only > 0 {
        out.push(format!(
            "{} row(s) present only in source: check for missing loads in target",
            result.source_only
        ));
    }
    if result.target_only > 0 {
        out.push(format!(
            "{} row(s) present only in target: check for duplicate or stray loads",
            result.target_only
        ));
    }
    if result.differing > 0 {
        let columns: Vec<&str> = result
            .per_column_stats
            .iter()
            .filter(|(_, stats)| stats.count > 0)
            .map(|(column, _)| column.as_str())
            .collect();
        if columns.is_empty() {
            out.push(format!("{} row(s) differ between source and target", result.differing));
        } else {
            out.push(format!(
                "{} row(s) differ between source and target; review columns: {}",
                result.differing,
                columns.join(", ")
            ));
        }
    }
    if result.provisional {
        out.push("Result is based on a sample; rerun with full validation to confirm".to_string());
    }
    out
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Artifact sink writing JSON reports under an output root.
pub struct FileArtifactSink {
    /// Output root directory.
    root: PathBuf,
}

impl FileArtifactSink {
    /// Creates an artifact sink under an output root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the report path for a query in an execution.
    #[must_use]
    pub fn report_path(&self, execution_id: &ExecutionId, query: &QueryDefinition) -> PathBuf {
        self.root
            .join("reports")
            .join(execution_id.as_str())
            .join(format!("{}.json", query.id))
    }
}

impl ArtifactSink for FileArtifactSink {
    fn export(
        &self,
        execution_id: &ExecutionId,
        query: &QueryDefinition,
        outcome: &QueryOutcome,
    ) -> Result<ArtifactRef, ArtifactError> {
        let report = QueryReport::build(execution_id, query, outcome);
        let bytes = serde_json::to_vec_pretty(&report)
            .map_err(|err| ArtifactError::Serialization(err.to_string()))?;
        let path = self.report_path(execution_id, query);
        write_atomic(&path, &bytes).map_err(|err| ArtifactError::Io(err.to_string()))?;
        Ok(ArtifactRef {
            uri: path.display().to_string(),
            content_hash: Some(hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes)),
        })
    }
}
