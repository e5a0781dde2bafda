// crates/parity-cli/src/selection.rs
// ============================================================================
// Module: Query Selection
// Description: Parses the `--queries` subset argument.
// Purpose: Turn a comma-separated list into validated query identifiers.
// Dependencies: parity-core
// ============================================================================

//! ## Overview
//! `--queries a,b,c` restricts a run to a subset of the catalog. Entries are
//! trimmed and de-duplicated in first-seen order. Unknown identifiers are
//! rejected later by the plan builder, which knows the catalog.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use parity_core::QueryId;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum number of ids accepted in one `--queries` argument.
pub const MAX_SELECTED_QUERIES: usize = 10_000;

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a comma-separated query id list.
///
/// # Errors
///
/// Returns a message when the list is empty, contains an empty entry, or
/// exceeds [`MAX_SELECTED_QUERIES`].
pub fn parse_query_list(raw: &str) -> Result<Vec<QueryId>, String> {
    if raw.trim().is_empty() {
        return Err("query list is empty".to_string());
    }
    let mut seen = BTreeSet::new();
    let mut ids = Vec::new();
    for (index, entry) in raw.split(',').enumerate() {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(format!("entry {} is empty", index + 1));
        }
        if seen.insert(entry) {
            ids.push(QueryId::new(entry));
        }
    }
    if ids.len() > MAX_SELECTED_QUERIES {
        return Err(format!("more than {MAX_SELECTED_QUERIES} queries selected"));
    }
    Ok(ids)
}
