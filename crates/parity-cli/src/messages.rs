// crates/parity-cli/src/messages.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Message catalog and placeholder substitution for CLI output.
// Purpose: Centralize user-facing strings so output stays consistent.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! Every line the `parity` binary prints is looked up in a static catalog by
//! key and rendered through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself.
//! - Placeholder substitutions preserve argument order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
///
/// # Invariants
/// - `key` matches a placeholder name without braces (for example, `path`).
/// - `value` is preformatted and should be safe for display.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static catalog entries.
const CATALOG: &[(&str, &str)] = &[
    ("main.version", "parity {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("usage.invalid", "{error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid: {queries} queries."),
    ("config.invalid.header", "Config has {count} problems:"),
    ("config.invalid.entry", "  - {problem}"),
    ("config.generate.ok", "Wrote {queries} queries to {path}."),
    ("config.generate.failed", "Catalog generation failed: {error}"),
    ("config.generate.exists", "Refusing to overwrite existing file {path}."),
    ("config.generate.write_failed", "Failed to write {path}: {error}"),
    ("store.open_failed", "Failed to open state store at {path}: {error}"),
    ("store.read_failed", "Failed to read state store: {error}"),
    ("sink.open_failed", "Failed to open {sink}: {error}"),
    ("selection.invalid", "Invalid --queries value: {error}"),
    ("engine.failed", "Run failed: {error}"),
    ("engine.concurrent", "Another process holds execution {execution_id} ({holder})."),
    ("plan.header", "Dry run: {count} queries would execute in this order:"),
    ("plan.entry", "  {position}. {query_id}"),
    ("plan.entry.added", "  {position}. {query_id} (added as dependency)"),
    ("run.header", "Execution {execution_id}: {status}"),
    (
        "run.counts",
        "Queries: {total} total, {succeeded} succeeded, {failed} failed, {skipped} skipped, \
         {pending} pending ({rate}% success)",
    ),
    ("run.processed", "Finalized this pass: {processed}"),
    ("run.interrupted", "Interrupted. Resume with: parity resume --execution-id {execution_id}"),
    ("status.none", "No executions recorded."),
    ("status.header", "Execution {execution_id}: {status} (pass {pass}, cursor {cursor}/{total})"),
    ("status.entry", "  {query_id}: {status} after {attempts} attempt(s){detail}"),
    ("status.not_found", "Execution not found: {execution_id}"),
    ("ledger.verify.ok", "Ledger verified: {entries} entries, head {head}."),
    ("ledger.verify.empty", "Ledger verified: no entries."),
    ("ledger.verify.failed", "Ledger verification failed: {error}"),
];

/// Returns the message catalog.
pub(crate) fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    CATALOG_MAP.get_or_init(|| CATALOG.iter().copied().collect())
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Renders `key` from the catalog while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::messages::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::messages::translate($key, args)
    }};
}
