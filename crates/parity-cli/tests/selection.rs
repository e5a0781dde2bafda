// crates/parity-cli/tests/selection.rs
// ============================================================================
// Module: Query Selection Tests
// Description: Parsing tests for the `--queries` subset argument.
// Purpose: Ensure subsets are trimmed, de-duplicated, and fail closed.
// Dependencies: parity-cli, parity-core
// ============================================================================

//! ## Overview
//! Exercises [`parity_cli::parse_query_list`].

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use parity_cli::parse_query_list;
use parity_core::QueryId;

/// Tests entries are trimmed and keep first-seen order.
#[test]
fn trims_and_deduplicates() {
    let ids = parse_query_list(" b, a ,b,c").unwrap();
    assert_eq!(ids, vec![QueryId::new("b"), QueryId::new("a"), QueryId::new("c")]);
}

/// Tests a single id parses.
#[test]
fn single_id() {
    assert_eq!(parse_query_list("orders").unwrap(), vec![QueryId::new("orders")]);
}

/// Tests empty lists and empty entries are rejected.
#[test]
fn rejects_empty_entries() {
    assert!(parse_query_list("").is_err());
    assert!(parse_query_list("  ").is_err());
    let err = parse_query_list("a,,b").unwrap_err();
    assert!(err.contains("entry 2"), "{err}");
    assert!(parse_query_list("a,").is_err());
}
