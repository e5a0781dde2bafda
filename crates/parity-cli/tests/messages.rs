// crates/parity-cli/tests/messages.rs
// ============================================================================
// Module: CLI Message Catalog Tests
// Description: Exercises catalog lookup and placeholder substitution.
// Purpose: Ensure CLI output routes through stable message helpers.
// Dependencies: parity-cli messages module and the `t!` macro.
// ============================================================================

//! ## Overview
//! Validates message arguments, key fallback, and the
//! [`t!`](parity_cli::t) macro.

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

use parity_cli::messages::MessageArg;
use parity_cli::messages::translate;
use parity_cli::t;

/// Confirms message arguments capture key/value pairs.
#[test]
fn message_arg_new_captures_key_and_value() {
    let arg = MessageArg::new("path", "/tmp/ledger.jsonl");
    assert_eq!(arg.key, "path");
    assert_eq!(arg.value, "/tmp/ledger.jsonl");
}

/// Confirms catalog entries resolve and replace placeholders.
#[test]
fn translate_substitutes_placeholders() {
    let args = vec![MessageArg::new("execution_id", "exec-9")];
    let result = translate("status.not_found", args);
    assert_eq!(result, "Execution not found: exec-9");
}

/// Confirms missing keys fall back to the key string.
#[test]
fn translate_falls_back_to_key() {
    assert_eq!(translate("missing.key", Vec::new()), "missing.key");
}

/// Confirms the t! macro formats named arguments.
#[test]
fn t_macro_formats_message() {
    let rendered = t!("run.header", execution_id = "exec-1", status = "COMPLETED");
    assert_eq!(rendered, "Execution exec-1: COMPLETED");
}
