// crates/parity-cli/src/lib.rs
// ============================================================================
// Module: Parity CLI Library
// Description: Helpers shared by the `parity` binary and its tests.
// Purpose: Keep exit-code policy, argument parsing, and messages testable.
// Dependencies: parity-core
// ============================================================================

//! ## Overview
//! The `parity` binary lives in `main.rs`. This library holds the pieces
//! with behavior worth testing in isolation: the exit-code mapping, the
//! `--queries` parser, and the message catalog behind [`t!`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod exit;
pub mod messages;
pub mod selection;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use exit::CliExit;
pub use selection::parse_query_list;
