// crates/parity-cli/tests/exit_codes.rs
// ============================================================================
// Module: CLI Exit Code Tests
// Description: Verifies run results and engine errors map to distinct codes.
// Purpose: Keep the exit-code contract stable for automation.
// Dependencies: parity-cli, parity-core
// ============================================================================

//! ## Overview
//! Exercises [`parity_cli::CliExit`] over every run status and engine error.

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

use std::collections::BTreeSet;

use parity_cli::CliExit;
use parity_core::EngineError;
use parity_core::ExecutionId;
use parity_core::PlanError;
use parity_core::RunReport;
use parity_core::RunStatus;
use parity_core::RunSummary;
use parity_core::StoreError;

/// Builds a report with the given status.
fn report(status: RunStatus, interrupted: bool) -> RunReport {
    RunReport {
        execution_id: ExecutionId::new("exec"),
        status,
        summary: RunSummary::default(),
        interrupted,
        processed: 0,
    }
}

/// Tests every code is distinct and only success is zero.
#[test]
fn codes_are_distinct() {
    let all = [
        CliExit::Success,
        CliExit::CompletedWithFailures,
        CliExit::Aborted,
        CliExit::ConcurrentRun,
        CliExit::Usage,
        CliExit::Interrupted,
    ];
    let codes: BTreeSet<u8> = all.iter().map(|exit| exit.code()).collect();
    assert_eq!(codes.len(), all.len());
    assert_eq!(CliExit::Success.code(), 0);
    assert_eq!(codes, (0 ..= 5).collect());
}

/// Tests run statuses map onto their documented codes.
#[test]
fn run_status_mapping() {
    assert_eq!(CliExit::for_report(&report(RunStatus::Completed, false)).code(), 0);
    assert_eq!(CliExit::for_report(&report(RunStatus::CompletedWithFailures, false)).code(), 1);
    assert_eq!(CliExit::for_report(&report(RunStatus::Aborted, false)).code(), 2);
    assert_eq!(CliExit::for_report(&report(RunStatus::Running, false)), CliExit::Interrupted);
}

/// Tests an interrupted pass wins over the persisted status.
#[test]
fn interruption_takes_precedence() {
    assert_eq!(CliExit::for_report(&report(RunStatus::Running, true)).code(), 5);
}

/// Tests engine errors map onto abort, lease, and usage codes.
#[test]
fn engine_error_mapping() {
    let concurrent = EngineError::ConcurrentRun {
        execution_id: "exec".to_string(),
        holder: "other".to_string(),
    };
    assert_eq!(CliExit::for_engine_error(&concurrent).code(), 3);
    let persistence = EngineError::Persistence(StoreError::Io("disk".to_string()));
    assert_eq!(CliExit::for_engine_error(&persistence).code(), 2);
    let plan = EngineError::Plan(PlanError::UnknownQuery("q".to_string()));
    assert_eq!(CliExit::for_engine_error(&plan).code(), 4);
    assert_eq!(CliExit::for_engine_error(&EngineError::NotFound("x".to_string())).code(), 4);
    assert_eq!(CliExit::for_engine_error(&EngineError::NothingToResume("resume")).code(), 4);
    assert_eq!(CliExit::for_engine_error(&EngineError::AlreadyExists("x".to_string())).code(), 4);
    let incomplete = EngineError::Incomplete {
        execution_id: "exec".to_string(),
        query_id: "q".to_string(),
    };
    assert_eq!(CliExit::for_engine_error(&incomplete).code(), 4);
}

/// Tests a corrupt persisted plan aborts while other plan errors are usage.
#[test]
fn corrupt_plan_mid_run_is_an_abort() {
    let corrupt = EngineError::Plan(PlanError::Corrupt("query q is not in the catalog".to_string()));
    assert_eq!(CliExit::for_engine_error(&corrupt), CliExit::Aborted);
    let cycle = EngineError::Plan(PlanError::Cycle(vec!["a".to_string(), "b".to_string()]));
    assert_eq!(CliExit::for_engine_error(&cycle), CliExit::Usage);
}
