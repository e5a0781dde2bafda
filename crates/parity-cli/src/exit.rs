// crates/parity-cli/src/exit.rs
// ============================================================================
// Module: CLI Exit Codes
// Description: Maps run results and engine errors onto process exit codes.
// Purpose: Give automation a distinct code for every way a run can end.
// Dependencies: parity-core
// ============================================================================

//! ## Overview
//! [`CliExit`] is the closed set of process outcomes. Only a `COMPLETED` run
//! (or a successful dry run or validation) exits with zero.
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | completed, dry run, or validation success |
//! | 1 | completed with failures, or a failed ledger check |
//! | 2 | aborted, including a corrupt persisted plan |
//! | 3 | another process holds the execution |
//! | 4 | configuration, plan, or usage error |
//! | 5 | interrupted by the user |

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::ExitCode;

use parity_core::EngineError;
use parity_core::PlanError;
use parity_core::RunReport;
use parity_core::RunStatus;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Process outcome of a CLI invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CliExit {
    /// Run completed with every query succeeding, or a check passed.
    Success,
    /// Run completed with failed or skipped queries, or a check failed.
    CompletedWithFailures,
    /// Run aborted on a fatal error.
    Aborted,
    /// Another process holds the execution lease.
    ConcurrentRun,
    /// Configuration, plan, or command-line error.
    Usage,
    /// Run stopped by an interrupt and can be resumed.
    Interrupted,
}

impl CliExit {
    /// Returns the numeric exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::CompletedWithFailures => 1,
            Self::Aborted => 2,
            Self::ConcurrentRun => 3,
            Self::Usage => 4,
            Self::Interrupted => 5,
        }
    }

    /// Maps a persisted run status.
    ///
    /// A `RUNNING` status after a pass means the pass stopped early.
    #[must_use]
    pub const fn for_status(status: RunStatus) -> Self {
        match status {
            RunStatus::Completed => Self::Success,
            RunStatus::CompletedWithFailures => Self::CompletedWithFailures,
            RunStatus::Aborted => Self::Aborted,
            RunStatus::Running => Self::Interrupted,
        }
    }

    /// Maps the result of one engine pass.
    #[must_use]
    pub const fn for_report(report: &RunReport) -> Self {
        if report.interrupted {
            return Self::Interrupted;
        }
        Self::for_status(report.status)
    }

    /// Maps an engine error.
    ///
    /// A corrupt persisted plan aborts the execution; every other plan error
    /// is rejected before any state changes.
    #[must_use]
    pub const fn for_engine_error(error: &EngineError) -> Self {
        match error {
            EngineError::Persistence(_) | EngineError::Plan(PlanError::Corrupt(_)) => Self::Aborted,
            EngineError::ConcurrentRun {
                ..
            } => Self::ConcurrentRun,
            EngineError::Plan(_)
            | EngineError::NotFound(_)
            | EngineError::NothingToResume(_)
            | EngineError::AlreadyExists(_)
            | EngineError::Incomplete {
                ..
            } => Self::Usage,
        }
    }
}

impl From<CliExit> for ExitCode {
    fn from(exit: CliExit) -> Self {
        Self::from(exit.code())
    }
}
