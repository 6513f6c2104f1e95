//! Deadline wrapper for single worker calls. Expiry is not an error: it
//! becomes a synthetic Timeout-shaped result, and the caller must recycle
//! the worker, because a wedged process cannot be trusted even if it
//! eventually answers. Timeouts are never retried — the working assumption
//! is that the mutant itself caused the hang.

use std::time::Duration;

use crate::errors::WorkerError;
use crate::mutants::{DryRunOutcome, MutantOutcomeKind, MutantRunOutcome};
use crate::worker::{DryRunOptions, RunOptions, TestRunner};

/// Either the wrapped call settled, or the deadline won.
#[derive(Debug)]
pub enum TimedCall<T> {
    Settled(T),
    TimedOut,
}

pub async fn run_mutant_with_timeout<R: TestRunner>(
    runner: &mut R,
    options: &RunOptions,
) -> TimedCall<Result<MutantRunOutcome, WorkerError>> {
    let deadline = Duration::from_millis(options.timeout_ms);
    match tokio::time::timeout(deadline, runner.run_mutant(options)).await {
        Ok(settled) => TimedCall::Settled(settled),
        Err(_) => TimedCall::TimedOut,
    }
}

pub async fn run_dry_with_timeout<R: TestRunner>(
    runner: &mut R,
    options: &DryRunOptions,
) -> TimedCall<Result<DryRunOutcome, WorkerError>> {
    let deadline = Duration::from_millis(options.timeout_ms);
    match tokio::time::timeout(deadline, runner.run_dry(options)).await {
        Ok(settled) => TimedCall::Settled(settled),
        Err(_) => TimedCall::TimedOut,
    }
}

/// The result a timed-out mutant run reports in place of a worker response.
pub fn timed_out_mutant_run() -> MutantRunOutcome {
    MutantRunOutcome {
        kind: MutantOutcomeKind::Timeout { reason: None },
        hit_count: None,
    }
}
