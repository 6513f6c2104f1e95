use mutator_engine::errors::WorkerError;
use mutator_engine::mutants::{
    CoverageAnalysis, DryRunOutcome, MutantId, MutantOutcomeKind, MutantRunOutcome,
};
use mutator_engine::timeout::{
    TimedCall, run_dry_with_timeout, run_mutant_with_timeout, timed_out_mutant_run,
};
use mutator_engine::worker::{DryRunOptions, RunOptions, TestRunner};

/// Settles after the given delay; hangs forever when `None`.
struct DelayRunner {
    delay_ms: Option<u64>,
}

impl TestRunner for DelayRunner {
    async fn run_dry(&mut self, _options: &DryRunOptions) -> Result<DryRunOutcome, WorkerError> {
        match self.delay_ms {
            Some(ms) => {
                tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                Ok(DryRunOutcome::Complete {
                    tests: vec![],
                    coverage: CoverageAnalysis::Off,
                })
            }
            None => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn run_mutant(
        &mut self,
        _options: &RunOptions,
    ) -> Result<MutantRunOutcome, WorkerError> {
        match self.delay_ms {
            Some(ms) => {
                tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                Ok(MutantRunOutcome {
                    kind: MutantOutcomeKind::Complete { tests: vec![] },
                    hit_count: Some(3),
                })
            }
            None => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn dispose(&mut self) {}
}

fn options(timeout_ms: u64) -> RunOptions {
    RunOptions {
        active_mutant: MutantId("m1".to_string()),
        test_filter: None,
        timeout_ms,
        hit_limit: None,
    }
}

// --- mutant runs ---

#[tokio::test(start_paused = true)]
async fn settles_within_the_deadline() {
    let mut runner = DelayRunner { delay_ms: Some(10) };
    match run_mutant_with_timeout(&mut runner, &options(1000)).await {
        TimedCall::Settled(Ok(outcome)) => {
            assert!(matches!(outcome.kind, MutantOutcomeKind::Complete { .. }));
            assert_eq!(outcome.hit_count, Some(3));
        }
        other => panic!("Expected a settled call, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn hanging_call_times_out_instead_of_blocking() {
    let mut runner = DelayRunner { delay_ms: None };
    match run_mutant_with_timeout(&mut runner, &options(1000)).await {
        TimedCall::TimedOut => {}
        other => panic!("Expected TimedOut, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn slow_call_past_the_deadline_times_out() {
    let mut runner = DelayRunner { delay_ms: Some(5000) };
    match run_mutant_with_timeout(&mut runner, &options(1000)).await {
        TimedCall::TimedOut => {}
        other => panic!("Expected TimedOut, got {:?}", other),
    }
}

// --- dry runs ---

#[tokio::test(start_paused = true)]
async fn dry_run_times_out_the_same_way() {
    let mut runner = DelayRunner { delay_ms: None };
    let options = DryRunOptions {
        timeout_ms: 1000,
        coverage_analysis: true,
    };
    match run_dry_with_timeout(&mut runner, &options).await {
        TimedCall::TimedOut => {}
        other => panic!("Expected TimedOut, got {:?}", other),
    }
}

// --- synthetic result shape ---

#[test]
fn synthetic_timeout_result_carries_no_hit_count() {
    let outcome = timed_out_mutant_run();
    assert!(matches!(
        outcome.kind,
        MutantOutcomeKind::Timeout { reason: None }
    ));
    assert_eq!(outcome.hit_count, None);
}
