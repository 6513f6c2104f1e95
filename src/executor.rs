//! Ties the engine together: baseline dry run, planning, dispatching Run
//! plans through the pool, classifying every raw outcome. Results complete
//! in no particular order; every mutant gets exactly one verdict.

use futures::StreamExt;
use futures::stream::FuturesUnordered;

use crate::classify::classify;
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::mutants::{
    CoverageAnalysis, DryRunOutcome, Mutant, MutantRunResult, MutantStatus, TestResult,
    TestStatus,
};
use crate::planner::{MutantTestPlan, plan_mutants};
use crate::pool::WorkerPool;
use crate::tokens::ConcurrencyTokenProvider;
use crate::worker::{DryRunOptions, WorkerFactory};

pub struct MutationTestExecutor<F: WorkerFactory> {
    pool: WorkerPool<F>,
    provider: ConcurrencyTokenProvider,
    config: EngineConfig,
}

impl<F: WorkerFactory> MutationTestExecutor<F> {
    pub fn new(factory: F, config: EngineConfig) -> Self {
        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let concurrency = config.effective_concurrency(cpu_count);
        // The checker stream belongs to the (external) checking phase; its
        // permits come back to us through free_checkers.
        let (provider, test_tokens, _checker_tokens) =
            ConcurrencyTokenProvider::new(concurrency, config.checkers);
        MutationTestExecutor {
            pool: WorkerPool::new(factory, test_tokens),
            provider,
            config,
        }
    }

    /// Run the whole session: one verdict per mutant, pool disposed at the
    /// end. A single mutant's crash or timeout never aborts the session.
    pub async fn run(&mut self, mutants: Vec<Mutant>) -> Result<Vec<MutantRunResult>, EngineError> {
        let baseline = self.dry_run().await;
        if baseline.is_err() {
            // The baseline worker still gets its Dispose handshake when the
            // session aborts.
            self.pool.dispose().await;
        }
        let (tests, coverage) = baseline?;
        // Static checking has completed by the time mutants execute, so its
        // permits are reclaimed for test execution.
        self.provider.free_checkers();

        let plans = plan_mutants(mutants, &coverage, &tests, &self.config);
        let mut results = Vec::with_capacity(plans.len());

        let pool = &self.pool;
        let report_all_killers = self.config.report_all_killers;
        let mut running = FuturesUnordered::new();
        for plan in plans {
            match plan {
                MutantTestPlan::EarlyResult { mutant, status } => {
                    results.push(MutantRunResult {
                        id: mutant.id,
                        status,
                    });
                }
                MutantTestPlan::Run {
                    mutant, options, ..
                } => {
                    running.push(async move {
                        let outcome = pool.run_mutant(&options).await;
                        (mutant.id, options.hit_limit, outcome)
                    });
                }
            }
        }

        while let Some((id, hit_limit, outcome)) = running.next().await {
            let result = match outcome {
                Ok(raw) => classify(id, &raw, hit_limit, report_all_killers),
                // Retry already exhausted inside the pool.
                Err(err) => MutantRunResult {
                    id,
                    status: MutantStatus::Error {
                        message: err.to_string(),
                    },
                },
            };
            results.push(result);
        }
        drop(running);

        self.pool.dispose().await;
        Ok(results)
    }

    async fn dry_run(&self) -> Result<(Vec<TestResult>, CoverageAnalysis), EngineError> {
        let options = DryRunOptions {
            timeout_ms: self.config.dry_run_timeout_ms,
            coverage_analysis: true,
        };
        match self.pool.run_dry(&options).await? {
            DryRunOutcome::Complete { tests, coverage } => {
                if let Some(failed) = tests.iter().find(|t| t.status == TestStatus::Failed) {
                    return Err(EngineError::BrokenBaseline(format!(
                        "test {} failed during the baseline run: {}",
                        failed.id,
                        failed.failure_message.as_deref().unwrap_or("no message")
                    )));
                }
                Ok((tests, coverage))
            }
            DryRunOutcome::Error { message } => Err(EngineError::BrokenBaseline(message)),
            DryRunOutcome::Timeout => Err(EngineError::BaselineTimeout),
        }
    }
}
