use crate::config::EngineConfig;
use crate::mutants::{
    CoverageAnalysis, Mutant, MutantCoverage, MutantStatus, TestResult,
};
use crate::worker::RunOptions;

/// What to do with one mutant: resolve it immediately, or schedule a real
/// execution with a derived time budget. Each mutant's plan is independent.
#[derive(Debug)]
pub enum MutantTestPlan {
    EarlyResult {
        mutant: Mutant,
        status: MutantStatus,
    },
    Run {
        mutant: Mutant,
        options: RunOptions,
        /// Estimated worst-case execution time: the sum of the covering
        /// tests' measured durations.
        net_time_ms: u64,
    },
}

pub fn plan_mutants(
    mutants: Vec<Mutant>,
    coverage: &CoverageAnalysis,
    baseline: &[TestResult],
    config: &EngineConfig,
) -> Vec<MutantTestPlan> {
    mutants
        .into_iter()
        .map(|mutant| plan_mutant(mutant, coverage, baseline, config))
        .collect()
}

fn plan_mutant(
    mutant: Mutant,
    coverage: &CoverageAnalysis,
    baseline: &[TestResult],
    config: &EngineConfig,
) -> MutantTestPlan {
    let per_mutant = match coverage {
        CoverageAnalysis::Off => None,
        CoverageAnalysis::PerTest { mutants } => match mutants.get(&mutant.id) {
            Some(MutantCoverage::Ignored { reason }) => {
                // Policy already decided; never scheduled.
                let status = MutantStatus::Ignored {
                    reason: reason.clone(),
                };
                return MutantTestPlan::EarlyResult { mutant, status };
            }
            // Static coverage means module-level side effects; any test
            // could be affected indirectly, so no filter applies.
            Some(MutantCoverage::Static) => None,
            Some(MutantCoverage::PerTest { tests }) if tests.is_empty() => {
                return MutantTestPlan::EarlyResult {
                    mutant,
                    status: MutantStatus::NoCoverage,
                };
            }
            Some(MutantCoverage::PerTest { tests }) => Some(tests),
            // Coverage analysis ran and nothing exercises this mutant.
            None => {
                return MutantTestPlan::EarlyResult {
                    mutant,
                    status: MutantStatus::NoCoverage,
                };
            }
        },
    };

    let (test_filter, net_time_ms) = match per_mutant {
        Some(tests) => {
            let net: u64 = baseline
                .iter()
                .filter(|t| tests.contains(&t.id))
                .map(|t| t.elapsed_ms)
                .sum();
            (Some(tests.iter().cloned().collect()), net)
        }
        None => {
            let net: u64 = baseline.iter().map(|t| t.elapsed_ms).sum();
            (None, net)
        }
    };

    let options = RunOptions {
        active_mutant: mutant.id.clone(),
        test_filter,
        timeout_ms: config.run_timeout_ms(net_time_ms),
        hit_limit: config.hit_limit,
    };
    MutantTestPlan::Run {
        mutant,
        options,
        net_time_ms,
    }
}
