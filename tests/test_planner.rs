use std::collections::{BTreeMap, BTreeSet};

use mutator_engine::config::EngineConfig;
use mutator_engine::mutants::{
    CoverageAnalysis, Mutant, MutantCoverage, MutantId, MutantStatus, TestId, TestResult,
    TestStatus,
};
use mutator_engine::planner::{MutantTestPlan, plan_mutants};

fn mutant(id: &str) -> Mutant {
    Mutant {
        id: MutantId(id.to_string()),
        file: "app.py".to_string(),
        line: 1,
        column: 1,
        start_byte: 0,
        end_byte: 1,
        operator: "arith".to_string(),
        original: "+".to_string(),
        replacement: "-".to_string(),
    }
}

fn test_result(id: &str, elapsed_ms: u64) -> TestResult {
    TestResult {
        id: TestId(id.to_string()),
        status: TestStatus::Success,
        elapsed_ms,
        failure_message: None,
    }
}

fn per_test(entries: Vec<(&str, MutantCoverage)>) -> CoverageAnalysis {
    let mut mutants = BTreeMap::new();
    for (id, coverage) in entries {
        mutants.insert(MutantId(id.to_string()), coverage);
    }
    CoverageAnalysis::PerTest { mutants }
}

fn covered_by(tests: &[&str]) -> MutantCoverage {
    MutantCoverage::PerTest {
        tests: tests
            .iter()
            .map(|t| TestId(t.to_string()))
            .collect::<BTreeSet<_>>(),
    }
}

fn config() -> EngineConfig {
    EngineConfig {
        timeout_factor: 2.0,
        timeout_ms: 1000,
        hit_limit: Some(500),
        ..EngineConfig::default()
    }
}

// --- early results ---

#[test]
fn ignored_mutant_gets_its_policy_status() {
    let coverage = per_test(vec![(
        "m1",
        MutantCoverage::Ignored {
            reason: "excluded by configuration".to_string(),
        },
    )]);
    let plans = plan_mutants(vec![mutant("m1")], &coverage, &[], &config());
    match &plans[0] {
        MutantTestPlan::EarlyResult { status, .. } => {
            assert_eq!(
                *status,
                MutantStatus::Ignored {
                    reason: "excluded by configuration".to_string()
                }
            );
        }
        other => panic!("Expected EarlyResult, got {:?}", other),
    }
}

#[test]
fn empty_coverage_is_no_coverage_never_run() {
    let coverage = per_test(vec![("m1", covered_by(&[]))]);
    let plans = plan_mutants(vec![mutant("m1")], &coverage, &[], &config());
    match &plans[0] {
        MutantTestPlan::EarlyResult { status, .. } => {
            assert_eq!(*status, MutantStatus::NoCoverage);
        }
        other => panic!("Expected EarlyResult, got {:?}", other),
    }
}

#[test]
fn mutant_absent_from_coverage_map_is_no_coverage() {
    let coverage = per_test(vec![("other", covered_by(&["t1"]))]);
    let plans = plan_mutants(vec![mutant("m1")], &coverage, &[], &config());
    match &plans[0] {
        MutantTestPlan::EarlyResult { status, .. } => {
            assert_eq!(*status, MutantStatus::NoCoverage);
        }
        other => panic!("Expected EarlyResult, got {:?}", other),
    }
}

// --- run plans ---

#[test]
fn covered_mutant_runs_with_filter_and_summed_net_time() {
    let coverage = per_test(vec![("m1", covered_by(&["t1", "t3"]))]);
    let baseline = vec![
        test_result("t1", 100),
        test_result("t2", 1000),
        test_result("t3", 50),
    ];
    let plans = plan_mutants(vec![mutant("m1")], &coverage, &baseline, &config());
    match &plans[0] {
        MutantTestPlan::Run {
            options,
            net_time_ms,
            ..
        } => {
            let filter = options.test_filter.as_ref().expect("filter expected");
            assert_eq!(
                filter,
                &vec![TestId("t1".to_string()), TestId("t3".to_string())]
            );
            assert_eq!(*net_time_ms, 150);
            // net_time × factor + fixed overhead
            assert_eq!(options.timeout_ms, 150 * 2 + 1000);
            assert_eq!(options.hit_limit, Some(500));
            assert_eq!(options.active_mutant, MutantId("m1".to_string()));
        }
        other => panic!("Expected Run, got {:?}", other),
    }
}

#[test]
fn statically_covered_mutant_runs_the_full_suite() {
    let coverage = per_test(vec![("m1", MutantCoverage::Static)]);
    let baseline = vec![test_result("t1", 100), test_result("t2", 200)];
    let plans = plan_mutants(vec![mutant("m1")], &coverage, &baseline, &config());
    match &plans[0] {
        MutantTestPlan::Run {
            options,
            net_time_ms,
            ..
        } => {
            assert!(options.test_filter.is_none(), "static coverage means no filter");
            assert_eq!(*net_time_ms, 300);
        }
        other => panic!("Expected Run, got {:?}", other),
    }
}

#[test]
fn no_coverage_analysis_runs_everything_unfiltered() {
    let baseline = vec![test_result("t1", 100), test_result("t2", 200)];
    let plans = plan_mutants(
        vec![mutant("m1")],
        &CoverageAnalysis::Off,
        &baseline,
        &config(),
    );
    match &plans[0] {
        MutantTestPlan::Run {
            options,
            net_time_ms,
            ..
        } => {
            assert!(options.test_filter.is_none());
            assert_eq!(*net_time_ms, 300);
        }
        other => panic!("Expected Run, got {:?}", other),
    }
}

#[test]
fn plans_are_independent_per_mutant() {
    let coverage = per_test(vec![
        ("m1", covered_by(&[])),
        ("m2", covered_by(&["t1"])),
    ]);
    let baseline = vec![test_result("t1", 100)];
    let plans = plan_mutants(
        vec![mutant("m1"), mutant("m2")],
        &coverage,
        &baseline,
        &config(),
    );
    assert!(matches!(plans[0], MutantTestPlan::EarlyResult { .. }));
    assert!(matches!(plans[1], MutantTestPlan::Run { .. }));
}

#[test]
fn zero_net_time_still_gets_the_fixed_overhead() {
    let coverage = per_test(vec![("m1", covered_by(&["t1"]))]);
    // Covering test missing from the baseline: elapsed sums to zero.
    let plans = plan_mutants(vec![mutant("m1")], &coverage, &[], &config());
    match &plans[0] {
        MutantTestPlan::Run { options, .. } => {
            assert_eq!(options.timeout_ms, 1000);
        }
        other => panic!("Expected Run, got {:?}", other),
    }
}
