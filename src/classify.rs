use crate::mutants::{
    MutantId, MutantOutcomeKind, MutantRunOutcome, MutantRunResult, MutantStatus, TestStatus,
};

/// Turn a raw run outcome into the terminal verdict for one mutant.
///
/// The hit-limit guard runs first and overrides everything: instrumented
/// code that exceeded its hit limit proved a runaway loop faster than the
/// external timer could, but for scoring it is still "could not verify", so
/// the verdict is Timeout.
pub fn classify(
    id: MutantId,
    outcome: &MutantRunOutcome,
    hit_limit: Option<u64>,
    report_all_killers: bool,
) -> MutantRunResult {
    if let (Some(hit_count), Some(limit)) = (outcome.hit_count, hit_limit) {
        if hit_count > limit {
            return MutantRunResult {
                id,
                status: MutantStatus::Timeout {
                    reason: format!("Hit limit reached ({hit_count}/{limit})"),
                },
            };
        }
    }

    let status = match &outcome.kind {
        MutantOutcomeKind::Complete { tests } => {
            let nr_of_tests = tests
                .iter()
                .filter(|t| t.status != TestStatus::Skipped)
                .count();
            let mut failed = tests.iter().filter(|t| t.status == TestStatus::Failed);
            match failed.next() {
                Some(first) => {
                    let mut killed_by = vec![first.id.clone()];
                    if report_all_killers {
                        killed_by.extend(failed.map(|t| t.id.clone()));
                    }
                    MutantStatus::Killed {
                        failure_message: first.failure_message.clone(),
                        killed_by,
                        nr_of_tests,
                    }
                }
                None => MutantStatus::Survived { nr_of_tests },
            }
        }
        MutantOutcomeKind::Error { message } => MutantStatus::Error {
            message: message.clone(),
        },
        MutantOutcomeKind::Timeout { reason } => MutantStatus::Timeout {
            reason: reason.clone().unwrap_or_else(|| "test run timed out".to_string()),
        },
    };
    MutantRunResult { id, status }
}
