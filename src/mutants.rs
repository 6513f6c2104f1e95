use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutantId(pub String);

impl std::fmt::Display for MutantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(pub String);

impl std::fmt::Display for TestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One candidate code change. Produced by the instrumenter, read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mutant {
    pub id: MutantId,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub start_byte: usize,
    pub end_byte: usize,
    pub operator: String,
    pub original: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub id: TestId,
    pub status: TestStatus,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

/// Which tests exercise one mutant, as reported by the dry run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutantCoverage {
    /// Exercised by exactly this set of tests.
    PerTest { tests: BTreeSet<TestId> },
    /// Executed during module load, outside any test. Every test may be
    /// affected indirectly, so the full suite must run.
    Static,
    /// Already resolved by policy (e.g. excluded by configuration).
    Ignored { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoverageAnalysis {
    /// No coverage data; every mutant runs the full suite.
    Off,
    /// Per-mutant coverage from an instrumented dry run. Mutants absent
    /// from the map are covered by nothing.
    PerTest {
        mutants: std::collections::BTreeMap<MutantId, MutantCoverage>,
    },
}

/// Baseline execution outcome, before any mutant is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DryRunOutcome {
    Complete {
        tests: Vec<TestResult>,
        coverage: CoverageAnalysis,
    },
    Error {
        message: String,
    },
    Timeout,
}

/// Raw outcome of one mutant run, before classification. The hit count is
/// part of the worker's response payload, never ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutantRunOutcome {
    #[serde(flatten)]
    pub kind: MutantOutcomeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutantOutcomeKind {
    Complete {
        tests: Vec<TestResult>,
    },
    Error {
        message: String,
    },
    Timeout {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// Terminal verdict for one mutant. Exactly one is produced per mutant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MutantStatus {
    Killed {
        failure_message: Option<String>,
        killed_by: Vec<TestId>,
        nr_of_tests: usize,
    },
    Survived {
        nr_of_tests: usize,
    },
    Timeout {
        reason: String,
    },
    Error {
        message: String,
    },
    NoCoverage,
    Ignored {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutantRunResult {
    pub id: MutantId,
    #[serde(flatten)]
    pub status: MutantStatus,
}
