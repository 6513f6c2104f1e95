use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Configuration surface consumed by the engine. Every field has a default
/// so partial config files and partial CLI flags both work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker parallelism. Unset means CPU-derived (see
    /// [`default_concurrency`](crate::default_concurrency)).
    pub concurrency: Option<usize>,
    /// Number of configured checker plugins. Zero means all permits go to
    /// test execution immediately.
    pub checkers: usize,
    /// Multiplicative margin on the estimated net test time.
    pub timeout_factor: f64,
    /// Fixed overhead added on top of the scaled net time, in milliseconds.
    pub timeout_ms: u64,
    /// Cap on instrumented hit counts before a run counts as an infinite
    /// loop. Unset disables the guard.
    pub hit_limit: Option<u64>,
    /// Report every failing test as a killer instead of just the first.
    pub report_all_killers: bool,
    pub dry_run_timeout_ms: u64,
    pub worker_startup_timeout_ms: u64,
    /// How long dispose waits for a clean worker exit before killing it.
    pub dispose_grace_ms: u64,
    pub worker: WorkerCommand,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Utf8PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            concurrency: None,
            checkers: 0,
            timeout_factor: 1.5,
            timeout_ms: 5000,
            hit_limit: None,
            report_all_killers: false,
            dry_run_timeout_ms: 300_000,
            worker_startup_timeout_ms: 30_000,
            dispose_grace_ms: 2000,
            worker: WorkerCommand::default(),
        }
    }
}

impl EngineConfig {
    /// Configured concurrency, else the CPU-derived default.
    pub fn effective_concurrency(&self, cpu_count: usize) -> usize {
        self.concurrency
            .unwrap_or_else(|| crate::default_concurrency(cpu_count))
    }

    /// Per-mutant wall-clock budget for an estimated net run time.
    pub fn run_timeout_ms(&self, net_time_ms: u64) -> u64 {
        (net_time_ms as f64 * self.timeout_factor) as u64 + self.timeout_ms
    }
}
