pub mod classify;
pub mod config;
pub mod errors;
pub mod executor;
pub mod mutants;
pub mod output;
pub mod planner;
pub mod pool;
pub mod protocol;
pub mod timeout;
pub mod tokens;
pub mod worker;

/// CPU-derived worker parallelism: leave one core for the orchestrator on
/// larger machines, use everything on small ones.
pub fn default_concurrency(cpu_count: usize) -> usize {
    if cpu_count > 4 { cpu_count - 1 } else { cpu_count }
}
