use std::path::PathBuf;
use std::process;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

use mutator_engine::config::{EngineConfig, WorkerCommand};
use mutator_engine::executor::MutationTestExecutor;
use mutator_engine::mutants::Mutant;
use mutator_engine::output;
use mutator_engine::worker::{ProcessWorkerFactory, WorkerConfig};

#[derive(Parser)]
#[command(
    name = "mutator-engine",
    version,
    about = "Mutation test execution engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every mutant from a mutants file through a worker command
    Run {
        /// JSON file with the instrumenter's mutants
        mutants: PathBuf,
        /// Worker program speaking the engine protocol on stdio
        #[arg(short, long)]
        worker: String,
        /// Extra argument passed to the worker program (repeatable)
        #[arg(long = "worker-arg")]
        worker_args: Vec<String>,
        /// Working directory for worker processes (default: current dir)
        #[arg(long)]
        working_dir: Option<Utf8PathBuf>,
        /// Number of concurrent workers (default: CPU-derived)
        #[arg(short, long)]
        concurrency: Option<usize>,
        /// Multiplicative margin on each mutant's estimated test time
        #[arg(long, default_value = "1.5")]
        timeout_factor: f64,
        /// Fixed per-run timeout overhead in milliseconds
        #[arg(long, default_value = "5000")]
        timeout: u64,
        /// Hit limit guarding against mutant-induced infinite loops
        #[arg(long)]
        hit_limit: Option<u64>,
        /// Report all killing tests instead of just the first
        #[arg(long)]
        report_all_killers: bool,
        /// Output JSON instead of human-readable text
        #[arg(long)]
        json: bool,
        /// Exit code only, no output
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Run {
            mutants,
            worker,
            worker_args,
            working_dir,
            concurrency,
            timeout_factor,
            timeout,
            hit_limit,
            report_all_killers,
            json,
            quiet,
        } => cmd_run(
            mutants,
            worker,
            worker_args,
            working_dir,
            concurrency,
            timeout_factor,
            timeout,
            hit_limit,
            report_all_killers,
            json,
            quiet,
        ),
    };

    process::exit(exit_code);
}

fn cmd_run(
    mutants_path: PathBuf,
    worker: String,
    worker_args: Vec<String>,
    working_dir: Option<Utf8PathBuf>,
    concurrency: Option<usize>,
    timeout_factor: f64,
    timeout: u64,
    hit_limit: Option<u64>,
    report_all_killers: bool,
    json_mode: bool,
    quiet: bool,
) -> i32 {
    let data = match std::fs::read_to_string(&mutants_path) {
        Ok(d) => d,
        Err(e) => {
            output::print_error(&format!(
                "Failed to read {}: {}. Pass a mutants JSON file produced by the instrumenter.",
                mutants_path.display(),
                e
            ));
            return 2;
        }
    };
    let mutants: Vec<Mutant> = match serde_json::from_str(&data) {
        Ok(m) => m,
        Err(e) => {
            output::print_error(&format!(
                "Malformed mutants file {}: {}",
                mutants_path.display(),
                e
            ));
            return 2;
        }
    };
    if mutants.is_empty() {
        if !quiet {
            output::print_success("No mutants to run.");
        }
        return 0;
    }

    let working_dir = working_dir.unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|d| Utf8PathBuf::from_path_buf(d).ok())
            .unwrap_or_else(|| Utf8PathBuf::from("."))
    });

    let config = EngineConfig {
        concurrency,
        timeout_factor,
        timeout_ms: timeout,
        hit_limit,
        report_all_killers,
        worker: WorkerCommand {
            program: worker.clone(),
            args: worker_args.clone(),
            working_dir: working_dir.clone(),
        },
        ..EngineConfig::default()
    };

    let factory = ProcessWorkerFactory::new(WorkerConfig {
        program: worker,
        args: worker_args,
        working_dir,
        init_options: serde_json::json!({}),
        startup_timeout: Duration::from_millis(config.worker_startup_timeout_ms),
        dispose_grace: Duration::from_millis(config.dispose_grace_ms),
    });

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            output::print_error(&format!("Failed to start the async runtime: {}", e));
            return 3;
        }
    };

    let mut executor = MutationTestExecutor::new(factory, config);
    let results = match runtime.block_on(executor.run(mutants)) {
        Ok(results) => results,
        Err(e) => {
            output::print_error(&format!("Mutation test session failed: {}", e));
            return 3;
        }
    };

    let summary = output::summarize(&results);

    if quiet {
        return if summary.survived_mutants.is_empty() { 0 } else { 1 };
    }

    if json_mode {
        match serde_json::to_string(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                output::print_error(&format!("Failed to serialize summary: {}", e));
                return 3;
            }
        }
    } else {
        output::print_run_summary(&summary);
    }

    if summary.survived_mutants.is_empty() { 0 } else { 1 }
}
