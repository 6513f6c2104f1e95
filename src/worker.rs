use std::process::Stdio;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::errors::{WorkerError, crash_error};
use crate::mutants::{
    CoverageAnalysis, DryRunOutcome, MutantId, MutantOutcomeKind, MutantRunOutcome, TestId,
    TestResult,
};
use crate::protocol::{MessageReader, WorkerRequest, WorkerResponse, write_message};

/// Options for one mutant run, carried across the process boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    pub active_mutant: MutantId,
    /// Run only these tests. `None` means the full suite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_filter: Option<Vec<TestId>>,
    pub timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryRunOptions {
    pub timeout_ms: u64,
    /// Ask the worker to record per-mutant coverage during the baseline.
    pub coverage_analysis: bool,
}

/// The seam the pool and the decorators compose over. One implementation
/// drives a real worker process; tests substitute stubs.
#[allow(async_fn_in_trait)]
pub trait TestRunner {
    async fn run_dry(&mut self, options: &DryRunOptions) -> Result<DryRunOutcome, WorkerError>;
    async fn run_mutant(&mut self, options: &RunOptions)
    -> Result<MutantRunOutcome, WorkerError>;
    /// Best effort, idempotent, never fails.
    async fn dispose(&mut self);
}

#[allow(async_fn_in_trait)]
pub trait WorkerFactory {
    type Runner: TestRunner;
    async fn create(&self) -> Result<Self::Runner, WorkerError>;
}

/// How to launch one worker process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Utf8PathBuf,
    /// Opaque options forwarded in the `Init` message.
    pub init_options: serde_json::Value,
    pub startup_timeout: Duration,
    pub dispose_grace: Duration,
}

/// Owns exactly one worker process and translates method calls into
/// request/response messages over its stdio. Calls are strictly serialized;
/// nothing is pipelined.
#[derive(Debug)]
pub struct WorkerProxy {
    child: Child,
    stdin: ChildStdin,
    reader: MessageReader<BufReader<ChildStdout>>,
    pid: Option<u32>,
    dispose_grace: Duration,
    disposed: bool,
}

impl WorkerProxy {
    /// Start the process and complete the `Init` handshake under the
    /// startup timeout.
    pub async fn spawn(config: &WorkerConfig) -> Result<Self, WorkerError> {
        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .current_dir(&config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            WorkerError::Initialization(format!("failed to spawn {}: {e}", config.program))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerError::Initialization("worker stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Initialization("worker stdout unavailable".into()))?;

        let mut proxy = WorkerProxy {
            pid: child.id(),
            child,
            stdin,
            reader: MessageReader::new(BufReader::new(stdout)),
            dispose_grace: config.dispose_grace,
            disposed: false,
        };

        let init = WorkerRequest::Init {
            log_level: tracing::level_filters::LevelFilter::current().to_string(),
            options: config.init_options.clone(),
            working_dir: config.working_dir.to_string(),
        };
        let handshake = async {
            write_message(&mut proxy.stdin, &init).await?;
            proxy.reader.read_message::<WorkerResponse>().await
        };
        match tokio::time::timeout(config.startup_timeout, handshake).await {
            Ok(Ok(Some(WorkerResponse::Initialized))) => {
                debug!(pid = ?proxy.pid, "worker initialized");
                Ok(proxy)
            }
            Ok(Ok(Some(other))) => {
                proxy.kill().await;
                Err(WorkerError::Initialization(format!(
                    "expected Initialized, got {other:?}"
                )))
            }
            Ok(Ok(None)) => {
                let crash = proxy.crashed().await;
                Err(WorkerError::Initialization(format!(
                    "worker exited during startup: {crash}"
                )))
            }
            Ok(Err(e)) => {
                proxy.kill().await;
                Err(WorkerError::Initialization(format!(
                    "init handshake failed: {e}"
                )))
            }
            Err(_) => {
                proxy.kill().await;
                Err(WorkerError::Initialization(format!(
                    "worker did not acknowledge init within {:?}",
                    config.startup_timeout
                )))
            }
        }
    }

    /// Issue one call and wait for the matching response. An unexpected
    /// process exit rejects the pending call with the crash classification.
    pub async fn call(
        &mut self,
        method: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, WorkerError> {
        let correlation_id = fastrand::u64(..);
        let request = WorkerRequest::Call {
            correlation_id,
            method: method.to_string(),
            args,
        };
        if write_message(&mut self.stdin, &request).await.is_err() {
            return Err(self.crashed().await);
        }

        loop {
            match self.reader.read_message::<WorkerResponse>().await {
                Ok(Some(WorkerResponse::Result {
                    correlation_id: id,
                    value,
                })) if id == correlation_id => return Ok(value),
                Ok(Some(WorkerResponse::Rejection {
                    correlation_id: id,
                    error,
                })) if id == correlation_id => return Err(WorkerError::Rejection(error)),
                // A response from an abandoned earlier call; skip it.
                Ok(Some(WorkerResponse::Result { .. }))
                | Ok(Some(WorkerResponse::Rejection { .. })) => continue,
                Ok(Some(other)) => {
                    return Err(WorkerError::Protocol(format!(
                        "unexpected message while waiting for call result: {other:?}"
                    )));
                }
                Ok(None) => return Err(self.crashed().await),
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    return Err(WorkerError::Protocol(e.to_string()));
                }
                Err(_) => return Err(self.crashed().await),
            }
        }
    }

    /// Ask the worker to shut down, then force-kill it if it lingers past
    /// the grace period. Idempotent and infallible.
    pub async fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        let _ = write_message(&mut self.stdin, &WorkerRequest::Dispose).await;
        let graceful = async {
            loop {
                match self.reader.read_message::<WorkerResponse>().await {
                    Ok(Some(WorkerResponse::DisposeCompleted)) | Ok(None) | Err(_) => break,
                    Ok(Some(_)) => continue,
                }
            }
            let _ = self.child.wait().await;
        };
        if tokio::time::timeout(self.dispose_grace, graceful).await.is_err() {
            debug!(pid = ?self.pid, "worker did not exit within grace period, killing");
            self.kill().await;
        }
    }

    async fn kill(&mut self) {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }

    /// Reap the exited process and classify the crash.
    async fn crashed(&mut self) -> WorkerError {
        match self.child.wait().await {
            Ok(status) => {
                let signal = unix_signal(&status);
                crash_error(self.pid, status.code(), signal)
            }
            Err(_) => crash_error(self.pid, None, None),
        }
    }
}

#[cfg(unix)]
fn unix_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn unix_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

#[derive(Debug, Deserialize)]
struct DryRunResponse {
    tests: Vec<TestResult>,
    #[serde(default)]
    coverage: Option<CoverageAnalysis>,
}

#[derive(Debug, Deserialize)]
struct MutantRunResponse {
    tests: Vec<TestResult>,
    #[serde(default)]
    hit_count: Option<u64>,
}

/// A [`TestRunner`] backed by a worker process, speaking the `dryRun` and
/// `mutantRun` methods.
pub struct ProcessWorker {
    proxy: WorkerProxy,
}

impl ProcessWorker {
    pub fn new(proxy: WorkerProxy) -> Self {
        ProcessWorker { proxy }
    }
}

fn encode_args<T: Serialize>(value: &T) -> Result<serde_json::Value, WorkerError> {
    serde_json::to_value(value).map_err(|e| WorkerError::Protocol(e.to_string()))
}

fn decode_value<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
) -> Result<T, WorkerError> {
    serde_json::from_value(value)
        .map_err(|e| WorkerError::Protocol(format!("malformed worker response: {e}")))
}

impl TestRunner for ProcessWorker {
    async fn run_dry(&mut self, options: &DryRunOptions) -> Result<DryRunOutcome, WorkerError> {
        match self.proxy.call("dryRun", encode_args(options)?).await {
            Ok(value) => {
                let response: DryRunResponse = decode_value(value)?;
                Ok(DryRunOutcome::Complete {
                    tests: response.tests,
                    coverage: response.coverage.unwrap_or(CoverageAnalysis::Off),
                })
            }
            // Application-level failure: the baseline itself is broken.
            Err(WorkerError::Rejection(message)) => Ok(DryRunOutcome::Error { message }),
            Err(e) => Err(e),
        }
    }

    async fn run_mutant(
        &mut self,
        options: &RunOptions,
    ) -> Result<MutantRunOutcome, WorkerError> {
        match self.proxy.call("mutantRun", encode_args(options)?).await {
            Ok(value) => {
                let response: MutantRunResponse = decode_value(value)?;
                Ok(MutantRunOutcome {
                    kind: MutantOutcomeKind::Complete {
                        tests: response.tests,
                    },
                    hit_count: response.hit_count,
                })
            }
            // Deterministic worker-side error; becomes an Error verdict.
            Err(WorkerError::Rejection(message)) => Ok(MutantRunOutcome {
                kind: MutantOutcomeKind::Error { message },
                hit_count: None,
            }),
            Err(e) => Err(e),
        }
    }

    async fn dispose(&mut self) {
        self.proxy.dispose().await;
    }
}

pub struct ProcessWorkerFactory {
    config: WorkerConfig,
}

impl ProcessWorkerFactory {
    pub fn new(config: WorkerConfig) -> Self {
        ProcessWorkerFactory { config }
    }
}

impl WorkerFactory for ProcessWorkerFactory {
    type Runner = ProcessWorker;

    async fn create(&self) -> Result<ProcessWorker, WorkerError> {
        let proxy = WorkerProxy::spawn(&self.config).await?;
        Ok(ProcessWorker::new(proxy))
    }
}
