use thiserror::Error;

/// Errors a single worker (or a call through it) can produce.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(
        "worker process crashed (pid {pid:?}, exit code {exit_code:?}, signal {signal:?}, out of memory: {out_of_memory})"
    )]
    ProcessCrashed {
        pid: Option<u32>,
        exit_code: Option<i32>,
        signal: Option<i32>,
        out_of_memory: bool,
    },

    #[error("worker failed to initialize: {0}")]
    Initialization(String),

    /// The worker reported an application-level error through the IPC
    /// protocol. Deterministic, so never retried.
    #[error("worker rejected the call: {0}")]
    Rejection(String),

    #[error("worker protocol violation: {0}")]
    Protocol(String),

    #[error("worker io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Crashes (including the out-of-memory subtype) are the only errors the
    /// pool retries.
    pub fn is_crash(&self) -> bool {
        matches!(self, WorkerError::ProcessCrashed { .. })
    }

    pub fn is_oom(&self) -> bool {
        matches!(
            self,
            WorkerError::ProcessCrashed {
                out_of_memory: true,
                ..
            }
        )
    }
}

/// Session-fatal failures. Per-mutant crashes and timeouts never surface
/// here; they become verdicts instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no worker could be initialized: {0}")]
    Worker(#[from] WorkerError),

    #[error("tests fail before mutation: {0}")]
    BrokenBaseline(String),

    #[error("baseline test run timed out")]
    BaselineTimeout,
}

/// Classify an exited process. On unix, SIGKILL (or the conventional
/// 128+9 exit code) is how the kernel OOM killer reaps a process; other
/// platforms never report out-of-memory.
pub fn crash_error(
    pid: Option<u32>,
    exit_code: Option<i32>,
    signal: Option<i32>,
) -> WorkerError {
    let out_of_memory = signal == Some(9) || exit_code == Some(137);
    WorkerError::ProcessCrashed {
        pid,
        exit_code,
        signal,
        out_of_memory,
    }
}
