//! A bounded collection of workers behind the concurrency token stream.
//! Workers are created lazily, handed to one caller at a time, and replaced
//! transparently when they crash: the in-flight call is retried exactly once
//! against a fresh worker, then the error propagates. Timeouts are never
//! retried; the wedged worker is discarded and the slot returned empty.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, Notify, mpsc};
use tracing::{debug, warn};

use crate::errors::WorkerError;
use crate::mutants::{DryRunOutcome, MutantRunOutcome};
use crate::timeout::{self, TimedCall};
use crate::tokens::ConcurrencyToken;
use crate::worker::{DryRunOptions, RunOptions, TestRunner, WorkerFactory};

/// One concurrency slot. The token is held for the slot's lifetime; the
/// runner is built lazily and absent after a recycle.
struct Slot<R> {
    _token: ConcurrencyToken,
    runner: Option<R>,
}

struct Receivers<R> {
    tokens: mpsc::Receiver<ConcurrencyToken>,
    tokens_closed: bool,
    returns: mpsc::UnboundedReceiver<Slot<R>>,
    /// Slots ever minted from tokens. Every one of them comes back through
    /// the returns channel once its call settles, so dispose collects
    /// exactly this many.
    slots: usize,
}

pub struct WorkerPool<F: WorkerFactory> {
    factory: F,
    receivers: Mutex<Receivers<F::Runner>>,
    returns_tx: mpsc::UnboundedSender<Slot<F::Runner>>,
    disposed: AtomicBool,
    shutdown: Notify,
}

fn disposed_error() -> WorkerError {
    WorkerError::Initialization("worker pool is disposed".into())
}

impl<F: WorkerFactory> WorkerPool<F> {
    pub fn new(factory: F, tokens: mpsc::Receiver<ConcurrencyToken>) -> Self {
        let (returns_tx, returns) = mpsc::unbounded_channel();
        WorkerPool {
            factory,
            receivers: Mutex::new(Receivers {
                tokens,
                tokens_closed: false,
                returns,
                slots: 0,
            }),
            returns_tx,
            disposed: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Suspends until a slot is free: an idle worker returned by an earlier
    /// call, or a fresh concurrency token (worker built lazily later). Wakes
    /// with an error if the pool is disposed while waiting.
    async fn acquire(&self) -> Result<Slot<F::Runner>, WorkerError> {
        let shutdown = self.shutdown.notified();
        tokio::pin!(shutdown);
        // Register before checking the flag, so a dispose landing between
        // the check and the select still wakes this waiter.
        shutdown.as_mut().enable();
        if self.disposed.load(Ordering::SeqCst) {
            return Err(disposed_error());
        }
        let mut rx = self.receivers.lock().await;
        // Deref once so the select arms borrow disjoint fields.
        let rx = &mut *rx;
        let slot = loop {
            if rx.tokens_closed {
                tokio::select! {
                    _ = &mut shutdown => return Err(disposed_error()),
                    slot = rx.returns.recv() => match slot {
                        Some(slot) => break slot,
                        None => return Err(disposed_error()),
                    },
                }
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => return Err(disposed_error()),
                slot = rx.returns.recv() => match slot {
                    Some(slot) => break slot,
                    None => return Err(disposed_error()),
                },
                token = rx.tokens.recv() => match token {
                    Some(token) => {
                        rx.slots += 1;
                        break Slot { _token: token, runner: None };
                    }
                    None => rx.tokens_closed = true,
                },
            }
        };
        Ok(slot)
    }

    fn release(&self, slot: Slot<F::Runner>) {
        let _ = self.returns_tx.send(slot);
    }

    async fn checkout(&self) -> Result<(Slot<F::Runner>, F::Runner), WorkerError> {
        let mut slot = self.acquire().await?;
        match slot.runner.take() {
            Some(runner) => Ok((slot, runner)),
            None => match self.factory.create().await {
                Ok(runner) => Ok((slot, runner)),
                Err(e) => {
                    self.release(slot);
                    Err(e)
                }
            },
        }
    }

    async fn replacement_after(&self, err: &WorkerError) -> Result<F::Runner, WorkerError> {
        if err.is_oom() {
            warn!("worker ran out of memory, replacing it and retrying the call once: {err}");
        } else {
            warn!("worker crashed, replacing it and retrying the call once: {err}");
        }
        self.factory.create().await
    }

    /// One mutant run: acquire, call under the per-mutant deadline, retry
    /// once on crash.
    pub async fn run_mutant(&self, options: &RunOptions) -> Result<MutantRunOutcome, WorkerError> {
        let (mut slot, mut runner) = self.checkout().await?;

        let first = timeout::run_mutant_with_timeout(&mut runner, options).await;
        let attempt = match first {
            TimedCall::Settled(Err(err)) if err.is_crash() => {
                runner.dispose().await;
                match self.replacement_after(&err).await {
                    Ok(mut replacement) => {
                        let retried =
                            timeout::run_mutant_with_timeout(&mut replacement, options).await;
                        runner = replacement;
                        retried
                    }
                    Err(create_err) => {
                        self.release(slot);
                        return Err(create_err);
                    }
                }
            }
            other => other,
        };

        match attempt {
            TimedCall::TimedOut => {
                debug!(mutant = %options.active_mutant, "mutant run timed out, recycling worker");
                runner.dispose().await;
                self.release(slot);
                Ok(timeout::timed_out_mutant_run())
            }
            TimedCall::Settled(Ok(outcome)) => {
                slot.runner = Some(runner);
                self.release(slot);
                Ok(outcome)
            }
            TimedCall::Settled(Err(err)) => {
                // Crash on the retry, or a protocol/io failure: the stream
                // state is suspect either way.
                runner.dispose().await;
                self.release(slot);
                Err(err)
            }
        }
    }

    /// The baseline run, under the same acquire/retry contract.
    pub async fn run_dry(&self, options: &DryRunOptions) -> Result<DryRunOutcome, WorkerError> {
        let (mut slot, mut runner) = self.checkout().await?;

        let first = timeout::run_dry_with_timeout(&mut runner, options).await;
        let attempt = match first {
            TimedCall::Settled(Err(err)) if err.is_crash() => {
                runner.dispose().await;
                match self.replacement_after(&err).await {
                    Ok(mut replacement) => {
                        let retried =
                            timeout::run_dry_with_timeout(&mut replacement, options).await;
                        runner = replacement;
                        retried
                    }
                    Err(create_err) => {
                        self.release(slot);
                        return Err(create_err);
                    }
                }
            }
            other => other,
        };

        match attempt {
            TimedCall::TimedOut => {
                debug!("dry run timed out, recycling worker");
                runner.dispose().await;
                self.release(slot);
                Ok(DryRunOutcome::Timeout)
            }
            TimedCall::Settled(Ok(outcome)) => {
                slot.runner = Some(runner);
                self.release(slot);
                Ok(outcome)
            }
            TimedCall::Settled(Err(err)) => {
                runner.dispose().await;
                self.release(slot);
                Err(err)
            }
        }
    }

    /// Dispose every worker, waiting for in-flight calls to settle first.
    /// Idempotent; a second call returns immediately.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Wake any acquire parked on the receivers; it errors out and
        // releases the lock.
        self.shutdown.notify_waiters();
        let mut rx = self.receivers.lock().await;
        for _ in 0..rx.slots {
            match rx.returns.recv().await {
                Some(slot) => {
                    if let Some(mut runner) = slot.runner {
                        runner.dispose().await;
                    }
                }
                None => break,
            }
        }
        rx.slots = 0;
        rx.tokens.close();
    }
}
