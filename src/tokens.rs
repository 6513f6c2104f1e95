use tokio::sync::mpsc;

/// An opaque permit. The pool never dispatches more concurrent calls than
/// there are outstanding tokens.
#[derive(Debug)]
pub struct ConcurrencyToken(());

/// Split a concurrency budget between checker and test-runner roles.
/// With no checkers everything goes to test execution.
pub fn token_budget(concurrency: usize, checkers: usize) -> (usize, usize) {
    if checkers == 0 {
        (0, concurrency)
    } else {
        (concurrency.div_ceil(2).max(1), (concurrency / 2).max(1))
    }
}

/// Emits checker and test-execution permits as two disjoint buffered
/// streams. Tokens are issued eagerly into bounded channels, so a consumer
/// that subscribes late still sees everything already emitted.
pub struct ConcurrencyTokenProvider {
    test_tx: Option<mpsc::Sender<ConcurrencyToken>>,
    held_by_checkers: usize,
}

impl ConcurrencyTokenProvider {
    /// Returns the provider plus the test-execution and checker token
    /// streams. The checker stream is complete (and closed) immediately;
    /// the test stream closes once `free_checkers` has run.
    pub fn new(
        concurrency: usize,
        checkers: usize,
    ) -> (
        Self,
        mpsc::Receiver<ConcurrencyToken>,
        mpsc::Receiver<ConcurrencyToken>,
    ) {
        let (checker_tokens, test_tokens) = token_budget(concurrency, checkers);

        let (checker_tx, checker_rx) = mpsc::channel(checker_tokens.max(1));
        for _ in 0..checker_tokens {
            checker_tx
                .try_send(ConcurrencyToken(()))
                .expect("checker channel sized for every checker token");
        }
        drop(checker_tx);

        // Sized for every token that can ever be emitted, so emission never
        // blocks on a slow consumer.
        let (test_tx, test_rx) = mpsc::channel(test_tokens + checker_tokens.max(1));
        for _ in 0..test_tokens {
            test_tx
                .try_send(ConcurrencyToken(()))
                .expect("test channel sized for every test token");
        }

        let provider = ConcurrencyTokenProvider {
            // No checkers: nothing will ever be freed, close the stream now.
            test_tx: (checker_tokens > 0).then_some(test_tx),
            held_by_checkers: checker_tokens,
        };
        (provider, test_rx, checker_rx)
    }

    /// Called once static checking is complete: the checker permits become
    /// test-execution permits and the test stream closes. Idempotent.
    pub fn free_checkers(&mut self) {
        if let Some(tx) = self.test_tx.take() {
            for _ in 0..self.held_by_checkers {
                tx.try_send(ConcurrencyToken(()))
                    .expect("test channel sized for freed checker tokens");
            }
        }
    }
}
