use mutator_engine::default_concurrency;
use mutator_engine::tokens::{ConcurrencyTokenProvider, token_budget};

// --- token_budget ---

#[test]
fn budget_no_checkers_gives_everything_to_tests() {
    assert_eq!(token_budget(8, 0), (0, 8));
    assert_eq!(token_budget(1, 0), (0, 1));
}

#[test]
fn budget_splits_half_and_half() {
    assert_eq!(token_budget(4, 2), (2, 2));
}

#[test]
fn budget_rounds_checker_share_up() {
    assert_eq!(token_budget(5, 1), (3, 2));
}

#[test]
fn budget_clamps_both_sides_to_one() {
    assert_eq!(token_budget(1, 1), (1, 1));
    assert_eq!(token_budget(2, 3), (1, 1));
}

// --- provider, no checkers ---

#[tokio::test]
async fn no_checkers_emits_all_test_tokens_and_closes() {
    let (_provider, mut test_rx, mut checker_rx) = ConcurrencyTokenProvider::new(4, 0);

    for _ in 0..4 {
        assert!(test_rx.try_recv().is_ok(), "token should already be buffered");
    }
    assert!(test_rx.recv().await.is_none(), "test stream should be closed");
    assert!(checker_rx.recv().await.is_none(), "checker stream should be empty");
}

// --- provider, with checkers ---

#[tokio::test]
async fn checkers_split_then_free_checkers_tops_up_and_closes() {
    let (mut provider, mut test_rx, mut checker_rx) = ConcurrencyTokenProvider::new(4, 2);

    // Checker stream: 2 tokens, complete immediately.
    assert!(checker_rx.try_recv().is_ok());
    assert!(checker_rx.try_recv().is_ok());
    assert!(checker_rx.recv().await.is_none());

    // Test stream: 2 tokens up front, nothing more yet.
    assert!(test_rx.try_recv().is_ok());
    assert!(test_rx.try_recv().is_ok());
    assert!(test_rx.try_recv().is_err());

    provider.free_checkers();

    // 2 more arrive, then the stream closes. Total ever emitted = 4.
    assert!(test_rx.try_recv().is_ok());
    assert!(test_rx.try_recv().is_ok());
    assert!(test_rx.recv().await.is_none());
}

#[tokio::test]
async fn tokens_are_replayable_for_a_late_consumer() {
    let (mut provider, mut test_rx, _checker_rx) = ConcurrencyTokenProvider::new(4, 2);
    provider.free_checkers();

    // Nothing was consumed before free_checkers; all 4 are still there.
    let mut seen = 0;
    while test_rx.recv().await.is_some() {
        seen += 1;
    }
    assert_eq!(seen, 4);
}

#[tokio::test]
async fn free_checkers_is_idempotent() {
    let (mut provider, mut test_rx, _checker_rx) = ConcurrencyTokenProvider::new(4, 2);
    provider.free_checkers();
    provider.free_checkers();

    let mut seen = 0;
    while test_rx.recv().await.is_some() {
        seen += 1;
    }
    assert_eq!(seen, 4, "a second free_checkers must not emit more tokens");
}

#[tokio::test]
async fn lifetime_total_never_exceeds_concurrency() {
    // Checker permits become test permits after free_checkers, so the test
    // stream's lifetime total is exactly the configured concurrency.
    for concurrency in 2..=9 {
        let (mut provider, mut test_rx, _checker_rx) =
            ConcurrencyTokenProvider::new(concurrency, 2);
        provider.free_checkers();

        let mut total = 0;
        while test_rx.recv().await.is_some() {
            total += 1;
        }
        assert_eq!(total, concurrency);

        let (checkers, tests) = token_budget(concurrency, 2);
        assert_eq!(checkers + tests, concurrency);
    }
}

// --- default_concurrency ---

#[test]
fn default_concurrency_uses_all_small_machines() {
    assert_eq!(default_concurrency(1), 1);
    assert_eq!(default_concurrency(4), 4);
}

#[test]
fn default_concurrency_leaves_one_core_on_larger_machines() {
    assert_eq!(default_concurrency(5), 4);
    assert_eq!(default_concurrency(8), 7);
}
