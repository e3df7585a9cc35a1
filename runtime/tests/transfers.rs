//! Integration tests for the Store under parallel progress streams.
//!
//! Models a batch of file transfers: each file reports progress through its
//! own stream, the last report of the batch triggers a follow-up read, and
//! observers wait on the broadcast for the batch result.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use pixwap_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use pixwap_runtime::{Store, StoreError, wait_for};
use std::collections::HashMap;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TransferAction {
    /// Start one stream per file size.
    Start { sizes: Vec<u64> },
    /// Bytes sent so far for one file.
    Progress { file: usize, sent: u64 },
    /// A file finished.
    FileDone { file: usize },
    /// A file failed.
    FileFailed { file: usize },
    /// Follow-up read after the last file.
    Refreshed { done: usize },
    /// Batch result.
    Finished { done: usize, failed: usize },
}

#[derive(Debug, Clone, Default)]
struct TransferState {
    sent: HashMap<usize, u64>,
    remaining: usize,
    done: usize,
    failed: usize,
    refreshed: bool,
}

/// Files larger than this fail after their first chunk.
#[derive(Debug, Clone, Copy)]
struct TransferEnv {
    chunk: u64,
    max_size: u64,
}

#[derive(Debug, Clone)]
struct TransferReducer;

impl Reducer for TransferReducer {
    type State = TransferState;
    type Action = TransferAction;
    type Environment = TransferEnv;

    fn reduce(
        &self,
        state: &mut TransferState,
        action: TransferAction,
        env: &TransferEnv,
    ) -> SmallVec<[Effect<TransferAction>; 4]> {
        match action {
            TransferAction::Start { sizes } => {
                *state = TransferState {
                    remaining: sizes.len(),
                    ..TransferState::default()
                };
                let env = *env;
                let streams = sizes
                    .into_iter()
                    .enumerate()
                    .map(|(file, size)| {
                        Effect::Stream(Box::pin(async_stream::stream! {
                            let mut sent = 0;
                            while sent < size {
                                tokio::task::yield_now().await;
                                sent = (sent + env.chunk).min(size);
                                yield TransferAction::Progress { file, sent };
                                if size > env.max_size {
                                    yield TransferAction::FileFailed { file };
                                    return;
                                }
                            }
                            yield TransferAction::FileDone { file };
                        }))
                    })
                    .collect();
                smallvec![Effect::Parallel(streams)]
            },
            TransferAction::Progress { file, sent } => {
                state.sent.insert(file, sent);
                smallvec![Effect::None]
            },
            TransferAction::FileDone { .. } | TransferAction::FileFailed { .. } => {
                if matches!(action, TransferAction::FileDone { .. }) {
                    state.done += 1;
                } else {
                    state.failed += 1;
                }
                state.remaining -= 1;
                if state.remaining > 0 {
                    return smallvec![Effect::None];
                }
                let done = state.done;
                smallvec![Effect::Future(Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Some(TransferAction::Refreshed { done })
                }))]
            },
            TransferAction::Refreshed { done } => {
                state.refreshed = true;
                let failed = state.failed;
                smallvec![Effect::Future(Box::pin(async move {
                    Some(TransferAction::Finished { done, failed })
                }))]
            },
            TransferAction::Finished { .. } => smallvec![Effect::None],
        }
    }
}

type TransferStore = Store<TransferState, TransferAction, TransferEnv, TransferReducer>;

fn store() -> TransferStore {
    Store::new(
        TransferState::default(),
        TransferReducer,
        TransferEnv {
            chunk: 4,
            max_size: 64,
        },
    )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_handle_covers_every_stream_and_follow_up() {
    let store = store();

    store
        .send(TransferAction::Start {
            sizes: vec![10, 17, 3],
        })
        .await
        .unwrap()
        .wait_with_timeout(WAIT)
        .await
        .unwrap();

    let state = store.state(Clone::clone).await;
    assert_eq!(state.done, 3);
    assert_eq!(state.failed, 0);
    assert!(state.refreshed);
    assert_eq!(state.sent.get(&0), Some(&10));
    assert_eq!(state.sent.get(&1), Some(&17));
    assert_eq!(state.sent.get(&2), Some(&3));
    assert_eq!(store.pending_effects(), 0);
}

#[tokio::test]
async fn test_partial_failure_completes_the_batch() {
    let store = store();

    let finished = store
        .send_and_wait_for(
            TransferAction::Start {
                sizes: vec![8, 100, 12],
            },
            |action| matches!(action, TransferAction::Finished { .. }),
            WAIT,
        )
        .await
        .unwrap();

    assert_eq!(finished, TransferAction::Finished { done: 2, failed: 1 });
    // The failing file stopped after its first chunk.
    assert_eq!(store.state(|s| s.sent.get(&1).copied()).await, Some(4));
}

#[tokio::test]
async fn test_progress_is_broadcast_in_stream_order() {
    let store = store();
    let mut rx = store.subscribe_actions();

    store
        .send(TransferAction::Start { sizes: vec![12] })
        .await
        .unwrap()
        .wait_with_timeout(WAIT)
        .await
        .unwrap();

    let mut progress = Vec::new();
    while let Ok(action) = rx.try_recv() {
        if let TransferAction::Progress { sent, .. } = action {
            progress.push(sent);
        }
    }
    assert_eq!(progress, vec![4, 8, 12]);
}

#[tokio::test]
async fn test_sent_actions_are_not_broadcast() {
    let store = store();
    let rx = store.subscribe_actions();

    store
        .send(TransferAction::Finished { done: 0, failed: 0 })
        .await
        .unwrap();

    let result = wait_for(rx, |_| true, Duration::from_millis(50)).await;
    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test]
async fn test_observer_subscribed_late_can_still_wait_on_state() {
    let store = store();

    let mut handle = store
        .send(TransferAction::Start { sizes: vec![40, 40] })
        .await
        .unwrap();

    // Subscribe, then read state, then wait: nothing slips in between.
    let rx = store.subscribe_actions();
    let finished = if store.state(|s| s.refreshed).await {
        None
    } else {
        Some(
            wait_for(rx, |a| matches!(a, TransferAction::Finished { .. }), WAIT)
                .await
                .unwrap(),
        )
    };

    handle.wait_with_timeout(WAIT).await.unwrap();
    if let Some(finished) = finished {
        assert_eq!(finished, TransferAction::Finished { done: 2, failed: 0 });
    }
    assert!(store.state(|s| s.refreshed).await);
}

#[tokio::test]
async fn test_shutdown_waits_for_streams_in_flight() {
    let store = store();

    store
        .send(TransferAction::Start { sizes: vec![60, 60] })
        .await
        .unwrap();
    store.shutdown(WAIT).await.unwrap();

    assert_eq!(store.pending_effects(), 0);
    assert!(matches!(
        store.send(TransferAction::Start { sizes: vec![1] }).await,
        Err(StoreError::ShutdownInProgress)
    ));
}
