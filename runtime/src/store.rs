//! The store: state, reducer and environment behind one handle.

use crate::StoreError;
use crate::handle::{EffectHandle, Tracker};
use futures::StreamExt;
use pixwap_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, broadcast};

/// Room for one upload batch's progress burst.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Runs one reducer.
///
/// `send` reduces under the state write lock, so the new state is visible as
/// soon as it returns. Returned effects run on spawned tasks; every action
/// they produce is reduced in turn and then published to
/// [`subscribe_actions`](Self::subscribe_actions) observers. Actions passed
/// to `send` directly are never published.
///
/// Clones share state, counters and the broadcast channel.
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    closing: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    observed: broadcast::Sender<A>,
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            closing: Arc::clone(&self.closing),
            in_flight: Arc::clone(&self.in_flight),
            observed: self.observed.clone(),
        }
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Store with the default broadcast capacity.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, DEFAULT_BROADCAST_CAPACITY)
    }

    /// Store whose observers may fall `capacity` actions behind before lagging.
    #[must_use]
    pub fn with_broadcast_capacity(initial_state: S, reducer: R, environment: E, capacity: usize) -> Self {
        let (observed, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            closing: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            observed,
        }
    }

    /// Services injected into the reducer.
    #[must_use]
    pub const fn environment(&self) -> &E {
        &self.environment
    }

    /// Effects running across every `send`.
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// True once [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Read state through a closure.
    pub async fn state<F, T>(&self, read: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        read(&*self.state.read().await)
    }

    /// Observe actions produced by effects, after they are reduced.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.observed.subscribe()
    }

    /// Reduce `action` and start its effects.
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after `shutdown`.
    #[tracing::instrument(skip_all, name = "store_send")]
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
        let (handle, tracker) = EffectHandle::new();
        self.reduce(action, &tracker).await?;
        Ok(handle)
    }

    /// Send, then wait for the first produced action matching `predicate`.
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`], [`StoreError::Timeout`] or
    /// [`StoreError::ChannelClosed`].
    pub async fn send_and_wait_for<F>(&self, action: A, predicate: F, timeout: Duration) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let rx = self.subscribe_actions();
        self.send(action).await?;
        wait_for(rx, predicate, timeout).await
    }

    /// Refuse new actions and give running effects until `timeout` to finish.
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownTimeout`] with the number still running.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.closing.store(true, Ordering::Release);
        metrics::counter!("pixwap_store_shutdowns_total").increment(1);
        tracing::info!(pending = self.pending_effects(), "Store draining");

        let deadline = Instant::now() + timeout;
        loop {
            let pending = self.pending_effects();
            if pending == 0 {
                tracing::info!("Store drained");
                return Ok(());
            }
            if Instant::now() >= deadline {
                tracing::error!(pending, "Store did not drain before the deadline");
                return Err(StoreError::ShutdownTimeout(pending));
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    async fn reduce(&self, action: A, tracker: &Tracker) -> Result<(), StoreError> {
        if self.is_shutting_down() {
            tracing::warn!("Action rejected, store is shutting down");
            return Err(StoreError::ShutdownInProgress);
        }
        metrics::counter!("pixwap_store_actions_total").increment(1);

        let effects = {
            let mut state = self.state.write().await;
            let started = Instant::now();
            let effects = self.reducer.reduce(&mut state, action, &self.environment);
            metrics::histogram!("pixwap_store_reduce_seconds").record(started.elapsed().as_secs_f64());
            effects
        };
        tracing::trace!(effects = effects.len(), "Reduced");

        for effect in effects {
            self.run(effect, tracker);
        }
        Ok(())
    }

    /// Reduce an effect's output, then publish it. Follow-up effects stay on
    /// the originating tracker.
    async fn feed_back(&self, action: A, tracker: &Tracker) {
        let published = action.clone();
        match self.reduce(action, tracker).await {
            Ok(()) => {
                let _ = self.observed.send(published);
            },
            Err(error) => tracing::debug!(%error, "Effect output dropped"),
        }
    }

    /// Start `effect` under `tracker`. Leaf effects get their own task.
    fn run(&self, effect: Effect<A>, tracker: &Tracker) {
        let kind = match &effect {
            Effect::None => return,
            Effect::Parallel(_) => "parallel",
            Effect::Sequential(_) => "sequential",
            Effect::Delay { .. } => "delay",
            Effect::Future(_) => "future",
            Effect::Stream(_) => "stream",
        };
        metrics::counter!("pixwap_store_effects_total", "kind" => kind).increment(1);

        if let Effect::Parallel(children) = effect {
            for child in children {
                self.run(child, tracker);
            }
            return;
        }

        let guard = tracker.start(&self.in_flight);
        let store = self.clone();
        let tracker = tracker.clone();
        tokio::spawn(async move {
            let _guard = guard;
            match effect {
                Effect::Future(fut) => {
                    if let Some(action) = fut.await {
                        store.feed_back(action, &tracker).await;
                    }
                },
                Effect::Stream(mut stream) => {
                    while let Some(action) = stream.next().await {
                        store.feed_back(action, &tracker).await;
                    }
                },
                Effect::Delay { duration, action } => {
                    tokio::time::sleep(duration).await;
                    store.feed_back(*action, &tracker).await;
                },
                Effect::Sequential(steps) => {
                    // Each step, and whatever it feeds back, settles before the next.
                    // Feedback from a step runs under the step's own handle, so the
                    // step guard keeps the outer handle open meanwhile.
                    for step in steps {
                        let (mut done, step_tracker) = EffectHandle::new();
                        store.run(step, &step_tracker);
                        drop(step_tracker);
                        done.wait().await;
                    }
                },
                Effect::None | Effect::Parallel(_) => {},
            }
        });
    }
}

/// Wait on `rx` for the first action matching `predicate`.
///
/// Subscribe before sending, then call this, and no action is missed.
///
/// # Errors
///
/// [`StoreError::Timeout`] or [`StoreError::ChannelClosed`].
pub async fn wait_for<A, F>(mut rx: broadcast::Receiver<A>, predicate: F, timeout: Duration) -> Result<A, StoreError>
where
    A: Clone,
    F: Fn(&A) -> bool,
{
    let search = async {
        loop {
            match rx.recv().await {
                Ok(action) if predicate(&action) => return Ok(action),
                Ok(_) => {},
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Action observer lagged");
                },
                Err(broadcast::error::RecvError::Closed) => return Err(StoreError::ChannelClosed),
            }
        }
    };
    tokio::time::timeout(timeout, search)
        .await
        .map_err(|_| StoreError::Timeout)?
}
