//! Completion tracking for one `send`.

use crate::StoreError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Resolves once every effect started by a `send` has finished, including
/// effects of the actions those effects fed back.
///
/// ```ignore
/// let mut handle = store.send(GalleryAction::StartUpload { event_id }).await?;
/// handle.wait_with_timeout(Duration::from_secs(60)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    in_flight: Arc<AtomicUsize>,
    settled: watch::Receiver<()>,
}

impl EffectHandle {
    pub(crate) fn new() -> (Self, Tracker) {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let (notify, settled) = watch::channel(());
        (
            Self {
                in_flight: Arc::clone(&in_flight),
                settled,
            },
            Tracker { in_flight, notify },
        )
    }

    /// A handle with nothing to wait for.
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracker) = Self::new();
        handle
    }

    /// Effects still running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until nothing is running.
    pub async fn wait(&mut self) {
        while self.pending() > 0 {
            // Err: every tracker dropped, so nothing can still be running.
            if self.settled.changed().await.is_err() {
                break;
            }
        }
    }

    /// [`wait`](Self::wait), bounded.
    ///
    /// # Errors
    ///
    /// [`StoreError::Timeout`] when effects are still running at the deadline.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Counting side of an [`EffectHandle`], carried through effect execution.
#[derive(Clone)]
pub(crate) struct Tracker {
    in_flight: Arc<AtomicUsize>,
    notify: watch::Sender<()>,
}

impl Tracker {
    /// Count one effect until the returned guard drops.
    ///
    /// `store_wide` is the store's own counter used by shutdown.
    pub(crate) fn start(&self, store_wide: &Arc<AtomicUsize>) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        store_wide.fetch_add(1, Ordering::SeqCst);
        InFlight {
            tracker: self.clone(),
            store_wide: Arc::clone(store_wide),
        }
    }
}

/// Decrements both counters on drop, panics included.
pub(crate) struct InFlight {
    tracker: Tracker,
    store_wide: Arc<AtomicUsize>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.store_wide.fetch_sub(1, Ordering::SeqCst);
        if self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.tracker.notify.send(());
        }
    }
}
