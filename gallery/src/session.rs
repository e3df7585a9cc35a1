//! Session context.
//!
//! Owns the session [`Store`] and the task forwarding identity state changes
//! into it. Built once at start and shared by everything that needs the
//! signed-in user.

use crate::actions::SessionAction;
use crate::environment::{Backend, GalleryEnvironment};
use crate::guard::{GuardDecision, guard};
use crate::providers::IdentityProvider;
use crate::reducers::SessionReducer;
use crate::state::{SessionState, UserProfile};
use pixwap_runtime::{EffectHandle, Store, StoreError, wait_for};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Store type behind a [`SessionContext`].
pub type SessionStore<B> = Store<SessionState, SessionAction, GalleryEnvironment<B>, SessionReducer<B>>;

/// Session context.
///
/// Publishes `{current_user, loading, error}` through [`SessionState`].
/// Dropping the context stops forwarding identity changes.
pub struct SessionContext<B: Backend> {
    store: SessionStore<B>,
    forwarder: JoinHandle<()>,
    /// Bumped after every action sent straight to the store. The store only
    /// publishes actions produced by effects.
    reduced: watch::Sender<u64>,
}

async fn send_and_bump<B: Backend>(
    store: &SessionStore<B>,
    reduced: &watch::Sender<u64>,
    action: SessionAction,
) -> Result<EffectHandle, StoreError> {
    let handle = store.send(action).await?;
    reduced.send_modify(|count| *count = count.wrapping_add(1));
    Ok(handle)
}

impl<B: Backend> SessionContext<B> {
    /// Start the session.
    ///
    /// Restores the cached profile, subscribes to identity changes, then asks
    /// the identity provider to restore the persisted session. The returned
    /// context is still `loading` until the provider's first report has been
    /// synchronised.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the session store rejects the cache restore.
    pub async fn start(env: GalleryEnvironment<B>) -> Result<Self, StoreError> {
        let store = Store::new(SessionState::starting(), SessionReducer::new(), env.clone());
        store.send(SessionAction::RestoreCache).await?.wait().await;

        let mut subscription = env.identity.subscribe();
        let identity = env.identity;
        let forward_to = store.clone();
        let (reduced, _) = watch::channel(0_u64);
        let notify = reduced.clone();

        let forwarder = tokio::spawn(async move {
            if let Err(error) = identity.restore().await {
                tracing::warn!(error = %error, "Could not restore persisted session");
            }
            while let Some(user) = subscription.changed().await {
                let forwarded = send_and_bump(&forward_to, &notify, SessionAction::IdentityChanged { user }).await;
                if forwarded.is_err() {
                    break;
                }
            }
            tracing::debug!("Identity forwarding stopped");
        });

        Ok(Self {
            store,
            forwarder,
            reduced,
        })
    }

    /// Current session state.
    pub async fn snapshot(&self) -> SessionState {
        self.store.state(Clone::clone).await
    }

    /// Signed-in user's profile, settled or not.
    pub async fn current_user(&self) -> Option<UserProfile> {
        self.store.state(|state| state.current_user.clone()).await
    }

    /// Guard decision for the current state.
    pub async fn guard(&self) -> GuardDecision {
        self.store.state(guard).await
    }

    /// Wait until no sync or account request is outstanding.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`] if the session does not settle in time
    /// - [`StoreError::ChannelClosed`] if the store is gone
    pub async fn settled(&self, timeout: Duration) -> Result<SessionState, StoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Subscribe before reading so no change slips in between.
            let actions = self.store.subscribe_actions();
            let mut reduced = self.reduced.subscribe();
            let state = self.snapshot().await;
            if state.is_settled() {
                return Ok(state);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(StoreError::Timeout);
            }
            tokio::select! {
                published = wait_for(actions, |_| true, remaining) => {
                    published?;
                }
                _ = reduced.changed() => {}
            }
        }
    }

    /// Send an action to the session store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    pub async fn send(&self, action: SessionAction) -> Result<EffectHandle, StoreError> {
        send_and_bump(&self.store, &self.reduced, action).await
    }

    /// Send an account request and wait for the session to settle.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send) and [`settled`](Self::settled).
    pub async fn request(&self, action: SessionAction, timeout: Duration) -> Result<SessionState, StoreError> {
        self.send(action).await?;
        self.settled(timeout).await
    }

    /// Stop forwarding identity changes and drain the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects do not finish in time.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.forwarder.abort();
        self.store.shutdown(timeout).await
    }
}

impl<B: Backend> Drop for SessionContext<B> {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use crate::mocks::{MemoryProfileCache, mock_environment};
    use crate::state::UserId;

    const SETTLE: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn starts_signed_out_without_persisted_session() {
        let ctx = SessionContext::start(mock_environment()).await.expect("session starts");

        let state = ctx.settled(SETTLE).await;
        assert!(matches!(state, Ok(ref s) if s.current_user.is_none() && !s.loading));
        assert_eq!(ctx.guard().await, GuardDecision::RedirectToLogin);
    }

    #[tokio::test]
    async fn cached_profile_is_visible_while_loading() {
        let cached = UserProfile::new_free(UserId::new("u1"), "ada@example.com", "Ada");
        let mut env = mock_environment();
        env.cache = MemoryProfileCache::with_profile(cached.clone());

        let store = Store::new(SessionState::starting(), SessionReducer::new(), env);
        let mut handle = store.send(SessionAction::RestoreCache).await.expect("store is running");
        handle.wait().await;

        let state = store.state(Clone::clone).await;
        assert_eq!(state.current_user, Some(cached));
        assert!(state.loading);
        assert_eq!(guard(&state), GuardDecision::Pending);
    }
}
