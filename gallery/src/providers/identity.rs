//! Identity provider trait and state-change subscription.

use crate::error::Result;
use crate::state::UserHandle;
use std::future::Future;
use tokio::sync::watch;

/// Identity provider.
///
/// Abstracts sign-up, sign-in and sign-out against an external identity
/// service, plus a subscription to identity state changes (sign-in, sign-out,
/// token refresh).
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The email is already registered → `GalleryError::DuplicateAccount`
    /// - The password is rejected → `GalleryError::WeakPassword`
    /// - The provider fails → `GalleryError::IdentityProvider`
    fn create_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> impl Future<Output = Result<UserHandle>> + Send;

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Credentials are wrong → `GalleryError::InvalidCredentials`
    /// - The provider fails → `GalleryError::IdentityProvider`
    fn sign_in(&self, email: &str, password: &str) -> impl Future<Output = Result<UserHandle>> + Send;

    /// Sign out the current user.
    ///
    /// # Errors
    ///
    /// Returns error if persisted credentials cannot be removed.
    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;

    /// Resolve the identity persisted from a previous run and publish it.
    ///
    /// Always publishes exactly one state change, `None` when nothing could
    /// be restored.
    ///
    /// # Errors
    ///
    /// Returns error if persisted credentials exist but cannot be refreshed.
    /// The published state is `None` in that case.
    fn restore(&self) -> impl Future<Output = Result<Option<UserHandle>>> + Send;

    /// Subscribe to identity state changes.
    ///
    /// Dropping the subscription unsubscribes.
    fn subscribe(&self) -> IdentitySubscription;
}

/// Broadcasts identity state to subscribers.
///
/// Shared by provider implementations; clones publish to the same
/// subscribers.
#[derive(Debug, Clone)]
pub struct IdentityChannel {
    tx: watch::Sender<Option<UserHandle>>,
}

impl IdentityChannel {
    /// Create a channel with no signed-in user.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publish a state change.
    ///
    /// Subscribers are notified even when the state equals the previous one
    /// (token refresh).
    pub fn publish(&self, state: Option<UserHandle>) {
        self.tx.send_replace(state);
    }

    /// Last published state.
    #[must_use]
    pub fn current(&self) -> Option<UserHandle> {
        self.tx.borrow().clone()
    }

    /// Subscribe to changes published after this call.
    #[must_use]
    pub fn subscribe(&self) -> IdentitySubscription {
        IdentitySubscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for IdentityChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side of [`IdentityChannel`].
#[derive(Debug)]
pub struct IdentitySubscription {
    rx: watch::Receiver<Option<UserHandle>>,
}

impl IdentitySubscription {
    /// Wait for the next state change.
    ///
    /// Returns `None` once the provider is gone.
    pub async fn changed(&mut self) -> Option<Option<UserHandle>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Last published state, without waiting.
    #[must_use]
    pub fn current(&self) -> Option<UserHandle> {
        self.rx.borrow().clone()
    }
}
