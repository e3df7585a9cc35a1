//! Mock identity provider for testing.

use crate::error::{GalleryError, Result};
use crate::providers::{IdentityChannel, IdentityProvider, IdentitySubscription};
use crate::state::{UserHandle, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Account {
    handle: UserHandle,
    password: String,
}

/// Mock identity provider.
///
/// Accounts live in memory; every sign-in, sign-out and restore publishes
/// to subscribers like the real provider.
#[derive(Debug, Clone)]
pub struct MockIdentityProvider {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    persisted: Arc<Mutex<Option<UserHandle>>>,
    channel: IdentityChannel,
    next_uid: Arc<AtomicUsize>,
    restore_delay: Duration,
}

impl MockIdentityProvider {
    /// Create a provider with no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            persisted: Arc::new(Mutex::new(None)),
            channel: IdentityChannel::new(),
            next_uid: Arc::new(AtomicUsize::new(1)),
            restore_delay: Duration::ZERO,
        }
    }

    /// Make [`IdentityProvider::restore`] report only after `delay`, like a
    /// slow token refresh.
    #[must_use]
    pub const fn with_restore_delay(mut self, delay: Duration) -> Self {
        self.restore_delay = delay;
        self
    }

    /// Add an account without signing it in.
    pub fn add_account(&self, uid: &str, email: &str, password: &str) -> UserHandle {
        let handle = UserHandle {
            uid: UserId::new(uid),
            email: email.to_string(),
            display_name: None,
        };
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.insert(
                email.to_string(),
                Account {
                    handle: handle.clone(),
                    password: password.to_string(),
                },
            );
        }
        handle
    }

    /// Session that [`IdentityProvider::restore`] will resume.
    pub fn persist_session(&self, handle: UserHandle) {
        if let Ok(mut persisted) = self.persisted.lock() {
            *persisted = Some(handle);
        }
    }

    /// Publish a state change as if the provider reported one.
    pub fn publish(&self, state: Option<UserHandle>) {
        self.channel.publish(state);
    }

    /// Last published state.
    #[must_use]
    pub fn current(&self) -> Option<UserHandle> {
        self.channel.current()
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for MockIdentityProvider {
    fn create_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> impl Future<Output = Result<UserHandle>> + Send {
        let accounts = Arc::clone(&self.accounts);
        let persisted = Arc::clone(&self.persisted);
        let channel = self.channel.clone();
        let uid = format!("uid-{}", self.next_uid.fetch_add(1, Ordering::SeqCst));
        let email = email.to_string();
        let password = password.to_string();
        let display_name = display_name.to_string();

        async move {
            let handle = {
                let mut accounts = accounts.lock().map_err(|_| GalleryError::InternalError)?;
                if accounts.contains_key(&email) {
                    return Err(GalleryError::DuplicateAccount);
                }
                let handle = UserHandle {
                    uid: UserId::new(uid),
                    email: email.clone(),
                    display_name: Some(display_name),
                };
                accounts.insert(
                    email,
                    Account {
                        handle: handle.clone(),
                        password,
                    },
                );
                handle
            };

            *persisted.lock().map_err(|_| GalleryError::InternalError)? = Some(handle.clone());
            channel.publish(Some(handle.clone()));
            Ok(handle)
        }
    }

    fn sign_in(&self, email: &str, password: &str) -> impl Future<Output = Result<UserHandle>> + Send {
        let accounts = Arc::clone(&self.accounts);
        let persisted = Arc::clone(&self.persisted);
        let channel = self.channel.clone();
        let email = email.to_string();
        let password = password.to_string();

        async move {
            let handle = accounts
                .lock()
                .map_err(|_| GalleryError::InternalError)?
                .get(&email)
                .filter(|account| account.password == password)
                .map(|account| account.handle.clone())
                .ok_or(GalleryError::InvalidCredentials)?;

            *persisted.lock().map_err(|_| GalleryError::InternalError)? = Some(handle.clone());
            channel.publish(Some(handle.clone()));
            Ok(handle)
        }
    }

    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send {
        let persisted = Arc::clone(&self.persisted);
        let channel = self.channel.clone();

        async move {
            *persisted.lock().map_err(|_| GalleryError::InternalError)? = None;
            channel.publish(None);
            Ok(())
        }
    }

    fn restore(&self) -> impl Future<Output = Result<Option<UserHandle>>> + Send {
        let persisted = Arc::clone(&self.persisted);
        let channel = self.channel.clone();
        let delay = self.restore_delay;

        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let restored = persisted
                .lock()
                .map_err(|_| GalleryError::InternalError)?
                .clone();
            channel.publish(restored.clone());
            Ok(restored)
        }
    }

    fn subscribe(&self) -> IdentitySubscription {
        self.channel.subscribe()
    }
}
