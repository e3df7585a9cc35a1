//! Mock profile store for testing.

use crate::error::{GalleryError, Result};
use crate::providers::ProfileStore;
use crate::state::{SubscriptionStatus, UserId, UserProfile};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock profile store.
///
/// Uses in-memory storage; reads can be made to fail.
#[derive(Debug, Clone, Default)]
pub struct MockProfileStore {
    profiles: Arc<Mutex<HashMap<UserId, UserProfile>>>,
    fail_reads: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
}

impl MockProfileStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a profile directly.
    pub fn insert(&self, profile: UserProfile) {
        if let Ok(mut profiles) = self.profiles.lock() {
            profiles.insert(profile.id.clone(), profile);
        }
    }

    /// Stored profile.
    #[must_use]
    pub fn profile(&self, user_id: &UserId) -> Option<UserProfile> {
        self.profiles.lock().ok()?.get(user_id).cloned()
    }

    /// Make every read fail with a document store error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of reads so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ProfileStore for MockProfileStore {
    fn get_profile(&self, user_id: &UserId) -> impl Future<Output = Result<Option<UserProfile>>> + Send {
        let profiles = Arc::clone(&self.profiles);
        let fail = self.fail_reads.load(Ordering::SeqCst);
        let user_id = user_id.clone();
        self.reads.fetch_add(1, Ordering::SeqCst);

        async move {
            if fail {
                return Err(GalleryError::DocumentStore("simulated read failure".into()));
            }
            Ok(profiles
                .lock()
                .map_err(|_| GalleryError::InternalError)?
                .get(&user_id)
                .cloned())
        }
    }

    fn put_profile(&self, profile: &UserProfile) -> impl Future<Output = Result<()>> + Send {
        let profiles = Arc::clone(&self.profiles);
        let profile = profile.clone();

        async move {
            profiles
                .lock()
                .map_err(|_| GalleryError::InternalError)?
                .insert(profile.id.clone(), profile);
            Ok(())
        }
    }

    fn update_subscription(
        &self,
        user_id: &UserId,
        status: SubscriptionStatus,
        subscription_id: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let profiles = Arc::clone(&self.profiles);
        let user_id = user_id.clone();
        let subscription_id = subscription_id.to_string();

        async move {
            let mut profiles = profiles.lock().map_err(|_| GalleryError::InternalError)?;
            let profile = profiles
                .get_mut(&user_id)
                .ok_or(GalleryError::NotFound { what: "Profile" })?;
            profile.subscription_status = status;
            profile.subscription_id = subscription_id;
            Ok(())
        }
    }
}
