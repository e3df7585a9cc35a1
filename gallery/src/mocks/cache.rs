//! In-memory profile cache for testing.

use crate::error::{GalleryError, Result};
use crate::providers::ProfileCache;
use crate::state::UserProfile;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Profile cache held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileCache {
    slot: Arc<Mutex<Option<UserProfile>>>,
}

impl MemoryProfileCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding `profile`.
    #[must_use]
    pub fn with_profile(profile: UserProfile) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(profile))),
        }
    }

    /// Cached profile.
    #[must_use]
    pub fn cached(&self) -> Option<UserProfile> {
        self.slot.lock().ok()?.clone()
    }
}

impl ProfileCache for MemoryProfileCache {
    fn load(&self) -> impl Future<Output = Result<Option<UserProfile>>> + Send {
        let slot = Arc::clone(&self.slot);
        async move { Ok(slot.lock().map_err(|_| GalleryError::InternalError)?.clone()) }
    }

    fn store(&self, profile: &UserProfile) -> impl Future<Output = Result<()>> + Send {
        let slot = Arc::clone(&self.slot);
        let profile = profile.clone();
        async move {
            *slot.lock().map_err(|_| GalleryError::InternalError)? = Some(profile);
            Ok(())
        }
    }

    fn clear(&self) -> impl Future<Output = Result<()>> + Send {
        let slot = Arc::clone(&self.slot);
        async move {
            *slot.lock().map_err(|_| GalleryError::InternalError)? = None;
            Ok(())
        }
    }
}
