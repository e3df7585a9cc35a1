//! Local profile cache trait.

use crate::error::Result;
use crate::state::UserProfile;
use std::future::Future;

/// Local persisted copy of the signed-in user's profile.
///
/// Read once at start so pages can render before the identity provider
/// reports; written after every successful profile fetch; cleared on
/// sign-out and on fetch failure.
pub trait ProfileCache: Send + Sync {
    /// Read the cached profile.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::Cache` if the cache exists but cannot be read.
    fn load(&self) -> impl Future<Output = Result<Option<UserProfile>>> + Send;

    /// Replace the cached profile.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::Cache` if the cache cannot be written.
    fn store(&self, profile: &UserProfile) -> impl Future<Output = Result<()>> + Send;

    /// Remove the cached profile.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::Cache` if the cache cannot be removed.
    fn clear(&self) -> impl Future<Output = Result<()>> + Send;
}
