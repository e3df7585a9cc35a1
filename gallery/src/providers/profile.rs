//! Profile store trait.

use crate::error::Result;
use crate::state::{SubscriptionStatus, UserId, UserProfile};
use std::future::Future;

/// Profile store.
///
/// Reads and writes the per-user profile document keyed by user id.
pub trait ProfileStore: Send + Sync {
    /// Get a profile by user id.
    ///
    /// Returns `Ok(None)` when no profile document exists.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The store request fails → `GalleryError::DocumentStore`
    /// - The document is malformed → `GalleryError::Decode`
    fn get_profile(&self, user_id: &UserId) -> impl Future<Output = Result<Option<UserProfile>>> + Send;

    /// Create or overwrite a profile.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn put_profile(&self, profile: &UserProfile) -> impl Future<Output = Result<()>> + Send;

    /// Change a profile's subscription fields.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The store request fails
    /// - The profile does not exist → `GalleryError::NotFound`
    fn update_subscription(
        &self,
        user_id: &UserId,
        status: SubscriptionStatus,
        subscription_id: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}
