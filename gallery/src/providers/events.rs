//! Event repository trait.

use crate::error::Result;
use crate::state::{DownloadRecord, Event, EventId, Image, NewEvent, UserId};
use std::future::Future;

/// Event repository.
///
/// Image and download lists only change through the atomic array operations
/// below; no method rewrites a whole event.
pub trait EventRepository: Send + Sync {
    /// Get an event by id.
    ///
    /// Returns `Ok(None)` when the event does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The store request fails → `GalleryError::DocumentStore`
    /// - The document is malformed → `GalleryError::Decode`
    fn get_event(&self, event_id: &EventId) -> impl Future<Output = Result<Option<Event>>> + Send;

    /// All events owned by a user.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails or any document is malformed.
    fn events_by_owner(&self, owner: &UserId) -> impl Future<Output = Result<Vec<Event>>> + Send;

    /// Create an event with empty image, viewer and download lists.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn create_event(&self, event: &NewEvent) -> impl Future<Output = Result<Event>> + Send;

    /// Atomically append an image to an event.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails or the event does not exist.
    fn append_image(&self, event_id: &EventId, image: &Image) -> impl Future<Output = Result<()>> + Send;

    /// Atomically remove an image from an event.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails or the event does not exist.
    fn remove_image(&self, event_id: &EventId, image: &Image) -> impl Future<Output = Result<()>> + Send;

    /// Atomically append a download record to an event.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails or the event does not exist.
    fn append_download(
        &self,
        event_id: &EventId,
        record: &DownloadRecord,
    ) -> impl Future<Output = Result<()>> + Send;
}
