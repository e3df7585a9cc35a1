//! Media host and image fetch traits.

use crate::error::Result;
use crate::state::SelectedFile;
use bytes::Bytes;
use std::future::Future;
use tokio::sync::mpsc;

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    /// Durable HTTPS URL of the hosted file.
    pub secure_url: String,
}

/// Receives cumulative bytes sent for one upload.
///
/// Reports are best-effort: once the receiver is gone they are dropped.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<u64>>,
}

impl ProgressSink {
    /// Create a sink and the receiver its reports arrive on.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<u64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that ignores every report.
    #[must_use]
    pub const fn discard() -> Self {
        Self { tx: None }
    }

    /// Report the cumulative number of bytes sent.
    pub fn report(&self, bytes_sent: u64) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(bytes_sent);
        }
    }
}

/// Media host.
pub trait MediaUploader: Send + Sync {
    /// Upload a file and return its durable URL.
    ///
    /// Progress is reported to `progress` as the body is sent.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::MediaUpload` if the host rejects the file or
    /// the request fails.
    fn upload(
        &self,
        file: SelectedFile,
        progress: ProgressSink,
    ) -> impl Future<Output = Result<UploadedMedia>> + Send;
}

/// Bytes of a hosted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    /// Image bytes.
    pub bytes: Bytes,
    /// Content type reported by the host.
    pub content_type: Option<String>,
}

/// Fetches hosted images for download.
pub trait ImageFetcher: Send + Sync {
    /// Fetch an image by URL.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::ImageFetch` if the request fails or the host
    /// answers with a non-success status.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedImage>> + Send;
}
