//! Mock media host and image fetcher for testing.

use crate::error::{GalleryError, Result};
use crate::providers::{FetchedImage, ImageFetcher, MediaUploader, ProgressSink, UploadedMedia};
use crate::state::SelectedFile;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Mock media host.
///
/// Reports progress in fixed chunks, yielding between them, and returns
/// `https://media.test/<n>/<file name>`. Files can be set to fail by name,
/// and all uploads can be held until released.
#[derive(Debug, Clone)]
pub struct MockMediaUploader {
    failing: Arc<Mutex<HashSet<String>>>,
    chunk_bytes: u64,
    uploads: Arc<AtomicUsize>,
    paused: Arc<watch::Sender<bool>>,
}

impl MockMediaUploader {
    /// Create an uploader that accepts every file.
    #[must_use]
    pub fn new() -> Self {
        Self {
            failing: Arc::new(Mutex::new(HashSet::new())),
            chunk_bytes: 4,
            uploads: Arc::new(AtomicUsize::new(0)),
            paused: Arc::new(watch::channel(false).0),
        }
    }

    /// Report progress every `bytes`.
    #[must_use]
    pub fn with_chunk_bytes(mut self, bytes: u64) -> Self {
        self.chunk_bytes = bytes.max(1);
        self
    }

    /// Reject uploads of the named file.
    pub fn fail_file(&self, name: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(name.to_string());
        }
    }

    /// Hold every upload before it sends its first byte.
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Release held uploads.
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Upload attempts so far.
    #[must_use]
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

impl Default for MockMediaUploader {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaUploader for MockMediaUploader {
    fn upload(
        &self,
        file: SelectedFile,
        progress: ProgressSink,
    ) -> impl Future<Output = Result<UploadedMedia>> + Send {
        let attempt = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        let failing = self
            .failing
            .lock()
            .map(|failing| failing.contains(&file.name))
            .unwrap_or(false);
        let mut paused = self.paused.subscribe();
        let chunk = self.chunk_bytes;

        async move {
            // The sender lives as long as this uploader, so an error only
            // means nothing can pause us any more.
            let _ = paused.wait_for(|paused| !*paused).await;

            let total = file.size();
            let mut sent = 0;
            while sent < total {
                sent = (sent + chunk).min(total);
                progress.report(sent);
                tokio::task::yield_now().await;

                if failing && sent * 2 >= total {
                    return Err(GalleryError::MediaUpload(format!(
                        "simulated failure for {}",
                        file.name
                    )));
                }
            }

            if failing {
                return Err(GalleryError::MediaUpload(format!(
                    "simulated failure for {}",
                    file.name
                )));
            }

            Ok(UploadedMedia {
                secure_url: format!("https://media.test/{attempt}/{}", file.name),
            })
        }
    }
}

/// Mock image fetcher serving registered URLs.
#[derive(Debug, Clone, Default)]
pub struct MockImageFetcher {
    images: Arc<Mutex<HashMap<String, FetchedImage>>>,
    fetches: Arc<AtomicUsize>,
}

impl MockImageFetcher {
    /// Create a fetcher serving nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` at `url`.
    pub fn insert(&self, url: &str, bytes: impl Into<Bytes>, content_type: Option<&str>) {
        if let Ok(mut images) = self.images.lock() {
            images.insert(
                url.to_string(),
                FetchedImage {
                    bytes: bytes.into(),
                    content_type: content_type.map(str::to_string),
                },
            );
        }
    }

    /// Fetches so far.
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ImageFetcher for MockImageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedImage>> + Send {
        let images = Arc::clone(&self.images);
        let url = url.to_string();
        self.fetches.fetch_add(1, Ordering::SeqCst);

        async move {
            images
                .lock()
                .map_err(|_| GalleryError::InternalError)?
                .get(&url)
                .cloned()
                .ok_or_else(|| GalleryError::ImageFetch(format!("HTTP 404 Not Found: {url}")))
        }
    }
}
