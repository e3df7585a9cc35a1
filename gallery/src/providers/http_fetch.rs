//! Plain HTTP image fetch.

use crate::error::{GalleryError, Result};
use crate::providers::media::{FetchedImage, ImageFetcher};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::future::Future;

/// Fetches hosted images with a GET request.
#[derive(Debug, Clone, Default)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    /// Create a fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedImage>> + Send {
        async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| GalleryError::ImageFetch(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(GalleryError::ImageFetch(format!("HTTP {status}")));
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let bytes = response
                .bytes()
                .await
                .map_err(|e| GalleryError::ImageFetch(e.to_string()))?;

            Ok(FetchedImage {
                bytes,
                content_type,
            })
        }
    }
}
