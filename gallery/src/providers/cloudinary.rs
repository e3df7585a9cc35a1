//! Cloudinary-style unsigned image upload.

use crate::config::MediaHostConfig;
use crate::error::{GalleryError, Result};
use crate::providers::media::{MediaUploader, ProgressSink, UploadedMedia};
use crate::state::SelectedFile;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use std::future::Future;

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Uploads images to the media host with a streamed multipart body.
#[derive(Debug, Clone)]
pub struct CloudinaryUploader {
    client: Client,
    config: MediaHostConfig,
}

impl CloudinaryUploader {
    /// Create an uploader.
    #[must_use]
    pub fn new(config: MediaHostConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Multipart file part whose body reports progress as it is consumed.
    fn file_part(&self, file: &SelectedFile, progress: ProgressSink) -> Result<Part> {
        let chunks = split_chunks(&file.bytes, self.config.chunk_bytes);
        let mut sent = 0_u64;
        let body = futures::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            progress.report(sent);
            Ok::<Bytes, std::io::Error>(chunk)
        });

        Part::stream_with_length(Body::wrap_stream(body), file.size())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| GalleryError::MediaUpload(e.to_string()))
    }
}

impl MediaUploader for CloudinaryUploader {
    fn upload(
        &self,
        file: SelectedFile,
        progress: ProgressSink,
    ) -> impl Future<Output = Result<UploadedMedia>> + Send {
        async move {
            let form = Form::new()
                .text("upload_preset", self.config.upload_preset.clone())
                .part("file", self.file_part(&file, progress.clone())?);

            let response = self
                .client
                .post(self.config.upload_url())
                .multipart(form)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(file = %file.name, error = %e, "Media upload request failed");
                    GalleryError::MediaUpload(e.to_string())
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
                    Ok(envelope) => envelope.error.message,
                    Err(_) => format!("HTTP {status}"),
                };
                tracing::error!(file = %file.name, %status, %message, "Media host rejected upload");
                return Err(GalleryError::MediaUpload(message));
            }

            let uploaded: UploadResponse = response
                .json()
                .await
                .map_err(|e| GalleryError::MediaUpload(e.to_string()))?;

            progress.report(file.size());
            tracing::debug!(file = %file.name, url = %uploaded.secure_url, "Media uploaded");
            Ok(UploadedMedia {
                secure_url: uploaded.secure_url,
            })
        }
    }
}

/// Split `bytes` into zero-copy slices of at most `chunk` bytes.
fn split_chunks(bytes: &Bytes, chunk: usize) -> Vec<Bytes> {
    let chunk = chunk.max(1);
    (0..bytes.len())
        .step_by(chunk)
        .map(|start| bytes.slice(start..(start + chunk).min(bytes.len())))
        .collect()
}
