//! Prometheus metrics.
//!
//! Stores count their own actions and effects; the gallery reducers report
//! uploads, downloads and profile syncs through the small recorders below.
//! `GET /metrics` in the web crate renders [`MetricsRecorder::render`].
//!
//! # Example
//!
//! ```rust,no_run
//! use pixwap_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//! let text = recorder.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Bucket configuration rejected.
    #[error("cannot build the Prometheus exporter: {0}")]
    Build(String),
    /// Global recorder could not be set.
    #[error("cannot install the Prometheus recorder: {0}")]
    Install(String),
}

/// Installed Prometheus recorder.
///
/// Unlike a standalone exporter this does not bind its own socket; the
/// application router exposes [`MetricsRecorder::render`].
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe every metric and install the process-wide recorder.
    ///
    /// A recorder installed earlier (another test, say) is left in place and
    /// [`render`](Self::render) keeps returning `None`.
    ///
    /// # Errors
    ///
    /// [`MetricsError`] when the exporter cannot be built or installed.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let message = e.to_string();
                if message.contains("already initialized") {
                    tracing::warn!("A metrics recorder is already installed");
                    Ok(())
                } else {
                    Err(MetricsError::Install(message))
                }
            },
        }
    }

    /// Underlying exporter handle, once installed.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Text exposition of the current values; `None` until installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    // Store
    describe_counter!("pixwap_store_actions_total", "Actions reduced by any store");
    describe_counter!("pixwap_store_effects_total", "Effects started, by kind");
    describe_histogram!("pixwap_store_reduce_seconds", "Time spent inside reducers");
    describe_counter!("pixwap_store_shutdowns_total", "Stores asked to drain");

    // Uploads
    describe_counter!(
        "pixwap_uploads_succeeded_total",
        "Files uploaded to the media host and appended to their event"
    );
    describe_counter!(
        "pixwap_uploads_failed_total",
        "Files whose upload or append failed"
    );
    describe_counter!(
        "pixwap_upload_batches_total",
        "Upload batches started"
    );
    describe_histogram!(
        "pixwap_upload_batch_duration_seconds",
        "Wall time of an upload batch"
    );

    // Downloads
    describe_counter!(
        "pixwap_downloads_recorded_total",
        "Download audit records appended"
    );
    describe_counter!(
        "pixwap_downloads_failed_total",
        "Downloads that failed, by stage"
    );

    // HTTP
    describe_counter!("pixwap_http_requests_total", "Responses sent, by status code");
    describe_histogram!("pixwap_http_request_duration_seconds", "Time to produce a response");
    describe_counter!("pixwap_http_downloads_served_total", "Image attachments served");

    // Session
    describe_counter!(
        "pixwap_profile_sync_total",
        "Profile synchronisations after identity changes, by outcome"
    );
}

/// Upload metrics recorder.
pub struct UploadMetrics;

impl UploadMetrics {
    /// Record a batch start.
    pub fn record_batch_started() {
        counter!("pixwap_upload_batches_total").increment(1);
    }

    /// Record a committed file.
    pub fn record_success() {
        counter!("pixwap_uploads_succeeded_total").increment(1);
    }

    /// Record a failed file.
    pub fn record_failure() {
        counter!("pixwap_uploads_failed_total").increment(1);
    }

    /// Record the end of a batch.
    pub fn record_batch_finished(duration: Duration) {
        histogram!("pixwap_upload_batch_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Download metrics recorder.
pub struct DownloadMetrics;

impl DownloadMetrics {
    /// Record an appended download record.
    pub fn record_audit() {
        counter!("pixwap_downloads_recorded_total").increment(1);
    }

    /// Record a failed download at the given stage.
    pub fn record_failure(stage: &'static str) {
        counter!("pixwap_downloads_failed_total", "stage" => stage).increment(1);
    }
}

/// Session metrics recorder.
pub struct SessionMetrics;

impl SessionMetrics {
    /// Record the outcome of a profile fetch (`loaded`, `missing`, `failed`, `stale`).
    pub fn record_sync(outcome: &'static str) {
        counter!("pixwap_profile_sync_total", "outcome" => outcome).increment(1);
    }
}
