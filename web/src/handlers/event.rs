//! Event page: gallery, upload batches, image removal and download capture.
//!
//! The event page is public. Anyone with the link can see the images and
//! download them after leaving an email; only the owner sees the download
//! records and may select, upload or remove images.

use crate::error::AppError;
use crate::extractors::{CorrelationId, MaybeUser, SessionUser};
use crate::handlers::multipart::read_form;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use pixwap_gallery::state::{BatchOutcome, DownloadRecord, FileError, PendingFile, UploadBatch};
use pixwap_gallery::{
    Backend, DownloadId, EventId, EventView, GalleryAction, GalleryError, Image, ImageId, PendingFileId,
    PreviewHandle, UserProfile,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Event page.
#[derive(Debug, Serialize)]
pub struct EventPage {
    /// Event id
    pub id: String,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Banner image, empty when none
    pub banner_image_url: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Images in upload order
    pub images: Vec<Image>,
    /// Whether the viewer owns the event
    pub is_owner: bool,
    /// Owner-only upload and download details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerPanel>,
}

/// What only the owner sees on the event page.
#[derive(Debug, Serialize)]
pub struct OwnerPanel {
    /// Staged files
    pub pending: Vec<PendingSummary>,
    /// Files refused at the last selection
    pub selection_errors: Vec<FileError>,
    /// Image quota
    pub quota: Quota,
    /// Upload in flight or last finished
    pub upload: UploadStatus,
    /// Download records, oldest first
    pub downloads: Vec<DownloadRecord>,
    /// Emails collected from visitors
    pub viewer_emails: Vec<String>,
}

/// Image quota of the owner's plan.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Quota {
    /// Images attached plus staged
    pub used: usize,
    /// Plan quota
    pub limit: usize,
}

/// A staged file.
#[derive(Debug, Serialize)]
pub struct PendingSummary {
    /// Id used to remove the file
    pub id: PendingFileId,
    /// File name
    pub name: String,
    /// MIME type
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
    /// Preview URL
    pub preview_url: String,
    /// Error of the last upload attempt
    pub last_error: Option<String>,
}

impl PendingSummary {
    fn new(pending: &PendingFile) -> Self {
        Self {
            id: pending.id,
            name: pending.file.name.clone(),
            mime_type: pending.file.mime_type.clone(),
            size: pending.file.size(),
            preview_url: format!("/preview/{}", pending.preview),
            last_error: pending.last_error.clone(),
        }
    }
}

/// Result of a selection.
#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    /// Staged files after the selection
    pub pending: Vec<PendingSummary>,
    /// Files refused (wrong type or too large)
    pub rejected: Vec<FileError>,
}

/// Upload batch status.
#[derive(Debug, Serialize)]
pub struct UploadStatus {
    /// Whether a batch is in flight
    pub uploading: bool,
    /// Progress of the batch in flight, `0.0..=1.0`
    pub progress: Option<f64>,
    /// Files in the batch in flight
    pub files: usize,
    /// Files committed so far
    pub committed: usize,
    /// Files failed so far
    pub failed: Vec<FileError>,
    /// Result of the last finished batch
    pub last_outcome: Option<BatchOutcome>,
}

impl UploadStatus {
    fn new(view: &EventView) -> Self {
        let batch: Option<&UploadBatch> = view.upload.as_ref();
        Self {
            uploading: batch.is_some(),
            progress: batch.map(UploadBatch::progress),
            files: batch.map_or(0, |b| b.files.len()),
            committed: batch.map_or(0, |b| b.committed),
            failed: batch.map(|b| b.failed.clone()).unwrap_or_default(),
            last_outcome: view.last_outcome.clone(),
        }
    }
}

/// Upload query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    /// Wait for the batch to finish before answering.
    #[serde(default)]
    pub wait: bool,
}

/// Download request.
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    /// Image to download (must belong to the event)
    pub image_url: String,
    /// Visitor email, recorded before the image is fetched
    pub email: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Event page (public).
///
/// Re-reads the event on every visit.
///
/// ```text
/// GET /event/:id
/// ```
///
/// # Errors
///
/// - 404 if the event does not exist
/// - 502 if the event cannot be read
pub async fn show<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
    MaybeUser(user): MaybeUser,
) -> Result<Json<EventPage>, AppError> {
    let event_id = EventId::new(id);
    let view = state.load_view(&event_id).await?;
    let Some(event) = view.event.as_ref() else {
        return Err(AppError::not_found("Event", &event_id));
    };

    let owner = user.filter(|user| event.is_owned_by(&user.id));
    let panel = owner.map(|user| OwnerPanel {
        pending: pending_summaries(&view),
        selection_errors: view.selection_errors.clone(),
        quota: quota(&state, &view, &user),
        upload: UploadStatus::new(&view),
        downloads: event.downloads.clone(),
        viewer_emails: event.viewer_emails.clone(),
    });

    Ok(Json(EventPage {
        id: event.id.to_string(),
        title: event.title.clone(),
        description: event.description.clone(),
        banner_image_url: event.banner_image_url.clone(),
        created_at: event.created_at,
        images: event.images.clone(),
        is_owner: panel.is_some(),
        owner: panel,
    }))
}

/// Stage files for upload (owner only).
///
/// Multipart form; every file part is staged. Files of the wrong type or
/// over the size limit are reported and skipped, the rest are staged.
///
/// ```text
/// POST /event/:id/selection
/// ```
///
/// # Errors
///
/// - 401 when signed out
/// - 403 for a non-owner
/// - 422 when the selection would exceed the plan's image quota
pub async fn select<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
    user: SessionUser,
    multipart: Multipart,
) -> Result<Json<SelectionResponse>, AppError> {
    let event_id = EventId::new(id);
    let form = read_form(multipart).await?;
    if form.files.is_empty() {
        return Err(AppError::validation("Choose at least one file"));
    }
    state.open_view(&event_id).await?;

    state
        .gallery
        .send(GalleryAction::SelectFiles {
            event_id: event_id.clone(),
            actor: user.actor(),
            files: form.files,
        })
        .await?
        .wait_with_timeout(state.settings.request_timeout)
        .await?;

    let view = state.view(&event_id).await?;
    if let Some(rejection) = view.selection_rejection.clone() {
        return Err(rejection.into());
    }

    Ok(Json(SelectionResponse {
        pending: pending_summaries(&view),
        rejected: view.selection_errors,
    }))
}

/// Drop a staged file (owner only).
///
/// ```text
/// DELETE /event/:id/selection/:file_id
/// ```
///
/// # Errors
///
/// - 400 for a malformed file id
/// - 404 when no such file is staged
/// - 409 when the file is part of the batch in flight
pub async fn remove_pending<B: Backend>(
    State(state): State<AppState<B>>,
    Path((id, file_id)): Path<(String, String)>,
    user: SessionUser,
) -> Result<Json<Vec<PendingSummary>>, AppError> {
    let event_id = EventId::new(id);
    let file: PendingFileId = file_id
        .parse()
        .map_err(|e| AppError::bad_request(format!("Invalid file id: {e}")))?;

    let before = state.open_view(&event_id).await?;
    if !before.is_owned_by(&user.0.id) {
        return Err(GalleryError::NotOwner.into());
    }
    if !before.pending.iter().any(|pending| pending.id == file) {
        return Err(AppError::not_found("Pending file", file));
    }

    state
        .gallery
        .send(GalleryAction::RemovePending {
            event_id: event_id.clone(),
            file,
        })
        .await?
        .wait_with_timeout(state.settings.request_timeout)
        .await?;

    let view = state.view(&event_id).await?;
    if view.pending.iter().any(|pending| pending.id == file) {
        let error = view.upload_error.unwrap_or(GalleryError::Busy { operation: "Upload" });
        return Err(error.into());
    }
    Ok(Json(pending_summaries(&view)))
}

/// Upload every staged file (owner only).
///
/// Answers 202 with the batch status right away, or with `?wait=true` once
/// every file has reported.
///
/// ```text
/// POST /event/:id/upload[?wait=true]
/// ```
///
/// # Errors
///
/// - 422 when nothing is staged or the batch would exceed the quota
/// - 409 while another batch is in flight
/// - 403 for a non-owner
pub async fn upload<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    user: SessionUser,
) -> Result<(StatusCode, Json<UploadStatus>), AppError> {
    let event_id = EventId::new(id);
    let before = state.open_view(&event_id).await?;
    if before.pending.is_empty() {
        return Err(AppError::validation("Choose at least one file to upload"));
    }

    let mut handle = state
        .gallery
        .send(GalleryAction::StartUpload {
            event_id: event_id.clone(),
            actor: user.actor(),
        })
        .await?;

    // A started batch clears `upload_error`; a refused one sets it.
    let started = state.view(&event_id).await?;
    if let Some(error) = started.upload_error.clone() {
        return Err(error.into());
    }

    if !query.wait {
        return Ok((StatusCode::ACCEPTED, Json(UploadStatus::new(&started))));
    }

    handle.wait_with_timeout(state.settings.upload_wait_timeout).await?;
    let finished = state.view(&event_id).await?;
    Ok((StatusCode::OK, Json(UploadStatus::new(&finished))))
}

/// Status of the batch in flight or the last finished one (owner only).
///
/// ```text
/// GET /event/:id/progress
/// ```
///
/// # Errors
///
/// - 401 when signed out
/// - 403 for a non-owner
/// - 404 when the event has no open view
pub async fn progress<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
    user: SessionUser,
) -> Result<Json<UploadStatus>, AppError> {
    let view = state.view(&EventId::new(id)).await?;
    if !view.is_owned_by(&user.0.id) {
        return Err(GalleryError::NotOwner.into());
    }
    Ok(Json(UploadStatus::new(&view)))
}

/// Remove an image from the event (owner only).
///
/// The media host copy is kept.
///
/// ```text
/// DELETE /event/:id/images/:image_id
/// ```
///
/// # Errors
///
/// - 403 for a non-owner
/// - 404 for an image that is not part of the event
/// - 409 while another removal is in flight
pub async fn delete_image<B: Backend>(
    State(state): State<AppState<B>>,
    Path((id, image_id)): Path<(String, String)>,
    user: SessionUser,
) -> Result<StatusCode, AppError> {
    let event_id = EventId::new(id);
    state.open_view(&event_id).await?;

    state
        .gallery
        .send(GalleryAction::DeleteImage {
            event_id: event_id.clone(),
            image_id: ImageId::new(image_id),
            actor: user.actor(),
        })
        .await?
        .wait_with_timeout(state.settings.request_timeout)
        .await?;

    let view = state.view(&event_id).await?;
    match view.delete_error {
        Some(error) => Err(error.into()),
        None => Ok(StatusCode::NO_CONTENT),
    }
}

/// Record the visitor's email, then send the image as an attachment.
///
/// ```text
/// POST /event/:id/download
/// {"image_url": "...", "email": "visitor@example.com"}
/// ```
///
/// # Errors
///
/// - 422 for an invalid email
/// - 404 for an image that is not part of the event
/// - 409 while another download from the event is in flight
/// - 502 if the record cannot be saved (nothing is downloaded) or the image
///   cannot be fetched (the record is kept)
pub async fn download<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
    CorrelationId(correlation_id): CorrelationId,
    Json(request): Json<DownloadRequest>,
) -> Result<Response, AppError> {
    let event_id = EventId::new(id);
    state.load_view(&event_id).await?;

    // Other visitors' outcomes share the channel; only ours is taken.
    let download = DownloadId::new();
    let outcome = state
        .gallery
        .send_and_wait_for(
            GalleryAction::RequestDownload {
                event_id: event_id.clone(),
                request: download,
                image_url: request.image_url,
                email: request.email,
            },
            move |action| action.concluded_download() == Some(download),
            state.settings.request_timeout,
        )
        .await?;

    match outcome {
        GalleryAction::DownloadReady { file, .. } => {
            tracing::info!(
                correlation_id = %correlation_id,
                event_id = %event_id,
                request = %download,
                file_name = %file.file_name,
                "Serving download"
            );
            metrics::counter!("pixwap_http_downloads_served_total").increment(1);
            let disposition = format!("attachment; filename=\"{}\"", file.file_name);
            Ok((
                [
                    (header::CONTENT_TYPE, file.content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                file.bytes,
            )
                .into_response())
        }
        GalleryAction::DownloadFailed { stage, error, .. } => {
            tracing::warn!(
                correlation_id = %correlation_id,
                event_id = %event_id,
                stage = stage.as_str(),
                error = %error,
                "Download refused"
            );
            Err(error.into())
        }
        _ => Err(AppError::internal("Download finished without a file")),
    }
}

/// Preview of a staged file.
///
/// ```text
/// GET /preview/:handle
/// ```
///
/// # Errors
///
/// - 400 for a malformed handle
/// - 404 once the preview has been released
pub async fn preview<B: Backend>(
    State(state): State<AppState<B>>,
    Path(handle): Path<String>,
) -> Result<Response, AppError> {
    let handle: PreviewHandle = handle
        .parse()
        .map_err(|e| AppError::bad_request(format!("Invalid preview handle: {e}")))?;

    let preview = state
        .environment()
        .previews
        .get(handle)
        .ok_or_else(|| AppError::not_found("Preview", handle))?;

    Ok(([(header::CONTENT_TYPE, preview.mime_type)], preview.bytes).into_response())
}

// ============================================================================
// Helpers
// ============================================================================

fn pending_summaries(view: &EventView) -> Vec<PendingSummary> {
    view.pending
        .iter()
        .map(PendingSummary::new)
        .collect()
}

fn quota<B: Backend>(state: &AppState<B>, view: &EventView, user: &UserProfile) -> Quota {
    Quota {
        used: view.existing_images() + view.pending.len(),
        limit: state.environment().policy.image_quota(user.subscription_status),
    }
}
