//! Event page reducer.
//!
//! One [`EventView`](crate::state::EventView) per open event. Covers the
//! owner's upload batch and image deletion, and the visitor's download
//! capture.
//!
//! # Upload batches
//!
//! `StartUpload` runs every pending file concurrently. Each file uploads to
//! the media host, reporting progress, and on success is appended to the
//! event on its own. A failure only affects its file: it stays pending with
//! its error so the owner can retry. When the last file reports, the event
//! is re-read and `BatchFinished` clears the busy flag.
//!
//! The image list shown is always the last successful read of the event;
//! nothing is spliced in locally.
//!
//! # Downloads
//!
//! The download record is appended before the image is fetched. A failed
//! append stops the download; a failed fetch keeps the record. Every outcome,
//! refusals included, is fed back as an action carrying the request's
//! [`DownloadId`], so concurrent visitors each get their own file.
//!
//! # Views
//!
//! A view whose read fails is dropped unless it holds staged files or work
//! in flight; the failure itself travels in `EventLoadFailed`.

use crate::actions::GalleryAction;
use crate::constants::DOWNLOAD_FILE_PREFIX;
use crate::environment::{Backend, GalleryEnvironment};
use crate::error::GalleryError;
use crate::preview::{PreviewHandle, PreviewRegistry};
use crate::providers::{EventRepository, ImageFetcher, MediaUploader, ProgressSink, UploadedMedia};
use crate::state::{
    BatchId, BatchOutcome, DownloadId, DownloadRecord, DownloadStage, DownloadedFile, EventId, EventView,
    FileError, GalleryState, Image, ImageId, PendingFile, PendingFileId, SelectedFile, UploadBatch,
};
use crate::validation::{extension_for, is_valid_email, partition_selection};
use pixwap_core::effect::Effect;
use pixwap_core::reducer::Reducer;
use pixwap_core::{SmallVec, smallvec};
use pixwap_runtime::metrics::{DownloadMetrics, UploadMetrics};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Content type assumed when the media host does not send one.
const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

/// Event page reducer.
pub struct GalleryReducer<B> {
    _phantom: PhantomData<fn() -> B>,
}

impl<B> GalleryReducer<B> {
    /// Create a new gallery reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<B> Default for GalleryReducer<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Clone for GalleryReducer<B> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<B> fmt::Debug for GalleryReducer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GalleryReducer")
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Effect Builders
// ═══════════════════════════════════════════════════════════════════════

/// Read an event and turn the result into an action.
async fn read_event<E: EventRepository>(events: &E, event_id: EventId) -> GalleryAction {
    match events.get_event(&event_id).await {
        Ok(Some(event)) => GalleryAction::EventLoaded { event },
        Ok(None) => GalleryAction::EventLoadFailed {
            event_id,
            error: GalleryError::NotFound { what: "Event" },
        },
        Err(error) => GalleryAction::EventLoadFailed { event_id, error },
    }
}

fn load_event<B: Backend>(env: &GalleryEnvironment<B>, event_id: EventId) -> Effect<GalleryAction> {
    let events = env.events.clone();
    Effect::future(async move { Some(read_event(&events, event_id).await) })
}

fn register_previews(registry: &PreviewRegistry, files: Vec<(PreviewHandle, SelectedFile)>) -> Effect<GalleryAction> {
    let registry = registry.clone();
    Effect::future(async move {
        for (handle, file) in &files {
            registry.register(*handle, file);
        }
        None
    })
}

fn release_previews(registry: &PreviewRegistry, handles: Vec<PreviewHandle>) -> Effect<GalleryAction> {
    if handles.is_empty() {
        return Effect::None;
    }
    let registry = registry.clone();
    Effect::future(async move {
        for handle in handles {
            registry.release(handle);
        }
        None
    })
}

/// Feed a refused download back so its requester sees the outcome.
fn refuse_download(event_id: EventId, request: DownloadId, error: GalleryError) -> Effect<GalleryAction> {
    Effect::future(async move {
        Some(GalleryAction::DownloadFailed {
            event_id,
            request,
            stage: DownloadStage::Request,
            error,
        })
    })
}

enum UploadStep {
    Progress(u64),
    Done(crate::error::Result<UploadedMedia>),
}

/// Upload one file, then append it to the event.
fn upload_file<B: Backend>(
    env: &GalleryEnvironment<B>,
    event_id: EventId,
    batch: BatchId,
    file_id: PendingFileId,
    file: SelectedFile,
) -> Effect<GalleryAction> {
    let media = env.media.clone();
    let events = env.events.clone();
    let clock = std::sync::Arc::clone(&env.clock);

    Effect::Stream(Box::pin(async_stream::stream! {
        let (sink, mut progress) = ProgressSink::channel();
        let mut upload = Box::pin(media.upload(file, sink));

        let uploaded = loop {
            let step = tokio::select! {
                biased;
                Some(bytes_sent) = progress.recv() => UploadStep::Progress(bytes_sent),
                result = &mut upload => UploadStep::Done(result),
            };
            match step {
                UploadStep::Progress(bytes_sent) => {
                    yield GalleryAction::UploadProgress {
                        event_id: event_id.clone(),
                        batch,
                        file: file_id,
                        bytes_sent,
                    };
                }
                UploadStep::Done(result) => break result,
            }
        };

        match uploaded {
            Err(error) => {
                yield GalleryAction::FileUploadFailed { event_id, batch, file: file_id, error };
            }
            Ok(media) => {
                let image = Image {
                    id: ImageId::generate(),
                    url: media.secure_url,
                    created_at: clock.now(),
                    event_id: event_id.clone(),
                };
                match events.append_image(&event_id, &image).await {
                    Ok(()) => yield GalleryAction::FileCommitted { event_id, batch, file: file_id, image },
                    Err(error) => yield GalleryAction::FileCommitFailed {
                        event_id,
                        batch,
                        file: file_id,
                        url: image.url,
                        error,
                    },
                }
            }
        }
    }))
}

/// Once every file has reported: re-read the event, then finish the batch.
fn finish_if_done<B: Backend>(
    view: &EventView,
    env: &GalleryEnvironment<B>,
    event_id: EventId,
) -> Effect<GalleryAction> {
    let Some(batch) = view.upload.as_ref().filter(|batch| batch.remaining == 0) else {
        return Effect::None;
    };

    let outcome = BatchOutcome {
        batch: batch.id,
        committed: batch.committed,
        failed: batch.failed.clone(),
        orphaned: batch.orphaned.clone(),
    };
    let events = env.events.clone();
    Effect::Stream(Box::pin(async_stream::stream! {
        yield read_event(&events, event_id.clone()).await;
        yield GalleryAction::BatchFinished { event_id, outcome };
    }))
}

/// View whose batch in flight is `batch`.
fn batch_view<'a>(state: &'a mut GalleryState, event_id: &EventId, batch: BatchId) -> Option<&'a mut EventView> {
    let view = state.views.get_mut(event_id)?;
    if view.upload.as_ref().is_some_and(|current| current.id == batch) {
        Some(view)
    } else {
        tracing::debug!(event_id = %event_id, "Dropping result of a stale upload batch");
        None
    }
}

/// Mark a file of the batch as reported.
fn settle_file(view: &mut EventView, file: PendingFileId, failure: Option<FileError>) -> Option<PreviewHandle> {
    let batch = view.upload.as_mut()?;
    batch.remaining = batch.remaining.saturating_sub(1);

    let position = view.pending.iter().position(|pending| pending.id == file);
    match failure {
        None => {
            if let Some(size) = batch.size_of(file) {
                batch.sent.insert(file, size);
            }
            batch.committed += 1;
            position.map(|index| view.pending.remove(index).preview)
        }
        Some(failure) => {
            if let Some(index) = position {
                view.pending[index].last_error = Some(failure.reason.clone());
            }
            batch.failed.push(failure);
            None
        }
    }
}

impl<B: Backend> Reducer for GalleryReducer<B> {
    type State = GalleryState;
    type Action = GalleryAction;
    type Environment = GalleryEnvironment<B>;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ═══════════════════════════════════════════════════════════════
            // Event Reads
            // ═══════════════════════════════════════════════════════════════
            GalleryAction::LoadEvent { event_id } => {
                state.view_mut(&event_id).loading = true;
                smallvec![load_event(env, event_id)]
            }

            GalleryAction::EventLoaded { event } => {
                let view = state.view_mut(&event.id);
                view.loading = false;
                view.load_error = None;
                view.event = Some(event);
                smallvec![Effect::None]
            }

            GalleryAction::EventLoadFailed { event_id, error } => {
                tracing::warn!(event_id = %event_id, error = %error, "Event read failed");
                let Some(view) = state.views.get_mut(&event_id) else {
                    return smallvec![Effect::None];
                };
                if view.is_idle() {
                    state.views.remove(&event_id);
                } else {
                    view.loading = false;
                    view.load_error = Some(error);
                }
                smallvec![Effect::None]
            }

            // ═══════════════════════════════════════════════════════════════
            // SelectFiles: validate and stage
            // ═══════════════════════════════════════════════════════════════
            GalleryAction::SelectFiles {
                event_id,
                actor,
                files,
            } => {
                let view = state.view_mut(&event_id);
                view.selection_errors.clear();
                view.selection_rejection = None;

                if !view.is_owned_by(&actor.user_id) {
                    tracing::warn!(event_id = %event_id, user_id = %actor.user_id, "Selection by non-owner");
                    view.selection_rejection = Some(GalleryError::NotOwner);
                    return smallvec![Effect::None];
                }

                let quota = env.policy.image_quota(actor.tier);
                if view.pending.len() + files.len() > quota {
                    view.selection_rejection = Some(GalleryError::QuotaExceeded { quota });
                    return smallvec![Effect::None];
                }

                let (accepted, rejected) = partition_selection(files, &env.policy);
                view.selection_errors = rejected;

                let mut registrations = Vec::with_capacity(accepted.len());
                for file in accepted {
                    let preview = PreviewHandle::new();
                    registrations.push((preview, file.clone()));
                    view.pending.push(PendingFile {
                        id: PendingFileId::new(),
                        file,
                        preview,
                        last_error: None,
                    });
                }

                if registrations.is_empty() {
                    return smallvec![Effect::None];
                }
                smallvec![register_previews(&env.previews, registrations)]
            }

            GalleryAction::RemovePending { event_id, file } => {
                let Some(view) = state.views.get_mut(&event_id) else {
                    return smallvec![Effect::None];
                };
                let Some(index) = view.pending.iter().position(|pending| pending.id == file) else {
                    tracing::debug!(file = %file, "No such pending file");
                    return smallvec![Effect::None];
                };
                if view.upload.as_ref().is_some_and(|batch| batch.contains(file)) {
                    view.upload_error = Some(GalleryError::Busy { operation: "Upload" });
                    return smallvec![Effect::None];
                }

                let removed = view.pending.remove(index);
                smallvec![release_previews(&env.previews, vec![removed.preview])]
            }

            // ═══════════════════════════════════════════════════════════════
            // StartUpload: one concurrent stream per file
            // ═══════════════════════════════════════════════════════════════
            GalleryAction::StartUpload { event_id, actor } => {
                let Some(view) = state.views.get_mut(&event_id) else {
                    return smallvec![Effect::None];
                };
                if view.pending.is_empty() {
                    return smallvec![Effect::None];
                }
                if view.is_uploading() {
                    view.upload_error = Some(GalleryError::Busy { operation: "Upload" });
                    return smallvec![Effect::None];
                }
                if !view.is_owned_by(&actor.user_id) {
                    tracing::warn!(event_id = %event_id, user_id = %actor.user_id, "Upload by non-owner");
                    view.upload_error = Some(GalleryError::NotOwner);
                    return smallvec![Effect::None];
                }
                let quota = env.policy.image_quota(actor.tier);
                if view.existing_images() + view.pending.len() > quota {
                    view.upload_error = Some(GalleryError::QuotaExceeded { quota });
                    return smallvec![Effect::None];
                }

                let batch = UploadBatch {
                    id: BatchId::new(),
                    files: view.pending.iter().map(|p| (p.id, p.file.size())).collect(),
                    sent: HashMap::new(),
                    remaining: view.pending.len(),
                    committed: 0,
                    failed: Vec::new(),
                    orphaned: Vec::new(),
                    started_at: env.clock.now(),
                };
                tracing::info!(
                    event_id = %event_id,
                    batch = %batch.id.0,
                    files = batch.files.len(),
                    bytes = batch.total_bytes(),
                    "Starting upload batch"
                );
                UploadMetrics::record_batch_started();

                let uploads = view
                    .pending
                    .iter_mut()
                    .map(|pending| {
                        pending.last_error = None;
                        upload_file(env, event_id.clone(), batch.id, pending.id, pending.file.clone())
                    })
                    .collect();

                view.upload_error = None;
                view.last_outcome = None;
                view.upload = Some(batch);
                smallvec![Effect::Parallel(uploads)]
            }

            GalleryAction::UploadProgress {
                event_id,
                batch,
                file,
                bytes_sent,
            } => {
                if let Some(view) = batch_view(state, &event_id, batch) {
                    if let Some(upload) = view.upload.as_mut() {
                        if let Some(size) = upload.size_of(file) {
                            let sent = upload.sent.entry(file).or_default();
                            *sent = (*sent).max(bytes_sent.min(size));
                        }
                    }
                }
                smallvec![Effect::None]
            }

            GalleryAction::FileCommitted {
                event_id,
                batch,
                file,
                image,
            } => {
                let Some(view) = batch_view(state, &event_id, batch) else {
                    return smallvec![Effect::None];
                };
                tracing::info!(event_id = %event_id, image_id = %image.id, "Image committed");
                UploadMetrics::record_success();

                let released = settle_file(view, file, None);
                smallvec![
                    release_previews(&env.previews, released.into_iter().collect()),
                    finish_if_done(view, env, event_id),
                ]
            }

            GalleryAction::FileUploadFailed {
                event_id,
                batch,
                file,
                error,
            } => {
                let Some(view) = batch_view(state, &event_id, batch) else {
                    return smallvec![Effect::None];
                };
                let file_name = view
                    .pending
                    .iter()
                    .find(|pending| pending.id == file)
                    .map(|pending| pending.file.name.clone())
                    .unwrap_or_default();
                tracing::warn!(event_id = %event_id, file = %file_name, error = %error, "Upload failed");
                UploadMetrics::record_failure();

                settle_file(
                    view,
                    file,
                    Some(FileError {
                        file_name,
                        reason: error.to_string(),
                    }),
                );
                smallvec![finish_if_done(view, env, event_id)]
            }

            GalleryAction::FileCommitFailed {
                event_id,
                batch,
                file,
                url,
                error,
            } => {
                let Some(view) = batch_view(state, &event_id, batch) else {
                    return smallvec![Effect::None];
                };
                let file_name = view
                    .pending
                    .iter()
                    .find(|pending| pending.id == file)
                    .map(|pending| pending.file.name.clone())
                    .unwrap_or_default();
                tracing::error!(
                    event_id = %event_id,
                    file = %file_name,
                    url = %url,
                    error = %error,
                    "Uploaded media was not saved to the event"
                );
                UploadMetrics::record_failure();

                if let Some(upload) = view.upload.as_mut() {
                    upload.orphaned.push(url.clone());
                }
                settle_file(
                    view,
                    file,
                    Some(FileError {
                        file_name,
                        reason: format!("Uploaded to {url} but not saved: {error}"),
                    }),
                );
                smallvec![finish_if_done(view, env, event_id)]
            }

            GalleryAction::BatchFinished { event_id, outcome } => {
                let Some(view) = batch_view(state, &event_id, outcome.batch) else {
                    return smallvec![Effect::None];
                };
                if let Some(batch) = view.upload.take() {
                    let elapsed = env.clock.now() - batch.started_at;
                    UploadMetrics::record_batch_finished(elapsed.to_std().unwrap_or_default());
                }
                tracing::info!(
                    event_id = %event_id,
                    committed = outcome.committed,
                    failed = outcome.failed.len(),
                    "Upload batch finished"
                );
                view.last_outcome = Some(outcome);
                smallvec![Effect::None]
            }

            // ═══════════════════════════════════════════════════════════════
            // DeleteImage
            // ═══════════════════════════════════════════════════════════════
            GalleryAction::DeleteImage {
                event_id,
                image_id,
                actor,
            } => {
                let view = state.view_mut(&event_id);
                if view.deleting {
                    view.delete_error = Some(GalleryError::Busy {
                        operation: "Image deletion",
                    });
                    return smallvec![Effect::None];
                }
                if !view.is_owned_by(&actor.user_id) {
                    tracing::warn!(event_id = %event_id, user_id = %actor.user_id, "Deletion by non-owner");
                    view.delete_error = Some(GalleryError::NotOwner);
                    return smallvec![Effect::None];
                }
                let Some(image) = view.event.as_ref().and_then(|event| event.image(&image_id)).cloned() else {
                    view.delete_error = Some(GalleryError::UnknownImage);
                    return smallvec![Effect::None];
                };

                view.deleting = true;
                view.delete_error = None;

                let events = env.events.clone();
                smallvec![Effect::Stream(Box::pin(async_stream::stream! {
                    match events.remove_image(&event_id, &image).await {
                        Ok(()) => {
                            yield read_event(&events, event_id.clone()).await;
                            yield GalleryAction::ImageDeleted { event_id, image_id };
                        }
                        Err(error) => yield GalleryAction::DeleteFailed { event_id, error },
                    }
                }))]
            }

            GalleryAction::ImageDeleted { event_id, image_id } => {
                tracing::info!(event_id = %event_id, image_id = %image_id, "Image deleted");
                state.view_mut(&event_id).deleting = false;
                smallvec![Effect::None]
            }

            GalleryAction::DeleteFailed { event_id, error } => {
                tracing::warn!(event_id = %event_id, error = %error, "Image deletion failed");
                let view = state.view_mut(&event_id);
                view.deleting = false;
                view.delete_error = Some(error);
                smallvec![Effect::None]
            }

            // ═══════════════════════════════════════════════════════════════
            // RequestDownload: record first, then fetch
            // ═══════════════════════════════════════════════════════════════
            GalleryAction::RequestDownload {
                event_id,
                request,
                image_url,
                email,
            } => {
                let view = state.view_mut(&event_id);
                if view.download.is_in_flight() {
                    return smallvec![refuse_download(event_id, request, GalleryError::Busy { operation: "Download" })];
                }

                let email = email.trim().to_string();
                if !is_valid_email(&email) {
                    view.download.error = Some(GalleryError::InvalidEmail);
                    view.download.failed_stage = Some(DownloadStage::Request);
                    return smallvec![refuse_download(event_id, request, GalleryError::InvalidEmail)];
                }
                if !view.event.as_ref().is_some_and(|event| event.has_image_url(&image_url)) {
                    view.download.error = Some(GalleryError::UnknownImage);
                    view.download.failed_stage = Some(DownloadStage::Request);
                    return smallvec![refuse_download(event_id, request, GalleryError::UnknownImage)];
                }

                view.download.current = Some(request);
                view.download.error = None;
                view.download.failed_stage = None;

                let record = DownloadRecord {
                    user_email: email,
                    download_date: env.clock.now(),
                };
                let events = env.events.clone();
                let fetcher = env.fetcher.clone();

                smallvec![Effect::Stream(Box::pin(async_stream::stream! {
                    if let Err(error) = events.append_download(&event_id, &record).await {
                        yield GalleryAction::DownloadFailed {
                            event_id,
                            request,
                            stage: DownloadStage::AuditLog,
                            error,
                        };
                        return;
                    }

                    let millis = record.download_date.timestamp_millis();
                    yield GalleryAction::DownloadRecorded {
                        event_id: event_id.clone(),
                        request,
                        record,
                    };

                    match fetcher.fetch(&image_url).await {
                        Ok(image) => {
                            let content_type = image
                                .content_type
                                .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
                            let file_name = format!(
                                "{DOWNLOAD_FILE_PREFIX}{millis}.{}",
                                extension_for(&content_type)
                            );
                            yield GalleryAction::DownloadReady {
                                event_id,
                                request,
                                file: DownloadedFile {
                                    file_name,
                                    content_type,
                                    bytes: image.bytes,
                                },
                            };
                        }
                        Err(error) => yield GalleryAction::DownloadFailed {
                            event_id,
                            request,
                            stage: DownloadStage::Fetch,
                            error,
                        },
                    }
                }))]
            }

            GalleryAction::DownloadRecorded {
                event_id,
                request,
                record,
            } => {
                tracing::info!(event_id = %event_id, request = %request, email = %record.user_email, "Download recorded");
                DownloadMetrics::record_audit();
                state.view_mut(&event_id).download.recorded += 1;
                smallvec![Effect::None]
            }

            GalleryAction::DownloadReady { event_id, request, file } => {
                let download = &mut state.view_mut(&event_id).download;
                if download.current == Some(request) {
                    download.current = None;
                }
                download.last_file_name = Some(file.file_name);
                smallvec![Effect::None]
            }

            GalleryAction::DownloadFailed {
                event_id,
                request,
                stage,
                error,
            } => {
                match stage {
                    DownloadStage::Request => {
                        tracing::debug!(event_id = %event_id, request = %request, error = %error, "Download refused");
                    }
                    DownloadStage::AuditLog => {
                        tracing::error!(event_id = %event_id, error = %error, "Download record not saved; download cancelled");
                    }
                    DownloadStage::Fetch => {
                        tracing::warn!(event_id = %event_id, error = %error, "Image fetch failed; download record kept");
                    }
                }
                DownloadMetrics::record_failure(stage.as_str());

                // A refusal never touches the request in flight.
                let Some(view) = state.views.get_mut(&event_id) else {
                    return smallvec![Effect::None];
                };
                let download = &mut view.download;
                if stage != DownloadStage::Request && download.current == Some(request) {
                    download.current = None;
                    download.failed_stage = Some(stage);
                    download.error = Some(error);
                }
                smallvec![Effect::None]
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use crate::actions::Actor;
    use crate::mocks::{MockBackend, mock_environment};
    use crate::state::{Event, NewEvent, SubscriptionStatus, UserId};
    use chrono::Utc;
    use pixwap_testing::{ReducerTest, assertions};

    fn owner() -> Actor {
        Actor {
            user_id: UserId::new("owner"),
            tier: SubscriptionStatus::Free,
        }
    }

    fn event_with_images(count: usize) -> Event {
        let id = EventId::new("evt");
        let mut event = NewEvent {
            title: "Party".into(),
            description: String::new(),
            banner_image_url: String::new(),
            created_at: Utc::now(),
            owner_user_id: UserId::new("owner"),
        }
        .into_event(id.clone());
        event.images = (0..count)
            .map(|n| Image {
                id: ImageId::new(format!("img-{n}")),
                url: format!("https://media.test/{n}.jpg"),
                created_at: Utc::now(),
                event_id: id.clone(),
            })
            .collect();
        event
    }

    fn viewing(event: Event) -> GalleryState {
        let mut state = GalleryState::default();
        let id = event.id.clone();
        state.view_mut(&id).event = Some(event);
        state
    }

    fn jpeg(name: &str) -> SelectedFile {
        SelectedFile::new(name, "image/jpeg", vec![0_u8; 16])
    }

    fn pending(name: &str) -> PendingFile {
        PendingFile {
            id: PendingFileId::new(),
            file: jpeg(name),
            preview: PreviewHandle::new(),
            last_error: None,
        }
    }

    #[test]
    fn selection_keeps_valid_files_and_reports_the_rest() {
        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(viewing(event_with_images(0)))
            .when_action(GalleryAction::SelectFiles {
                event_id: EventId::new("evt"),
                actor: owner(),
                files: vec![jpeg("a.jpg"), SelectedFile::new("b.txt", "text/plain", vec![1_u8])],
            })
            .then_state(|state| {
                let view = &state.views[&EventId::new("evt")];
                assert_eq!(view.pending.len(), 1);
                assert_eq!(view.selection_errors.len(), 1);
                assert_eq!(view.selection_errors[0].file_name, "b.txt");
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn selection_over_quota_is_rejected_whole() {
        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(viewing(event_with_images(0)))
            .when_action(GalleryAction::SelectFiles {
                event_id: EventId::new("evt"),
                actor: owner(),
                files: (0..11).map(|n| jpeg(&format!("{n}.jpg"))).collect(),
            })
            .then_state(|state| {
                let view = &state.views[&EventId::new("evt")];
                assert!(view.pending.is_empty());
                assert_eq!(view.selection_rejection, Some(GalleryError::QuotaExceeded { quota: 10 }));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn visitors_cannot_select_files() {
        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(viewing(event_with_images(0)))
            .when_action(GalleryAction::SelectFiles {
                event_id: EventId::new("evt"),
                actor: Actor {
                    user_id: UserId::new("visitor"),
                    tier: SubscriptionStatus::Premium,
                },
                files: vec![jpeg("a.jpg")],
            })
            .then_state(|state| {
                assert_eq!(
                    state.views[&EventId::new("evt")].selection_rejection,
                    Some(GalleryError::NotOwner)
                );
            })
            .run();
    }

    #[test]
    fn start_upload_with_nothing_pending_changes_nothing() {
        let state = viewing(event_with_images(0));
        let expected = state.clone();

        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(state)
            .when_action(GalleryAction::StartUpload {
                event_id: EventId::new("evt"),
                actor: owner(),
            })
            .then_state(move |state| assert_eq!(state, &expected))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn existing_images_count_against_the_quota() {
        let mut state = viewing(event_with_images(9));
        state.view_mut(&EventId::new("evt")).pending = vec![pending("a.jpg"), pending("b.jpg")];

        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(state)
            .when_action(GalleryAction::StartUpload {
                event_id: EventId::new("evt"),
                actor: owner(),
            })
            .then_state(|state| {
                let view = &state.views[&EventId::new("evt")];
                assert_eq!(view.upload_error, Some(GalleryError::QuotaExceeded { quota: 10 }));
                assert!(!view.is_uploading());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn start_upload_opens_a_batch_over_every_pending_file() {
        let mut state = viewing(event_with_images(0));
        state.view_mut(&EventId::new("evt")).pending = vec![pending("a.jpg"), pending("b.jpg")];

        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(state)
            .when_action(GalleryAction::StartUpload {
                event_id: EventId::new("evt"),
                actor: owner(),
            })
            .then_state(|state| {
                let batch = state.views[&EventId::new("evt")].upload.clone().expect("batch is open");
                assert_eq!(batch.remaining, 2);
                assert_eq!(batch.total_bytes(), 32);
            })
            .then_effects(|effects| {
                assert!(matches!(&effects[0], Effect::Parallel(uploads) if uploads.len() == 2));
            })
            .run();
    }

    #[test]
    fn pending_file_in_flight_cannot_be_removed() {
        let mut state = viewing(event_with_images(0));
        let file = pending("a.jpg");
        let view = state.view_mut(&EventId::new("evt"));
        view.upload = Some(UploadBatch {
            id: BatchId::new(),
            files: vec![(file.id, 16)],
            sent: HashMap::new(),
            remaining: 1,
            committed: 0,
            failed: Vec::new(),
            orphaned: Vec::new(),
            started_at: Utc::now(),
        });
        let file_id = file.id;
        view.pending = vec![file];

        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(state)
            .when_action(GalleryAction::RemovePending {
                event_id: EventId::new("evt"),
                file: file_id,
            })
            .then_state(|state| {
                let view = &state.views[&EventId::new("evt")];
                assert_eq!(view.pending.len(), 1);
                assert_eq!(view.upload_error, Some(GalleryError::Busy { operation: "Upload" }));
            })
            .run();
    }

    #[test]
    fn removal_targets_the_file_even_after_earlier_ones_commit() {
        let mut state = viewing(event_with_images(0));
        let (uploading, kept, dropped) = (pending("a.jpg"), pending("b.jpg"), pending("c.jpg"));
        let batch = BatchId::new();
        let (uploading_id, dropped_id) = (uploading.id, dropped.id);
        let view = state.view_mut(&EventId::new("evt"));
        view.upload = Some(UploadBatch {
            id: batch,
            files: vec![(uploading.id, 16)],
            sent: HashMap::new(),
            remaining: 1,
            committed: 0,
            failed: Vec::new(),
            orphaned: Vec::new(),
            started_at: Utc::now(),
        });
        view.pending = vec![uploading, kept, dropped];

        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(state)
            .given_actions([GalleryAction::FileCommitted {
                event_id: EventId::new("evt"),
                batch,
                file: uploading_id,
                image: Image {
                    id: ImageId::new("img-new"),
                    url: "https://media.test/new.jpg".into(),
                    created_at: Utc::now(),
                    event_id: EventId::new("evt"),
                },
            }])
            .when_action(GalleryAction::RemovePending {
                event_id: EventId::new("evt"),
                file: dropped_id,
            })
            .then_state(|state| {
                let names: Vec<_> = state.views[&EventId::new("evt")]
                    .pending
                    .iter()
                    .map(|pending| pending.file.name.clone())
                    .collect();
                assert_eq!(names, vec!["b.jpg".to_string()]);
            })
            .run();
    }

    #[test]
    fn failed_file_stays_pending_with_its_error() {
        let mut state = viewing(event_with_images(0));
        let (first, second) = (pending("a.jpg"), pending("b.jpg"));
        let batch = BatchId::new();
        let failed_id = first.id;
        let view = state.view_mut(&EventId::new("evt"));
        view.upload = Some(UploadBatch {
            id: batch,
            files: vec![(first.id, 16), (second.id, 16)],
            sent: HashMap::new(),
            remaining: 2,
            committed: 0,
            failed: Vec::new(),
            orphaned: Vec::new(),
            started_at: Utc::now(),
        });
        view.pending = vec![first, second];

        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(state)
            .when_action(GalleryAction::FileUploadFailed {
                event_id: EventId::new("evt"),
                batch,
                file: failed_id,
                error: GalleryError::MediaUpload("HTTP 500".into()),
            })
            .then_state(|state| {
                let view = &state.views[&EventId::new("evt")];
                assert_eq!(view.pending.len(), 2);
                assert!(view.pending[0].last_error.is_some());
                assert!(view.is_uploading());
                assert_eq!(view.upload.as_ref().map(|b| b.remaining), Some(1));
            })
            .then_effects(|effects| assert!(effects.iter().all(Effect::is_none)))
            .run();
    }

    #[test]
    fn results_of_a_stale_batch_are_dropped() {
        let state = viewing(event_with_images(0));
        let expected = state.clone();

        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(state)
            .when_action(GalleryAction::UploadProgress {
                event_id: EventId::new("evt"),
                batch: BatchId::new(),
                file: PendingFileId::new(),
                bytes_sent: 10,
            })
            .then_state(move |state| assert_eq!(state, &expected))
            .run();
    }

    #[test]
    fn invalid_download_email_is_refused_before_any_io() {
        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(viewing(event_with_images(1)))
            .when_action(GalleryAction::RequestDownload {
                event_id: EventId::new("evt"),
                request: DownloadId::new(),
                image_url: "https://media.test/0.jpg".into(),
                email: "visitor@nowhere".into(),
            })
            .then_state(|state| {
                let download = &state.views[&EventId::new("evt")].download;
                assert_eq!(download.error, Some(GalleryError::InvalidEmail));
                assert!(!download.is_in_flight());
            })
            .then_effects(|effects| {
                // Only the refusal is fed back; nothing is recorded or fetched.
                assertions::assert_has_future_effect(effects);
                assert_eq!(assertions::active_count(effects), 1);
            })
            .run();
    }

    #[test]
    fn refusing_a_second_download_leaves_the_first_in_flight() {
        let first = DownloadId::new();
        let second = DownloadId::new();

        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(viewing(event_with_images(1)))
            .given_actions([
                GalleryAction::RequestDownload {
                    event_id: EventId::new("evt"),
                    request: first,
                    image_url: "https://media.test/0.jpg".into(),
                    email: "a@example.com".into(),
                },
                GalleryAction::RequestDownload {
                    event_id: EventId::new("evt"),
                    request: second,
                    image_url: "https://media.test/0.jpg".into(),
                    email: "b@example.com".into(),
                },
            ])
            .when_action(GalleryAction::DownloadFailed {
                event_id: EventId::new("evt"),
                request: second,
                stage: DownloadStage::Request,
                error: GalleryError::Busy { operation: "Download" },
            })
            .then_state(move |state| {
                let download = &state.views[&EventId::new("evt")].download;
                assert_eq!(download.current, Some(first));
                assert_eq!(download.error, None);
            })
            .run();
    }

    #[test]
    fn failed_read_of_an_idle_view_drops_it() {
        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(GalleryState::default())
            .given_actions([GalleryAction::LoadEvent {
                event_id: EventId::new("nope"),
            }])
            .when_action(GalleryAction::EventLoadFailed {
                event_id: EventId::new("nope"),
                error: GalleryError::NotFound { what: "Event" },
            })
            .then_state(|state| assert!(state.views.is_empty()))
            .run();
    }

    #[test]
    fn failed_read_keeps_a_view_with_staged_files() {
        let mut state = viewing(event_with_images(0));
        state.view_mut(&EventId::new("evt")).pending = vec![pending("a.jpg")];

        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(state)
            .when_action(GalleryAction::EventLoadFailed {
                event_id: EventId::new("evt"),
                error: GalleryError::DocumentStore("unavailable".into()),
            })
            .then_state(|state| {
                let view = &state.views[&EventId::new("evt")];
                assert_eq!(view.pending.len(), 1);
                assert!(view.event.is_some());
                assert!(matches!(view.load_error, Some(GalleryError::DocumentStore(_))));
            })
            .run();
    }

    #[test]
    fn downloads_are_limited_to_the_event_images() {
        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(viewing(event_with_images(1)))
            .when_action(GalleryAction::RequestDownload {
                event_id: EventId::new("evt"),
                request: DownloadId::new(),
                image_url: "https://elsewhere.test/x.jpg".into(),
                email: "visitor@example.com".into(),
            })
            .then_state(|state| {
                assert_eq!(
                    state.views[&EventId::new("evt")].download.error,
                    Some(GalleryError::UnknownImage)
                );
            })
            .then_effects(|effects| assert_eq!(assertions::active_count(effects), 1))
            .run();
    }

    #[test]
    fn valid_download_request_goes_in_flight() {
        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(viewing(event_with_images(1)))
            .when_action(GalleryAction::RequestDownload {
                event_id: EventId::new("evt"),
                request: DownloadId::new(),
                image_url: "https://media.test/0.jpg".into(),
                email: "  visitor@example.com ".into(),
            })
            .then_state(|state| assert!(state.views[&EventId::new("evt")].download.is_in_flight()))
            .then_effects(assertions::assert_has_stream_effect)
            .run();
    }

    #[test]
    fn deleting_an_unknown_image_is_rejected() {
        ReducerTest::new(GalleryReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(viewing(event_with_images(1)))
            .when_action(GalleryAction::DeleteImage {
                event_id: EventId::new("evt"),
                image_id: ImageId::new("missing"),
                actor: owner(),
            })
            .then_state(|state| {
                let view = &state.views[&EventId::new("evt")];
                assert_eq!(view.delete_error, Some(GalleryError::UnknownImage));
                assert!(!view.deleting);
            })
            .run();
    }
}
