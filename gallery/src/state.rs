//! Gallery state types.
//!
//! Domain records (profiles, events, images, download records) and the
//! view state owned by the session, dashboard and gallery reducers.

use crate::error::GalleryError;
use crate::preview::PreviewHandle;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an id issued by an external service.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the id.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id! {
    /// User id issued by the identity provider.
    UserId
}

string_id! {
    /// Event document id issued by the document store.
    EventId
}

string_id! {
    /// Image id, generated locally when an upload is committed.
    ImageId
}

impl ImageId {
    /// Generate a new random `ImageId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Identifier of a file waiting in an upload batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingFileId(pub uuid::Uuid);

impl PendingFileId {
    /// Generate a new random `PendingFileId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for PendingFileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PendingFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PendingFileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of one upload batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub uuid::Uuid);

impl BatchId {
    /// Generate a new random `BatchId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of one download request, carried by every action it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadId(pub uuid::Uuid);

impl DownloadId {
    /// Generate a new random `DownloadId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for DownloadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Domain Records
// ═══════════════════════════════════════════════════════════════════════

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Free plan.
    #[default]
    Free,
    /// Premium plan.
    Premium,
}

impl SubscriptionStatus {
    /// Lowercase name, as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            other => Err(format!("unknown subscription status `{other}`")),
        }
    }
}

/// A user's profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity provider user id (also the document key).
    pub id: UserId,
    /// Email address.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Profile picture, if any.
    pub profile_image_url: Option<String>,
    /// Current tier.
    pub subscription_status: SubscriptionStatus,
    /// Subscription reference; empty on the free plan.
    pub subscription_id: String,
}

impl UserProfile {
    /// Profile created at sign-up: free tier, no subscription.
    #[must_use]
    pub fn new_free(id: UserId, email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: display_name.into(),
            profile_image_url: None,
            subscription_status: SubscriptionStatus::Free,
            subscription_id: String::new(),
        }
    }

    /// Whether the user is on the premium plan.
    #[must_use]
    pub fn is_premium(&self) -> bool {
        self.subscription_status == SubscriptionStatus::Premium
    }
}

/// An image attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image id.
    pub id: ImageId,
    /// Durable URL on the media host.
    pub url: String,
    /// When the image was committed.
    pub created_at: DateTime<Utc>,
    /// Owning event.
    pub event_id: EventId,
}

/// One captured download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Email entered by the visitor.
    pub user_email: String,
    /// When the download was requested.
    pub download_date: DateTime<Utc>,
}

/// A shareable event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event id.
    pub id: EventId,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Banner URL; empty when no banner was uploaded.
    pub banner_image_url: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Owner. Never changes after creation.
    pub owner_user_id: UserId,
    /// Gallery images.
    pub images: Vec<Image>,
    /// Viewer emails (kept for compatibility; never written).
    pub viewer_emails: Vec<String>,
    /// Download audit log.
    pub downloads: Vec<DownloadRecord>,
}

impl Event {
    /// Whether `user` owns this event.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner_user_id == user
    }

    /// Image with the given id.
    #[must_use]
    pub fn image(&self, id: &ImageId) -> Option<&Image> {
        self.images.iter().find(|image| &image.id == id)
    }

    /// Whether `url` is one of this event's images.
    #[must_use]
    pub fn has_image_url(&self, url: &str) -> bool {
        self.images.iter().any(|image| image.url == url)
    }
}

/// Fields of an event that is about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// Title (validated).
    pub title: String,
    /// Description.
    pub description: String,
    /// Banner URL, possibly empty.
    pub banner_image_url: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Owner.
    pub owner_user_id: UserId,
}

impl NewEvent {
    /// The stored event once the store has assigned an id.
    #[must_use]
    pub fn into_event(self, id: EventId) -> Event {
        Event {
            id,
            title: self.title,
            description: self.description,
            banner_image_url: self.banner_image_url,
            created_at: self.created_at,
            owner_user_id: self.owner_user_id,
            images: Vec::new(),
            viewer_emails: Vec::new(),
            downloads: Vec::new(),
        }
    }
}

/// Normalized identity returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserHandle {
    /// User id.
    pub uid: UserId,
    /// Email.
    pub email: String,
    /// Display name, if the provider knows one.
    pub display_name: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// Files
// ═══════════════════════════════════════════════════════════════════════

/// A file chosen by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// File name.
    pub name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Contents.
    pub bytes: Bytes,
}

impl SelectedFile {
    /// Create a selected file.
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// A per-file rejection or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    /// File name.
    pub file_name: String,
    /// Human-readable reason.
    pub reason: String,
}

/// A file waiting in the event's upload batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    /// Batch-local id.
    pub id: PendingFileId,
    /// The file.
    pub file: SelectedFile,
    /// Local preview.
    pub preview: PreviewHandle,
    /// Error from the last attempt, if it failed.
    pub last_error: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// Session State
// ═══════════════════════════════════════════════════════════════════════

/// State published by the session context.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    /// Signed-in user's profile.
    pub current_user: Option<UserProfile>,
    /// True until the first identity state has been resolved.
    pub loading: bool,
    /// Last profile synchronisation error.
    pub error: Option<String>,
    /// Identity the session is synchronised with.
    pub identity: Option<UserId>,
    /// Incremented on every identity change; profile results carry it.
    pub sync_generation: u64,
    /// A profile fetch is outstanding.
    pub syncing: bool,
    /// A register/sign-in/sign-out/upgrade request is in flight.
    pub auth_busy: bool,
    /// Error of the last register/sign-in/sign-out/upgrade request.
    pub auth_error: Option<GalleryError>,
}

impl SessionState {
    /// Initial state before the identity provider has reported.
    #[must_use]
    pub fn starting() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// Whether the published user and loading flag are final for now.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !self.loading && !self.syncing && !self.auth_busy
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Dashboard State
// ═══════════════════════════════════════════════════════════════════════

/// State of the owner dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardState {
    /// Owner whose events are loaded.
    pub owner: Option<UserId>,
    /// Owner's events, newest first.
    pub events: Vec<Event>,
    /// A load is in flight.
    pub loading: bool,
    /// Last load error.
    pub error: Option<GalleryError>,
    /// An event creation is in flight.
    pub creating: bool,
    /// Last creation error.
    pub create_error: Option<GalleryError>,
    /// Last created event.
    pub last_created: Option<EventId>,
}

// ═══════════════════════════════════════════════════════════════════════
// Gallery State
// ═══════════════════════════════════════════════════════════════════════

/// An upload batch in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBatch {
    /// Batch id.
    pub id: BatchId,
    /// Files in the batch with their sizes.
    pub files: Vec<(PendingFileId, u64)>,
    /// Bytes sent so far per file.
    pub sent: HashMap<PendingFileId, u64>,
    /// Files that have not reported a result yet.
    pub remaining: usize,
    /// Files uploaded and appended.
    pub committed: usize,
    /// Files that failed.
    pub failed: Vec<FileError>,
    /// Media URLs uploaded but not appended to the event.
    pub orphaned: Vec<String>,
    /// Start time.
    pub started_at: DateTime<Utc>,
}

impl UploadBatch {
    /// Total bytes of the batch.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|(_, size)| size).sum()
    }

    /// Overall progress in `0.0..=1.0` (bytes sent over batch bytes).
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Byte counts stay far below 2^52
    pub fn progress(&self) -> f64 {
        let total = self.total_bytes();
        if total == 0 {
            return 1.0;
        }
        let sent: u64 = self.sent.values().sum();
        (sent as f64 / total as f64).min(1.0)
    }

    /// Whether a file is part of this batch.
    #[must_use]
    pub fn contains(&self, file: PendingFileId) -> bool {
        self.files.iter().any(|(id, _)| *id == file)
    }

    /// Size of a file in the batch.
    #[must_use]
    pub fn size_of(&self, file: PendingFileId) -> Option<u64> {
        self.files
            .iter()
            .find_map(|(id, size)| (*id == file).then_some(*size))
    }
}

/// Result of a finished batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Batch id.
    pub batch: BatchId,
    /// Files uploaded and appended.
    pub committed: usize,
    /// Files that failed, with reasons.
    pub failed: Vec<FileError>,
    /// Media URLs uploaded but not appended to the event.
    pub orphaned: Vec<String>,
}

impl BatchOutcome {
    /// Whether every file in the batch was committed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Stage at which a download failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStage {
    /// Refused before anything was recorded (email, image, busy).
    Request,
    /// Appending the download record.
    AuditLog,
    /// Fetching the image bytes.
    Fetch,
}

impl DownloadStage {
    /// Stage label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::AuditLog => "audit_log",
            Self::Fetch => "fetch",
        }
    }
}

/// A downloaded image ready to be saved by the client.
#[derive(Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Synthesized file name (`image-<unix-millis>.<ext>`).
    pub file_name: String,
    /// Content type reported by the media host.
    pub content_type: String,
    /// Image bytes.
    pub bytes: Bytes,
}

impl fmt::Debug for DownloadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Download capture state of one event view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadState {
    /// Request in flight.
    pub current: Option<DownloadId>,
    /// Error of the last request (field error or stage failure).
    pub error: Option<GalleryError>,
    /// Stage of the last failure.
    pub failed_stage: Option<DownloadStage>,
    /// File name of the last completed download.
    pub last_file_name: Option<String>,
    /// Download records appended from this view.
    pub recorded: usize,
}

impl DownloadState {
    /// Whether a download is in flight.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.current.is_some()
    }
}

/// State of one event page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventView {
    /// Last successful read of the event.
    pub event: Option<Event>,
    /// A read is in flight.
    pub loading: bool,
    /// Error of the last read.
    pub load_error: Option<GalleryError>,
    /// Files waiting to be uploaded.
    pub pending: Vec<PendingFile>,
    /// Per-file rejections from the last selection.
    pub selection_errors: Vec<FileError>,
    /// Whole-selection rejection (quota, ownership).
    pub selection_rejection: Option<GalleryError>,
    /// Batch in flight.
    pub upload: Option<UploadBatch>,
    /// Rejection of the last `StartUpload`.
    pub upload_error: Option<GalleryError>,
    /// Result of the last finished batch.
    pub last_outcome: Option<BatchOutcome>,
    /// An image deletion is in flight.
    pub deleting: bool,
    /// Error of the last deletion.
    pub delete_error: Option<GalleryError>,
    /// Download capture.
    pub download: DownloadState,
}

impl EventView {
    /// Whether an upload batch is in flight.
    #[must_use]
    pub const fn is_uploading(&self) -> bool {
        self.upload.is_some()
    }

    /// Images already attached to the event.
    #[must_use]
    pub fn existing_images(&self) -> usize {
        self.event.as_ref().map_or(0, |event| event.images.len())
    }

    /// Owner check against the last read.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.event.as_ref().is_some_and(|event| event.is_owned_by(user))
    }

    /// No staged file and nothing in flight: the view can be dropped and
    /// rebuilt from the next read.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.upload.is_none() && !self.deleting && !self.download.is_in_flight()
    }
}

/// State of all open event pages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GalleryState {
    /// Views by event id.
    pub views: HashMap<EventId, EventView>,
}

impl GalleryState {
    /// View of an event, if open.
    #[must_use]
    pub fn view(&self, event_id: &EventId) -> Option<&EventView> {
        self.views.get(event_id)
    }

    /// View of an event, opening it if needed.
    pub fn view_mut(&mut self, event_id: &EventId) -> &mut EventView {
        self.views.entry(event_id.clone()).or_default()
    }
}
