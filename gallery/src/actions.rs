//! Gallery actions.
//!
//! Each reducer has its own action enum. Every enum mixes commands (user
//! intent, sent by the web layer) and results (produced by effects and fed
//! back by the store).

use crate::error::GalleryError;
use crate::state::{
    BatchId, BatchOutcome, DownloadId, DownloadRecord, DownloadStage, DownloadedFile, Event, EventId, Image,
    ImageId, PendingFileId, SelectedFile, SubscriptionStatus, UserHandle, UserId, UserProfile,
};

/// The signed-in user acting on an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// User id.
    pub user_id: UserId,
    /// Plan the quotas are taken from.
    pub tier: SubscriptionStatus,
}

impl From<&UserProfile> for Actor {
    fn from(profile: &UserProfile) -> Self {
        Self {
            user_id: profile.id.clone(),
            tier: profile.subscription_status,
        }
    }
}

/// Session action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    // ═══════════════════════════════════════════════════════════════════════
    // Identity Synchronisation
    // ═══════════════════════════════════════════════════════════════════════
    /// Read the local profile cache (once, at start).
    RestoreCache,

    /// Cache read finished.
    CacheRestored {
        /// Cached profile, if any.
        profile: Option<UserProfile>,
    },

    /// The identity provider reported a state change.
    IdentityChanged {
        /// Signed-in user, `None` when signed out.
        user: Option<UserHandle>,
    },

    /// Profile fetched for an identity change.
    ProfileLoaded {
        /// Sync generation the fetch belongs to.
        generation: u64,
        /// The profile.
        profile: UserProfile,
    },

    /// No profile document exists for the identity.
    ProfileMissing {
        /// Sync generation the fetch belongs to.
        generation: u64,
    },

    /// Profile fetch failed.
    ProfileFetchFailed {
        /// Sync generation the fetch belongs to.
        generation: u64,
        /// Cause.
        error: GalleryError,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Account Requests
    // ═══════════════════════════════════════════════════════════════════════
    /// Create an account and its profile.
    Register {
        /// Email.
        email: String,
        /// Password.
        password: String,
        /// Display name.
        display_name: String,
    },

    /// Account and profile created.
    Registered {
        /// The new profile.
        profile: UserProfile,
    },

    /// Sign in with email and password.
    SignIn {
        /// Email.
        email: String,
        /// Password.
        password: String,
    },

    /// Sign-in accepted by the identity provider.
    SignedIn {
        /// Signed-in user.
        user: UserHandle,
    },

    /// Sign out.
    SignOut,

    /// Signed out.
    SignedOut,

    /// Move the signed-in user to the premium plan (no payment).
    UpgradeSubscription,

    /// Profile upgraded.
    SubscriptionUpgraded {
        /// Updated profile.
        profile: UserProfile,
    },

    /// Register, sign-in, sign-out or upgrade failed.
    AuthFailed {
        /// Cause.
        error: GalleryError,
    },
}

/// Dashboard action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardAction {
    /// Load an owner's events.
    LoadEvents {
        /// Owner.
        owner: UserId,
    },

    /// Events loaded.
    EventsLoaded {
        /// Owner.
        owner: UserId,
        /// Events in store order.
        events: Vec<Event>,
    },

    /// Loading failed.
    LoadFailed {
        /// Owner.
        owner: UserId,
        /// Cause.
        error: GalleryError,
    },

    /// Create an event.
    CreateEvent {
        /// Creator.
        actor: Actor,
        /// Title (trimmed before storing).
        title: String,
        /// Description.
        description: String,
        /// Optional banner image.
        banner: Option<SelectedFile>,
    },

    /// Event created.
    EventCreated {
        /// The stored event.
        event: Event,
    },

    /// Event creation failed.
    CreateFailed {
        /// Cause.
        error: GalleryError,
    },
}

/// Event page action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryAction {
    // ═══════════════════════════════════════════════════════════════════════
    // Event Reads
    // ═══════════════════════════════════════════════════════════════════════
    /// Read an event.
    LoadEvent {
        /// Event.
        event_id: EventId,
    },

    /// Event read.
    EventLoaded {
        /// The event as stored.
        event: Event,
    },

    /// Event read failed.
    EventLoadFailed {
        /// Event.
        event_id: EventId,
        /// Cause.
        error: GalleryError,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Upload Workflow
    // ═══════════════════════════════════════════════════════════════════════
    /// Add files to the pending batch.
    SelectFiles {
        /// Event.
        event_id: EventId,
        /// Acting user.
        actor: Actor,
        /// Chosen files.
        files: Vec<SelectedFile>,
    },

    /// Drop a pending file.
    RemovePending {
        /// Event.
        event_id: EventId,
        /// The staged file.
        file: PendingFileId,
    },

    /// Upload every pending file.
    StartUpload {
        /// Event.
        event_id: EventId,
        /// Acting user.
        actor: Actor,
    },

    /// Bytes sent for one file.
    UploadProgress {
        /// Event.
        event_id: EventId,
        /// Batch.
        batch: BatchId,
        /// File.
        file: PendingFileId,
        /// Cumulative bytes sent.
        bytes_sent: u64,
    },

    /// File uploaded and appended to the event.
    FileCommitted {
        /// Event.
        event_id: EventId,
        /// Batch.
        batch: BatchId,
        /// File.
        file: PendingFileId,
        /// Appended image.
        image: Image,
    },

    /// Upload of a file failed; the file stays pending.
    FileUploadFailed {
        /// Event.
        event_id: EventId,
        /// Batch.
        batch: BatchId,
        /// File.
        file: PendingFileId,
        /// Cause.
        error: GalleryError,
    },

    /// File uploaded but the append to the event failed.
    FileCommitFailed {
        /// Event.
        event_id: EventId,
        /// Batch.
        batch: BatchId,
        /// File.
        file: PendingFileId,
        /// Orphaned media URL.
        url: String,
        /// Cause.
        error: GalleryError,
    },

    /// Every file of the batch has reported and the event was re-read.
    BatchFinished {
        /// Event.
        event_id: EventId,
        /// Result.
        outcome: BatchOutcome,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Image Deletion
    // ═══════════════════════════════════════════════════════════════════════
    /// Remove an image from the event.
    DeleteImage {
        /// Event.
        event_id: EventId,
        /// Image.
        image_id: ImageId,
        /// Acting user.
        actor: Actor,
    },

    /// Image removed and event re-read.
    ImageDeleted {
        /// Event.
        event_id: EventId,
        /// Image.
        image_id: ImageId,
    },

    /// Image removal failed.
    DeleteFailed {
        /// Event.
        event_id: EventId,
        /// Cause.
        error: GalleryError,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Download Capture
    // ═══════════════════════════════════════════════════════════════════════
    /// Record the visitor's email, then fetch an image.
    RequestDownload {
        /// Event.
        event_id: EventId,
        /// Chosen by the caller to pick its outcome out of the broadcast.
        request: DownloadId,
        /// Image URL (must belong to the event).
        image_url: String,
        /// Visitor email.
        email: String,
    },

    /// Download record appended.
    DownloadRecorded {
        /// Event.
        event_id: EventId,
        /// Request.
        request: DownloadId,
        /// Appended record.
        record: DownloadRecord,
    },

    /// Image bytes ready to save.
    DownloadReady {
        /// Event.
        event_id: EventId,
        /// Request.
        request: DownloadId,
        /// The file.
        file: DownloadedFile,
    },

    /// Download failed.
    DownloadFailed {
        /// Event.
        event_id: EventId,
        /// Request.
        request: DownloadId,
        /// Failed stage.
        stage: DownloadStage,
        /// Cause.
        error: GalleryError,
    },
}

impl GalleryAction {
    /// Download request this action concludes, if it is a download outcome.
    #[must_use]
    pub const fn concluded_download(&self) -> Option<DownloadId> {
        match self {
            Self::DownloadReady { request, .. } | Self::DownloadFailed { request, .. } => Some(*request),
            _ => None,
        }
    }

    /// Event this action concerns.
    #[must_use]
    pub fn event_id(&self) -> &EventId {
        match self {
            Self::EventLoaded { event } => &event.id,
            Self::LoadEvent { event_id }
            | Self::EventLoadFailed { event_id, .. }
            | Self::SelectFiles { event_id, .. }
            | Self::RemovePending { event_id, .. }
            | Self::StartUpload { event_id, .. }
            | Self::UploadProgress { event_id, .. }
            | Self::FileCommitted { event_id, .. }
            | Self::FileUploadFailed { event_id, .. }
            | Self::FileCommitFailed { event_id, .. }
            | Self::BatchFinished { event_id, .. }
            | Self::DeleteImage { event_id, .. }
            | Self::ImageDeleted { event_id, .. }
            | Self::DeleteFailed { event_id, .. }
            | Self::RequestDownload { event_id, .. }
            | Self::DownloadRecorded { event_id, .. }
            | Self::DownloadReady { event_id, .. }
            | Self::DownloadFailed { event_id, .. } => event_id,
        }
    }
}
