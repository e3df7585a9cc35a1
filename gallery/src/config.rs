//! Gallery configuration.
//!
//! Upload rules and external service endpoints. Values default to the
//! production limits in [`crate::constants`]; the application overrides
//! endpoints from its environment.

use crate::constants::{
    ALLOWED_MIME_TYPES, DEFAULT_UPLOAD_PRESET, FREE_EVENT_LIMIT, FREE_IMAGE_QUOTA, MAX_FILE_BYTES,
    PREMIUM_IMAGE_QUOTA, TITLE_MAX_CHARS, TITLE_MIN_CHARS, UPLOAD_CHUNK_BYTES,
};
use crate::state::SubscriptionStatus;

/// Per-plan upload and creation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Accepted image MIME types.
    pub allowed_mime_types: &'static [&'static str],

    /// Largest accepted file in bytes.
    ///
    /// Default: 5 MiB
    pub max_file_bytes: u64,

    /// Images per event on the free plan.
    ///
    /// Default: 10
    pub free_image_quota: usize,

    /// Images per event on the premium plan.
    ///
    /// Default: 30
    pub premium_image_quota: usize,

    /// Events a free account may create. Premium accounts are not capped.
    ///
    /// Default: 7
    pub free_event_limit: usize,

    /// Shortest accepted title (characters, trimmed).
    pub title_min_chars: usize,

    /// Longest accepted title (characters).
    pub title_max_chars: usize,
}

impl UploadPolicy {
    /// Create a policy with the default limits.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allowed_mime_types: ALLOWED_MIME_TYPES,
            max_file_bytes: MAX_FILE_BYTES,
            free_image_quota: FREE_IMAGE_QUOTA,
            premium_image_quota: PREMIUM_IMAGE_QUOTA,
            free_event_limit: FREE_EVENT_LIMIT,
            title_min_chars: TITLE_MIN_CHARS,
            title_max_chars: TITLE_MAX_CHARS,
        }
    }

    /// Set the file size limit.
    #[must_use]
    pub const fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    /// Set the free plan image quota.
    #[must_use]
    pub const fn with_free_image_quota(mut self, quota: usize) -> Self {
        self.free_image_quota = quota;
        self
    }

    /// Set the premium plan image quota.
    #[must_use]
    pub const fn with_premium_image_quota(mut self, quota: usize) -> Self {
        self.premium_image_quota = quota;
        self
    }

    /// Set the free plan event limit.
    #[must_use]
    pub const fn with_free_event_limit(mut self, limit: usize) -> Self {
        self.free_event_limit = limit;
        self
    }

    /// Image quota per event for a plan.
    #[must_use]
    pub const fn image_quota(&self, tier: SubscriptionStatus) -> usize {
        match tier {
            SubscriptionStatus::Free => self.free_image_quota,
            SubscriptionStatus::Premium => self.premium_image_quota,
        }
    }

    /// Event limit for a plan, `None` when unlimited.
    #[must_use]
    pub const fn event_limit(&self, tier: SubscriptionStatus) -> Option<usize> {
        match tier {
            SubscriptionStatus::Free => Some(self.free_event_limit),
            SubscriptionStatus::Premium => None,
        }
    }

    /// Whether a MIME type is accepted.
    #[must_use]
    pub fn accepts_mime_type(&self, mime_type: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime_type))
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Firebase project configuration (identity provider and document store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    /// Web API key of the project.
    pub api_key: String,

    /// Project id.
    pub project_id: String,

    /// Identity Toolkit endpoint.
    ///
    /// Default: `https://identitytoolkit.googleapis.com/v1`
    pub auth_base_url: String,

    /// Secure Token endpoint used for refresh.
    ///
    /// Default: `https://securetoken.googleapis.com/v1`
    pub token_base_url: String,

    /// Firestore REST endpoint.
    ///
    /// Default: `https://firestore.googleapis.com/v1`
    pub firestore_base_url: String,
}

impl FirebaseConfig {
    /// Create configuration for a project with the public Google endpoints.
    #[must_use]
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            auth_base_url: "https://identitytoolkit.googleapis.com/v1".to_string(),
            token_base_url: "https://securetoken.googleapis.com/v1".to_string(),
            firestore_base_url: "https://firestore.googleapis.com/v1".to_string(),
        }
    }

    /// Point every endpoint at one base URL (emulators, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        self.auth_base_url = base.to_string();
        self.token_base_url = base.to_string();
        self.firestore_base_url = base.to_string();
        self
    }

    /// Override the identity endpoint.
    #[must_use]
    pub fn with_auth_base_url(mut self, url: impl Into<String>) -> Self {
        self.auth_base_url = url.into();
        self
    }

    /// Override the refresh endpoint.
    #[must_use]
    pub fn with_token_base_url(mut self, url: impl Into<String>) -> Self {
        self.token_base_url = url.into();
        self
    }

    /// Override the Firestore endpoint.
    #[must_use]
    pub fn with_firestore_base_url(mut self, url: impl Into<String>) -> Self {
        self.firestore_base_url = url.into();
        self
    }

    /// Resource path of the default database's document root.
    #[must_use]
    pub fn documents_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }
}

/// Media host (Cloudinary-style unsigned upload) configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHostConfig {
    /// API base, e.g. `https://api.cloudinary.com/v1_1`.
    pub base_url: String,

    /// Cloud name.
    pub cloud_name: String,

    /// Unsigned upload preset.
    ///
    /// Default: `pixwap`
    pub upload_preset: String,

    /// Chunk size of the streamed request body; progress is reported per chunk.
    pub chunk_bytes: usize,
}

impl MediaHostConfig {
    /// Create configuration for a cloud with the public endpoint.
    #[must_use]
    pub fn new(cloud_name: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.cloudinary.com/v1_1".to_string(),
            cloud_name: cloud_name.into(),
            upload_preset: DEFAULT_UPLOAD_PRESET.to_string(),
            chunk_bytes: UPLOAD_CHUNK_BYTES,
        }
    }

    /// Override the API base.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the upload preset.
    #[must_use]
    pub fn with_upload_preset(mut self, preset: impl Into<String>) -> Self {
        self.upload_preset = preset.into();
        self
    }

    /// Override the body chunk size.
    #[must_use]
    pub const fn with_chunk_bytes(mut self, bytes: usize) -> Self {
        self.chunk_bytes = bytes;
        self
    }

    /// Upload endpoint for images.
    #[must_use]
    pub fn upload_url(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.base_url.trim_end_matches('/'),
            self.cloud_name
        )
    }
}
