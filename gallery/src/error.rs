//! Error types for gallery, session and adapter operations.

use thiserror::Error;

/// Result type alias for gallery operations.
pub type Result<T> = std::result::Result<T, GalleryError>;

/// Error taxonomy for Pixwap workflows.
///
/// Validation errors are raised before any network call and carry a message
/// suitable for showing next to the offending input. Adapter errors wrap
/// failures reported by the identity provider, the document store, the media
/// host or the local cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GalleryError {
    // ═══════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════

    /// File type is not one of the accepted image types.
    #[error("Invalid file type: {file_name}")]
    UnsupportedFileType {
        /// Offending file
        file_name: String,
        /// Declared MIME type
        mime_type: String,
    },

    /// File exceeds the size limit.
    #[error("File too large: {file_name}")]
    FileTooLarge {
        /// Offending file
        file_name: String,
        /// File size in bytes
        size: u64,
        /// Limit in bytes
        limit: u64,
    },

    /// Adding the files would exceed the per-event image quota.
    #[error("You can only upload up to {quota} images")]
    QuotaExceeded {
        /// Quota of the acting plan
        quota: usize,
    },

    /// Email does not look like an address.
    #[error("Please enter a valid email")]
    InvalidEmail,

    /// A form field failed validation.
    #[error("{reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// Human-readable reason
        reason: String,
    },

    /// Free plan event limit reached.
    #[error("Free users can only create up to {limit} events. Please upgrade to create more.")]
    EventLimitReached {
        /// Limit of the free plan
        limit: usize,
    },

    /// The operation requires a signed-in user.
    #[error("You must be signed in")]
    NotSignedIn,

    /// Only the event owner may perform this operation.
    #[error("Only the event owner can do that")]
    NotOwner,

    /// The image is not part of the event.
    #[error("Image does not belong to this event")]
    UnknownImage,

    /// The workflow is already running.
    #[error("{operation} is already in progress")]
    Busy {
        /// Workflow name
        operation: &'static str,
    },

    // ═══════════════════════════════════════════════════════════
    // Identity Errors
    // ═══════════════════════════════════════════════════════════

    /// Wrong email or password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Email is already registered.
    #[error("An account with this email already exists")]
    DuplicateAccount,

    /// Password rejected by the identity provider.
    #[error("Password is too weak: {reason}")]
    WeakPassword {
        /// Provider message
        reason: String,
    },

    /// Any other identity provider failure.
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    // ═══════════════════════════════════════════════════════════
    // Storage Errors
    // ═══════════════════════════════════════════════════════════

    /// Document store request failed.
    #[error("Document store error: {0}")]
    DocumentStore(String),

    /// A stored document did not match its schema.
    #[error("Malformed {collection}/{id} document: {reason}")]
    Decode {
        /// Collection name
        collection: &'static str,
        /// Document id
        id: String,
        /// Decoder message
        reason: String,
    },

    /// Resource not found.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up
        what: &'static str,
    },

    /// Media host rejected or failed the upload.
    #[error("Media upload failed: {0}")]
    MediaUpload(String),

    /// Hosted image could not be fetched.
    #[error("Image fetch failed: {0}")]
    ImageFetch(String),

    /// Local profile cache could not be read or written.
    #[error("Profile cache error: {0}")]
    Cache(String),

    /// Internal error (lock poisoning and similar).
    #[error("Internal error")]
    InternalError,
}

impl GalleryError {
    /// Whether the error was caused by user input rather than a dependency.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFileType { .. }
                | Self::FileTooLarge { .. }
                | Self::QuotaExceeded { .. }
                | Self::InvalidEmail
                | Self::InvalidField { .. }
                | Self::EventLimitReached { .. }
                | Self::InvalidCredentials
                | Self::DuplicateAccount
                | Self::WeakPassword { .. }
        )
    }

    /// Whether the error means the caller lacks rights or a session.
    #[must_use]
    pub const fn is_access_error(&self) -> bool {
        matches!(self, Self::NotSignedIn | Self::NotOwner)
    }

    /// Shorthand for an invalid form field.
    #[must_use]
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_name_the_file() {
        let error = GalleryError::UnsupportedFileType {
            file_name: "notes.txt".into(),
            mime_type: "text/plain".into(),
        };
        assert_eq!(error.to_string(), "Invalid file type: notes.txt");
        assert!(error.is_user_error());
    }

    #[test]
    fn quota_message_names_the_quota() {
        assert_eq!(
            GalleryError::QuotaExceeded { quota: 10 }.to_string(),
            "You can only upload up to 10 images"
        );
    }

    #[test]
    fn adapter_errors_are_not_user_errors() {
        assert!(!GalleryError::MediaUpload("502".into()).is_user_error());
        assert!(GalleryError::NotOwner.is_access_error());
    }
}
