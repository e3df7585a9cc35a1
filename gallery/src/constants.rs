//! Constants shared by the gallery workflows.

/// Largest accepted image, in bytes (5 MiB).
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// MIME types accepted for banners and gallery images.
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Images per event on the free plan.
pub const FREE_IMAGE_QUOTA: usize = 10;

/// Images per event on the premium plan.
pub const PREMIUM_IMAGE_QUOTA: usize = 30;

/// Events a free account may create.
pub const FREE_EVENT_LIMIT: usize = 7;

/// Shortest accepted event title, in characters (after trimming).
pub const TITLE_MIN_CHARS: usize = 3;

/// Longest accepted event title, in characters.
pub const TITLE_MAX_CHARS: usize = 100;

/// Shortest password the identity provider accepts.
pub const PASSWORD_MIN_CHARS: usize = 6;

/// Message published when the profile document cannot be read.
pub const PROFILE_FETCH_ERROR: &str = "Failed to fetch user data.";

/// Message published when an identity has no profile document.
pub const PROFILE_MISSING_ERROR: &str = "User profile not found.";

/// Document collection holding user profiles.
pub const USERS_COLLECTION: &str = "users";

/// Document collection holding events.
pub const EVENTS_COLLECTION: &str = "events";

/// Prefix of generated premium subscription ids.
pub const PREMIUM_ID_PREFIX: &str = "premium_";

/// Number of random characters after [`PREMIUM_ID_PREFIX`].
pub const PREMIUM_ID_SUFFIX_LEN: usize = 6;

/// Prefix of synthesized download file names.
pub const DOWNLOAD_FILE_PREFIX: &str = "image-";

/// Bytes per chunk when streaming an upload body.
pub const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Upload preset sent with every media upload.
pub const DEFAULT_UPLOAD_PRESET: &str = "pixwap";
