//! Input validation for selections, forms and download capture.
//!
//! Everything here runs before any network call.

use crate::config::UploadPolicy;
use crate::constants::PASSWORD_MIN_CHARS;
use crate::error::{GalleryError, Result};
use crate::state::{FileError, SelectedFile};

/// Validate a single file against the type and size rules.
///
/// # Errors
///
/// - [`GalleryError::UnsupportedFileType`] if the MIME type is not accepted
/// - [`GalleryError::FileTooLarge`] if the file exceeds the size limit
pub fn validate_file(file: &SelectedFile, policy: &UploadPolicy) -> Result<()> {
    if !policy.accepts_mime_type(&file.mime_type) {
        return Err(GalleryError::UnsupportedFileType {
            file_name: file.name.clone(),
            mime_type: file.mime_type.clone(),
        });
    }

    if file.size() > policy.max_file_bytes {
        return Err(GalleryError::FileTooLarge {
            file_name: file.name.clone(),
            size: file.size(),
            limit: policy.max_file_bytes,
        });
    }

    Ok(())
}

/// Split a selection into accepted files and per-file rejections.
///
/// Order is preserved in both halves.
#[must_use]
pub fn partition_selection(
    files: Vec<SelectedFile>,
    policy: &UploadPolicy,
) -> (Vec<SelectedFile>, Vec<FileError>) {
    let mut accepted = Vec::with_capacity(files.len());
    let mut rejected = Vec::new();

    for file in files {
        match validate_file(&file, policy) {
            Ok(()) => accepted.push(file),
            Err(error) => rejected.push(FileError {
                file_name: file.name,
                reason: error.to_string(),
            }),
        }
    }

    (accepted, rejected)
}

/// Validate an email address.
///
/// Accepts `local@domain.tld` shapes: exactly one `@`, no whitespace, a
/// non-empty local part, and a domain with a dot that has characters on
/// both sides.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    // Some dot must be neither the first nor the last character.
    domain
        .char_indices()
        .any(|(index, c)| c == '.' && index > 0 && index + 1 < domain.len())
}

/// Validate and trim an event title.
///
/// # Errors
///
/// Returns [`GalleryError::InvalidField`] if the trimmed title is outside the
/// policy's length bounds.
pub fn validate_title(title: &str, policy: &UploadPolicy) -> Result<String> {
    let trimmed = title.trim();
    let chars = trimmed.chars().count();

    if chars < policy.title_min_chars {
        return Err(GalleryError::field(
            "title",
            format!(
                "Event title must be at least {} characters long",
                policy.title_min_chars
            ),
        ));
    }

    if chars > policy.title_max_chars {
        return Err(GalleryError::field(
            "title",
            format!(
                "Event title must be at most {} characters long",
                policy.title_max_chars
            ),
        ));
    }

    Ok(trimmed.to_string())
}

/// Validate sign-in credentials.
///
/// # Errors
///
/// Returns [`GalleryError::InvalidField`] for a missing field and
/// [`GalleryError::InvalidEmail`] for a malformed address.
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(GalleryError::field("email", "Email is required"));
    }
    if !is_valid_email(email.trim()) {
        return Err(GalleryError::InvalidEmail);
    }
    if password.is_empty() {
        return Err(GalleryError::field("password", "Password is required"));
    }
    Ok(())
}

/// Validate a registration form.
///
/// # Errors
///
/// Everything [`validate_credentials`] rejects, plus a missing display name
/// ([`GalleryError::InvalidField`]) and short passwords
/// ([`GalleryError::WeakPassword`]).
pub fn validate_registration(email: &str, password: &str, display_name: &str) -> Result<()> {
    if display_name.trim().is_empty() {
        return Err(GalleryError::field("display_name", "Display name is required"));
    }
    validate_credentials(email, password)?;
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(GalleryError::WeakPassword {
            reason: format!("Password should be at least {PASSWORD_MIN_CHARS} characters"),
        });
    }
    Ok(())
}

/// File extension for a downloaded image's content type.
///
/// Unknown types fall back to `jpg`.
#[must_use]
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    }
}
