//! Multipart form decoding shared by the upload endpoints.

use crate::error::AppError;
use axum::extract::Multipart;
use pixwap_gallery::SelectedFile;
use std::collections::HashMap;

/// MIME type assumed when a part does not declare one.
const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Decoded multipart form.
#[derive(Debug, Default)]
pub struct FormData {
    /// Text fields by name (last value wins).
    pub fields: HashMap<String, String>,
    /// File parts in submission order.
    pub files: Vec<SelectedFile>,
}

impl FormData {
    /// Text field, empty when absent.
    #[must_use]
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }
}

/// Read every part of a multipart body.
///
/// Parts with a file name are files; an empty file input (no name, no bytes)
/// is skipped.
///
/// # Errors
///
/// Returns 400 if the body is not valid multipart.
pub async fn read_form(mut multipart: Multipart) -> Result<FormData, AppError> {
    let mut form = FormData::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Malformed form: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(ToString::to_string);
        let mime_type = field.content_type().unwrap_or(UNKNOWN_MIME_TYPE).to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(format!("Malformed form field {name}: {e}")))?;

        match file_name {
            Some(file_name) if !file_name.is_empty() || !bytes.is_empty() => {
                form.files.push(SelectedFile::new(file_name, mime_type, bytes));
            }
            Some(_) => {}
            None => {
                let value = String::from_utf8(bytes.to_vec())
                    .map_err(|_| AppError::bad_request(format!("Field {name} is not UTF-8")))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}
