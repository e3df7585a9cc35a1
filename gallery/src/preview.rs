//! Local previews of selected files.
//!
//! Every file accepted into an upload batch gets a preview handle that the
//! web front-end serves at `/preview/{handle}`. Handles are released when the
//! file leaves the batch (removed by the user, or committed to the event).

use crate::state::SelectedFile;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

/// Handle of a registered preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewHandle(pub uuid::Uuid);

impl PreviewHandle {
    /// Generate a new random `PreviewHandle`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for PreviewHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PreviewHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// Bytes behind a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    /// MIME type of the file.
    pub mime_type: String,
    /// File contents.
    pub bytes: Bytes,
}

/// Registry of live previews.
///
/// Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    previews: Arc<Mutex<HashMap<PreviewHandle, Preview>>>,
}

impl PreviewRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a preview for `file` under `handle`.
    pub fn register(&self, handle: PreviewHandle, file: &SelectedFile) {
        self.lock().insert(
            handle,
            Preview {
                mime_type: file.mime_type.clone(),
                bytes: file.bytes.clone(),
            },
        );
    }

    /// Look up a preview.
    #[must_use]
    pub fn get(&self, handle: PreviewHandle) -> Option<Preview> {
        self.lock().get(&handle).cloned()
    }

    /// Release a preview. Returns whether it was live.
    pub fn release(&self, handle: PreviewHandle) -> bool {
        self.lock().remove(&handle).is_some()
    }

    /// Number of live previews.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no preview is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PreviewHandle, Preview>> {
        // The map stays consistent even if a holder panicked mid-insert.
        self.previews.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_drops_the_preview() {
        let registry = PreviewRegistry::new();
        let handle = PreviewHandle::new();
        registry.register(handle, &SelectedFile::new("a.jpg", "image/jpeg", vec![1_u8]));

        assert_eq!(registry.get(handle).map(|p| p.mime_type), Some("image/jpeg".into()));
        assert!(registry.release(handle));
        assert!(!registry.release(handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn handles_parse_from_their_display_form() {
        let handle = PreviewHandle::new();
        assert_eq!(handle.to_string().parse::<PreviewHandle>().ok(), Some(handle));
    }
}
