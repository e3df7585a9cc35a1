//! JSON file profile cache.

use crate::error::{GalleryError, Result};
use crate::providers::ProfileCache;
use crate::state::UserProfile;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of the cached profile.
pub const CACHE_FILE_NAME: &str = "current_user.json";

/// Profile cache stored as one JSON file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProfileCache {
    path: PathBuf,
}

impl FileProfileCache {
    /// Cache stored at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache stored in `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CACHE_FILE_NAME))
    }

    /// Cache in the platform's local data directory (`.../pixwap`).
    ///
    /// `None` when the platform has no such directory.
    #[must_use]
    pub fn default_location() -> Option<Self> {
        dirs::data_local_dir().map(|dir| Self::in_dir(dir.join("pixwap")))
    }

    /// Path of the cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileCache for FileProfileCache {
    fn load(&self) -> impl Future<Output = Result<Option<UserProfile>>> + Send {
        async move {
            let bytes = match tokio::fs::read(&self.path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(GalleryError::Cache(e.to_string())),
            };
            serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| GalleryError::Cache(format!("corrupt cache file: {e}")))
        }
    }

    fn store(&self, profile: &UserProfile) -> impl Future<Output = Result<()>> + Send {
        async move {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| GalleryError::Cache(e.to_string()))?;
            }
            let json = serde_json::to_vec_pretty(profile).map_err(|e| GalleryError::Cache(e.to_string()))?;
            tokio::fs::write(&self.path, json)
                .await
                .map_err(|e| GalleryError::Cache(e.to_string()))
        }
    }

    fn clear(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(GalleryError::Cache(e.to_string())),
            }
        }
    }
}
