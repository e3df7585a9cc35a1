//! Configuration management for the Pixwap server.
//!
//! Loads configuration from environment variables (and a `.env` file, see
//! `main.rs`) with sensible defaults. Only the Firebase credentials and the
//! media host cloud name are required.

use pixwap_gallery::{FirebaseConfig, MediaHostConfig};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {name}: {value}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server
    pub server: ServerConfig,
    /// Identity provider and document store
    pub firebase: FirebaseConfig,
    /// Media host
    pub media: MediaHostConfig,
    /// Local files
    pub storage: StorageConfig,
    /// Request handling
    pub web: WebSettings,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
}

/// Local file locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory of the profile cache and persisted credentials.
    ///
    /// Default: the platform's local data directory plus `pixwap`
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Path of the persisted identity credentials.
    #[must_use]
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("credentials.json"))
    }
}

/// Settings the request handlers read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSettings {
    /// How long a guarded page waits for the session to settle before
    /// answering 503.
    ///
    /// Default: 5 seconds
    pub guard_timeout: Duration,

    /// How long a handler waits for a workflow it started.
    ///
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// How long `POST /event/:id/upload?wait=true` waits for the batch.
    ///
    /// Default: 5 minutes
    pub upload_wait_timeout: Duration,

    /// Origin used in share links.
    ///
    /// Default: `http://localhost:8080`
    pub public_origin: String,

    /// Largest accepted request body in bytes.
    ///
    /// Default: 64 MiB (a full premium batch of 5 MiB images fits in
    /// several requests)
    pub max_body_bytes: usize,

    /// Interval between identity token refreshes.
    ///
    /// Default: 50 minutes (tokens live for an hour)
    pub token_refresh_interval: Duration,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            guard_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            upload_wait_timeout: Duration::from_secs(300),
            public_origin: "http://localhost:8080".to_string(),
            max_body_bytes: 64 * 1024 * 1024,
            token_refresh_interval: Duration::from_secs(50 * 60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `FIREBASE_API_KEY`,
    /// `FIREBASE_PROJECT_ID` or `CLOUDINARY_CLOUD_NAME` is unset, and
    /// [`ConfigError::Invalid`] when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = WebSettings::default();

        let mut firebase = FirebaseConfig::new(required("FIREBASE_API_KEY")?, required("FIREBASE_PROJECT_ID")?);
        if let Ok(url) = env::var("FIREBASE_EMULATOR_URL") {
            firebase = firebase.with_base_url(&url);
        }
        if let Ok(url) = env::var("FIREBASE_AUTH_URL") {
            firebase = firebase.with_auth_base_url(url);
        }
        if let Ok(url) = env::var("FIREBASE_TOKEN_URL") {
            firebase = firebase.with_token_base_url(url);
        }
        if let Ok(url) = env::var("FIRESTORE_URL") {
            firebase = firebase.with_firestore_base_url(url);
        }

        let mut media = MediaHostConfig::new(required("CLOUDINARY_CLOUD_NAME")?);
        if let Ok(url) = env::var("CLOUDINARY_URL") {
            media = media.with_base_url(url);
        }
        if let Ok(preset) = env::var("CLOUDINARY_UPLOAD_PRESET") {
            media = media.with_upload_preset(preset);
        }

        let port = parsed("PORT")?.unwrap_or(8080);

        Ok(Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port,
                shutdown_timeout: seconds("SHUTDOWN_TIMEOUT")?.unwrap_or(Duration::from_secs(30)),
            },
            firebase,
            media,
            storage: StorageConfig {
                data_dir: env::var("PIXWAP_DATA_DIR")
                    .ok()
                    .map(PathBuf::from)
                    .or_else(|| dirs::data_local_dir().map(|dir| dir.join("pixwap"))),
            },
            web: WebSettings {
                guard_timeout: seconds("GUARD_TIMEOUT")?.unwrap_or(defaults.guard_timeout),
                request_timeout: seconds("REQUEST_TIMEOUT")?.unwrap_or(defaults.request_timeout),
                upload_wait_timeout: seconds("UPLOAD_WAIT_TIMEOUT")?.unwrap_or(defaults.upload_wait_timeout),
                public_origin: env::var("PUBLIC_ORIGIN").unwrap_or_else(|_| format!("http://localhost:{port}")),
                max_body_bytes: parsed("MAX_BODY_BYTES")?.unwrap_or(defaults.max_body_bytes),
                token_refresh_interval: seconds("TOKEN_REFRESH_INTERVAL")?
                    .unwrap_or(defaults.token_refresh_interval),
            },
        })
    }

    /// Address to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(None),
    }
}

fn seconds(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    Ok(parsed::<u64>(name)?.map(Duration::from_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_live_next_to_the_cache() {
        let storage = StorageConfig {
            data_dir: Some(PathBuf::from("/tmp/pixwap")),
        };
        assert_eq!(
            storage.credentials_path(),
            Some(PathBuf::from("/tmp/pixwap/credentials.json"))
        );
        assert_eq!(StorageConfig { data_dir: None }.credentials_path(), None);
    }

    #[test]
    fn default_settings_wait_for_the_session() {
        let settings = WebSettings::default();
        assert_eq!(settings.guard_timeout, Duration::from_secs(5));
        assert!(settings.max_body_bytes > 5 * 1024 * 1024);
    }

    #[test]
    fn missing_variable_is_named() {
        assert_eq!(
            ConfigError::Missing("FIREBASE_API_KEY").to_string(),
            "Missing required environment variable FIREBASE_API_KEY"
        );
    }
}
