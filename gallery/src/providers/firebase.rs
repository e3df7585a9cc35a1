//! Firebase Auth REST identity provider.
//!
//! Uses the Identity Toolkit endpoints for sign-up and sign-in and the
//! Secure Token endpoint for refresh. The refresh token is persisted to a
//! credentials file so the next start can restore the session.

use crate::config::FirebaseConfig;
use crate::error::{GalleryError, Result};
use crate::providers::identity::{IdentityChannel, IdentityProvider, IdentitySubscription};
use crate::state::{UserHandle, UserId};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared holder of the signed-in user's ID token.
///
/// The document store reads it for every request.
#[derive(Debug, Clone, Default)]
pub struct TokenCell {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenCell {
    /// Create an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current ID token.
    #[must_use]
    pub fn id_token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the ID token.
    pub fn set(&self, token: Option<String>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

/// Credentials persisted between runs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCredentials {
    uid: UserId,
    email: String,
    display_name: Option<String>,
    refresh_token: String,
}

impl StoredCredentials {
    fn handle(&self) -> UserHandle {
        UserHandle {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

impl fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileResponse {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Firebase Auth identity provider.
///
/// Clones share tokens, credentials and subscribers.
#[derive(Debug, Clone)]
pub struct FirebaseIdentityProvider {
    client: Client,
    config: FirebaseConfig,
    tokens: TokenCell,
    credentials: Arc<RwLock<Option<StoredCredentials>>>,
    credentials_path: Option<PathBuf>,
    channel: IdentityChannel,
}

impl FirebaseIdentityProvider {
    /// Create a provider for a project.
    ///
    /// Sessions are not persisted until
    /// [`with_credentials_path`](Self::with_credentials_path) is set.
    #[must_use]
    pub fn new(config: FirebaseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            tokens: TokenCell::new(),
            credentials: Arc::new(RwLock::new(None)),
            credentials_path: None,
            channel: IdentityChannel::new(),
        }
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Persist the refresh token to this file.
    #[must_use]
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    /// Cell holding the current ID token, for the document store.
    #[must_use]
    pub fn token_cell(&self) -> TokenCell {
        self.tokens.clone()
    }

    /// Exchange the refresh token for a fresh ID token.
    ///
    /// Republishes the signed-in user. Does nothing when signed out.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::IdentityProvider` if the refresh is rejected.
    /// The session is cleared in that case.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_session(&self) -> Result<()> {
        let Some(credentials) = self.current_credentials() else {
            return Ok(());
        };

        match self.exchange_refresh_token(&credentials).await {
            Ok((refreshed, id_token)) => {
                self.establish(refreshed, id_token).await;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(error = %error, "Token refresh rejected, signing out");
                self.clear_session().await?;
                Err(error)
            }
        }
    }

    fn identity_url(&self, endpoint: &str) -> String {
        format!(
            "{}/accounts:{endpoint}?key={}",
            self.config.auth_base_url.trim_end_matches('/'),
            self.config.api_key
        )
    }

    fn token_url(&self) -> String {
        format!(
            "{}/token?key={}",
            self.config.token_base_url.trim_end_matches('/'),
            self.config.api_key
        )
    }

    fn current_credentials(&self) -> Option<StoredCredentials> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| GalleryError::IdentityProvider(e.to_string()))?;

        read_response(response).await
    }

    async fn exchange_refresh_token(
        &self,
        credentials: &StoredCredentials,
    ) -> Result<(StoredCredentials, String)> {
        let response = self
            .client
            .post(self.token_url())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credentials.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GalleryError::IdentityProvider(e.to_string()))?;

        let refreshed: RefreshResponse = read_response(response).await?;
        if refreshed.user_id != credentials.uid.as_str() {
            return Err(GalleryError::IdentityProvider(
                "refreshed token belongs to another user".to_string(),
            ));
        }

        Ok((
            StoredCredentials {
                refresh_token: refreshed.refresh_token,
                ..credentials.clone()
            },
            refreshed.id_token,
        ))
    }

    /// Install a signed-in session and publish it.
    async fn establish(&self, credentials: StoredCredentials, id_token: String) {
        let handle = credentials.handle();
        self.tokens.set(Some(id_token));
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials.clone());

        if let Err(error) = self.persist(&credentials).await {
            tracing::warn!(error = %error, "Could not persist credentials");
        }

        self.channel.publish(Some(handle));
    }

    async fn clear_session(&self) -> Result<()> {
        self.tokens.set(None);
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.channel.publish(None);

        let Some(path) = &self.credentials_path else {
            return Ok(());
        };
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GalleryError::IdentityProvider(format!(
                "could not remove credentials: {e}"
            ))),
        }
    }

    async fn persist(&self, credentials: &StoredCredentials) -> Result<()> {
        let Some(path) = &self.credentials_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GalleryError::IdentityProvider(e.to_string()))?;
        }
        let json = serde_json::to_vec(credentials)
            .map_err(|e| GalleryError::IdentityProvider(e.to_string()))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| GalleryError::IdentityProvider(e.to_string()))
    }

    async fn load_persisted(&self) -> Result<Option<StoredCredentials>> {
        let Some(path) = &self.credentials_path else {
            return Ok(None);
        };
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(GalleryError::IdentityProvider(e.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| GalleryError::IdentityProvider(format!("corrupt credentials: {e}")))
    }
}

impl IdentityProvider for FirebaseIdentityProvider {
    fn create_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> impl Future<Output = Result<UserHandle>> + Send {
        async move {
            let created: AuthResponse = self
                .post_json(
                    &self.identity_url("signUp"),
                    &PasswordRequest {
                        email,
                        password,
                        return_secure_token: true,
                    },
                )
                .await?;

            let updated: UpdateProfileResponse = self
                .post_json(
                    &self.identity_url("update"),
                    &UpdateProfileRequest {
                        id_token: &created.id_token,
                        display_name,
                        return_secure_token: true,
                    },
                )
                .await?;

            let credentials = StoredCredentials {
                uid: UserId::new(created.local_id),
                email: created.email,
                display_name: Some(display_name.to_string()),
                refresh_token: updated.refresh_token.unwrap_or(created.refresh_token),
            };
            let handle = credentials.handle();
            tracing::info!(user_id = %handle.uid, "Account created");

            self.establish(credentials, updated.id_token.unwrap_or(created.id_token))
                .await;
            Ok(handle)
        }
    }

    fn sign_in(&self, email: &str, password: &str) -> impl Future<Output = Result<UserHandle>> + Send {
        async move {
            let signed_in: AuthResponse = self
                .post_json(
                    &self.identity_url("signInWithPassword"),
                    &PasswordRequest {
                        email,
                        password,
                        return_secure_token: true,
                    },
                )
                .await?;

            let credentials = StoredCredentials {
                uid: UserId::new(signed_in.local_id),
                email: signed_in.email,
                display_name: signed_in.display_name.filter(|name| !name.is_empty()),
                refresh_token: signed_in.refresh_token,
            };
            let handle = credentials.handle();
            tracing::info!(user_id = %handle.uid, "Signed in");

            self.establish(credentials, signed_in.id_token).await;
            Ok(handle)
        }
    }

    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            tracing::info!("Signing out");
            self.clear_session().await
        }
    }

    fn restore(&self) -> impl Future<Output = Result<Option<UserHandle>>> + Send {
        async move {
            let persisted = match self.load_persisted().await {
                Ok(persisted) => persisted,
                Err(error) => {
                    self.channel.publish(None);
                    return Err(error);
                }
            };

            let Some(credentials) = persisted else {
                self.channel.publish(None);
                return Ok(None);
            };

            match self.exchange_refresh_token(&credentials).await {
                Ok((refreshed, id_token)) => {
                    let handle = refreshed.handle();
                    tracing::info!(user_id = %handle.uid, "Session restored");
                    self.establish(refreshed, id_token).await;
                    Ok(Some(handle))
                }
                Err(error) => {
                    tracing::warn!(error = %error, "Persisted session could not be restored");
                    self.clear_session().await?;
                    Err(error)
                }
            }
        }
    }

    fn subscribe(&self) -> IdentitySubscription {
        self.channel.subscribe()
    }
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if response.status().is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| GalleryError::IdentityProvider(e.to_string()));
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => format!("HTTP {status}: {body}"),
    };
    Err(map_provider_error(&message))
}

/// Map an Identity Toolkit error message (`CODE` or `CODE : detail`).
fn map_provider_error(message: &str) -> GalleryError {
    let (code, detail) = match message.split_once(':') {
        Some((code, detail)) => (code.trim(), Some(detail.trim())),
        None => (message.trim(), None),
    };

    match code {
        "EMAIL_EXISTS" => GalleryError::DuplicateAccount,
        "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" | "INVALID_LOGIN_CREDENTIALS" => {
            GalleryError::InvalidCredentials
        }
        "WEAK_PASSWORD" => GalleryError::WeakPassword {
            reason: detail
                .unwrap_or("Password should be at least 6 characters")
                .to_string(),
        },
        _ => GalleryError::IdentityProvider(message.to_string()),
    }
}
