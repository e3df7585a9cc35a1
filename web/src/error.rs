//! HTTP errors.
//!
//! Every failure a handler returns becomes an [`AppError`]: an [`ErrorCode`]
//! that fixes the status, a message safe to show a visitor, and optionally
//! the underlying error for the logs. The body is always
//! `{"code": "...", "message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pixwap_gallery::GalleryError;
use pixwap_runtime::StoreError;
use serde::Serialize;
use std::fmt;

/// Machine-readable error code; each maps to one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request.
    BadRequest,
    /// No session, or wrong credentials.
    Unauthorized,
    /// Signed in, but not the event owner.
    Forbidden,
    /// Unknown event, image, pending file or preview.
    NotFound,
    /// Account exists, or a workflow is already running.
    Conflict,
    /// Input rejected by validation.
    ValidationError,
    /// Upload would exceed the event's image quota.
    QuotaExceeded,
    /// Free plan event limit reached.
    EventLimitReached,
    /// A workflow did not settle in time.
    Timeout,
    /// Identity or document store unreachable while syncing the profile.
    ProfileSyncFailed,
    /// An external service failed.
    UpstreamError,
    /// Session still loading, or the server is draining.
    ServiceUnavailable,
    /// Anything else.
    InternalServerError,
}

impl ErrorCode {
    /// Response status for this code.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::ValidationError | Self::QuotaExceeded | Self::EventLimitReached => {
                StatusCode::UNPROCESSABLE_ENTITY
            },
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::ProfileSyncFailed | Self::UpstreamError => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire form, e.g. `QUOTA_EXCEEDED`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::EventLimitReached => "EVENT_LIMIT_REACHED",
            Self::Timeout => "TIMEOUT",
            Self::ProfileSyncFailed => "PROFILE_SYNC_FAILED",
            Self::UpstreamError => "UPSTREAM_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Handler error.
///
/// ```ignore
/// async fn show<B: Backend>(...) -> Result<Json<EventPage>, AppError> {
///     let view = state.load_view(&event_id, actor).await?;
///     Ok(Json(EventPage::from(view)))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    code: ErrorCode,
    message: String,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Error with `code` and a visitor-facing message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the cause; logged for server errors, never sent.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Same message, different code (and so possibly a different status).
    #[must_use]
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }

    /// Response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.code.status()
    }

    /// Wire code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code.as_str()
    }

    /// Visitor-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 400.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// 401.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// 404 for `what` identified by `id`.
    #[must_use]
    pub fn not_found(what: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::NotFound, format!("{what} with id {id} not found"))
    }

    /// 422.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// 500.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }

    /// 502.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamError, message)
    }

    /// 503.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Serialize)]
struct Body<'a> {
    code: ErrorCode,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            let cause = self.source.as_ref().map(|e| format!("{e:#}"));
            tracing::error!(%status, code = self.code.as_str(), message = %self.message, ?cause, "Request failed");
        }
        let body = Body {
            code: self.code,
            message: &self.message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<GalleryError> for AppError {
    fn from(err: GalleryError) -> Self {
        let code = match &err {
            GalleryError::InvalidCredentials | GalleryError::NotSignedIn => ErrorCode::Unauthorized,
            GalleryError::NotOwner => ErrorCode::Forbidden,
            GalleryError::DuplicateAccount | GalleryError::Busy { .. } => ErrorCode::Conflict,
            GalleryError::NotFound { .. } | GalleryError::UnknownImage => ErrorCode::NotFound,
            GalleryError::QuotaExceeded { .. } => ErrorCode::QuotaExceeded,
            GalleryError::EventLimitReached { .. } => ErrorCode::EventLimitReached,
            GalleryError::InternalError => ErrorCode::InternalServerError,
            _ if err.is_user_error() => ErrorCode::ValidationError,
            _ => ErrorCode::UpstreamError,
        };
        let error = Self::new(code, err.to_string());
        if code == ErrorCode::UpstreamError {
            error.with_source(anyhow::Error::new(err))
        } else {
            error
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => Self::new(ErrorCode::Timeout, "The request did not finish in time"),
            StoreError::ShutdownInProgress | StoreError::ShutdownTimeout(_) => {
                Self::unavailable("Server is shutting down")
            },
            StoreError::ChannelClosed => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(err))
            },
        }
    }
}
