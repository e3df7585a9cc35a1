//! Custom Axum extractors.
//!
//! - [`GuardedUser`]: the signed-in user of a protected page; redirects to
//!   `/login` otherwise
//! - [`SessionUser`]: the signed-in user of an action endpoint; 401 otherwise
//! - [`MaybeUser`]: the signed-in user, if any
//! - [`CorrelationId`]: the request's correlation id
//!
//! The session extractors never decide while the session is still loading:
//! they wait for it (bounded by the guard timeout) and answer 503 when it
//! does not settle in time.

use crate::error::AppError;
use crate::middleware::correlation_id_from;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use pixwap_gallery::guard::{GuardDecision, guard};
use pixwap_gallery::{Actor, Backend, UserProfile};
use uuid::Uuid;

/// Page a guarded route sends anonymous visitors to.
pub const LOGIN_PATH: &str = "/login";

/// Signed-in user of a guarded page.
#[derive(Debug, Clone)]
pub struct GuardedUser(pub UserProfile);

impl GuardedUser {
    /// The user as the actor of a workflow.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0)
    }
}

/// Why a guarded page was not rendered.
#[derive(Debug)]
pub enum GuardRejection {
    /// No signed-in user.
    Login(Redirect),
    /// The session could not be resolved.
    Error(AppError),
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Login(redirect) => redirect.into_response(),
            Self::Error(error) => error.into_response(),
        }
    }
}

#[async_trait]
impl<B: Backend> FromRequestParts<AppState<B>> for GuardedUser {
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState<B>) -> Result<Self, Self::Rejection> {
        let session = state.resolved_session().await.map_err(GuardRejection::Error)?;

        match guard(&session) {
            GuardDecision::Allow(user) => Ok(Self(user)),
            GuardDecision::RedirectToLogin => {
                tracing::debug!(path = %parts.uri.path(), "Guarded page requested without a session");
                Err(GuardRejection::Login(Redirect::to(LOGIN_PATH)))
            }
            GuardDecision::Pending => Err(GuardRejection::Error(AppError::unavailable(
                "Session is still loading, please retry",
            ))),
        }
    }
}

/// Signed-in user of an action endpoint.
#[derive(Debug, Clone)]
pub struct SessionUser(pub UserProfile);

impl SessionUser {
    /// The user as the actor of a workflow.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0)
    }
}

#[async_trait]
impl<B: Backend> FromRequestParts<AppState<B>> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &AppState<B>) -> Result<Self, Self::Rejection> {
        let session = state.resolved_session().await?;
        session
            .current_user
            .map(Self)
            .ok_or_else(|| AppError::unauthorized("You must be signed in"))
    }
}

/// Signed-in user, if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<UserProfile>);

#[async_trait]
impl<B: Backend> FromRequestParts<AppState<B>> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &AppState<B>) -> Result<Self, Self::Rejection> {
        Ok(Self(state.resolved_session().await?.current_user))
    }
}

/// Correlation ID for request tracing.
///
/// Reads the id stored by the correlation middleware, falling back to the
/// `X-Correlation-ID` header or a fresh UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .unwrap_or_else(|| correlation_id_from(&parts.headers));

        Ok(Self(correlation_id))
    }
}
