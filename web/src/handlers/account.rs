//! Account pages: home, registration, sign-in, sign-out and the plan upgrade.
//!
//! Account requests go through the session context and wait for it to
//! settle, so a redirect to `/dashboard` is only issued once the profile is
//! published.

use crate::error::{AppError, ErrorCode};
use crate::extractors::{GuardedUser, LOGIN_PATH, MaybeUser};
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use pixwap_gallery::guard::redirect_signed_in;
use pixwap_gallery::{Backend, SessionAction, SessionState, SubscriptionStatus, UserProfile};
use serde::{Deserialize, Serialize};

/// Where signed-in users land.
pub const DASHBOARD_PATH: &str = "/dashboard";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Public view of a profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    /// User id
    pub id: String,
    /// Email
    pub email: String,
    /// Display name
    pub display_name: String,
    /// Profile picture
    pub profile_image_url: Option<String>,
    /// Plan
    pub subscription_status: SubscriptionStatus,
    /// Subscription reference, empty on the free plan
    pub subscription_id: String,
}

impl From<&UserProfile> for ProfileResponse {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.to_string(),
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            profile_image_url: profile.profile_image_url.clone(),
            subscription_status: profile.subscription_status,
            subscription_id: profile.subscription_id.clone(),
        }
    }
}

/// Home page.
#[derive(Debug, Serialize)]
pub struct HomePage {
    /// Signed-in user
    pub user: Option<ProfileResponse>,
    /// Next page for the visitor
    pub next: &'static str,
}

/// Login or registration form.
#[derive(Debug, Serialize)]
pub struct FormPage {
    /// Form name
    pub form: &'static str,
    /// Last account request error
    pub error: Option<String>,
}

/// Registration form body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Email
    pub email: String,
    /// Password (at least 6 characters)
    pub password: String,
    /// Display name
    pub display_name: String,
}

/// Sign-in form body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email
    pub email: String,
    /// Password
    pub password: String,
}

/// Upgrade page.
#[derive(Debug, Serialize)]
pub struct UpgradePage {
    /// Current profile
    pub user: ProfileResponse,
    /// Whether the upgrade is still available
    pub can_upgrade: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Home page.
///
/// ```text
/// GET /
/// ```
pub async fn home(MaybeUser(user): MaybeUser) -> Json<HomePage> {
    let next = if user.is_some() { DASHBOARD_PATH } else { LOGIN_PATH };
    Json(HomePage {
        user: user.as_ref().map(ProfileResponse::from),
        next,
    })
}

/// Registration form; signed-in users are sent to the dashboard.
///
/// # Errors
///
/// Returns 503 if the session is still loading after the guard timeout.
pub async fn register_page<B: Backend>(State(state): State<AppState<B>>) -> Result<Response, AppError> {
    form_page(&state, "register").await
}

/// Login form; signed-in users are sent to the dashboard.
///
/// # Errors
///
/// Returns 503 if the session is still loading after the guard timeout.
pub async fn login_page<B: Backend>(State(state): State<AppState<B>>) -> Result<Response, AppError> {
    form_page(&state, "login").await
}

async fn form_page<B: Backend>(state: &AppState<B>, form: &'static str) -> Result<Response, AppError> {
    let session = state.resolved_session().await?;
    if redirect_signed_in(&session) {
        return Ok(Redirect::to(DASHBOARD_PATH).into_response());
    }
    Ok(Json(FormPage {
        form,
        error: session
            .auth_error
            .as_ref()
            .map(ToString::to_string)
            .or(session.error),
    })
    .into_response())
}

/// Create an account with a free profile and sign it in.
///
/// ```text
/// POST /register
/// {"email": "...", "password": "...", "display_name": "..."}
/// ```
///
/// Redirects to `/dashboard` (303) on success.
///
/// # Errors
///
/// - 422 for invalid fields or a weak password
/// - 409 for an existing account or a request already in flight
/// - 502 when the identity provider or the document store fails
pub async fn register<B: Backend>(
    State(state): State<AppState<B>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Redirect, AppError> {
    let session = state
        .session
        .request(
            SessionAction::Register {
                email: request.email,
                password: request.password,
                display_name: request.display_name,
            },
            state.settings.request_timeout,
        )
        .await?;

    signed_in(&session)?;
    Ok(Redirect::to(DASHBOARD_PATH))
}

/// Sign in with email and password.
///
/// ```text
/// POST /login
/// {"email": "...", "password": "..."}
/// ```
///
/// Redirects to `/dashboard` (303) on success.
///
/// # Errors
///
/// - 401 for wrong credentials
/// - 502 when the profile cannot be loaded
pub async fn login<B: Backend>(
    State(state): State<AppState<B>>,
    Json(request): Json<LoginRequest>,
) -> Result<Redirect, AppError> {
    let session = state
        .session
        .request(
            SessionAction::SignIn {
                email: request.email,
                password: request.password,
            },
            state.settings.request_timeout,
        )
        .await?;

    signed_in(&session)?;
    Ok(Redirect::to(DASHBOARD_PATH))
}

/// Sign out and go back to the login page.
///
/// ```text
/// POST /logout
/// ```
///
/// # Errors
///
/// Returns 502 if the identity provider rejects the sign-out.
pub async fn logout<B: Backend>(State(state): State<AppState<B>>) -> Result<Redirect, AppError> {
    let session = state
        .session
        .request(SessionAction::SignOut, state.settings.request_timeout)
        .await?;

    if let Some(error) = session.auth_error {
        return Err(error.into());
    }
    Ok(Redirect::to(LOGIN_PATH))
}

/// Upgrade page (guarded).
pub async fn upgrade_page(user: GuardedUser) -> Json<UpgradePage> {
    Json(UpgradePage {
        can_upgrade: !user.0.is_premium(),
        user: ProfileResponse::from(&user.0),
    })
}

/// Move the signed-in user to the premium plan (guarded, no payment).
///
/// ```text
/// POST /upgrade
/// ```
///
/// # Errors
///
/// Returns 502 if the profile cannot be updated.
pub async fn upgrade<B: Backend>(
    State(state): State<AppState<B>>,
    user: GuardedUser,
) -> Result<Json<ProfileResponse>, AppError> {
    if user.0.is_premium() {
        return Ok(Json(ProfileResponse::from(&user.0)));
    }

    let session = state
        .session
        .request(SessionAction::UpgradeSubscription, state.settings.request_timeout)
        .await?;

    let profile = signed_in(&session)?;
    tracing::info!(user_id = %profile.id, subscription_id = %profile.subscription_id, "Plan upgraded");
    Ok(Json(ProfileResponse::from(profile)))
}

/// Profile published after an account request, or the request's error.
fn signed_in(session: &SessionState) -> Result<&UserProfile, AppError> {
    if let Some(error) = &session.auth_error {
        return Err(error.clone().into());
    }
    session.current_user.as_ref().ok_or_else(|| {
        let message = session
            .error
            .clone()
            .unwrap_or_else(|| "You must be signed in".to_string());
        AppError::bad_gateway(message).with_code(ErrorCode::ProfileSyncFailed)
    })
}
