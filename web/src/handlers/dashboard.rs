//! Owner dashboard and event creation.

use crate::error::AppError;
use crate::extractors::GuardedUser;
use crate::handlers::multipart::read_form;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Multipart, State},
    response::Redirect,
};
use chrono::{DateTime, Utc};
use pixwap_gallery::dashboard::{aggregate, can_create_event, share_link};
use pixwap_gallery::{
    Backend, DashboardAction, DashboardState, DashboardStats, Event, GalleryError, SubscriptionStatus,
};
use serde::Serialize;

// ============================================================================
// Response Types
// ============================================================================

/// One event on the dashboard.
#[derive(Debug, Serialize)]
pub struct EventSummary {
    /// Event id
    pub id: String,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Banner image, empty when none
    pub banner_image_url: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Images in the event
    pub image_count: usize,
    /// Download records of the event
    pub download_count: usize,
    /// Public link of the event page
    pub share_link: String,
}

impl EventSummary {
    fn new(event: &Event, origin: &str) -> Self {
        Self {
            id: event.id.to_string(),
            title: event.title.clone(),
            description: event.description.clone(),
            banner_image_url: event.banner_image_url.clone(),
            created_at: event.created_at,
            image_count: event.images.len(),
            download_count: event.downloads.len(),
            share_link: share_link(origin, &event.id),
        }
    }
}

/// Dashboard page.
#[derive(Debug, Serialize)]
pub struct DashboardPage {
    /// Display name of the owner
    pub display_name: String,
    /// Plan of the owner
    pub subscription_status: SubscriptionStatus,
    /// Aggregated figures
    pub stats: DashboardStats,
    /// `"events/limit"`
    pub usage: String,
    /// Whether another event may be created
    pub can_create_event: bool,
    /// Events, newest first
    pub events: Vec<EventSummary>,
}

/// Event creation form.
#[derive(Debug, Serialize)]
pub struct CreateEventPage {
    /// Whether another event may be created
    pub can_create_event: bool,
    /// `"events/limit"`
    pub usage: String,
    /// Shown instead of the form when the plan limit is reached
    pub limit_message: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Owner dashboard (guarded).
///
/// ```text
/// GET /dashboard
/// ```
///
/// # Errors
///
/// Returns 502 if the events cannot be read.
pub async fn show<B: Backend>(
    State(state): State<AppState<B>>,
    user: GuardedUser,
) -> Result<Json<DashboardPage>, AppError> {
    let dashboard = load_events(&state, &user).await?;
    let policy = state.environment().policy;
    let tier = user.0.subscription_status;
    let stats = aggregate(&dashboard.events, tier, &policy);

    Ok(Json(DashboardPage {
        display_name: user.0.display_name.clone(),
        subscription_status: tier,
        usage: stats.usage_label(),
        can_create_event: can_create_event(stats.event_count, tier, &policy),
        events: dashboard
            .events
            .iter()
            .map(|event| EventSummary::new(event, &state.settings.public_origin))
            .collect(),
        stats,
    }))
}

/// Event creation form (guarded).
///
/// ```text
/// GET /create-event
/// ```
///
/// # Errors
///
/// Returns 502 if the events cannot be read.
pub async fn create_page<B: Backend>(
    State(state): State<AppState<B>>,
    user: GuardedUser,
) -> Result<Json<CreateEventPage>, AppError> {
    let dashboard = load_events(&state, &user).await?;
    let policy = state.environment().policy;
    let tier = user.0.subscription_status;
    let stats = aggregate(&dashboard.events, tier, &policy);
    let allowed = can_create_event(stats.event_count, tier, &policy);

    Ok(Json(CreateEventPage {
        can_create_event: allowed,
        usage: stats.usage_label(),
        limit_message: (!allowed).then(|| {
            GalleryError::EventLimitReached {
                limit: policy.free_event_limit,
            }
            .to_string()
        }),
    }))
}

/// Create an event (guarded).
///
/// Multipart form with `title`, `description` and an optional `banner`
/// image. Redirects to the new event page (303).
///
/// ```text
/// POST /create-event
/// ```
///
/// # Errors
///
/// - 422 for an invalid title or banner, or when the plan limit is reached
/// - 409 while another creation is in flight
/// - 502 if the banner upload or the document write fails
pub async fn create<B: Backend>(
    State(state): State<AppState<B>>,
    user: GuardedUser,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut form = read_form(multipart).await?;
    let banner = if form.files.is_empty() {
        None
    } else {
        Some(form.files.remove(0))
    };

    state
        .dashboard
        .send(DashboardAction::CreateEvent {
            actor: user.actor(),
            title: form.field("title").to_string(),
            description: form.field("description").to_string(),
            banner,
        })
        .await?
        .wait_with_timeout(state.settings.request_timeout)
        .await?;

    let (error, created) = state
        .dashboard
        .state(|s| (s.create_error.clone(), s.last_created.clone()))
        .await;

    match (error, created) {
        (Some(error), _) => Err(error.into()),
        (None, Some(event_id)) => Ok(Redirect::to(&format!("/event/{event_id}"))),
        (None, None) => Err(AppError::internal("Event creation finished without a result")),
    }
}

/// Read the owner's events into the dashboard store.
async fn load_events<B: Backend>(state: &AppState<B>, user: &GuardedUser) -> Result<DashboardState, AppError> {
    state
        .dashboard
        .send(DashboardAction::LoadEvents {
            owner: user.0.id.clone(),
        })
        .await?
        .wait_with_timeout(state.settings.request_timeout)
        .await?;

    let dashboard = state.dashboard.state(Clone::clone).await;
    match &dashboard.error {
        Some(error) => Err(error.clone().into()),
        None => Ok(dashboard),
    }
}
