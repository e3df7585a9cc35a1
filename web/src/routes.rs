//! Router configuration for the Pixwap server.
//!
//! Builds the complete Axum router with all pages and endpoints.

use crate::handlers::{account, dashboard, event, health};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use pixwap_gallery::Backend;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Configures:
/// - Health checks and metrics
/// - Account pages (home, register, login, logout, upgrade)
/// - The owner dashboard and event creation
/// - Event pages: selection, upload, removal, download, previews
///
/// Every request gets a correlation id and a trace span; bodies are capped
/// at the configured maximum.
pub fn build_router<B: Backend>(state: AppState<B>) -> Router {
    let max_body_bytes = state.settings.max_body_bytes;

    let event_routes = Router::new()
        .route("/event/:id", get(event::show::<B>))
        .route("/event/:id/selection", post(event::select::<B>))
        .route("/event/:id/selection/:file_id", delete(event::remove_pending::<B>))
        .route("/event/:id/upload", post(event::upload::<B>))
        .route("/event/:id/progress", get(event::progress::<B>))
        .route("/event/:id/images/:image_id", delete(event::delete_image::<B>))
        .route("/event/:id/download", post(event::download::<B>))
        .route("/preview/:handle", get(event::preview::<B>));

    Router::new()
        // Health checks
        .route("/health", get(health::health::<B>))
        .route("/metrics", get(health::metrics::<B>))
        // Account pages
        .route("/", get(account::home))
        .route("/register", get(account::register_page::<B>).post(account::register::<B>))
        .route("/login", get(account::login_page::<B>).post(account::login::<B>))
        .route("/logout", post(account::logout::<B>))
        .route("/upgrade", get(account::upgrade_page).post(account::upgrade::<B>))
        // Dashboard
        .route("/dashboard", get(dashboard::show::<B>))
        .route(
            "/create-event",
            get(dashboard::create_page::<B>).post(dashboard::create::<B>),
        )
        .merge(event_routes)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
