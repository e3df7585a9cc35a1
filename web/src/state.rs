//! Application state shared by the HTTP handlers.
//!
//! Holds the session context, one dashboard store and one gallery store over
//! the same [`GalleryEnvironment`]. Everything is cheap to clone: the stores
//! share their state, the session sits behind an `Arc`.

use crate::config::WebSettings;
use crate::error::AppError;
use pixwap_gallery::{
    Backend, DashboardAction, DashboardReducer, DashboardState, EventId, EventView,
    GalleryAction, GalleryEnvironment, GalleryReducer, GalleryState, SessionContext,
    SessionState,
};
use pixwap_runtime::metrics::MetricsRecorder;
use pixwap_runtime::{Store, StoreError};
use std::sync::Arc;

/// Dashboard store.
pub type DashboardStore<B> =
    Store<DashboardState, DashboardAction, GalleryEnvironment<B>, DashboardReducer<B>>;

/// Event page store.
pub type GalleryStore<B> = Store<GalleryState, GalleryAction, GalleryEnvironment<B>, GalleryReducer<B>>;

/// Application state shared across all HTTP handlers.
pub struct AppState<B: Backend> {
    /// Signed-in user and account requests
    pub session: Arc<SessionContext<B>>,

    /// Owner dashboards and event creation
    pub dashboard: DashboardStore<B>,

    /// Event pages: uploads, deletions, downloads
    pub gallery: GalleryStore<B>,

    /// Handler settings
    pub settings: Arc<WebSettings>,

    /// Prometheus recorder, when installed
    pub metrics: Option<Arc<MetricsRecorder>>,
}

impl<B: Backend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            dashboard: self.dashboard.clone(),
            gallery: self.gallery.clone(),
            settings: Arc::clone(&self.settings),
            metrics: self.metrics.clone(),
        }
    }
}

impl<B: Backend> AppState<B> {
    /// Build the stores over `env` around a started session.
    #[must_use]
    pub fn new(env: &GalleryEnvironment<B>, session: SessionContext<B>, settings: WebSettings) -> Self {
        Self {
            session: Arc::new(session),
            dashboard: Store::new(DashboardState::default(), DashboardReducer::new(), env.clone()),
            gallery: Store::new(GalleryState::default(), GalleryReducer::new(), env.clone()),
            settings: Arc::new(settings),
            metrics: None,
        }
    }

    /// Expose `recorder` at `GET /metrics`.
    #[must_use]
    pub fn with_metrics(mut self, recorder: MetricsRecorder) -> Self {
        self.metrics = Some(Arc::new(recorder));
        self
    }

    /// The environment shared by the stores.
    #[must_use]
    pub fn environment(&self) -> &GalleryEnvironment<B> {
        self.gallery.environment()
    }

    /// Session state once the first identity report has been synchronised.
    ///
    /// Waits up to the guard timeout while the session is loading.
    ///
    /// # Errors
    ///
    /// Returns a 503 [`AppError`] if the session is still loading when the
    /// timeout expires.
    pub async fn resolved_session(&self) -> Result<SessionState, AppError> {
        let snapshot = self.session.snapshot().await;
        if !snapshot.loading {
            return Ok(snapshot);
        }

        match self.session.settled(self.settings.guard_timeout).await {
            Ok(state) => Ok(state),
            Err(StoreError::Timeout) => {
                tracing::warn!("Session still loading after the guard timeout");
                Err(AppError::unavailable("Session is still loading, please retry"))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Current view of an event, read from the remote store if it is not open.
    ///
    /// # Errors
    ///
    /// Returns the read error of the event (404 for a missing event).
    pub async fn open_view(&self, event_id: &EventId) -> Result<EventView, AppError> {
        let loaded = self
            .gallery
            .state(|state| state.view(event_id).is_some_and(|view| view.event.is_some()))
            .await;
        if loaded {
            return self.view(event_id).await;
        }
        self.load_view(event_id).await
    }

    /// Re-read an event and return its view.
    ///
    /// # Errors
    ///
    /// Returns the read error of the event (404 for a missing event).
    pub async fn load_view(&self, event_id: &EventId) -> Result<EventView, AppError> {
        // A failed read may drop the view, so the outcome comes from the action.
        let wanted = event_id.clone();
        let outcome = self
            .gallery
            .send_and_wait_for(
                GalleryAction::LoadEvent {
                    event_id: event_id.clone(),
                },
                move |action| match action {
                    GalleryAction::EventLoaded { event } => event.id == wanted,
                    GalleryAction::EventLoadFailed { event_id, .. } => *event_id == wanted,
                    _ => false,
                },
                self.settings.request_timeout,
            )
            .await?;

        if let GalleryAction::EventLoadFailed { error, .. } = outcome {
            return Err(error.into());
        }
        self.view(event_id).await
    }

    /// Current view of an event without reading it.
    ///
    /// # Errors
    ///
    /// Returns 404 when the event has no open view.
    pub async fn view(&self, event_id: &EventId) -> Result<EventView, AppError> {
        self.gallery
            .state(|state| state.view(event_id).cloned())
            .await
            .ok_or_else(|| AppError::not_found("Event", event_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixwap_gallery::mocks::MockBackend;

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState<MockBackend>>();
    }
}
