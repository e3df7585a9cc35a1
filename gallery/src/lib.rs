//! # Pixwap Gallery
//!
//! Events, photo uploads, download capture and session synchronisation for
//! Pixwap, built on the `pixwap-core` reducer architecture.
//!
//! ## Workflows
//!
//! - **Session**: mirrors the identity provider's state into
//!   `{current_user, loading, error}` and keeps a local profile cache
//! - **Dashboard**: lists an owner's events and creates new ones behind the
//!   free plan's event limit
//! - **Event page**: batches, validates and uploads images under per-plan
//!   quotas; removes images; records a visitor's email before each download
//!
//! ## Architecture
//!
//! ```text
//! Action → Reducer → (State, Effects) → Effect Execution → More Actions
//! ```
//!
//! Effects reach external services only through the provider traits in
//! [`providers`]. [`environment::HttpBackend`] wires the HTTP adapters;
//! [`mocks::MockBackend`] wires in-memory ones for tests.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pixwap_gallery::*;
//!
//! let env = GalleryEnvironment::connect(&firebase, media, cache, None);
//! let session = SessionContext::start(env.clone()).await?;
//!
//! let events = Store::new(GalleryState::default(), GalleryReducer::new(), env);
//! events.send(GalleryAction::LoadEvent { event_id }).await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod environment;
pub mod error;
pub mod guard;
pub mod preview;
pub mod providers;
pub mod reducers;
pub mod session;
pub mod state;
pub mod stores;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use actions::{Actor, DashboardAction, GalleryAction, SessionAction};
pub use config::{FirebaseConfig, MediaHostConfig, UploadPolicy};
pub use dashboard::{DashboardStats, EventLimit};
pub use environment::{Backend, GalleryEnvironment, HttpBackend};
pub use error::{GalleryError, Result};
pub use guard::GuardDecision;
pub use preview::{PreviewHandle, PreviewRegistry};
pub use reducers::{DashboardReducer, GalleryReducer, SessionReducer};
pub use session::{SessionContext, SessionStore};
pub use state::{
    DashboardState, DownloadId, Event, EventId, EventView, GalleryState, Image, ImageId,
    PendingFileId, SelectedFile, SessionState, SubscriptionStatus, UserId, UserProfile,
};
