//! Axum front-end for Pixwap.
//!
//! Serves the account pages, the owner dashboard and the public event pages
//! on top of the `pixwap-gallery` stores, following the "Functional Core,
//! Imperative Shell" split:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, multipart
//! │  - Request parsing                      │  ← Session guard
//! │  - Response serialization               │  ← Logging, metrics
//! ├─────────────────────────────────────────┤
//! │         Functional Core                 │
//! │  - Session, dashboard, gallery reducers │  ← Testable at memory speed
//! │  - Effect descriptions (values)         │  ← Identity, documents, media
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **Extract** the session user, path and body
//! 2. **Send** an action to the session, dashboard or gallery store
//! 3. **Wait** for the effects it started (bounded)
//! 4. **Read** the resulting state and map it to a response
//!
//! # Example
//!
//! ```ignore
//! use pixwap_web::{AppState, build_router};
//!
//! let session = SessionContext::start(env.clone()).await?;
//! let app = build_router(AppState::new(&env, session, WebSettings::default()));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use config::{Config, ConfigError, WebSettings};
pub use error::{AppError, ErrorCode};
pub use extractors::{CorrelationId, GuardedUser, MaybeUser, SessionUser};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationIdExt, correlation_id_layer};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
