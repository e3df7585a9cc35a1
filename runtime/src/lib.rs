//! # Pixwap Runtime
//!
//! Executes reducers from `pixwap-core`.
//!
//! A [`Store`] owns one workflow's state. Request handlers `send` an action,
//! optionally wait on the returned [`EffectHandle`], then read the state.
//! Handlers that need a specific outcome (a download, a finished batch)
//! subscribe to produced actions first and use [`wait_for`].
//!
//! ```ignore
//! use pixwap_runtime::Store;
//!
//! let store = Store::new(GalleryState::default(), GalleryReducer::new(), env);
//! let mut handle = store.send(GalleryAction::LoadEvent { event_id }).await?;
//! handle.wait_with_timeout(Duration::from_secs(5)).await?;
//! let title = store.state(|s| s.event.as_ref().map(|e| e.title.clone())).await;
//! ```

pub mod error;
mod handle;
pub mod metrics;
pub mod store;

pub use error::StoreError;
pub use handle::EffectHandle;
pub use store::{Store, wait_for};
