//! Gallery reducers.
//!
//! Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
//! Each one runs in its own store; the web layer sends commands to the
//! store that owns the state it renders.

pub mod dashboard;
pub mod gallery;
pub mod session;

pub use dashboard::DashboardReducer;
pub use gallery::GalleryReducer;
pub use session::SessionReducer;
