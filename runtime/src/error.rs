//! Store errors.

use thiserror::Error;

/// Why a store call did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `shutdown` was called; the action was not reduced.
    #[error("store is shutting down")]
    ShutdownInProgress,

    /// Effects were still running when the shutdown deadline passed.
    #[error("shutdown deadline passed with {0} effects in flight")]
    ShutdownTimeout(usize),

    /// Nothing matched before the deadline.
    #[error("timed out waiting for the store")]
    Timeout,

    /// Every sender of the action broadcast is gone.
    #[error("action broadcast closed")]
    ChannelClosed,
}
