//! Route guard decisions.
//!
//! The guard never decides while the session is still resolving the first
//! identity state, so a signed-in user is not bounced to the login page
//! during start-up.

use crate::state::{SessionState, UserProfile};

/// Outcome of guarding a protected page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is still loading; wait and ask again.
    Pending,
    /// No signed-in user.
    RedirectToLogin,
    /// Render the page for this user.
    Allow(UserProfile),
}

/// Decide access to a protected page.
#[must_use]
pub fn guard(session: &SessionState) -> GuardDecision {
    if session.loading {
        return GuardDecision::Pending;
    }

    match &session.current_user {
        Some(user) => GuardDecision::Allow(user.clone()),
        None => GuardDecision::RedirectToLogin,
    }
}

/// Whether the login and registration pages should send the user to the
/// dashboard instead.
#[must_use]
pub fn redirect_signed_in(session: &SessionState) -> bool {
    !session.loading && session.current_user.is_some()
}
