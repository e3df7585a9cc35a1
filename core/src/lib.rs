//! # Pixwap Core
//!
//! The vocabulary shared by every Pixwap workflow.
//!
//! Session sync, event uploads, download capture and dashboard loading are
//! each a [`reducer::Reducer`] over plain state. A reducer mutates its state
//! and hands back [`effect::Effect`] values; `pixwap-runtime` runs them and
//! feeds whatever they produce back in as new actions.
//!
//! ```ignore
//! use pixwap_core::{reducer::Reducer, effect::Effect, smallvec, SmallVec};
//!
//! impl Reducer for QuotaReducer {
//!     type State = QuotaState;
//!     type Action = QuotaAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut QuotaState, action: QuotaAction, _: &())
//!         -> SmallVec<[Effect<QuotaAction>; 4]>
//!     {
//!         if let QuotaAction::Used(n) = action {
//!             state.used += n;
//!         }
//!         smallvec![]
//!     }
//! }
//! ```

pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// The reducer trait.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// Business logic for one workflow.
    ///
    /// `reduce` must not block or perform I/O. Anything slow goes into the
    /// returned effects. Calling it twice with equal inputs gives equal
    /// state.
    pub trait Reducer {
        /// Workflow state.
        type State;
        /// User intents plus the results of earlier effects.
        type Action;
        /// Services the effects may capture (clients, clock, caches).
        type Environment;

        /// Apply `action` to `state` and describe the follow-up work.
        ///
        /// Up to four effects stay on the stack.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Descriptions of work for the runtime.
pub mod effect {
    use futures::Stream;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Work a reducer asks the runtime to do.
    ///
    /// Building an `Effect` does nothing. The store executes it after the
    /// reducer returns.
    pub enum Effect<Action> {
        /// Nothing to do.
        None,

        /// Children run concurrently.
        Parallel(Vec<Effect<Action>>),

        /// Children run one after another; each finishes before the next starts.
        Sequential(Vec<Effect<Action>>),

        /// Send `action` after `duration`.
        Delay {
            /// Wait before sending.
            duration: Duration,
            /// Sent once the wait is over.
            action: Box<Action>,
        },

        /// One async call; `Some` is reduced, `None` is dropped.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// An async sequence; every item is reduced in yield order.
        ///
        /// Uploads use this to report progress before their outcome.
        Stream(Pin<Box<dyn Stream<Item = Action> + Send>>),
    }

    // Futures and streams are opaque.
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Stream(_) => write!(f, "Effect::Stream(<stream>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Box an async block whose optional result is fed back.
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// `Parallel`, collapsed to the single child or to `None` when possible.
        #[must_use]
        pub fn merge(mut effects: Vec<Effect<Action>>) -> Effect<Action> {
            effects.retain(|e| !e.is_none());
            match effects.len() {
                0 => Effect::None,
                1 => effects.pop().unwrap_or(Effect::None),
                _ => Effect::Parallel(effects),
            }
        }

        /// Sequential group.
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// True when executing this does no work.
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().all(Effect::is_none)
                },
                _ => false,
            }
        }
    }
}

/// Injected services shared by every crate.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of "now"; swapped for a fixed clock in tests.
    ///
    /// # Examples
    ///
    /// ```
    /// use pixwap_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Current instant.
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
