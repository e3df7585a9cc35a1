//! # Pixwap Testing
//!
//! Testing utilities and helpers for Pixwap reducers and stores.
//!
//! This crate provides:
//! - A deterministic [`FixedClock`]
//! - The Given-When-Then [`ReducerTest`] builder and effect assertions
//! - [`effects::collect_actions`] to drive an effect description to completion
//!   without a Store
//!
//! ## Example
//!
//! ```ignore
//! use pixwap_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(GalleryReducer::new())
//!     .with_env(test_environment())
//!     .given_state(GalleryState::default())
//!     .when_action(GalleryAction::StartUpload { event_id })
//!     .then_effects(|effects| assertions::assert_no_effects(effects))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use pixwap_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until [`FixedClock::advance`] moves it.
    /// Clones share the same time.
    ///
    /// # Example
    ///
    /// ```
    /// use pixwap_testing::mocks::FixedClock;
    /// use pixwap_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2);
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Helpers for executing effect descriptions in tests
pub mod effects {
    use futures::StreamExt;
    use pixwap_core::effect::Effect;

    /// Run an effect to completion and return every action it produced.
    ///
    /// `Parallel` children are run one after another, which keeps the
    /// resulting order deterministic. `Delay` actions are returned without
    /// waiting.
    pub async fn collect_actions<A: Send>(effect: Effect<A>) -> Vec<A> {
        let mut actions = Vec::new();
        let mut queue = vec![effect];

        while let Some(effect) = queue.pop() {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => actions.extend(fut.await),
                Effect::Stream(mut stream) => {
                    while let Some(action) = stream.next().await {
                        actions.push(action);
                    }
                },
                Effect::Delay { action, .. } => actions.push(*action),
                Effect::Parallel(children) | Effect::Sequential(children) => {
                    queue.extend(children.into_iter().rev());
                },
            }
        }

        actions
    }

    /// Run every effect in order and collect the produced actions.
    pub async fn collect_all<A: Send>(effects: impl IntoIterator<Item = Effect<A>>) -> Vec<A> {
        let mut actions = Vec::new();
        for effect in effects {
            actions.extend(collect_actions(effect).await);
        }
        actions
    }
}

/// Test helpers and utilities
pub mod helpers {
    /// Install a `tracing` subscriber that writes through the test harness.
    ///
    /// Safe to call from every test; only the first call installs.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "pixwap=debug".into()),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
