//! Dashboard reducer.
//!
//! Loads an owner's events and creates new ones. Creation re-counts the
//! owner's events against the plan limit before anything is uploaded, so a
//! stale dashboard cannot slip past the free plan gate.

use crate::actions::{Actor, DashboardAction};
use crate::dashboard::can_create_event;
use crate::environment::{Backend, GalleryEnvironment};
use crate::error::{GalleryError, Result};
use crate::providers::{EventRepository, MediaUploader, ProgressSink};
use crate::state::{DashboardState, Event, NewEvent, SelectedFile};
use crate::validation::{validate_file, validate_title};
use pixwap_core::effect::Effect;
use pixwap_core::reducer::Reducer;
use pixwap_core::{SmallVec, smallvec};
use std::fmt;
use std::marker::PhantomData;

/// Dashboard reducer.
pub struct DashboardReducer<B> {
    _phantom: PhantomData<fn() -> B>,
}

impl<B> DashboardReducer<B> {
    /// Create a new dashboard reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<B> Default for DashboardReducer<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Clone for DashboardReducer<B> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<B> fmt::Debug for DashboardReducer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DashboardReducer")
    }
}

/// Gate, upload the banner, then create the event document.
async fn create_event<B: Backend>(
    env: GalleryEnvironment<B>,
    actor: Actor,
    title: String,
    description: String,
    banner: Option<SelectedFile>,
) -> Result<Event> {
    let owned = env.events.events_by_owner(&actor.user_id).await?.len();
    if !can_create_event(owned, actor.tier, &env.policy) {
        return Err(GalleryError::EventLimitReached {
            limit: env.policy.free_event_limit,
        });
    }

    let banner_image_url = match banner {
        Some(file) => env.media.upload(file, ProgressSink::discard()).await?.secure_url,
        None => String::new(),
    };

    let new_event = NewEvent {
        title,
        description,
        banner_image_url,
        created_at: env.clock.now(),
        owner_user_id: actor.user_id,
    };
    env.events.create_event(&new_event).await
}

impl<B: Backend> Reducer for DashboardReducer<B> {
    type State = DashboardState;
    type Action = DashboardAction;
    type Environment = GalleryEnvironment<B>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ═══════════════════════════════════════════════════════════════
            // LoadEvents
            // ═══════════════════════════════════════════════════════════════
            DashboardAction::LoadEvents { owner } => {
                if state.owner.as_ref() != Some(&owner) {
                    state.events.clear();
                }
                state.owner = Some(owner.clone());
                state.loading = true;
                state.error = None;

                let events = env.events.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    Some(match events.events_by_owner(&owner).await {
                        Ok(events) => DashboardAction::EventsLoaded { owner, events },
                        Err(error) => DashboardAction::LoadFailed { owner, error },
                    })
                }))]
            }

            DashboardAction::EventsLoaded { owner, mut events } => {
                if state.owner.as_ref() != Some(&owner) {
                    return smallvec![Effect::None];
                }
                events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                tracing::debug!(owner = %owner, count = events.len(), "Dashboard events loaded");
                state.events = events;
                state.loading = false;
                smallvec![Effect::None]
            }

            DashboardAction::LoadFailed { owner, error } => {
                if state.owner.as_ref() != Some(&owner) {
                    return smallvec![Effect::None];
                }
                tracing::error!(owner = %owner, error = %error, "Failed to load dashboard events");
                state.loading = false;
                state.error = Some(error);
                smallvec![Effect::None]
            }

            // ═══════════════════════════════════════════════════════════════
            // CreateEvent
            // ═══════════════════════════════════════════════════════════════
            DashboardAction::CreateEvent {
                actor,
                title,
                description,
                banner,
            } => {
                if state.creating {
                    state.create_error = Some(GalleryError::Busy {
                        operation: "Event creation",
                    });
                    return smallvec![Effect::None];
                }

                let title = match validate_title(&title, &env.policy) {
                    Ok(title) => title,
                    Err(error) => {
                        state.create_error = Some(error);
                        return smallvec![Effect::None];
                    }
                };
                if let Some(Err(error)) = banner.as_ref().map(|file| validate_file(file, &env.policy)) {
                    state.create_error = Some(error);
                    return smallvec![Effect::None];
                }

                let known_count = (state.owner.as_ref() == Some(&actor.user_id)).then_some(state.events.len());
                if known_count.is_some_and(|count| !can_create_event(count, actor.tier, &env.policy)) {
                    tracing::warn!(user_id = %actor.user_id, "Event limit reached");
                    state.create_error = Some(GalleryError::EventLimitReached {
                        limit: env.policy.free_event_limit,
                    });
                    return smallvec![Effect::None];
                }

                state.creating = true;
                state.create_error = None;
                state.last_created = None;

                let env = env.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    Some(match create_event(env, actor, title, description, banner).await {
                        Ok(event) => DashboardAction::EventCreated { event },
                        Err(error) => DashboardAction::CreateFailed { error },
                    })
                }))]
            }

            DashboardAction::EventCreated { event } => {
                tracing::info!(event_id = %event.id, owner = %event.owner_user_id, "Event created");
                state.creating = false;
                state.last_created = Some(event.id.clone());
                if state.owner.as_ref() == Some(&event.owner_user_id) {
                    state.events.insert(0, event);
                }
                smallvec![Effect::None]
            }

            DashboardAction::CreateFailed { error } => {
                tracing::warn!(error = %error, "Event creation failed");
                state.creating = false;
                state.create_error = Some(error);
                smallvec![Effect::None]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockBackend, mock_environment};
    use crate::state::{EventId, SubscriptionStatus, UserId};
    use chrono::{TimeZone, Utc};
    use pixwap_testing::{ReducerTest, assertions};

    fn actor(tier: SubscriptionStatus) -> Actor {
        Actor {
            user_id: UserId::new("owner"),
            tier,
        }
    }

    fn event(id: &str, day: u32) -> Event {
        NewEvent {
            title: format!("Event {id}"),
            description: String::new(),
            banner_image_url: String::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).single().unwrap_or_default(),
            owner_user_id: UserId::new("owner"),
        }
        .into_event(EventId::new(id))
    }

    fn owned(count: u32) -> DashboardState {
        DashboardState {
            owner: Some(UserId::new("owner")),
            events: (1..=count).map(|n| event(&format!("e{n}"), n)).collect(),
            ..DashboardState::default()
        }
    }

    #[test]
    fn loaded_events_are_sorted_newest_first() {
        ReducerTest::new(DashboardReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(DashboardState {
                owner: Some(UserId::new("owner")),
                loading: true,
                ..DashboardState::default()
            })
            .when_action(DashboardAction::EventsLoaded {
                owner: UserId::new("owner"),
                events: vec![event("old", 1), event("new", 9), event("mid", 5)],
            })
            .then_state(|state| {
                let ids: Vec<_> = state.events.iter().map(|e| e.id.as_str().to_string()).collect();
                assert_eq!(ids, vec!["new", "mid", "old"]);
                assert!(!state.loading);
            })
            .run();
    }

    #[test]
    fn results_for_another_owner_are_ignored() {
        ReducerTest::new(DashboardReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(owned(2))
            .when_action(DashboardAction::EventsLoaded {
                owner: UserId::new("someone-else"),
                events: Vec::new(),
            })
            .then_state(|state| assert_eq!(state.events.len(), 2))
            .run();
    }

    #[test]
    fn free_owner_at_the_limit_is_refused_locally() {
        ReducerTest::new(DashboardReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(owned(7))
            .when_action(DashboardAction::CreateEvent {
                actor: actor(SubscriptionStatus::Free),
                title: "Another party".into(),
                description: String::new(),
                banner: None,
            })
            .then_state(|state| {
                assert_eq!(state.create_error, Some(GalleryError::EventLimitReached { limit: 7 }));
                assert!(!state.creating);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn premium_owner_is_not_capped() {
        ReducerTest::new(DashboardReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(owned(7))
            .when_action(DashboardAction::CreateEvent {
                actor: actor(SubscriptionStatus::Premium),
                title: "Another party".into(),
                description: String::new(),
                banner: None,
            })
            .then_state(|state| assert!(state.creating))
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn short_title_is_rejected() {
        ReducerTest::new(DashboardReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(DashboardState::default())
            .when_action(DashboardAction::CreateEvent {
                actor: actor(SubscriptionStatus::Free),
                title: " ab ".into(),
                description: String::new(),
                banner: None,
            })
            .then_state(|state| {
                assert!(matches!(
                    state.create_error,
                    Some(GalleryError::InvalidField { field: "title", .. })
                ));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn banner_must_be_an_accepted_image() {
        ReducerTest::new(DashboardReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(DashboardState::default())
            .when_action(DashboardAction::CreateEvent {
                actor: actor(SubscriptionStatus::Free),
                title: "Wedding".into(),
                description: String::new(),
                banner: Some(SelectedFile::new("banner.gif", "image/gif", vec![0_u8; 8])),
            })
            .then_state(|state| {
                assert!(matches!(
                    state.create_error,
                    Some(GalleryError::UnsupportedFileType { .. })
                ));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn created_event_goes_to_the_front() {
        ReducerTest::new(DashboardReducer::<MockBackend>::new())
            .with_env(mock_environment())
            .given_state(DashboardState {
                creating: true,
                ..owned(2)
            })
            .when_action(DashboardAction::EventCreated { event: event("fresh", 20) })
            .then_state(|state| {
                assert!(!state.creating);
                assert_eq!(state.events[0].id, EventId::new("fresh"));
                assert_eq!(state.last_created, Some(EventId::new("fresh")));
            })
            .run();
    }
}
