//! Session reducer.
//!
//! Keeps `{current_user, loading, error}` in step with the identity provider
//! and the profile store, and owns the local profile cache.
//!
//! # Flow
//!
//! 1. `RestoreCache` pre-populates the user from the cache at start
//! 2. Every `IdentityChanged` bumps the sync generation
//! 3. A signed-in identity triggers a profile fetch tagged with that generation
//! 4. Results from an older generation are dropped
//!
//! Register, sign-in, sign-out and upgrade requests run one at a time.

use crate::actions::SessionAction;
use crate::constants::{PREMIUM_ID_PREFIX, PREMIUM_ID_SUFFIX_LEN, PROFILE_FETCH_ERROR, PROFILE_MISSING_ERROR};
use crate::environment::{Backend, GalleryEnvironment};
use crate::error::GalleryError;
use crate::providers::{IdentityProvider, ProfileCache, ProfileStore};
use crate::state::{SessionState, SubscriptionStatus, UserId, UserProfile};
use crate::validation::{validate_credentials, validate_registration};
use pixwap_core::effect::Effect;
use pixwap_core::reducer::Reducer;
use pixwap_core::{SmallVec, smallvec};
use pixwap_runtime::metrics::SessionMetrics;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt;
use std::marker::PhantomData;

/// Session reducer.
pub struct SessionReducer<B> {
    _phantom: PhantomData<fn() -> B>,
}

impl<B> SessionReducer<B> {
    /// Create a new session reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<B> Default for SessionReducer<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Clone for SessionReducer<B> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<B> fmt::Debug for SessionReducer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionReducer")
    }
}

/// `premium_` followed by random uppercase alphanumerics.
fn generate_subscription_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PREMIUM_ID_SUFFIX_LEN)
        .map(|byte| char::from(byte).to_ascii_uppercase())
        .collect();
    format!("{PREMIUM_ID_PREFIX}{suffix}")
}

fn store_cache<B: Backend>(env: &GalleryEnvironment<B>, profile: UserProfile) -> Effect<SessionAction> {
    let cache = env.cache.clone();
    Effect::Future(Box::pin(async move {
        if let Err(error) = cache.store(&profile).await {
            tracing::warn!(error = %error, "Could not write profile cache");
        }
        None
    }))
}

fn clear_cache<B: Backend>(env: &GalleryEnvironment<B>) -> Effect<SessionAction> {
    let cache = env.cache.clone();
    Effect::Future(Box::pin(async move {
        if let Err(error) = cache.clear().await {
            tracing::warn!(error = %error, "Could not clear profile cache");
        }
        None
    }))
}

/// Start a profile fetch for `user_id` under a new generation.
fn begin_sync<B: Backend>(
    state: &mut SessionState,
    user_id: UserId,
    env: &GalleryEnvironment<B>,
) -> Effect<SessionAction> {
    state.sync_generation += 1;
    state.identity = Some(user_id.clone());
    state.syncing = true;

    let generation = state.sync_generation;
    let profiles = env.profiles.clone();
    tracing::debug!(user_id = %user_id, generation, "Fetching profile");

    Effect::Future(Box::pin(async move {
        Some(match profiles.get_profile(&user_id).await {
            Ok(Some(profile)) => SessionAction::ProfileLoaded { generation, profile },
            Ok(None) => SessionAction::ProfileMissing { generation },
            Err(error) => SessionAction::ProfileFetchFailed { generation, error },
        })
    }))
}

/// Publish a signed-out session.
fn sign_out_locally<B: Backend>(state: &mut SessionState, env: &GalleryEnvironment<B>) -> Effect<SessionAction> {
    state.sync_generation += 1;
    state.identity = None;
    state.current_user = None;
    state.loading = false;
    state.syncing = false;
    state.error = None;
    clear_cache(env)
}

/// Whether a profile result belongs to the current generation.
fn is_current(state: &SessionState, generation: u64) -> bool {
    if generation == state.sync_generation {
        return true;
    }
    tracing::debug!(
        generation,
        current = state.sync_generation,
        "Dropping stale profile result"
    );
    false
}

/// Refuse an account request while another one runs.
fn reject_if_busy(state: &mut SessionState) -> bool {
    if state.auth_busy {
        state.auth_error = Some(GalleryError::Busy {
            operation: "Account request",
        });
        return true;
    }
    false
}

impl<B: Backend> Reducer for SessionReducer<B> {
    type State = SessionState;
    type Action = SessionAction;
    type Environment = GalleryEnvironment<B>;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ═══════════════════════════════════════════════════════════════
            // RestoreCache: read the cached profile once
            // ═══════════════════════════════════════════════════════════════
            SessionAction::RestoreCache => {
                let cache = env.cache.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    let profile = match cache.load().await {
                        Ok(profile) => profile,
                        Err(error) => {
                            tracing::warn!(error = %error, "Ignoring unreadable profile cache");
                            None
                        }
                    };
                    Some(SessionAction::CacheRestored { profile })
                }))]
            }

            SessionAction::CacheRestored { profile } => {
                // The identity provider has already spoken; its answer wins.
                if state.sync_generation == 0 && state.current_user.is_none() {
                    state.current_user = profile;
                }
                smallvec![Effect::None]
            }

            // ═══════════════════════════════════════════════════════════════
            // IdentityChanged: resynchronise the profile
            // ═══════════════════════════════════════════════════════════════
            SessionAction::IdentityChanged { user: None } => {
                tracing::info!("Identity cleared");
                SessionMetrics::record_sync("signed_out");
                smallvec![sign_out_locally(state, env)]
            }

            SessionAction::IdentityChanged { user: Some(handle) } => {
                if state.syncing && state.identity.as_ref() == Some(&handle.uid) {
                    return smallvec![Effect::None];
                }
                smallvec![begin_sync(state, handle.uid, env)]
            }

            SessionAction::ProfileLoaded { generation, profile } => {
                if !is_current(state, generation) {
                    return smallvec![Effect::None];
                }
                tracing::info!(user_id = %profile.id, tier = %profile.subscription_status, "Profile synchronised");
                SessionMetrics::record_sync("loaded");

                state.current_user = Some(profile.clone());
                state.loading = false;
                state.syncing = false;
                state.error = None;
                smallvec![store_cache(env, profile)]
            }

            SessionAction::ProfileMissing { generation } => {
                if !is_current(state, generation) {
                    return smallvec![Effect::None];
                }
                tracing::warn!(user_id = ?state.identity, "Signed-in user has no profile document");
                SessionMetrics::record_sync("missing");

                state.current_user = None;
                state.loading = false;
                state.syncing = false;
                state.error = Some(PROFILE_MISSING_ERROR.to_string());
                smallvec![clear_cache(env)]
            }

            SessionAction::ProfileFetchFailed { generation, error } => {
                if !is_current(state, generation) {
                    return smallvec![Effect::None];
                }
                tracing::error!(error = %error, "Profile fetch failed");
                SessionMetrics::record_sync("failed");

                state.current_user = None;
                state.loading = false;
                state.syncing = false;
                state.error = Some(PROFILE_FETCH_ERROR.to_string());
                smallvec![clear_cache(env)]
            }

            // ═══════════════════════════════════════════════════════════════
            // Register: create account, then profile document
            // ═══════════════════════════════════════════════════════════════
            SessionAction::Register {
                email,
                password,
                display_name,
            } => {
                if reject_if_busy(state) {
                    return smallvec![Effect::None];
                }
                if let Err(error) = validate_registration(&email, &password, &display_name) {
                    state.auth_error = Some(error);
                    return smallvec![Effect::None];
                }

                state.auth_busy = true;
                state.auth_error = None;

                let identity = env.identity.clone();
                let profiles = env.profiles.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    let display_name = display_name.trim();
                    let handle = match identity.create_user(email.trim(), &password, display_name).await {
                        Ok(handle) => handle,
                        Err(error) => return Some(SessionAction::AuthFailed { error }),
                    };

                    let profile = UserProfile::new_free(handle.uid, handle.email, display_name);
                    Some(match profiles.put_profile(&profile).await {
                        Ok(()) => SessionAction::Registered { profile },
                        Err(error) => SessionAction::AuthFailed { error },
                    })
                }))]
            }

            SessionAction::Registered { profile } => {
                tracing::info!(user_id = %profile.id, "Account registered");
                state.auth_busy = false;
                // Supersedes the fetch started by the provider's own
                // notification, which may race the profile write.
                state.sync_generation += 1;
                state.identity = Some(profile.id.clone());
                state.current_user = Some(profile.clone());
                state.loading = false;
                state.syncing = false;
                state.error = None;
                smallvec![store_cache(env, profile)]
            }

            // ═══════════════════════════════════════════════════════════════
            // SignIn / SignOut
            // ═══════════════════════════════════════════════════════════════
            SessionAction::SignIn { email, password } => {
                if reject_if_busy(state) {
                    return smallvec![Effect::None];
                }
                if let Err(error) = validate_credentials(&email, &password) {
                    state.auth_error = Some(error);
                    return smallvec![Effect::None];
                }

                state.auth_busy = true;
                state.auth_error = None;

                let identity = env.identity.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    Some(match identity.sign_in(email.trim(), &password).await {
                        Ok(user) => SessionAction::SignedIn { user },
                        Err(error) => SessionAction::AuthFailed { error },
                    })
                }))]
            }

            SessionAction::SignedIn { user } => {
                state.auth_busy = false;
                let already_synced = state.identity.as_ref() == Some(&user.uid)
                    && (state.syncing
                        || state
                            .current_user
                            .as_ref()
                            .is_some_and(|profile| profile.id == user.uid));
                if already_synced {
                    return smallvec![Effect::None];
                }
                smallvec![begin_sync(state, user.uid, env)]
            }

            SessionAction::SignOut => {
                if reject_if_busy(state) {
                    return smallvec![Effect::None];
                }
                state.auth_busy = true;
                state.auth_error = None;

                let identity = env.identity.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    Some(match identity.sign_out().await {
                        Ok(()) => SessionAction::SignedOut,
                        Err(error) => SessionAction::AuthFailed { error },
                    })
                }))]
            }

            SessionAction::SignedOut => {
                tracing::info!("Signed out");
                state.auth_busy = false;
                smallvec![sign_out_locally(state, env)]
            }

            // ═══════════════════════════════════════════════════════════════
            // UpgradeSubscription: flip the tier, no payment
            // ═══════════════════════════════════════════════════════════════
            SessionAction::UpgradeSubscription => {
                if reject_if_busy(state) {
                    return smallvec![Effect::None];
                }
                let Some(current) = state.current_user.clone() else {
                    state.auth_error = Some(GalleryError::NotSignedIn);
                    return smallvec![Effect::None];
                };

                state.auth_busy = true;
                state.auth_error = None;

                let subscription_id = generate_subscription_id();
                let profiles = env.profiles.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    let result = profiles
                        .update_subscription(&current.id, SubscriptionStatus::Premium, &subscription_id)
                        .await;
                    Some(match result {
                        Ok(()) => SessionAction::SubscriptionUpgraded {
                            profile: UserProfile {
                                subscription_status: SubscriptionStatus::Premium,
                                subscription_id,
                                ..current
                            },
                        },
                        Err(error) => SessionAction::AuthFailed { error },
                    })
                }))]
            }

            SessionAction::SubscriptionUpgraded { profile } => {
                state.auth_busy = false;
                if state.identity.as_ref() != Some(&profile.id) {
                    return smallvec![Effect::None];
                }
                tracing::info!(user_id = %profile.id, "Subscription upgraded");
                state.current_user = Some(profile.clone());
                smallvec![store_cache(env, profile)]
            }

            SessionAction::AuthFailed { error } => {
                tracing::warn!(error = %error, "Account request failed");
                state.auth_busy = false;
                state.auth_error = Some(error);
                smallvec![Effect::None]
            }
        }
    }
}
