//! Firestore-backed profile store and event repository.

pub mod client;
pub mod documents;
pub mod value;

pub use client::{ArrayTransform, FirestoreClient, RawDocument};

use crate::constants::{EVENTS_COLLECTION, USERS_COLLECTION};
use crate::error::{GalleryError, Result};
use crate::providers::{EventRepository, ProfileStore};
use crate::state::{
    DownloadRecord, Event, EventId, Image, NewEvent, SubscriptionStatus, UserId, UserProfile,
};
use documents::{EventDocument, UserDocument, decode, encode};
use serde_json::{Map, Value};
use std::future::Future;
use value::to_firestore;

/// Profile store over the `users` collection.
#[derive(Debug, Clone)]
pub struct FirestoreProfileStore {
    client: FirestoreClient,
}

impl FirestoreProfileStore {
    /// Create a profile store.
    #[must_use]
    pub const fn new(client: FirestoreClient) -> Self {
        Self { client }
    }
}

impl ProfileStore for FirestoreProfileStore {
    fn get_profile(&self, user_id: &UserId) -> impl Future<Output = Result<Option<UserProfile>>> + Send {
        async move {
            let Some(document) = self.client.get(USERS_COLLECTION, user_id.as_str()).await? else {
                return Ok(None);
            };
            let stored: UserDocument = decode(USERS_COLLECTION, &document)?;
            Ok(Some(stored.into_profile(user_id.clone())))
        }
    }

    fn put_profile(&self, profile: &UserProfile) -> impl Future<Output = Result<()>> + Send {
        async move {
            let fields = encode(&UserDocument::from(profile))?;
            self.client
                .set(USERS_COLLECTION, profile.id.as_str(), &fields)
                .await
        }
    }

    fn update_subscription(
        &self,
        user_id: &UserId,
        status: SubscriptionStatus,
        subscription_id: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut fields = Map::new();
            fields.insert("subscription_status".into(), Value::from(status.as_str()));
            fields.insert("subscription_id".into(), Value::from(subscription_id));

            self.client
                .update(USERS_COLLECTION, user_id.as_str(), &fields)
                .await
                .map_err(|error| match error {
                    GalleryError::NotFound { .. } => GalleryError::NotFound { what: "Profile" },
                    other => other,
                })
        }
    }
}

/// Event repository over the `events` collection.
#[derive(Debug, Clone)]
pub struct FirestoreEventRepository {
    client: FirestoreClient,
}

impl FirestoreEventRepository {
    /// Create an event repository.
    #[must_use]
    pub const fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    async fn transform(
        &self,
        event_id: &EventId,
        field: &str,
        transform: ArrayTransform,
        element: Value,
    ) -> Result<()> {
        self.client
            .transform_array(EVENTS_COLLECTION, event_id.as_str(), field, transform, element)
            .await
            .map_err(|error| match error {
                GalleryError::NotFound { .. } => GalleryError::NotFound { what: "Event" },
                other => other,
            })
    }
}

fn decode_event(document: &RawDocument) -> Result<Event> {
    let stored: EventDocument = decode(EVENTS_COLLECTION, document)?;
    Ok(stored.into_event(EventId::new(document.id.clone())))
}

fn encode_entry<T: serde::Serialize>(entry: &T) -> Result<Value> {
    Ok(to_firestore(&Value::Object(encode(entry)?)))
}

impl EventRepository for FirestoreEventRepository {
    fn get_event(&self, event_id: &EventId) -> impl Future<Output = Result<Option<Event>>> + Send {
        async move {
            self.client
                .get(EVENTS_COLLECTION, event_id.as_str())
                .await?
                .as_ref()
                .map(decode_event)
                .transpose()
        }
    }

    fn events_by_owner(&self, owner: &UserId) -> impl Future<Output = Result<Vec<Event>>> + Send {
        async move {
            self.client
                .query_equal(EVENTS_COLLECTION, "user_id", &Value::from(owner.as_str()))
                .await?
                .iter()
                .map(decode_event)
                .collect()
        }
    }

    fn create_event(&self, event: &NewEvent) -> impl Future<Output = Result<Event>> + Send {
        async move {
            let fields = encode(&EventDocument::from(event))?;
            let id = self.client.add(EVENTS_COLLECTION, &fields).await?;
            tracing::info!(event_id = %id, owner = %event.owner_user_id, "Event document created");
            Ok(event.clone().into_event(EventId::new(id)))
        }
    }

    fn append_image(&self, event_id: &EventId, image: &Image) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.transform(event_id, "images", ArrayTransform::Append, encode_entry(image)?)
                .await
        }
    }

    fn remove_image(&self, event_id: &EventId, image: &Image) -> impl Future<Output = Result<()>> + Send {
        async move {
            // Removal matches on the exact stored value, so send the entry as
            // it is stored rather than re-encoding the decoded image.
            let document = self
                .client
                .get(EVENTS_COLLECTION, event_id.as_str())
                .await?
                .ok_or(GalleryError::NotFound { what: "Event" })?;
            let stored = document
                .fields
                .get("images")
                .and_then(|images| images.pointer("/arrayValue/values"))
                .and_then(Value::as_array)
                .and_then(|entries| {
                    entries.iter().find(|entry| {
                        entry.pointer("/mapValue/fields/id/stringValue")
                            == Some(&Value::from(image.id.as_str()))
                    })
                })
                .cloned()
                .ok_or(GalleryError::NotFound { what: "Image" })?;

            self.transform(event_id, "images", ArrayTransform::Remove, stored)
                .await
        }
    }

    fn append_download(
        &self,
        event_id: &EventId,
        record: &DownloadRecord,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.transform(event_id, "downloads", ArrayTransform::Append, encode_entry(record)?)
                .await
        }
    }
}
