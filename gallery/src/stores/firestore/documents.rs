//! Stored document schemas.
//!
//! Field names match the documents written by the web client, so both can
//! share a project. Decoding fails closed: a missing or mistyped field is a
//! [`GalleryError::Decode`] rather than a defaulted value.

use super::client::RawDocument;
use crate::error::{GalleryError, Result};
use crate::state::{
    DownloadRecord, Event, EventId, Image, NewEvent, SubscriptionStatus, UserId, UserProfile,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDocument {
    /// Email.
    pub email: String,
    /// Display name.
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// Profile picture.
    #[serde(rename = "pfpUrl", default, skip_serializing_if = "Option::is_none")]
    pub pfp_url: Option<String>,
    /// `free` or `premium`.
    pub subscription_status: SubscriptionStatus,
    /// Subscription reference.
    pub subscription_id: String,
}

impl UserDocument {
    /// Profile stored under `id`.
    #[must_use]
    pub fn into_profile(self, id: UserId) -> UserProfile {
        UserProfile {
            id,
            email: self.email,
            display_name: self.display_name,
            profile_image_url: self.pfp_url,
            subscription_status: self.subscription_status,
            subscription_id: self.subscription_id,
        }
    }
}

impl From<&UserProfile> for UserDocument {
    fn from(profile: &UserProfile) -> Self {
        Self {
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            pfp_url: profile.profile_image_url.clone(),
            subscription_status: profile.subscription_status,
            subscription_id: profile.subscription_id.clone(),
        }
    }
}

/// `events/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDocument {
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Banner URL, possibly empty.
    #[serde(rename = "bannerImageUrl")]
    pub banner_image_url: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Owner.
    pub user_id: UserId,
    /// `{id, url, created_at, event_id}` entries.
    pub images: Vec<Image>,
    /// Viewer emails.
    #[serde(rename = "viewerEmails")]
    pub viewer_emails: Vec<String>,
    /// `{user_email, download_date}` entries.
    pub downloads: Vec<DownloadRecord>,
}

impl EventDocument {
    /// Event stored under `id`.
    #[must_use]
    pub fn into_event(self, id: EventId) -> Event {
        Event {
            id,
            title: self.title,
            description: self.description,
            banner_image_url: self.banner_image_url,
            created_at: self.created_at,
            owner_user_id: self.user_id,
            images: self.images,
            viewer_emails: self.viewer_emails,
            downloads: self.downloads,
        }
    }
}

impl From<&NewEvent> for EventDocument {
    fn from(event: &NewEvent) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            banner_image_url: event.banner_image_url.clone(),
            created_at: event.created_at,
            user_id: event.owner_user_id.clone(),
            images: Vec::new(),
            viewer_emails: Vec::new(),
            downloads: Vec::new(),
        }
    }
}

/// Decode a raw document into a schema struct.
///
/// # Errors
///
/// Returns [`GalleryError::Decode`] naming the collection and document.
pub fn decode<T: DeserializeOwned>(collection: &'static str, document: &RawDocument) -> Result<T> {
    let decode_error = |reason: String| GalleryError::Decode {
        collection,
        id: document.id.clone(),
        reason,
    };

    let json = document.to_json().map_err(decode_error)?;
    serde_json::from_value(json).map_err(|e| decode_error(e.to_string()))
}

/// Encode a schema struct or entry as a JSON object.
///
/// # Errors
///
/// Returns [`GalleryError::InternalError`] if the value is not an object.
pub fn encode<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        _ => Err(GalleryError::InternalError),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use crate::stores::firestore::value::to_firestore_fields;
    use serde_json::json;

    fn raw(id: &str, value: &Value) -> RawDocument {
        RawDocument {
            id: id.to_string(),
            fields: to_firestore_fields(&value.as_object().cloned().unwrap_or_default()),
        }
    }

    fn event_json() -> Value {
        json!({
            "title": "Wedding",
            "description": "Saturday",
            "bannerImageUrl": "",
            "created_at": "2025-01-01T10:00:00Z",
            "user_id": "owner-1",
            "images": [{
                "id": "img-1",
                "url": "https://media.test/1.jpg",
                "created_at": "2025-01-01T11:00:00Z",
                "event_id": "evt-1"
            }],
            "viewerEmails": [],
            "downloads": [{ "user_email": "v@example.com", "download_date": "2025-01-02T09:00:00Z" }]
        })
    }

    #[test]
    fn event_documents_decode_with_stored_field_names() {
        let document: Result<EventDocument> = decode("events", &raw("evt-1", &event_json()));
        let event = document
            .map(|d| d.into_event(EventId::new("evt-1")))
            .expect("event document decodes");
        assert_eq!(event.owner_user_id, UserId::new("owner-1"));
        assert_eq!(event.images.len(), 1);
        assert_eq!(event.downloads[0].user_email, "v@example.com");
    }

    #[test]
    fn event_without_downloads_fails_closed() {
        let mut json = event_json();
        if let Some(fields) = json.as_object_mut() {
            fields.remove("downloads");
        }

        let result: Result<EventDocument> = decode("events", &raw("evt-1", &json));
        assert!(matches!(
            result,
            Err(GalleryError::Decode { collection: "events", ref id, .. }) if id == "evt-1"
        ));
    }

    #[test]
    fn profile_picture_is_optional() {
        let json = json!({
            "email": "ada@example.com",
            "displayName": "Ada",
            "subscription_status": "premium",
            "subscription_id": "premium_ABC123"
        });
        let document: Result<UserDocument> = decode("users", &raw("u1", &json));
        let profile = document.map(|d| d.into_profile(UserId::new("u1")));

        assert_eq!(profile.map(|p| (p.is_premium(), p.profile_image_url)), Ok((true, None)));
    }

    #[test]
    fn unknown_subscription_status_fails_closed() {
        let json = json!({
            "email": "ada@example.com",
            "displayName": "Ada",
            "subscription_status": "gold",
            "subscription_id": ""
        });
        let result: Result<UserDocument> = decode("users", &raw("u1", &json));
        assert!(matches!(result, Err(GalleryError::Decode { collection: "users", .. })));
    }

    #[test]
    fn new_events_start_with_empty_lists() {
        let new_event = NewEvent {
            title: "Party".into(),
            description: String::new(),
            banner_image_url: String::new(),
            created_at: Utc::now(),
            owner_user_id: UserId::new("owner-1"),
        };
        let fields = encode(&EventDocument::from(&new_event)).unwrap_or_default();

        assert_eq!(fields.get("images"), Some(&json!([])));
        assert_eq!(fields.get("viewerEmails"), Some(&json!([])));
        assert_eq!(fields.get("downloads"), Some(&json!([])));
        assert_eq!(fields.get("user_id"), Some(&json!("owner-1")));
    }
}
