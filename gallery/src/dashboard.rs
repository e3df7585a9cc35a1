//! Dashboard aggregation and the event creation gate.

use crate::config::UploadPolicy;
use crate::state::{Event, EventId, SubscriptionStatus};
use serde::Serialize;
use std::fmt;

/// Maximum number of events a plan may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLimit {
    /// Capped at the given count.
    Limited(usize),
    /// No cap.
    Unlimited,
}

impl fmt::Display for EventLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(limit) => write!(f, "{limit}"),
            Self::Unlimited => f.write_str("∞"),
        }
    }
}

/// Figures shown on the owner dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// Events owned.
    pub event_count: usize,
    /// Plan limit.
    pub max_events: EventLimit,
    /// Download records across all events.
    pub total_downloads: usize,
    /// Images across all events.
    pub total_images: usize,
    /// Events with a share link (every event).
    pub active_links: usize,
}

impl DashboardStats {
    /// `"3/7"` or `"3/∞"`.
    #[must_use]
    pub fn usage_label(&self) -> String {
        format!("{}/{}", self.event_count, self.max_events)
    }
}

/// Aggregate an owner's events.
#[must_use]
pub fn aggregate(events: &[Event], tier: SubscriptionStatus, policy: &UploadPolicy) -> DashboardStats {
    DashboardStats {
        event_count: events.len(),
        max_events: policy
            .event_limit(tier)
            .map_or(EventLimit::Unlimited, EventLimit::Limited),
        total_downloads: events.iter().map(|event| event.downloads.len()).sum(),
        total_images: events.iter().map(|event| event.images.len()).sum(),
        active_links: events.len(),
    }
}

/// Whether an owner with `event_count` events may create another.
#[must_use]
pub fn can_create_event(event_count: usize, tier: SubscriptionStatus, policy: &UploadPolicy) -> bool {
    policy
        .event_limit(tier)
        .is_none_or(|limit| event_count < limit)
}

/// Public link of an event.
#[must_use]
pub fn share_link(origin: &str, event_id: &EventId) -> String {
    format!("{}/event/{}", origin.trim_end_matches('/'), event_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DownloadRecord, UserId};
    use chrono::Utc;

    fn event(id: &str, downloads: usize) -> Event {
        Event {
            id: EventId::new(id),
            title: format!("Event {id}"),
            description: String::new(),
            banner_image_url: String::new(),
            created_at: Utc::now(),
            owner_user_id: UserId::new("owner"),
            images: Vec::new(),
            viewer_emails: Vec::new(),
            downloads: (0..downloads)
                .map(|n| DownloadRecord {
                    user_email: format!("v{n}@example.com"),
                    download_date: Utc::now(),
                })
                .collect(),
        }
    }

    #[test]
    fn total_downloads_sums_every_event() {
        let events = vec![event("a", 2), event("b", 0), event("c", 5)];
        let stats = aggregate(&events, SubscriptionStatus::Free, &UploadPolicy::default());

        assert_eq!(stats.event_count, 3);
        assert_eq!(stats.total_downloads, 7);
        assert_eq!(stats.usage_label(), "3/7");
    }

    #[test]
    fn premium_limit_renders_as_infinity() {
        let stats = aggregate(&[event("a", 0)], SubscriptionStatus::Premium, &UploadPolicy::default());
        assert_eq!(stats.max_events, EventLimit::Unlimited);
        assert_eq!(stats.usage_label(), "1/∞");
    }

    #[test]
    fn free_plan_is_gated_at_seven_events() {
        let policy = UploadPolicy::default();
        assert!(can_create_event(6, SubscriptionStatus::Free, &policy));
        assert!(!can_create_event(7, SubscriptionStatus::Free, &policy));
        assert!(can_create_event(7, SubscriptionStatus::Premium, &policy));
        assert!(can_create_event(500, SubscriptionStatus::Premium, &policy));
    }

    #[test]
    fn share_link_joins_origin_and_id() {
        assert_eq!(
            share_link("http://localhost:3000/", &EventId::new("abc")),
            "http://localhost:3000/event/abc"
        );
    }
}
