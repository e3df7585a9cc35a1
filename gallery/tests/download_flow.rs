//! Integration tests for download capture.

#![allow(clippy::expect_used, clippy::panic)]

use chrono::Utc;
use pixwap_core::environment::Clock;
use pixwap_gallery::{
    actions::GalleryAction,
    error::GalleryError,
    mocks::{MockBackend, mock_environment},
    reducers::GalleryReducer,
    state::{
        DownloadId, DownloadStage, DownloadState, EventId, GalleryState, Image, ImageId, NewEvent, UserId,
    },
    GalleryEnvironment,
};
use pixwap_runtime::{Store, wait_for};
use pixwap_testing::test_clock;
use std::sync::Arc;
use std::time::Duration;

type GalleryStore = Store<GalleryState, GalleryAction, GalleryEnvironment<MockBackend>, GalleryReducer<MockBackend>>;

const WAIT: Duration = Duration::from_secs(5);
const IMAGE_URL: &str = "https://media.test/party/1.png";
const SECOND_URL: &str = "https://media.test/party/2.png";

fn event_id() -> EventId {
    EventId::new("evt-party")
}

async fn visitor_view(env: &GalleryEnvironment<MockBackend>) -> GalleryStore {
    let mut event = NewEvent {
        title: "Garden party".into(),
        description: String::new(),
        banner_image_url: String::new(),
        created_at: Utc::now(),
        owner_user_id: UserId::new("owner"),
    }
    .into_event(event_id());
    for (id, url) in [("img-1", IMAGE_URL), ("img-2", SECOND_URL)] {
        event.images.push(Image {
            id: ImageId::new(id),
            url: url.into(),
            created_at: Utc::now(),
            event_id: event_id(),
        });
    }
    env.events.insert(event);

    let store = Store::new(GalleryState::default(), GalleryReducer::new(), env.clone());
    store
        .send(GalleryAction::LoadEvent { event_id: event_id() })
        .await
        .expect("store accepts action")
        .wait_with_timeout(WAIT)
        .await
        .expect("event loads");
    store
}

async fn request_download(store: &GalleryStore, email: &str) -> Vec<GalleryAction> {
    let mut actions = store.subscribe_actions();
    store
        .send(GalleryAction::RequestDownload {
            event_id: event_id(),
            request: DownloadId::new(),
            image_url: IMAGE_URL.into(),
            email: email.into(),
        })
        .await
        .expect("store accepts action")
        .wait_with_timeout(WAIT)
        .await
        .expect("download finishes");

    let mut seen = Vec::new();
    while let Ok(action) = actions.try_recv() {
        seen.push(action);
    }
    seen
}

async fn download_state(store: &GalleryStore) -> DownloadState {
    store
        .state(|state| state.view(&event_id()).map(|view| view.download.clone()))
        .await
        .expect("view is open")
}

#[tokio::test]
async fn test_download_records_email_then_delivers_file() {
    let clock = test_clock();
    let env = mock_environment().with_clock(Arc::new(clock.clone()));
    env.fetcher.insert(IMAGE_URL, vec![1_u8, 2, 3], Some("image/png"));
    let store = visitor_view(&env).await;

    let actions = request_download(&store, "visitor@example.com").await;

    let ready = actions
        .iter()
        .find_map(|action| match action {
            GalleryAction::DownloadReady { file, .. } => Some(file.clone()),
            _ => None,
        })
        .expect("download delivered");
    assert_eq!(
        ready.file_name,
        format!("image-{}.png", clock.now().timestamp_millis())
    );
    assert_eq!(ready.content_type, "image/png");
    assert_eq!(ready.bytes.as_ref(), &[1_u8, 2, 3]);

    let stored = env.events.event(&event_id()).expect("event exists");
    assert_eq!(stored.downloads.len(), 1);
    assert_eq!(stored.downloads[0].user_email, "visitor@example.com");
    assert_eq!(stored.downloads[0].download_date, clock.now());

    let download = download_state(&store).await;
    assert!(!download.is_in_flight());
    assert_eq!(download.recorded, 1);
    assert_eq!(download.last_file_name, Some(ready.file_name));
}

#[tokio::test]
async fn test_record_precedes_fetch() {
    let env = mock_environment();
    env.fetcher.insert(IMAGE_URL, vec![0_u8; 4], None);
    let store = visitor_view(&env).await;

    let actions = request_download(&store, "visitor@example.com").await;
    let recorded = actions
        .iter()
        .position(|a| matches!(a, GalleryAction::DownloadRecorded { .. }));
    let ready = actions
        .iter()
        .position(|a| matches!(a, GalleryAction::DownloadReady { .. }));
    assert!(matches!((recorded, ready), (Some(r), Some(d)) if r < d));

    // No content type falls back to jpg.
    let name = download_state(&store).await.last_file_name.unwrap_or_default();
    assert!(name.starts_with("image-") && name.ends_with(".jpg"));
}

#[tokio::test]
async fn test_invalid_email_triggers_no_network() {
    let env = mock_environment();
    env.fetcher.insert(IMAGE_URL, vec![0_u8; 4], None);
    let store = visitor_view(&env).await;

    let actions = request_download(&store, "not an email").await;

    assert!(actions.iter().all(|a| !matches!(a, GalleryAction::DownloadRecorded { .. })));
    assert_eq!(env.events.download_appends(), 0);
    assert_eq!(env.fetcher.fetches(), 0);
    assert_eq!(download_state(&store).await.error, Some(GalleryError::InvalidEmail));
}

#[tokio::test]
async fn test_audit_failure_cancels_the_download() {
    let env = mock_environment();
    env.fetcher.insert(IMAGE_URL, vec![0_u8; 4], None);
    env.events.fail_download_appends(true);
    let store = visitor_view(&env).await;

    request_download(&store, "visitor@example.com").await;

    let download = download_state(&store).await;
    assert_eq!(download.failed_stage, Some(DownloadStage::AuditLog));
    assert!(!download.is_in_flight());
    assert_eq!(env.fetcher.fetches(), 0);
}

#[tokio::test]
async fn test_fetch_failure_keeps_the_audit_entry() {
    let env = mock_environment();
    // Nothing registered at IMAGE_URL: the fetch fails.
    let store = visitor_view(&env).await;

    request_download(&store, "visitor@example.com").await;

    let download = download_state(&store).await;
    assert_eq!(download.failed_stage, Some(DownloadStage::Fetch));
    assert!(matches!(download.error, Some(GalleryError::ImageFetch(_))));
    assert_eq!(download.recorded, 1);
    assert_eq!(env.events.event(&event_id()).map(|e| e.downloads.len()), Some(1));
}

#[tokio::test]
async fn test_urls_outside_the_event_are_refused() {
    let env = mock_environment();
    let store = visitor_view(&env).await;

    store
        .send(GalleryAction::RequestDownload {
            event_id: event_id(),
            request: DownloadId::new(),
            image_url: "http://169.254.169.254/latest/meta-data".into(),
            email: "visitor@example.com".into(),
        })
        .await
        .expect("store accepts action");

    assert_eq!(download_state(&store).await.error, Some(GalleryError::UnknownImage));
    assert_eq!(env.events.download_appends(), 0);
    assert_eq!(env.fetcher.fetches(), 0);
}

#[tokio::test]
async fn test_each_requester_receives_its_own_file() {
    let env = mock_environment();
    env.fetcher.insert(IMAGE_URL, vec![1_u8; 4], Some("image/png"));
    env.fetcher.insert(SECOND_URL, vec![2_u8; 4], Some("image/png"));
    let store = visitor_view(&env).await;

    // The second visitor is already listening when the first download lands.
    let second_listener = store.subscribe_actions();

    let first = DownloadId::new();
    let first_outcome = store
        .send_and_wait_for(
            GalleryAction::RequestDownload {
                event_id: event_id(),
                request: first,
                image_url: IMAGE_URL.into(),
                email: "first@example.com".into(),
            },
            move |action| action.concluded_download() == Some(first),
            WAIT,
        )
        .await
        .expect("first download finishes");
    assert!(matches!(first_outcome, GalleryAction::DownloadReady { ref file, .. } if file.bytes.as_ref() == &[1_u8; 4]));

    let second = DownloadId::new();
    store
        .send(GalleryAction::RequestDownload {
            event_id: event_id(),
            request: second,
            image_url: SECOND_URL.into(),
            email: "second@example.com".into(),
        })
        .await
        .expect("store accepts action");
    let second_outcome = wait_for(
        second_listener,
        move |action| action.concluded_download() == Some(second),
        WAIT,
    )
    .await
    .expect("second download finishes");

    match second_outcome {
        GalleryAction::DownloadReady { request, file, .. } => {
            assert_eq!(request, second);
            assert_eq!(file.bytes.as_ref(), &[2_u8; 4]);
        }
        other => panic!("expected the second file, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refusal_reaches_its_requester() {
    let env = mock_environment();
    let store = visitor_view(&env).await;

    let request = DownloadId::new();
    let outcome = store
        .send_and_wait_for(
            GalleryAction::RequestDownload {
                event_id: event_id(),
                request,
                image_url: IMAGE_URL.into(),
                email: "nobody".into(),
            },
            move |action| action.concluded_download() == Some(request),
            WAIT,
        )
        .await
        .expect("refusal is published");

    assert!(matches!(
        outcome,
        GalleryAction::DownloadFailed {
            stage: DownloadStage::Request,
            error: GalleryError::InvalidEmail,
            ..
        }
    ));
}

#[tokio::test]
async fn test_reads_of_missing_events_leave_no_views_behind() {
    let env = mock_environment();
    let store: GalleryStore = Store::new(GalleryState::default(), GalleryReducer::new(), env);

    for n in 0..500 {
        let outcome = store
            .send_and_wait_for(
                GalleryAction::LoadEvent {
                    event_id: EventId::new(format!("nope-{n}")),
                },
                |action| matches!(action, GalleryAction::EventLoadFailed { .. }),
                WAIT,
            )
            .await
            .expect("read finishes");
        assert!(matches!(
            outcome,
            GalleryAction::EventLoadFailed {
                error: GalleryError::NotFound { .. },
                ..
            }
        ));
    }

    assert_eq!(store.state(|state| state.views.len()).await, 0);
}
