//! End-to-end tests of the HTTP surface over in-memory backends.

#![allow(clippy::expect_used)]

use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use chrono::Utc;
use pixwap_gallery::mocks::{MockBackend, MockIdentityProvider, mock_environment};
use pixwap_gallery::state::{Image, ImageId, NewEvent, UserId};
use pixwap_gallery::{EventId, GalleryEnvironment, SessionContext, UserProfile};
use pixwap_web::{AppState, WebSettings, build_router};
use serde_json::{Value, json};
use std::time::Duration;

const OWNER_EMAIL: &str = "owner@example.com";
const VISITOR_EMAIL: &str = "visitor@example.com";
const PASSWORD: &str = "secret-pass";
const EVENT_ID: &str = "evt-party";
const IMAGE_URL: &str = "https://media.test/party/1.jpg";

fn settings() -> WebSettings {
    WebSettings {
        guard_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        upload_wait_timeout: Duration::from_secs(10),
        public_origin: "https://pixwap.test".to_string(),
        ..WebSettings::default()
    }
}

async fn server(env: &GalleryEnvironment<MockBackend>) -> TestServer {
    let session = SessionContext::start(env.clone()).await.expect("session starts");
    let state = AppState::new(env, session, settings());
    TestServer::new(build_router(state)).expect("server builds")
}

/// Owner and visitor accounts plus one event with one image.
fn seed(env: &GalleryEnvironment<MockBackend>) {
    for (uid, email, name) in [("owner", OWNER_EMAIL, "Olive"), ("visitor", VISITOR_EMAIL, "Victor")] {
        env.identity.add_account(uid, email, PASSWORD);
        env.profiles.insert(UserProfile::new_free(UserId::new(uid), email, name));
    }

    let event_id = EventId::new(EVENT_ID);
    let mut event = NewEvent {
        title: "Garden party".into(),
        description: "Summer".into(),
        banner_image_url: String::new(),
        created_at: Utc::now(),
        owner_user_id: UserId::new("owner"),
    }
    .into_event(event_id.clone());
    event.images.push(Image {
        id: ImageId::new("img-1"),
        url: IMAGE_URL.into(),
        created_at: Utc::now(),
        event_id,
    });
    env.events.insert(event);
    env.fetcher.insert(IMAGE_URL, b"jpeg-bytes".to_vec(), Some("image/jpeg"));
}

async fn login(server: &TestServer, email: &str) {
    server
        .post("/login")
        .json(&json!({ "email": email, "password": PASSWORD }))
        .await
        .assert_status(StatusCode::SEE_OTHER);
}

fn jpeg(name: &str) -> Part {
    Part::bytes(b"fake jpeg body".to_vec())
        .file_name(name)
        .mime_type("image/jpeg")
}

#[tokio::test]
async fn test_health_reports_ready_session() {
    let env = mock_environment();
    let server = server(&env).await;

    let body: Value = server.get("/health").await.json();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["session"], "ready");
}

#[tokio::test]
async fn test_metrics_are_disabled_without_a_recorder() {
    let env = mock_environment();
    let server = server(&env).await;

    server.get("/metrics").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_guarded_page_redirects_anonymous_visitor_to_login() {
    let env = mock_environment();
    let server = server(&env).await;

    let response = server.get("/dashboard").await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/login");
}

#[tokio::test]
async fn test_register_lands_on_an_empty_dashboard() {
    let env = mock_environment();
    let server = server(&env).await;

    let response = server
        .post("/register")
        .json(&json!({
            "email": "new@example.com",
            "password": PASSWORD,
            "display_name": "Newcomer",
        }))
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/dashboard");

    let dashboard: Value = server.get("/dashboard").await.json();
    assert_eq!(dashboard["display_name"], "Newcomer");
    assert_eq!(dashboard["stats"]["event_count"], 0);
    assert_eq!(dashboard["usage"], "0/7");
    assert_eq!(dashboard["can_create_event"], true);

    // Signed-in users skip the login form.
    server.get("/login").await.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let env = mock_environment();
    let server = server(&env).await;

    server
        .post("/register")
        .json(&json!({
            "email": "new@example.com",
            "password": "123",
            "display_name": "Newcomer",
        }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;

    server
        .post("/login")
        .json(&json!({ "email": OWNER_EMAIL, "password": "not-the-password" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server.get("/dashboard").await.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_create_event_redirects_to_the_event_page() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;
    login(&server, OWNER_EMAIL).await;

    let response = server
        .post("/create-event")
        .multipart(
            MultipartForm::new()
                .add_text("title", "Wedding")
                .add_text("description", "June"),
        )
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    let location = response.header("location");
    let location = location.to_str().expect("ascii location");
    assert!(location.starts_with("/event/"), "unexpected location {location}");

    let dashboard: Value = server.get("/dashboard").await.json();
    assert_eq!(dashboard["stats"]["event_count"], 2);
    assert_eq!(dashboard["events"][0]["title"], "Wedding");
    let link = dashboard["events"][0]["share_link"].as_str().expect("share link");
    assert!(link.starts_with("https://pixwap.test/event/"));
}

#[tokio::test]
async fn test_create_event_rejects_short_title() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;
    login(&server, OWNER_EMAIL).await;

    server
        .post("/create-event")
        .multipart(MultipartForm::new().add_text("title", " ab "))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let env = mock_environment();
    let server = server(&env).await;

    server.get("/event/missing").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_visitors_do_not_see_the_owner_panel() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;

    let page: Value = server.get(&format!("/event/{EVENT_ID}")).await.json();

    assert_eq!(page["title"], "Garden party");
    assert_eq!(page["is_owner"], false);
    assert!(page.get("owner").is_none());
    assert_eq!(page["images"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_owner_selects_previews_and_uploads() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;
    login(&server, OWNER_EMAIL).await;

    let selection: Value = server
        .post(&format!("/event/{EVENT_ID}/selection"))
        .multipart(
            MultipartForm::new()
                .add_part("files", jpeg("a.jpg"))
                .add_part("files", jpeg("b.jpg"))
                .add_part(
                    "files",
                    Part::bytes(b"%PDF".to_vec()).file_name("doc.pdf").mime_type("application/pdf"),
                ),
        )
        .await
        .json();
    assert_eq!(selection["pending"].as_array().map(Vec::len), Some(2));
    assert_eq!(selection["rejected"][0]["file_name"], "doc.pdf");

    let preview_url = selection["pending"][0]["preview_url"].as_str().expect("preview url");
    let preview = server.get(preview_url).await;
    preview.assert_status_ok();
    assert_eq!(preview.header("content-type"), "image/jpeg");
    assert_eq!(preview.as_bytes().as_ref(), b"fake jpeg body");

    let status: Value = server
        .post(&format!("/event/{EVENT_ID}/upload"))
        .add_query_param("wait", "true")
        .await
        .json();
    assert_eq!(status["uploading"], false);
    assert_eq!(status["last_outcome"]["committed"], 2);

    let progress: Value = server.get(&format!("/event/{EVENT_ID}/progress")).await.json();
    assert_eq!(progress["last_outcome"]["committed"], 2);

    let page: Value = server.get(&format!("/event/{EVENT_ID}")).await.json();
    assert_eq!(page["is_owner"], true);
    assert_eq!(page["images"].as_array().map(Vec::len), Some(3));
    assert_eq!(page["owner"]["pending"].as_array().map(Vec::len), Some(0));
    assert_eq!(page["owner"]["quota"]["used"], 3);
    assert_eq!(page["owner"]["quota"]["limit"], 10);

    // Committed files release their previews.
    server.get(preview_url).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_without_pending_files_is_rejected() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;
    login(&server, OWNER_EMAIL).await;

    server
        .post(&format!("/event/{EVENT_ID}/upload"))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_pending_file_can_be_removed() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;
    login(&server, OWNER_EMAIL).await;

    let selection: Value = server
        .post(&format!("/event/{EVENT_ID}/selection"))
        .multipart(
            MultipartForm::new()
                .add_part("files", jpeg("a.jpg"))
                .add_part("files", jpeg("b.jpg")),
        )
        .await
        .json();
    let second = selection["pending"][1]["id"].as_str().expect("file id").to_string();

    let pending: Value = server
        .delete(&format!("/event/{EVENT_ID}/selection/{second}"))
        .await
        .json();
    assert_eq!(pending.as_array().map(Vec::len), Some(1));
    assert_eq!(pending[0]["name"], "a.jpg");

    server
        .delete(&format!("/event/{EVENT_ID}/selection/{second}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete(&format!("/event/{EVENT_ID}/selection/0"))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_progress_is_owner_only() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;

    // Anyone can open the page; the progress panel is the owner's.
    server.get(&format!("/event/{EVENT_ID}")).await.assert_status_ok();
    server
        .get(&format!("/event/{EVENT_ID}/progress"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    login(&server, VISITOR_EMAIL).await;
    server
        .get(&format!("/event/{EVENT_ID}/progress"))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_late_signed_out_report_redirects_instead_of_timing_out() {
    let mut env = mock_environment();
    env.identity = MockIdentityProvider::new().with_restore_delay(Duration::from_millis(200));
    let server = server(&env).await;

    let started = tokio::time::Instant::now();
    let response = server.get("/dashboard").await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/login");
    assert!(started.elapsed() < settings().guard_timeout);
}

#[tokio::test]
async fn test_session_still_restoring_answers_unavailable() {
    let mut env = mock_environment();
    env.identity = MockIdentityProvider::new().with_restore_delay(Duration::from_secs(30));
    let session = SessionContext::start(env.clone()).await.expect("session starts");
    let settings = WebSettings {
        guard_timeout: Duration::from_millis(100),
        ..settings()
    };
    let server = TestServer::new(build_router(AppState::new(&env, session, settings))).expect("server builds");

    let response = server.get("/dashboard").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_selection_requires_a_session() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;

    server
        .post(&format!("/event/{EVENT_ID}/selection"))
        .multipart(MultipartForm::new().add_part("files", jpeg("a.jpg")))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_owner_cannot_delete_images() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;
    login(&server, VISITOR_EMAIL).await;

    server
        .delete(&format!("/event/{EVENT_ID}/images/img-1"))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let stored = env.events.event(&EventId::new(EVENT_ID)).expect("event stored");
    assert_eq!(stored.images.len(), 1);
}

#[tokio::test]
async fn test_owner_deletes_an_image() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;
    login(&server, OWNER_EMAIL).await;

    server
        .delete(&format!("/event/{EVENT_ID}/images/img-1"))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let stored = env.events.event(&EventId::new(EVENT_ID)).expect("event stored");
    assert!(stored.images.is_empty());
}

#[tokio::test]
async fn test_download_records_email_and_returns_attachment() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;

    let response = server
        .post(&format!("/event/{EVENT_ID}/download"))
        .json(&json!({ "image_url": IMAGE_URL, "email": "guest@example.com" }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/jpeg");
    let disposition = response.header("content-disposition");
    let disposition = disposition.to_str().expect("ascii header");
    assert!(disposition.starts_with("attachment; filename=\"image-"));
    assert!(disposition.ends_with(".jpg\""));
    assert_eq!(response.as_bytes().as_ref(), b"jpeg-bytes");

    let stored = env.events.event(&EventId::new(EVENT_ID)).expect("event stored");
    assert_eq!(stored.downloads.len(), 1);
    assert_eq!(stored.downloads[0].user_email, "guest@example.com");
}

#[tokio::test]
async fn test_download_with_invalid_email_records_nothing() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;

    server
        .post(&format!("/event/{EVENT_ID}/download"))
        .json(&json!({ "image_url": IMAGE_URL, "email": "not-an-email" }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(env.events.download_appends(), 0);
    assert_eq!(env.fetcher.fetches(), 0);
}

#[tokio::test]
async fn test_download_of_foreign_image_is_not_found() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;

    server
        .post(&format!("/event/{EVENT_ID}/download"))
        .json(&json!({ "image_url": "https://elsewhere.test/x.jpg", "email": "guest@example.com" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_preview_handle_is_bad_request() {
    let env = mock_environment();
    let server = server(&env).await;

    server.get("/preview/not-a-uuid").await.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upgrade_moves_the_user_to_premium() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;
    login(&server, OWNER_EMAIL).await;

    let profile: Value = server.post("/upgrade").await.json();
    assert_eq!(profile["subscription_status"], "premium");
    assert!(
        profile["subscription_id"]
            .as_str()
            .is_some_and(|id| id.starts_with("premium_"))
    );

    let page: Value = server.get("/upgrade").await.json();
    assert_eq!(page["can_upgrade"], false);
}

#[tokio::test]
async fn test_logout_returns_to_login() {
    let env = mock_environment();
    seed(&env);
    let server = server(&env).await;
    login(&server, OWNER_EMAIL).await;

    let response = server.post("/logout").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/login");

    server.get("/dashboard").await.assert_status(StatusCode::SEE_OTHER);
}
