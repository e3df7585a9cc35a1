//! Profile cache persisted as a JSON file.

#![allow(clippy::expect_used)]

use pixwap_gallery::{
    error::GalleryError,
    providers::ProfileCache,
    state::{UserId, UserProfile},
    stores::file_cache::{CACHE_FILE_NAME, FileProfileCache},
};

fn ada() -> UserProfile {
    UserProfile::new_free(UserId::new("u-ada"), "ada@example.com", "Ada")
}

#[tokio::test]
async fn test_store_load_and_clear() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cache = FileProfileCache::in_dir(dir.path().join("pixwap"));
    assert!(cache.path().ends_with(CACHE_FILE_NAME));

    cache.store(&ada()).await.expect("store succeeds");
    assert_eq!(cache.load().await, Ok(Some(ada())));

    cache.clear().await.expect("clear succeeds");
    assert_eq!(cache.load().await, Ok(None));
    assert!(!cache.path().exists());
}

#[tokio::test]
async fn test_missing_file_is_an_empty_cache() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cache = FileProfileCache::in_dir(dir.path());

    assert_eq!(cache.load().await, Ok(None));
    // Clearing twice is harmless.
    assert_eq!(cache.clear().await, Ok(()));
}

#[tokio::test]
async fn test_corrupt_file_is_a_cache_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cache = FileProfileCache::in_dir(dir.path());
    std::fs::write(cache.path(), b"{ not json").expect("file written");

    assert!(matches!(cache.load().await, Err(GalleryError::Cache(_))));
}
