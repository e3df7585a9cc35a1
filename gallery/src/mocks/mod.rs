//! Mock provider implementations for testing.
//!
//! This module provides simple, in-memory implementations of all provider traits
//! for use in unit and integration tests.

pub mod cache;
pub mod events;
pub mod identity;
pub mod media;
pub mod profile;

pub use cache::MemoryProfileCache;
pub use events::MockEventRepository;
pub use identity::MockIdentityProvider;
pub use media::{MockImageFetcher, MockMediaUploader};
pub use profile::MockProfileStore;

use crate::environment::{Backend, GalleryEnvironment};

/// Backend made of the in-memory mocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockBackend;

impl Backend for MockBackend {
    type Identity = MockIdentityProvider;
    type Profiles = MockProfileStore;
    type Events = MockEventRepository;
    type Media = MockMediaUploader;
    type Fetcher = MockImageFetcher;
    type Cache = MemoryProfileCache;
}

/// Environment over fresh mocks.
///
/// The mocks share state with their clones, so tests can keep a copy of the
/// environment to seed data and inspect calls.
#[must_use]
pub fn mock_environment() -> GalleryEnvironment<MockBackend> {
    GalleryEnvironment::new(
        MockIdentityProvider::new(),
        MockProfileStore::new(),
        MockEventRepository::new(),
        MockMediaUploader::new(),
        MockImageFetcher::new(),
        MemoryProfileCache::new(),
    )
}
