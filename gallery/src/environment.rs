//! Gallery environment.
//!
//! This module defines the environment type for dependency injection
//! in gallery reducers.

use crate::config::{FirebaseConfig, MediaHostConfig, UploadPolicy};
use crate::preview::PreviewRegistry;
use crate::providers::{
    CloudinaryUploader, EventRepository, FirebaseIdentityProvider, HttpImageFetcher,
    IdentityProvider, ImageFetcher, MediaUploader, ProfileCache, ProfileStore,
};
use crate::stores::{
    FileProfileCache, FirestoreClient, FirestoreEventRepository, FirestoreProfileStore,
};
use pixwap_core::environment::{Clock, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;

/// Set of provider implementations.
///
/// Groups the provider type parameters so reducers take one parameter
/// instead of six.
pub trait Backend: Send + Sync + 'static {
    /// Identity provider.
    type Identity: IdentityProvider + Clone + 'static;
    /// Profile store.
    type Profiles: ProfileStore + Clone + 'static;
    /// Event repository.
    type Events: EventRepository + Clone + 'static;
    /// Media host.
    type Media: MediaUploader + Clone + 'static;
    /// Image fetcher.
    type Fetcher: ImageFetcher + Clone + 'static;
    /// Local profile cache.
    type Cache: ProfileCache + Clone + 'static;
}

/// Gallery environment.
///
/// Contains all external dependencies needed by gallery reducers.
pub struct GalleryEnvironment<B: Backend> {
    /// Identity provider.
    pub identity: B::Identity,

    /// Profile store (`users` documents).
    pub profiles: B::Profiles,

    /// Event repository (`events` documents).
    pub events: B::Events,

    /// Media host.
    pub media: B::Media,

    /// Image fetcher for downloads.
    pub fetcher: B::Fetcher,

    /// Local profile cache.
    pub cache: B::Cache,

    /// Clock for timestamps.
    pub clock: Arc<dyn Clock>,

    /// Upload and creation rules.
    pub policy: UploadPolicy,

    /// Previews of pending files.
    pub previews: PreviewRegistry,
}

impl<B: Backend> GalleryEnvironment<B> {
    /// Create an environment with the system clock and default policy.
    #[must_use]
    pub fn new(
        identity: B::Identity,
        profiles: B::Profiles,
        events: B::Events,
        media: B::Media,
        fetcher: B::Fetcher,
        cache: B::Cache,
    ) -> Self {
        Self {
            identity,
            profiles,
            events,
            media,
            fetcher,
            cache,
            clock: Arc::new(SystemClock),
            policy: UploadPolicy::default(),
            previews: PreviewRegistry::new(),
        }
    }

    /// Use a different clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different policy.
    #[must_use]
    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<B: Backend> Clone for GalleryEnvironment<B> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            profiles: self.profiles.clone(),
            events: self.events.clone(),
            media: self.media.clone(),
            fetcher: self.fetcher.clone(),
            cache: self.cache.clone(),
            clock: Arc::clone(&self.clock),
            policy: self.policy,
            previews: self.previews.clone(),
        }
    }
}

/// Production backend: Firebase, Firestore, the media host and a file cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpBackend;

impl Backend for HttpBackend {
    type Identity = FirebaseIdentityProvider;
    type Profiles = FirestoreProfileStore;
    type Events = FirestoreEventRepository;
    type Media = CloudinaryUploader;
    type Fetcher = HttpImageFetcher;
    type Cache = FileProfileCache;
}

impl GalleryEnvironment<HttpBackend> {
    /// Wire the production adapters.
    ///
    /// The document store authenticates with the identity provider's ID
    /// token. Credentials persist at `credentials_path` when given.
    #[must_use]
    pub fn connect(
        firebase: &FirebaseConfig,
        media: MediaHostConfig,
        cache: FileProfileCache,
        credentials_path: Option<PathBuf>,
    ) -> Self {
        let mut identity = FirebaseIdentityProvider::new(firebase.clone());
        if let Some(path) = credentials_path {
            identity = identity.with_credentials_path(path);
        }
        let firestore = FirestoreClient::new(firebase).with_tokens(identity.token_cell());

        Self::new(
            identity,
            FirestoreProfileStore::new(firestore.clone()),
            FirestoreEventRepository::new(firestore),
            CloudinaryUploader::new(media),
            HttpImageFetcher::new(),
            cache,
        )
    }
}
