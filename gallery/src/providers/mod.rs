//! External service providers.
//!
//! Traits for every dependency the gallery reducers call, plus the HTTP
//! implementations used in production.
//!
//! # Architecture
//!
//! Reducers never talk to a service directly. They describe effects that
//! call these traits through [`crate::environment::GalleryEnvironment`]:
//!
//! ```text
//! Reducer ──effect──▶ Provider trait ──▶ Firebase Auth / Firestore / media host
//!    ▲                                              │
//!    └──────────────── result action ◀──────────────┘
//! ```
//!
//! This enables:
//! - **Testing**: in-memory mocks from [`crate::mocks`]
//! - **Production**: the REST adapters in this module and [`crate::stores`]

pub mod cache;
pub mod cloudinary;
pub mod events;
pub mod firebase;
pub mod http_fetch;
pub mod identity;
pub mod media;
pub mod profile;

pub use cache::ProfileCache;
pub use cloudinary::CloudinaryUploader;
pub use events::EventRepository;
pub use firebase::{FirebaseIdentityProvider, TokenCell};
pub use http_fetch::HttpImageFetcher;
pub use identity::{IdentityChannel, IdentityProvider, IdentitySubscription};
pub use media::{FetchedImage, ImageFetcher, MediaUploader, ProgressSink, UploadedMedia};
pub use profile::ProfileStore;
