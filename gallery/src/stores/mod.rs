//! Concrete storage adapters.
//!
//! - [`firestore`]: profile store and event repository over Firestore REST
//! - [`file_cache`]: the local profile cache as a JSON file

pub mod file_cache;
pub mod firestore;

pub use file_cache::FileProfileCache;
pub use firestore::{FirestoreClient, FirestoreEventRepository, FirestoreProfileStore};
