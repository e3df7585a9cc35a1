//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by page.

pub mod account;
pub mod dashboard;
pub mod event;
pub mod health;
pub mod multipart;

// Re-export common handler utilities
pub use health::health;
