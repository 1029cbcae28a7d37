//! Durable timeline store for the Tomorrow Echo encounter system.
//!
//! One [`TimelineData`] record per participant, kept in memory and written
//! through to a single JSON document on every commit. The store is loaded
//! once at startup and shared by reference; there is no global instance.
//!
//! # Modules
//!
//! - [`timeline_store`] -- [`TimelineStore`]: load, lookup, commit, save
//! - [`error`] -- [`StoreError`]
//!
//! [`TimelineData`]: tomorrow_types::TimelineData

pub mod error;
pub mod timeline_store;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use timeline_store::{STORE_FORMAT_VERSION, TimelineStore};
