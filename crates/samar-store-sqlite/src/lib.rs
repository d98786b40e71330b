//! SQLite backend for the Samar messaging client.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One [`SqliteStore`] implements every
//! collaborator trait from `samar-core`: profiles and conversations
//! ([`ChatStore`](samar_core::store::ChatStore)), avatars
//! ([`BlobStore`](samar_core::store::BlobStore)) and local accounts
//! ([`IdentityProvider`](samar_core::store::IdentityProvider)).

mod accounts;
mod blobs;
mod encode;
mod feeds;
mod schema;
mod store;

pub mod error;

pub use blobs::Blob;
pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
