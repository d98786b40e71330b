//! Core types and trait definitions for the Samar messaging client.
//!
//! This crate is deliberately free of database and UI dependencies. The
//! session reconciler and every storage backend depend on it; it depends on
//! nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod auth;
pub mod conversation;
pub mod error;
pub mod feed;
pub mod identity;
pub mod profile;
pub mod store;

pub use error::{Error, Result};
