//! The session reconciler for the Samar messaging client.
//!
//! A [`Session`] belongs to one signed-in identity. It keeps the derived
//! client state (contact list, directory, selected conversation and its
//! messages, own profile) consistent with the snapshots pushed by a
//! [`ChatStore`](samar_core::store::ChatStore), and routes user intents back
//! into the store. A [`Client`] follows the identity provider and opens or
//! tears down sessions as the signed-in identity changes.
//!
//! All state is owned by the session and mutated only through its methods.
//! Store pushes are applied by awaiting [`Session::pump`] (or
//! [`Client::pump`]) on a single task; nothing is spawned in the background.

pub mod avatar;
pub mod client;
pub mod config;
pub mod contacts;
pub mod conversation;
pub mod directory;
pub mod error;
pub mod profile;
pub mod session;

pub use client::{Client, ClientEvent};
pub use config::SessionConfig;
pub use error::{Error, Result, ValidationError};
pub use session::{ChatMessage, Direction, Session, SessionEvent};
