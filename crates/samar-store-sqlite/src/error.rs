//! Error type for `samar-store-sqlite`.

use samar_core::{conversation::ConversationId, identity::UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] samar_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("password hashing error: {0}")]
  PasswordHash(String),

  /// The profile row could not be read back after an upsert.
  #[error("profile {0} missing after write")]
  ProfileMissing(UserId),

  /// A message or preview update targeted a conversation that does not exist.
  #[error("conversation not found: {0}")]
  ConversationNotFound(ConversationId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
