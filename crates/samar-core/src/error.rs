//! Error types for `samar-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("a conversation needs two participants, got {0:?} twice")]
  SelfConversation(String),

  #[error("invalid conversation id: {0}")]
  ConversationId(#[from] uuid::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
