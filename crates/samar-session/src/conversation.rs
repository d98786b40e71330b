//! Finding or creating the conversation between two identities.

use samar_core::{
  conversation::{ConversationId, ParticipantPair},
  identity::UserId,
  store::ChatStore,
};
use tracing::info;

use crate::{Error, Result};

/// Id of the conversation between `a` and `b`, creating it if none exists.
///
/// Lookup is a full scan matched by participant set, so argument order does
/// not matter. Failed lookups are returned as errors rather than treated as
/// "absent", which would risk a duplicate conversation.
pub async fn start_conversation<S: ChatStore>(
  store: &S,
  a: &UserId,
  b: &UserId,
) -> Result<ConversationId> {
  let pair = ParticipantPair::new(a.clone(), b.clone())?;

  let existing = store.list_conversations().await.map_err(Error::store)?;
  if let Some(found) = existing.iter().find(|c| pair.matches(&c.participants)) {
    return Ok(found.conversation_id);
  }

  let created = store.create_conversation(pair).await.map_err(Error::store)?;
  info!(conversation = %created.conversation_id, %a, %b, "created conversation");
  Ok(created.conversation_id)
}
