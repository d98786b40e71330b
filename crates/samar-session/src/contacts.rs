//! Contact reconciliation.
//!
//! A [`Contact`] is the local view of one conversation's counterpart. The
//! contact list is rebuilt from scratch from every conversation snapshot:
//! one contact per distinct peer (first conversation seen wins), peers
//! without a readable profile left out, most recent conversation first.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use samar_core::{
  conversation::{ConversationId, ConversationRecord},
  identity::UserId,
  profile::ProfileRecord,
  store::ChatStore,
};
use serde::Serialize;
use tracing::{debug, warn};

/// A conversation counterpart as shown in the contact list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
  pub peer_id:           UserId,
  pub display_name:      String,
  pub avatar_url:        String,
  /// The conversation's last message text.
  pub status_preview:    String,
  pub is_online:         bool,
  pub conversation_id:   ConversationId,
  /// `None` until the first message; such contacts sort last.
  pub last_message_time: Option<DateTime<Utc>>,
  pub is_selected:       bool,
}

impl Contact {
  pub fn new(
    profile: &ProfileRecord,
    conversation: &ConversationRecord,
    selected: Option<&UserId>,
  ) -> Self {
    Self {
      peer_id:           profile.user_id.clone(),
      display_name:      profile.display_name.clone(),
      avatar_url:        profile.avatar_url.clone(),
      status_preview:    conversation.last_message_text.clone(),
      is_online:         profile.is_online,
      conversation_id:   conversation.conversation_id,
      last_message_time: conversation.last_message_time,
      is_selected:       selected == Some(&profile.user_id),
    }
  }
}

/// Each distinct peer of `me` paired with the first conversation that
/// names them. Conversations without a peer are skipped.
pub fn distinct_peers<'a>(
  me: &UserId,
  conversations: &'a [ConversationRecord],
) -> Vec<(&'a UserId, &'a ConversationRecord)> {
  let mut seen = HashSet::new();
  conversations
    .iter()
    .filter_map(|c| c.peer_of(me).map(|peer| (peer, c)))
    .filter(|(peer, _)| seen.insert(*peer))
    .collect()
}

/// Most recent first; contacts without messages keep their relative order
/// at the end.
pub fn sort_contacts(contacts: &mut [Contact]) {
  contacts.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
}

/// Build the full contact list for `me` from a conversation snapshot.
///
/// Peer profiles are read one at a time. A read failure or a missing
/// profile drops that contact from this pass only.
pub async fn reconcile<S: ChatStore>(
  store: &S,
  me: &UserId,
  conversations: &[ConversationRecord],
  selected: Option<&UserId>,
) -> Vec<Contact> {
  let peers = distinct_peers(me, conversations);
  let mut contacts = Vec::with_capacity(peers.len());

  for (peer, conversation) in peers {
    match store.get_profile(peer).await {
      Ok(Some(profile)) => {
        contacts.push(Contact::new(&profile, conversation, selected));
      }
      Ok(None) => {
        warn!(%peer, conversation = %conversation.conversation_id, "peer has no profile; contact omitted");
      }
      Err(e) => {
        warn!(error = %e, %peer, "failed to read peer profile; contact omitted");
      }
    }
  }

  sort_contacts(&mut contacts);
  debug!(
    conversations = conversations.len(),
    contacts = contacts.len(),
    "reconciled contact list"
  );
  contacts
}

/// Contacts whose name or last message contains `query`, ignoring case.
/// An empty query matches everything.
pub fn filter_contacts<'a>(contacts: &'a [Contact], query: &str) -> Vec<&'a Contact> {
  let query = query.trim().to_lowercase();
  contacts
    .iter()
    .filter(|c| {
      query.is_empty()
        || c.display_name.to_lowercase().contains(&query)
        || c.status_preview.to_lowercase().contains(&query)
    })
    .collect()
}
