//! Conversations and their messages.
//!
//! A conversation is a two-party thread. Messages are append-only and are
//! never mutated after the store accepts them.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, identity::UserId};

// ─── Ids ─────────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
  pub fn new_v4() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for ConversationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.hyphenated())
  }
}

impl FromStr for ConversationId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Ok(Self(Uuid::parse_str(s)?)) }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
  pub fn new_v4() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for MessageId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.hyphenated())
  }
}

// ─── Participants ────────────────────────────────────────────────────────────

/// Canonical form of an unordered pair of distinct participants: the two ids
/// are kept sorted, so `(a, b)` and `(b, a)` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantPair {
  low:  UserId,
  high: UserId,
}

impl ParticipantPair {
  pub fn new(a: UserId, b: UserId) -> Result<Self> {
    match a.cmp(&b) {
      std::cmp::Ordering::Less => Ok(Self { low: a, high: b }),
      std::cmp::Ordering::Greater => Ok(Self { low: b, high: a }),
      std::cmp::Ordering::Equal => Err(Error::SelfConversation(a.to_string())),
    }
  }

  pub fn ids(&self) -> [&UserId; 2] { [&self.low, &self.high] }

  /// Set equality against a stored participant list, ignoring order.
  pub fn matches(&self, participants: &[UserId]) -> bool {
    participants.len() == 2
      && participants.contains(&self.low)
      && participants.contains(&self.high)
  }

  pub fn into_vec(self) -> Vec<UserId> { vec![self.low, self.high] }
}

// ─── Conversation ────────────────────────────────────────────────────────────

/// A stored two-party conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
  pub conversation_id:   ConversationId,
  /// As stored. Well-formed records hold two distinct ids in sorted order;
  /// readers must not rely on either property.
  pub participants:      Vec<UserId>,
  /// Preview of the newest message; empty until the first send.
  pub last_message_text: String,
  /// `None` until the first message is sent.
  pub last_message_time: Option<DateTime<Utc>>,
  pub created_at:        DateTime<Utc>,
}

impl ConversationRecord {
  /// The participant that is not `me`, if any.
  pub fn peer_of(&self, me: &UserId) -> Option<&UserId> {
    self.participants.iter().find(|p| *p != me)
  }

  pub fn involves(&self, user: &UserId) -> bool {
    self.participants.contains(user)
  }
}

// ─── Message ─────────────────────────────────────────────────────────────────

/// An immutable chat message inside one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
  pub message_id:      MessageId,
  pub conversation_id: ConversationId,
  pub text:            String,
  pub sender_id:       UserId,
  /// Snapshot of the sender's display name at send time.
  pub sender_name:     String,
  /// Server-assigned; never changes after creation.
  pub sent_at:         DateTime<Utc>,
}

/// Input to [`ChatStore::append_message`](crate::store::ChatStore::append_message).
/// `sent_at` is always set by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
  pub text:        String,
  pub sender_id:   UserId,
  pub sender_name: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn id(s: &str) -> UserId { UserId::new(s) }

  #[test]
  fn pair_is_order_insensitive() {
    let ab = ParticipantPair::new(id("a"), id("b")).unwrap();
    let ba = ParticipantPair::new(id("b"), id("a")).unwrap();
    assert_eq!(ab, ba);
    assert_eq!(ab.ids(), [&id("a"), &id("b")]);
  }

  #[test]
  fn pair_rejects_self_conversation() {
    assert!(matches!(
      ParticipantPair::new(id("a"), id("a")),
      Err(Error::SelfConversation(_))
    ));
  }

  #[test]
  fn pair_matches_stored_lists_as_sets() {
    let pair = ParticipantPair::new(id("a"), id("b")).unwrap();
    assert!(pair.matches(&[id("b"), id("a")]));
    assert!(!pair.matches(&[id("a"), id("c")]));
    assert!(!pair.matches(&[id("a"), id("b"), id("c")]));
  }

  #[test]
  fn peer_of_skips_self() {
    let record = ConversationRecord {
      conversation_id:   ConversationId::new_v4(),
      participants:      vec![id("a"), id("b")],
      last_message_text: String::new(),
      last_message_time: None,
      created_at:        Utc::now(),
    };
    assert_eq!(record.peer_of(&id("a")), Some(&id("b")));
    assert_eq!(record.peer_of(&id("b")), Some(&id("a")));

    let degenerate = ConversationRecord {
      participants: vec![id("a"), id("a")],
      ..record
    };
    assert_eq!(degenerate.peer_of(&id("a")), None);
  }

  #[test]
  fn conversation_id_parses_display_form() {
    let cid = ConversationId::new_v4();
    let parsed: ConversationId = cid.to_string().parse().unwrap();
    assert_eq!(parsed, cid);
    assert!("nope".parse::<ConversationId>().is_err());
  }
}
