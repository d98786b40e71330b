//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that lexical order in SQL equals chronological order. The
//! participant list is stored as a compact JSON array.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use samar_core::{
  conversation::{ConversationId, ConversationRecord, MessageId, MessageRecord},
  identity::{Identity, UserId},
  profile::ProfileRecord,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

/// The store clock, truncated to the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Participants ────────────────────────────────────────────────────────────

pub fn encode_participants(ids: &[UserId]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_participants(s: &str) -> Result<Vec<UserId>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub user_id:      String,
  pub email:        String,
  pub display_name: String,
  pub avatar_url:   String,
  pub status:       String,
  pub is_online:    bool,
  pub last_seen:    String,
  pub created_at:   String,
  pub updated_at:   String,
}

/// Column list matching [`RawProfile::from_row`].
pub const PROFILE_COLUMNS: &str = "user_id, email, display_name, avatar_url, \
                                   status, is_online, last_seen, created_at, \
                                   updated_at";

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:      row.get(0)?,
      email:        row.get(1)?,
      display_name: row.get(2)?,
      avatar_url:   row.get(3)?,
      status:       row.get(4)?,
      is_online:    row.get(5)?,
      last_seen:    row.get(6)?,
      created_at:   row.get(7)?,
      updated_at:   row.get(8)?,
    })
  }

  pub fn into_profile(self) -> Result<ProfileRecord> {
    Ok(ProfileRecord {
      user_id:      UserId::new(self.user_id),
      email:        self.email,
      display_name: self.display_name,
      avatar_url:   self.avatar_url,
      status:       self.status,
      is_online:    self.is_online,
      last_seen:    decode_dt(&self.last_seen)?,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `conversations` row.
pub struct RawConversation {
  pub conversation_id:   String,
  pub participants:      String,
  pub last_message_text: String,
  pub last_message_time: Option<String>,
  pub created_at:        String,
}

pub const CONVERSATION_COLUMNS: &str = "conversation_id, participants, \
                                        last_message_text, last_message_time, \
                                        created_at";

impl RawConversation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      conversation_id:   row.get(0)?,
      participants:      row.get(1)?,
      last_message_text: row.get(2)?,
      last_message_time: row.get(3)?,
      created_at:        row.get(4)?,
    })
  }

  pub fn into_conversation(self) -> Result<ConversationRecord> {
    Ok(ConversationRecord {
      conversation_id:   ConversationId(decode_uuid(&self.conversation_id)?),
      participants:      decode_participants(&self.participants)?,
      last_message_text: self.last_message_text,
      last_message_time: self
        .last_message_time
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `messages` row.
pub struct RawMessage {
  pub message_id:      String,
  pub conversation_id: String,
  pub text:            String,
  pub sender_id:       String,
  pub sender_name:     String,
  pub sent_at:         String,
}

pub const MESSAGE_COLUMNS: &str = "message_id, conversation_id, text, \
                                   sender_id, sender_name, sent_at";

impl RawMessage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:      row.get(0)?,
      conversation_id: row.get(1)?,
      text:            row.get(2)?,
      sender_id:       row.get(3)?,
      sender_name:     row.get(4)?,
      sent_at:         row.get(5)?,
    })
  }

  pub fn into_message(self) -> Result<MessageRecord> {
    Ok(MessageRecord {
      message_id:      MessageId(decode_uuid(&self.message_id)?),
      conversation_id: ConversationId(decode_uuid(&self.conversation_id)?),
      text:            self.text,
      sender_id:       UserId::new(self.sender_id),
      sender_name:     self.sender_name,
      sent_at:         decode_dt(&self.sent_at)?,
    })
  }
}

/// Raw strings read from an `accounts` row.
pub struct RawAccount {
  pub user_id:      String,
  pub email:        String,
  pub display_name: String,
  pub avatar_url:   String,
}

pub const ACCOUNT_COLUMNS: &str = "user_id, email, display_name, avatar_url";

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:      row.get(0)?,
      email:        row.get(1)?,
      display_name: row.get(2)?,
      avatar_url:   row.get(3)?,
    })
  }

  pub fn into_identity(self) -> Identity {
    Identity {
      id:           UserId::new(self.user_id),
      display_name: self.display_name,
      avatar_url:   self.avatar_url,
      email:        self.email,
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let early = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let late = Utc.timestamp_opt(1_700_000_000, 5_000).unwrap();
    let (a, b) = (encode_dt(early), encode_dt(late));
    assert_eq!(a.len(), b.len());
    assert!(a < b);
    assert_eq!(decode_dt(&b).unwrap(), late);
  }

  #[test]
  fn participants_round_trip_as_json() {
    let ids = vec![UserId::new("a"), UserId::new("b")];
    let encoded = encode_participants(&ids).unwrap();
    assert_eq!(encoded, r#"["a","b"]"#);
    assert_eq!(decode_participants(&encoded).unwrap(), ids);
  }
}
