//! [`SqliteStore`] — the SQLite implementation of [`ChatStore`].

use std::{path::Path, sync::Arc};

use argon2::{Algorithm, Argon2, Params, Version};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use samar_core::{
  conversation::{
    ConversationId, ConversationRecord, MessageId, MessageRecord, NewMessage,
    ParticipantPair,
  },
  feed::Subscription,
  identity::UserId,
  profile::{NewProfile, ProfilePatch, ProfileRecord},
  store::ChatStore,
};
use tracing::warn;

use crate::{
  Error, Result,
  encode::{
    self,
    CONVERSATION_COLUMNS, MESSAGE_COLUMNS, PROFILE_COLUMNS, RawConversation,
    RawMessage, RawProfile, decode_participants, encode_dt, encode_participants,
    encode_uuid,
  },
  feeds::Feeds,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Samar backend backed by a single SQLite file.
///
/// Clones share the connection and the live-query feeds, and therefore
/// subscriptions.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn:   tokio_rusqlite::Connection,
  pub(crate) feeds:  Arc<Feeds>,
  pub(crate) hasher: Argon2<'static>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, Params::default()).await
  }

  /// Open an in-memory store for tests. Uses the cheapest
  /// password-hashing parameters argon2 allows.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let params = Params::new(Params::MIN_M_COST, 1, 1, None)
      .map_err(|e| Error::PasswordHash(e.to_string()))?;
    Self::init(conn, params).await
  }

  async fn init(conn: tokio_rusqlite::Connection, params: Params) -> Result<Self> {
    let store = Self {
      conn,
      feeds: Arc::new(Feeds::new()),
      hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
    };
    store.init_schema().await?;
    store.restore_identity().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of live message subscriptions for a conversation.
  pub fn message_listeners(&self, id: ConversationId) -> usize {
    self.feeds.message_listeners(id)
  }

  /// Number of live conversation-list subscriptions for a user.
  pub fn conversation_listeners(&self, user: &UserId) -> usize {
    self.feeds.conversation_listeners(user)
  }

  /// Number of live directory subscriptions.
  pub fn directory_listeners(&self) -> usize { self.feeds.directory.listeners() }

  // ── Queries ───────────────────────────────────────────────────────────────

  async fn query_profile(&self, id: &UserId) -> Result<Option<ProfileRecord>> {
    let id_str = id.as_str().to_owned();

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
              rusqlite::params![id_str],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn query_directory(&self) -> Result<Vec<ProfileRecord>> {
    let raws: Vec<RawProfile> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLUMNS} FROM profiles
           ORDER BY updated_at DESC, user_id"
        ))?;
        let rows = stmt
          .query_map([], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  /// Conversations involving `user`, or every conversation when `None`.
  async fn query_conversations(
    &self,
    user: Option<&UserId>,
  ) -> Result<Vec<ConversationRecord>> {
    let user_str = user.map(|u| u.as_str().to_owned());

    let raws: Vec<RawConversation> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(u) = user_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c
             WHERE EXISTS (
               SELECT 1 FROM json_each(c.participants) p WHERE p.value = ?1
             )
             ORDER BY c.created_at, c.rowid"
          ))?;
          stmt
            .query_map(rusqlite::params![u], RawConversation::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             ORDER BY created_at, rowid"
          ))?;
          stmt
            .query_map([], RawConversation::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawConversation::into_conversation)
      .collect()
  }

  async fn query_messages(&self, id: ConversationId) -> Result<Vec<MessageRecord>> {
    let id_str = encode_uuid(id.0);

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE conversation_id = ?1
           ORDER BY sent_at, seq"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawMessage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  // ── Feed refresh ──────────────────────────────────────────────────────────
  //
  // A failed refresh never fails the write that triggered it: the write is
  // committed, and the next successful refresh catches subscribers up.

  async fn refresh_directory(&self) {
    if self.feeds.directory.listeners() == 0 {
      return;
    }
    match self.query_directory().await {
      Ok(profiles) => self.feeds.directory.publish(profiles),
      Err(e) => warn!(error = %e, "failed to refresh directory feed"),
    }
  }

  async fn refresh_conversations(&self, participants: &[UserId]) {
    for user in participants {
      let Some(feed) = self.feeds.live_conversations_for(user) else {
        continue;
      };
      match self.query_conversations(Some(user)).await {
        Ok(conversations) => feed.publish(conversations),
        Err(e) => {
          warn!(error = %e, %user, "failed to refresh conversation feed");
        }
      }
    }
  }

  async fn refresh_messages(&self, id: ConversationId) {
    let Some(feed) = self.feeds.live_messages_of(id) else {
      return;
    };
    match self.query_messages(id).await {
      Ok(messages) => feed.publish(messages),
      Err(e) => {
        warn!(error = %e, conversation = %id, "failed to refresh message feed");
      }
    }
  }
}

// ─── ChatStore impl ──────────────────────────────────────────────────────────

impl ChatStore for SqliteStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn get_profile(&self, id: &UserId) -> Result<Option<ProfileRecord>> {
    self.query_profile(id).await
  }

  async fn put_profile(
    &self,
    id: &UserId,
    profile: NewProfile,
  ) -> Result<ProfileRecord> {
    let id_str = id.as_str().to_owned();
    let now    = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (
             user_id, email, display_name, avatar_url, status, is_online,
             last_seen, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?7)
           ON CONFLICT (user_id) DO UPDATE SET
             email        = excluded.email,
             display_name = excluded.display_name,
             avatar_url   = excluded.avatar_url,
             status       = excluded.status,
             is_online    = excluded.is_online,
             last_seen    = excluded.last_seen,
             created_at   = excluded.created_at,
             updated_at   = excluded.updated_at",
          rusqlite::params![
            id_str,
            profile.email,
            profile.display_name,
            profile.avatar_url,
            profile.status,
            profile.is_online,
            now,
          ],
        )?;
        Ok(())
      })
      .await?;

    let record = self
      .query_profile(id)
      .await?
      .ok_or_else(|| Error::ProfileMissing(id.clone()))?;
    self.refresh_directory().await;
    Ok(record)
  }

  async fn merge_profile(
    &self,
    id: &UserId,
    patch: ProfilePatch,
  ) -> Result<ProfileRecord> {
    let id_str = id.as_str().to_owned();
    let now    = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (
             user_id, email, display_name, avatar_url, status, is_online,
             last_seen, created_at, updated_at
           ) VALUES (
             ?1, COALESCE(?2, ''), COALESCE(?3, ''), COALESCE(?4, ''),
             COALESCE(?5, ''), COALESCE(?6, 0), ?7, ?7, ?7
           )
           ON CONFLICT (user_id) DO UPDATE SET
             email        = COALESCE(?2, email),
             display_name = COALESCE(?3, display_name),
             avatar_url   = COALESCE(?4, avatar_url),
             status       = COALESCE(?5, status),
             is_online    = COALESCE(?6, is_online),
             last_seen    = CASE WHEN ?8 THEN ?7 ELSE last_seen END,
             updated_at   = ?7",
          rusqlite::params![
            id_str,
            patch.email,
            patch.display_name,
            patch.avatar_url,
            patch.status,
            patch.is_online,
            now,
            patch.touch_last_seen,
          ],
        )?;
        Ok(())
      })
      .await?;

    let record = self
      .query_profile(id)
      .await?
      .ok_or_else(|| Error::ProfileMissing(id.clone()))?;
    self.refresh_directory().await;
    Ok(record)
  }

  async fn subscribe_directory(&self) -> Result<Subscription<Vec<ProfileRecord>>> {
    let subscription = self.feeds.directory.subscribe();
    let profiles     = self.query_directory().await?;
    self.feeds.directory.publish(profiles);
    Ok(subscription)
  }

  // ── Conversations ─────────────────────────────────────────────────────────

  async fn list_conversations(&self) -> Result<Vec<ConversationRecord>> {
    self.query_conversations(None).await
  }

  async fn create_conversation(
    &self,
    participants: ParticipantPair,
  ) -> Result<ConversationRecord> {
    let record = ConversationRecord {
      conversation_id:   ConversationId::new_v4(),
      participants:      participants.into_vec(),
      last_message_text: String::new(),
      last_message_time: None,
      created_at:        encode::now(),
    };

    let id_str           = encode_uuid(record.conversation_id.0);
    let participants_str = encode_participants(&record.participants)?;
    let at_str           = encode_dt(record.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO conversations (conversation_id, participants, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, participants_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.refresh_conversations(&record.participants).await;
    Ok(record)
  }

  async fn subscribe_conversations(
    &self,
    user: &UserId,
  ) -> Result<Subscription<Vec<ConversationRecord>>> {
    let (feed, subscription) = self.feeds.subscribe_conversations(user);
    let conversations = self.query_conversations(Some(user)).await?;
    feed.publish(conversations);
    Ok(subscription)
  }

  async fn update_conversation_preview(
    &self,
    id: ConversationId,
    text: &str,
  ) -> Result<()> {
    let id_str = encode_uuid(id.0);
    let text   = text.to_owned();
    let now    = encode_dt(Utc::now());

    let participants: Option<String> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE conversations
           SET last_message_text = ?2, last_message_time = ?3
           WHERE conversation_id = ?1",
          rusqlite::params![id_str, text, now],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(Some(conn.query_row(
          "SELECT participants FROM conversations WHERE conversation_id = ?1",
          rusqlite::params![id_str],
          |row| row.get(0),
        )?))
      })
      .await?;

    let participants = participants.ok_or(Error::ConversationNotFound(id))?;
    let participants = decode_participants(&participants)?;
    self.refresh_conversations(&participants).await;
    Ok(())
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn append_message(
    &self,
    conversation: ConversationId,
    message: NewMessage,
  ) -> Result<MessageRecord> {
    let record = MessageRecord {
      message_id:      MessageId::new_v4(),
      conversation_id: conversation,
      text:            message.text,
      sender_id:       message.sender_id,
      sender_name:     message.sender_name,
      sent_at:         encode::now(),
    };

    let message_id_str = encode_uuid(record.message_id.0);
    let conv_id_str    = encode_uuid(conversation.0);
    let text           = record.text.clone();
    let sender_id      = record.sender_id.as_str().to_owned();
    let sender_name    = record.sender_name.clone();
    let sent_at_str    = encode_dt(record.sent_at);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM conversations WHERE conversation_id = ?1",
            rusqlite::params![conv_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(false);
        }

        conn.execute(
          "INSERT INTO messages (
             message_id, conversation_id, text, sender_id, sender_name, sent_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            message_id_str,
            conv_id_str,
            text,
            sender_id,
            sender_name,
            sent_at_str,
          ],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::ConversationNotFound(conversation));
    }

    self.refresh_messages(conversation).await;
    Ok(record)
  }

  async fn subscribe_messages(
    &self,
    conversation: ConversationId,
  ) -> Result<Subscription<Vec<MessageRecord>>> {
    let (feed, subscription) = self.feeds.subscribe_messages(conversation);
    let messages     = self.query_messages(conversation).await?;
    feed.publish(messages);
    Ok(subscription)
  }
}
