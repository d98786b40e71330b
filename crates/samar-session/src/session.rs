//! [`Session`]: derived client state for one signed-in identity.

use std::sync::Arc;

use chrono::Utc;
use samar_core::{
  conversation::{ConversationId, ConversationRecord, MessageRecord, NewMessage},
  feed::{Feed, Subscription},
  identity::{Identity, UserId},
  profile::{ProfilePatch, ProfileRecord, StatusPreset},
  store::{BlobStore, ChatStore},
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  Error, Result, SessionConfig,
  avatar::{self, AvatarUpload},
  config::AvatarStorage,
  contacts::{self, Contact},
  conversation,
  directory::{self, DirectoryEntry},
  profile::repair_profile,
};

// ─── Messages ────────────────────────────────────────────────────────────────

/// Who sent a message, relative to the signed-in identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Outgoing,
  Incoming,
}

/// A message of the selected conversation, tagged for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
  #[serde(flatten)]
  pub record:    MessageRecord,
  pub direction: Direction,
}

impl ChatMessage {
  fn tag(record: MessageRecord, me: &UserId) -> Self {
    let direction = if &record.sender_id == me {
      Direction::Outgoing
    } else {
      Direction::Incoming
    };
    Self { record, direction }
  }
}

/// What a call to [`Session::pump`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
  /// The conversation set changed; the contact list was rebuilt.
  Contacts,
  /// Some profile changed; the directory, the own profile and the contact
  /// list were rebuilt.
  Directory,
  /// The selected conversation has a new message list. Presentation layers
  /// scroll to the newest message.
  Messages,
}

/// A store push, detached from the subscription it came from.
enum Push {
  Conversations(Vec<ConversationRecord>),
  Directory(Vec<ProfileRecord>),
  Messages(Vec<MessageRecord>),
}

async fn next_of<T: Clone>(subscription: Option<&mut Subscription<T>>) -> Option<T> {
  subscription?.next().await
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// The reconciler for one signed-in identity.
///
/// Holds at most one message subscription, always for the selected contact's
/// conversation. Every handle is released by [`Session::close`] or on drop.
pub struct Session<S, B> {
  store:    Arc<S>,
  blobs:    Arc<B>,
  config:   Arc<SessionConfig>,
  identity: Identity,

  profile:   Feed<Option<ProfileRecord>>,
  contacts:  Feed<Vec<Contact>>,
  directory: Feed<Vec<DirectoryEntry>>,
  messages:  Feed<Vec<ChatMessage>>,
  selected:  Feed<Option<Contact>>,

  /// Latest conversation snapshot, kept to rebuild contacts when a peer's
  /// profile changes.
  conversations: Vec<ConversationRecord>,
  /// Set while a contact rebuild is in flight.
  contacts_stale: bool,

  conversation_sub: Option<Subscription<Vec<ConversationRecord>>>,
  directory_sub:    Option<Subscription<Vec<ProfileRecord>>>,
  message_sub:      Option<Subscription<Vec<MessageRecord>>>,
}

impl<S, B> Session<S, B>
where
  S: ChatStore,
  B: BlobStore,
{
  /// Repair the identity's profile, then subscribe to its conversations and
  /// to the directory.
  ///
  /// A failed profile write fails the whole call. A failed subscription only
  /// leaves the corresponding list empty.
  pub async fn open(
    store: Arc<S>,
    blobs: Arc<B>,
    config: Arc<SessionConfig>,
    identity: Identity,
  ) -> Result<Self> {
    let profile = repair_profile(&*store, &identity, &config).await?;

    let conversation_sub = match store.subscribe_conversations(&identity.id).await {
      Ok(sub) => Some(sub),
      Err(e) => {
        warn!(error = %e, user = %identity.id, "conversation subscription failed");
        None
      }
    };
    let directory_sub = match store.subscribe_directory().await {
      Ok(sub) => Some(sub),
      Err(e) => {
        warn!(error = %e, "directory subscription failed");
        None
      }
    };

    let mut session = Self {
      store,
      blobs,
      config,
      identity,
      profile: Feed::new(Some(profile)),
      contacts: Feed::new(Vec::new()),
      directory: Feed::new(Vec::new()),
      messages: Feed::new(Vec::new()),
      selected: Feed::new(None),
      conversations: Vec::new(),
      contacts_stale: false,
      conversation_sub,
      directory_sub,
      message_sub: None,
    };

    if let Some(profiles) = session.directory_sub.as_mut().and_then(Subscription::snapshot) {
      session.apply_directory(profiles);
    }
    if let Some(conversations) =
      session.conversation_sub.as_mut().and_then(Subscription::snapshot)
    {
      session.conversations = conversations;
    }
    session.rebuild_contacts().await;

    info!(user = %session.identity.id, "session opened");
    Ok(session)
  }

  // ── State ─────────────────────────────────────────────────────────────────

  pub fn identity(&self) -> &Identity { &self.identity }

  pub fn config(&self) -> &SessionConfig { &self.config }

  /// The own profile as last written or pushed.
  pub fn profile(&self) -> Option<ProfileRecord> { self.profile.latest() }

  pub fn contacts(&self) -> Vec<Contact> { self.contacts.latest() }

  pub fn directory(&self) -> Vec<DirectoryEntry> { self.directory.latest() }

  pub fn messages(&self) -> Vec<ChatMessage> { self.messages.latest() }

  pub fn selected(&self) -> Option<Contact> { self.selected.latest() }

  pub fn watch_profile(&self) -> Subscription<Option<ProfileRecord>> { self.profile.subscribe() }

  pub fn watch_contacts(&self) -> Subscription<Vec<Contact>> { self.contacts.subscribe() }

  pub fn watch_directory(&self) -> Subscription<Vec<DirectoryEntry>> { self.directory.subscribe() }

  pub fn watch_messages(&self) -> Subscription<Vec<ChatMessage>> { self.messages.subscribe() }

  pub fn watch_selected(&self) -> Subscription<Option<Contact>> { self.selected.subscribe() }

  /// Whether a message subscription is currently held.
  pub fn has_message_subscription(&self) -> bool {
    self.message_sub.as_ref().is_some_and(|s| !s.is_released())
  }

  /// Contacts matching `query`; see [`contacts::filter_contacts`].
  pub fn filtered_contacts(&self, query: &str) -> Vec<Contact> {
    let contacts = self.contacts.latest();
    contacts::filter_contacts(&contacts, query)
      .into_iter()
      .cloned()
      .collect()
  }

  /// Directory entries matching `query`; see [`directory::filter_directory`].
  pub fn filtered_directory(&self, query: &str) -> Vec<DirectoryEntry> {
    let entries = self.directory.latest();
    directory::filter_directory(&entries, query)
      .into_iter()
      .cloned()
      .collect()
  }

  // ── Store pushes ──────────────────────────────────────────────────────────

  /// Wait for the next push from any held subscription and apply it.
  ///
  /// Returns `None` once no subscription is left to wait on. Cancel-safe: a
  /// contact rebuild interrupted by dropping the future is finished by the
  /// next call.
  pub async fn pump(&mut self) -> Option<SessionEvent> {
    if self.contacts_stale {
      self.rebuild_contacts().await;
      return Some(SessionEvent::Contacts);
    }

    let push = tokio::select! {
      Some(c) = next_of(self.conversation_sub.as_mut()) => Push::Conversations(c),
      Some(d) = next_of(self.directory_sub.as_mut()) => Push::Directory(d),
      Some(m) = next_of(self.message_sub.as_mut()) => Push::Messages(m),
      else => return None,
    };

    Some(match push {
      Push::Conversations(conversations) => {
        self.conversations = conversations;
        self.rebuild_contacts().await;
        SessionEvent::Contacts
      }
      Push::Directory(profiles) => {
        self.apply_directory(profiles);
        self.rebuild_contacts().await;
        SessionEvent::Directory
      }
      Push::Messages(messages) => {
        self.apply_messages(messages);
        SessionEvent::Messages
      }
    })
  }

  async fn rebuild_contacts(&mut self) {
    self.contacts_stale = true;
    let selected = self.selected.latest().map(|c| c.peer_id);
    let contacts = contacts::reconcile(
      &*self.store,
      &self.identity.id,
      &self.conversations,
      selected.as_ref(),
    )
    .await;
    self.contacts.publish(contacts);
    self.contacts_stale = false;
  }

  fn apply_directory(&mut self, profiles: Vec<ProfileRecord>) {
    if let Some(own) = profiles.iter().find(|p| p.user_id == self.identity.id) {
      self.profile.publish(Some(own.clone()));
    }
    self
      .directory
      .publish(directory::directory_entries(&self.identity.id, profiles));
  }

  fn apply_messages(&mut self, messages: Vec<MessageRecord>) {
    let me = &self.identity.id;
    let tagged = messages
      .into_iter()
      .map(|m| ChatMessage::tag(m, me))
      .collect();
    self.messages.publish(tagged);
  }

  // ── Selection ─────────────────────────────────────────────────────────────

  /// Make `contact` the selected contact and follow its conversation.
  ///
  /// The previous message subscription is released before the new one is
  /// opened. If subscribing fails, nothing stays selected.
  pub async fn select_contact(&mut self, contact: &Contact) -> Result<()> {
    self.release_messages();

    let mut subscription = match self.store.subscribe_messages(contact.conversation_id).await {
      Ok(subscription) => subscription,
      Err(e) => {
        self.mark_selected(None);
        return Err(Error::store(e));
      }
    };

    let mut selected = contact.clone();
    selected.is_selected = true;
    self.mark_selected(Some(selected));

    if let Some(messages) = subscription.snapshot() {
      self.apply_messages(messages);
    }
    self.message_sub = Some(subscription);
    debug!(peer = %contact.peer_id, conversation = %contact.conversation_id, "selected contact");
    Ok(())
  }

  /// Drop the selection and its message subscription.
  pub fn clear_selection(&mut self) {
    self.release_messages();
    self.mark_selected(None);
  }

  fn release_messages(&mut self) {
    if let Some(mut previous) = self.message_sub.take() {
      previous.release();
    }
    self.messages.publish(Vec::new());
  }

  fn mark_selected(&mut self, contact: Option<Contact>) {
    let peer = contact.as_ref().map(|c| c.peer_id.clone());
    self.contacts.update(|contacts| {
      for c in contacts.iter_mut() {
        c.is_selected = Some(&c.peer_id) == peer.as_ref();
      }
    });
    self.selected.publish(contact);
  }

  // ── Conversations ─────────────────────────────────────────────────────────

  /// Id of the conversation with `peer`, creating it if needed.
  pub async fn start_conversation(&self, peer: &UserId) -> Result<ConversationId> {
    conversation::start_conversation(&*self.store, &self.identity.id, peer).await
  }

  /// Open a chat with someone from the directory.
  ///
  /// A peer without a contact yet gets a provisional one at the head of the
  /// list until the next conversation push rebuilds it. Nothing is inserted
  /// if the selection fails.
  pub async fn open_chat_with(&mut self, entry: &DirectoryEntry) -> Result<Contact> {
    let conversation_id = self.start_conversation(&entry.user_id).await?;

    let existing = self
      .contacts
      .latest()
      .into_iter()
      .find(|c| c.peer_id == entry.user_id);
    let provisional = existing.is_none();

    let mut contact = existing.unwrap_or_else(|| Contact {
      peer_id: entry.user_id.clone(),
      display_name: entry.display_name.clone(),
      avatar_url: entry.avatar_url.clone(),
      status_preview: String::new(),
      is_online: entry.is_online,
      conversation_id,
      last_message_time: None,
      is_selected: false,
    });

    self.select_contact(&contact).await?;
    contact.is_selected = true;
    if provisional {
      let head = contact.clone();
      self.contacts.update(|contacts| contacts.insert(0, head));
    }
    Ok(contact)
  }

  /// Send `text` to the selected conversation.
  ///
  /// Blank text or no selection is a no-op returning `Ok(None)`. The
  /// conversation preview is updated afterwards on a best-effort basis.
  pub async fn send_message(&mut self, text: &str) -> Result<Option<MessageRecord>> {
    let text = text.trim();
    if text.is_empty() {
      return Ok(None);
    }
    let Some(conversation) = self.selected.latest().map(|c| c.conversation_id) else {
      return Ok(None);
    };

    let message = NewMessage {
      text:        text.to_owned(),
      sender_id:   self.identity.id.clone(),
      sender_name: self.sender_name(),
    };
    let record = self
      .store
      .append_message(conversation, message)
      .await
      .map_err(Error::store)?;

    if let Err(e) = self.store.update_conversation_preview(conversation, text).await {
      warn!(error = %e, %conversation, "failed to update conversation preview");
    }
    Ok(Some(record))
  }

  fn sender_name(&self) -> String {
    self
      .profile
      .latest()
      .map(|p| p.display_name)
      .filter(|n| !n.is_empty())
      .or_else(|| Some(self.identity.display_name.clone()).filter(|n| !n.is_empty()))
      .unwrap_or_else(|| self.config.default_display_name.clone())
  }

  // ── Own profile ───────────────────────────────────────────────────────────

  /// Set the free-form status. Blank text is a no-op returning `false`.
  /// Local state changes only once the write succeeds.
  pub async fn set_status(&mut self, text: &str) -> Result<bool> {
    let text = text.trim();
    if text.is_empty() {
      return Ok(false);
    }
    let record = self
      .store
      .merge_profile(&self.identity.id, ProfilePatch::status(text))
      .await
      .map_err(Error::store)?;
    self.profile.publish(Some(record));
    Ok(true)
  }

  pub async fn set_quick_status(&mut self, preset: StatusPreset) -> Result<bool> {
    let text = self.config.quick_status(preset);
    self.set_status(&text).await
  }

  /// Replace the avatar.
  ///
  /// The image is validated first; a rejected image makes no store call.
  /// The new URL is shown immediately and rolled back if the profile write
  /// fails. In blob mode the superseded image is deleted afterwards, or the
  /// new one if the write failed.
  pub async fn set_avatar(&mut self, upload: AvatarUpload) -> Result<String> {
    avatar::validate(&self.config.avatar, &upload)?;

    let storage = self.config.avatar.storage;
    let url = match storage {
      AvatarStorage::Inline => avatar::data_url(&upload),
      AvatarStorage::Blob => {
        let path = avatar::blob_path(&self.identity.id, Utc::now(), &upload.file_name);
        self
          .blobs
          .upload(&path, upload.media_type.trim(), &upload.bytes)
          .await
          .map_err(Error::store)?
      }
    };

    let previous = self.profile.latest().map(|p| p.avatar_url).unwrap_or_default();
    self.show_avatar(url.clone());

    match self
      .store
      .merge_profile(&self.identity.id, ProfilePatch::avatar(url.clone()))
      .await
    {
      Ok(record) => {
        self.profile.publish(Some(record));
        if storage == AvatarStorage::Blob && avatar::is_stored(&previous) && previous != url {
          self.delete_blob(&previous).await;
        }
        Ok(url)
      }
      Err(e) => {
        self.show_avatar(previous);
        if storage == AvatarStorage::Blob {
          self.delete_blob(&url).await;
        }
        Err(Error::store(e))
      }
    }
  }

  fn show_avatar(&self, url: String) {
    self.profile.update(|profile| {
      if let Some(profile) = profile {
        profile.avatar_url = url;
      }
    });
  }

  async fn delete_blob(&self, url: &str) {
    if let Err(e) = self.blobs.delete(url).await {
      warn!(error = %e, url, "failed to delete avatar blob");
    }
  }

  // ── Presence ──────────────────────────────────────────────────────────────

  /// Refresh `is_online` and `last_seen`. Failures are logged only.
  pub async fn heartbeat(&self) {
    match self
      .store
      .merge_profile(&self.identity.id, ProfilePatch::presence(true))
      .await
    {
      Ok(record) => self.profile.publish(Some(record)),
      Err(e) => warn!(error = %e, user = %self.identity.id, "presence heartbeat failed"),
    }
  }

  /// Mark the identity offline (best-effort) and release every handle.
  pub async fn close(mut self) {
    if let Err(e) = self
      .store
      .merge_profile(&self.identity.id, ProfilePatch::presence(false))
      .await
    {
      warn!(error = %e, user = %self.identity.id, "failed to record sign-out presence");
    }
    self.release_all();
    info!(user = %self.identity.id, "session closed");
  }

  /// Release every held subscription without touching the store.
  pub fn release_all(&mut self) {
    self.clear_selection();
    if let Some(mut sub) = self.conversation_sub.take() {
      sub.release();
    }
    if let Some(mut sub) = self.directory_sub.take() {
      sub.release();
    }
  }
}
