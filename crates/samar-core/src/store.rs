//! Collaborator traits consumed by the session layer.
//!
//! The traits are implemented by backends (e.g. `samar-store-sqlite`). The
//! session reconciler depends on these abstractions, not on any concrete
//! backend.
//!
//! All methods return `Send` futures so the traits can be used from
//! multi-threaded async runtimes.

use std::future::Future;

use crate::{
  auth::AuthError,
  conversation::{
    ConversationId, ConversationRecord, MessageRecord, NewMessage,
    ParticipantPair,
  },
  feed::Subscription,
  identity::{FederatedCredential, Identity, UserId},
  profile::{NewProfile, ProfilePatch, ProfileRecord},
};

// ─── Chat store ──────────────────────────────────────────────────────────────

/// Profile and conversation documents, with real-time subscriptions.
///
/// Every `subscribe_*` method returns a [`Subscription`] whose snapshot is
/// already populated with the current query result; the backend publishes a
/// full replacement snapshot after every relevant write.
pub trait ChatStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// One-shot read. `None` if no record exists for `id`.
  fn get_profile<'a>(
    &'a self,
    id: &'a UserId,
  ) -> impl Future<Output = Result<Option<ProfileRecord>, Self::Error>> + Send + 'a;

  /// Write the whole record, replacing any existing one (merge = false).
  /// All timestamps are set by the store.
  fn put_profile<'a>(
    &'a self,
    id: &'a UserId,
    profile: NewProfile,
  ) -> impl Future<Output = Result<ProfileRecord, Self::Error>> + Send + 'a;

  /// Write only the fields present in `patch` (merge = true), creating a
  /// partial record if none exists.
  fn merge_profile<'a>(
    &'a self,
    id: &'a UserId,
    patch: ProfilePatch,
  ) -> impl Future<Output = Result<ProfileRecord, Self::Error>> + Send + 'a;

  /// Every profile, most recently updated first.
  fn subscribe_directory(
    &self,
  ) -> impl Future<Output = Result<Subscription<Vec<ProfileRecord>>, Self::Error>>
  + Send
  + '_;

  // ── Conversations ─────────────────────────────────────────────────────

  /// One-shot full scan of every conversation.
  fn list_conversations(
    &self,
  ) -> impl Future<Output = Result<Vec<ConversationRecord>, Self::Error>> + Send + '_;

  /// Create a conversation with an empty preview. Performs no uniqueness
  /// check; callers look up existing conversations first.
  fn create_conversation(
    &self,
    participants: ParticipantPair,
  ) -> impl Future<Output = Result<ConversationRecord, Self::Error>> + Send + '_;

  /// Conversations whose participants contain `user`.
  fn subscribe_conversations<'a>(
    &'a self,
    user: &'a UserId,
  ) -> impl Future<
    Output = Result<Subscription<Vec<ConversationRecord>>, Self::Error>,
  > + Send
  + 'a;

  /// Set `last_message_text` and stamp `last_message_time` with the server
  /// clock.
  fn update_conversation_preview<'a>(
    &'a self,
    id: ConversationId,
    text: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Messages ──────────────────────────────────────────────────────────

  /// Append a message; `sent_at` is set by the store.
  fn append_message(
    &self,
    conversation: ConversationId,
    message: NewMessage,
  ) -> impl Future<Output = Result<MessageRecord, Self::Error>> + Send + '_;

  /// Messages of one conversation, oldest first.
  fn subscribe_messages(
    &self,
    conversation: ConversationId,
  ) -> impl Future<Output = Result<Subscription<Vec<MessageRecord>>, Self::Error>>
  + Send
  + '_;
}

// ─── Blob store ──────────────────────────────────────────────────────────────

/// Binary object storage used by the avatar upload path.
pub trait BlobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store `bytes` at `path` and return a URL that refers to them.
  fn upload<'a>(
    &'a self,
    path: &'a str,
    media_type: &'a str,
    bytes: &'a [u8],
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  /// Delete the object behind `url`. Unknown URLs are not an error.
  fn delete<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Identity provider ───────────────────────────────────────────────────────

/// Authentication. Each call resolves to an [`Identity`] or an
/// [`AuthError`] carrying the provider's failure code.
pub trait IdentityProvider: Send + Sync {
  /// Pushes the active identity, or `None`, on every auth-state change.
  fn current_identity(&self) -> Subscription<Option<Identity>>;

  fn sign_in_email<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Identity, AuthError>> + Send + 'a;

  fn sign_in_federated(
    &self,
    credential: FederatedCredential,
  ) -> impl Future<Output = Result<Identity, AuthError>> + Send + '_;

  fn sign_up_email<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
    display_name: &'a str,
  ) -> impl Future<Output = Result<Identity, AuthError>> + Send + 'a;

  fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send + '_;
}
