//! Integration tests for `SqliteStore` against an in-memory database.

use std::time::Duration;

use samar_core::{
  auth::AuthErrorKind,
  conversation::{ConversationId, NewMessage, ParticipantPair},
  identity::{FederatedCredential, UserId},
  profile::{NewProfile, ProfilePatch},
  store::{BlobStore, ChatStore, IdentityProvider},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn uid(s: &str) -> UserId { UserId::new(s) }

fn new_profile(name: &str, email: &str) -> NewProfile {
  NewProfile {
    email:        email.into(),
    display_name: name.into(),
    avatar_url:   String::new(),
    status:       "😊 متاح".into(),
    is_online:    true,
  }
}

fn text_from(sender: &str, text: &str) -> NewMessage {
  NewMessage {
    text:        text.into(),
    sender_id:   uid(sender),
    sender_name: sender.to_uppercase(),
  }
}

async fn tick() { tokio::time::sleep(Duration::from_millis(2)).await }

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn put_and_get_profile() {
  let s = store().await;

  let written = s.put_profile(&uid("u1"), new_profile("Mona", "mona@x.io")).await.unwrap();
  assert_eq!(written.user_id, uid("u1"));
  assert_eq!(written.display_name, "Mona");
  assert!(written.is_online);
  assert_eq!(written.created_at, written.updated_at);

  let fetched = s.get_profile(&uid("u1")).await.unwrap().unwrap();
  assert_eq!(fetched, written);
}

#[tokio::test]
async fn get_profile_missing_returns_none() {
  let s = store().await;
  assert!(s.get_profile(&uid("nobody")).await.unwrap().is_none());
}

#[tokio::test]
async fn merge_touches_only_given_fields() {
  let s = store().await;
  let before = s.put_profile(&uid("u1"), new_profile("Mona", "mona@x.io")).await.unwrap();
  tick().await;

  let after = s.merge_profile(&uid("u1"), ProfilePatch::status("🟡 مشغول")).await.unwrap();
  assert_eq!(after.status, "🟡 مشغول");
  assert_eq!(after.display_name, "Mona");
  assert_eq!(after.email, "mona@x.io");
  assert_eq!(after.created_at, before.created_at);
  assert_eq!(after.last_seen, before.last_seen);
  assert!(after.updated_at > before.updated_at);
}

#[tokio::test]
async fn presence_merge_refreshes_last_seen() {
  let s = store().await;
  let before = s.put_profile(&uid("u1"), new_profile("Mona", "mona@x.io")).await.unwrap();
  tick().await;

  let after = s.merge_profile(&uid("u1"), ProfilePatch::presence(false)).await.unwrap();
  assert!(!after.is_online);
  assert!(after.last_seen > before.last_seen);
}

#[tokio::test]
async fn merge_on_missing_record_creates_placeholder() {
  let s = store().await;
  let record = s.merge_profile(&uid("ghost"), ProfilePatch::presence(true)).await.unwrap();
  assert!(record.is_online);
  assert!(record.display_name.is_empty());
  assert!(!record.is_complete());
}

#[tokio::test]
async fn put_overwrites_whole_record() {
  let s = store().await;
  s.put_profile(&uid("u1"), new_profile("Mona", "mona@x.io")).await.unwrap();
  s.merge_profile(&uid("u1"), ProfilePatch::avatar("https://img/1.png")).await.unwrap();

  let rewritten = s.put_profile(&uid("u1"), new_profile("Mona Z", "mona@x.io")).await.unwrap();
  assert_eq!(rewritten.display_name, "Mona Z");
  assert!(rewritten.avatar_url.is_empty());
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn directory_is_most_recently_updated_first() {
  let s = store().await;
  s.put_profile(&uid("a"), new_profile("A", "a@x.io")).await.unwrap();
  tick().await;
  s.put_profile(&uid("b"), new_profile("B", "b@x.io")).await.unwrap();

  let mut sub = s.subscribe_directory().await.unwrap();
  let ids: Vec<_> = sub.snapshot().unwrap().into_iter().map(|p| p.user_id).collect();
  assert_eq!(ids, vec![uid("b"), uid("a")]);

  tick().await;
  s.merge_profile(&uid("a"), ProfilePatch::presence(true)).await.unwrap();
  let ids: Vec<_> = sub.next().await.unwrap().into_iter().map(|p| p.user_id).collect();
  assert_eq!(ids, vec![uid("a"), uid("b")]);
}

#[tokio::test]
async fn directory_listeners_track_releases() {
  let s = store().await;
  let mut sub = s.subscribe_directory().await.unwrap();
  assert_eq!(s.directory_listeners(), 1);
  sub.release();
  assert_eq!(s.directory_listeners(), 0);
}

// ─── Conversations ───────────────────────────────────────────────────────────

#[tokio::test]
async fn created_conversation_has_sorted_participants_and_empty_preview() {
  let s = store().await;
  let pair = ParticipantPair::new(uid("zed"), uid("amy")).unwrap();
  let record = s.create_conversation(pair).await.unwrap();

  assert_eq!(record.participants, vec![uid("amy"), uid("zed")]);
  assert!(record.last_message_text.is_empty());
  assert!(record.last_message_time.is_none());

  let all = s.list_conversations().await.unwrap();
  assert_eq!(all, vec![record]);
}

#[tokio::test]
async fn conversation_subscription_filters_by_participant() {
  let s = store().await;
  let ab = s
    .create_conversation(ParticipantPair::new(uid("a"), uid("b")).unwrap())
    .await
    .unwrap();
  s.create_conversation(ParticipantPair::new(uid("c"), uid("d")).unwrap())
    .await
    .unwrap();

  let mut sub = s.subscribe_conversations(&uid("a")).await.unwrap();
  let snapshot = sub.snapshot().unwrap();
  assert_eq!(snapshot.len(), 1);
  assert_eq!(snapshot[0].conversation_id, ab.conversation_id);

  let ae = s
    .create_conversation(ParticipantPair::new(uid("e"), uid("a")).unwrap())
    .await
    .unwrap();
  let snapshot = sub.next().await.unwrap();
  let ids: Vec<_> = snapshot.iter().map(|c| c.conversation_id).collect();
  assert_eq!(ids, vec![ab.conversation_id, ae.conversation_id]);
}

#[tokio::test]
async fn preview_update_is_pushed_to_both_participants() {
  let s = store().await;
  let conv = s
    .create_conversation(ParticipantPair::new(uid("a"), uid("b")).unwrap())
    .await
    .unwrap();
  let mut sub_a = s.subscribe_conversations(&uid("a")).await.unwrap();
  let mut sub_b = s.subscribe_conversations(&uid("b")).await.unwrap();
  sub_a.snapshot();
  sub_b.snapshot();

  s.update_conversation_preview(conv.conversation_id, "أهلا").await.unwrap();

  for sub in [&mut sub_a, &mut sub_b] {
    let snapshot = sub.next().await.unwrap();
    assert_eq!(snapshot[0].last_message_text, "أهلا");
    assert!(snapshot[0].last_message_time.is_some());
  }
}

#[tokio::test]
async fn preview_update_on_unknown_conversation_fails() {
  let s = store().await;
  let missing = ConversationId::new_v4();
  let err = s.update_conversation_preview(missing, "hi").await.unwrap_err();
  assert!(matches!(err, Error::ConversationNotFound(id) if id == missing));
}

#[tokio::test]
async fn released_conversation_feed_is_pruned() {
  let s = store().await;
  let mut sub = s.subscribe_conversations(&uid("a")).await.unwrap();
  assert_eq!(s.conversation_listeners(&uid("a")), 1);
  sub.release();
  assert_eq!(s.conversation_listeners(&uid("a")), 0);

  // A write after release must not resurrect the feed.
  s.create_conversation(ParticipantPair::new(uid("a"), uid("b")).unwrap())
    .await
    .unwrap();
  assert_eq!(s.conversation_listeners(&uid("a")), 0);
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn messages_arrive_in_send_order() {
  let s = store().await;
  let conv = s
    .create_conversation(ParticipantPair::new(uid("a"), uid("b")).unwrap())
    .await
    .unwrap();
  let mut sub = s.subscribe_messages(conv.conversation_id).await.unwrap();
  assert!(sub.snapshot().unwrap().is_empty());

  for (sender, text) in [("a", "one"), ("b", "two"), ("a", "three")] {
    s.append_message(conv.conversation_id, text_from(sender, text))
      .await
      .unwrap();
  }

  let mut latest = sub.snapshot().unwrap();
  while latest.len() < 3 {
    latest = sub.next().await.unwrap();
  }
  let texts: Vec<_> = latest.iter().map(|m| m.text.as_str()).collect();
  assert_eq!(texts, vec!["one", "two", "three"]);
  assert_eq!(latest[1].sender_id, uid("b"));
  assert_eq!(latest[1].sender_name, "B");
}

#[tokio::test]
async fn appended_message_equals_pushed_message() {
  let s = store().await;
  let conv = s
    .create_conversation(ParticipantPair::new(uid("a"), uid("b")).unwrap())
    .await
    .unwrap();
  let mut sub = s.subscribe_messages(conv.conversation_id).await.unwrap();
  sub.snapshot();

  let sent = s
    .append_message(conv.conversation_id, text_from("a", "hello"))
    .await
    .unwrap();

  let pushed = sub.next().await.unwrap();
  assert_eq!(pushed, vec![sent.clone()]);
  assert_eq!(sent.sent_at.timestamp_subsec_nanos() % 1_000, 0);
}

#[tokio::test]
async fn message_to_unknown_conversation_is_rejected() {
  let s = store().await;
  let missing = ConversationId::new_v4();
  let err = s.append_message(missing, text_from("a", "hi")).await.unwrap_err();
  assert!(matches!(err, Error::ConversationNotFound(_)));
}

#[tokio::test]
async fn message_subscriptions_are_per_conversation() {
  let s = store().await;
  let first = s
    .create_conversation(ParticipantPair::new(uid("a"), uid("b")).unwrap())
    .await
    .unwrap();
  let second = s
    .create_conversation(ParticipantPair::new(uid("a"), uid("c")).unwrap())
    .await
    .unwrap();

  let mut sub = s.subscribe_messages(first.conversation_id).await.unwrap();
  sub.snapshot();
  s.append_message(second.conversation_id, text_from("c", "elsewhere"))
    .await
    .unwrap();
  s.append_message(first.conversation_id, text_from("b", "here"))
    .await
    .unwrap();

  let snapshot = sub.next().await.unwrap();
  assert_eq!(snapshot.len(), 1);
  assert_eq!(snapshot[0].text, "here");

  assert_eq!(s.message_listeners(first.conversation_id), 1);
  assert_eq!(s.message_listeners(second.conversation_id), 0);
  sub.release();
  assert_eq!(s.message_listeners(first.conversation_id), 0);
}

// ─── Blobs ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_then_read_blob() {
  let s = store().await;
  let url = s
    .upload("profile-images/u1/1_me.png", "image/png", b"\x89PNG")
    .await
    .unwrap();
  assert_eq!(url, "blob://profile-images/u1/1_me.png");

  let blob = s.read_blob(&url).await.unwrap().unwrap();
  assert_eq!(blob.media_type, "image/png");
  assert_eq!(blob.bytes, b"\x89PNG");
  assert_eq!(blob.content_hash.len(), 64);
}

#[tokio::test]
async fn delete_blob_and_ignore_foreign_urls() {
  let s = store().await;
  let url = s.upload("p/x.gif", "image/gif", b"GIF89a").await.unwrap();

  s.delete("https://elsewhere/x.gif").await.unwrap();
  assert!(s.read_blob(&url).await.unwrap().is_some());

  s.delete(&url).await.unwrap();
  assert!(s.read_blob(&url).await.unwrap().is_none());
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sign_up_signs_in_and_publishes_identity() {
  let s = store().await;
  let mut current = s.current_identity();
  assert_eq!(current.snapshot().unwrap(), None);

  let identity = s
    .sign_up_email(" Mona@X.io ", "secret1", "Mona")
    .await
    .unwrap();
  assert_eq!(identity.email, "mona@x.io");
  assert_eq!(identity.display_name, "Mona");
  assert!(!identity.id.is_empty());

  assert_eq!(current.next().await.unwrap(), Some(identity));
}

#[tokio::test]
async fn sign_up_rejects_bad_input() {
  let s = store().await;

  let err = s.sign_up_email("not-an-email", "secret1", "X").await.unwrap_err();
  assert_eq!(err.kind, AuthErrorKind::InvalidEmail);

  let err = s.sign_up_email("x@y.io", "12345", "X").await.unwrap_err();
  assert_eq!(err.kind, AuthErrorKind::WeakPassword);

  s.sign_up_email("x@y.io", "123456", "X").await.unwrap();
  let err = s.sign_up_email("X@Y.io", "abcdef", "X2").await.unwrap_err();
  assert_eq!(err.kind, AuthErrorKind::EmailAlreadyInUse);
}

#[tokio::test]
async fn sign_in_checks_password() {
  let s = store().await;
  let created = s.sign_up_email("x@y.io", "secret1", "X").await.unwrap();
  s.sign_out().await.unwrap();

  let err = s.sign_in_email("x@y.io", "wrong!!").await.unwrap_err();
  assert_eq!(err.kind, AuthErrorKind::WrongPassword);

  let err = s.sign_in_email("nobody@y.io", "secret1").await.unwrap_err();
  assert_eq!(err.kind, AuthErrorKind::UserNotFound);

  let signed_in = s.sign_in_email("X@y.io", "secret1").await.unwrap();
  assert_eq!(signed_in, created);
}

#[tokio::test]
async fn sign_out_clears_identity() {
  let s = store().await;
  s.sign_up_email("x@y.io", "secret1", "X").await.unwrap();
  let mut current = s.current_identity();
  assert!(current.snapshot().unwrap().is_some());

  s.sign_out().await.unwrap();
  assert_eq!(current.next().await.unwrap(), None);
}

#[tokio::test]
async fn federated_sign_in_is_stable_per_subject() {
  let s = store().await;
  let credential = FederatedCredential {
    provider:     "google.com".into(),
    subject:      "1234".into(),
    email:        "mona@gmail.com".into(),
    display_name: "Mona".into(),
    avatar_url:   "https://lh3/photo.jpg".into(),
  };

  let first = s.sign_in_federated(credential.clone()).await.unwrap();
  assert_eq!(first.avatar_url, "https://lh3/photo.jpg");

  let renamed = FederatedCredential { display_name: "Mona Z".into(), ..credential };
  let second = s.sign_in_federated(renamed).await.unwrap();
  assert_eq!(second.id, first.id);
  assert_eq!(second.display_name, "Mona Z");
}

#[tokio::test]
async fn federated_sign_in_rejects_password_provider() {
  let s = store().await;
  let err = s
    .sign_in_federated(FederatedCredential {
      provider:     "password".into(),
      subject:      "x".into(),
      email:        "x@y.io".into(),
      display_name: "X".into(),
      avatar_url:   String::new(),
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind.code(), "auth/invalid-credential");
}
