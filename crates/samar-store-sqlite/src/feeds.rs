//! Live-query feeds kept by the store.
//!
//! Each subscribed query (the directory, one user's conversations, one
//! conversation's messages) owns a [`Feed`]. Writers look the feed up after
//! committing and publish a fresh snapshot; feeds whose last subscription
//! was released are pruned on that lookup.

use std::{
  collections::HashMap,
  hash::Hash,
  sync::{Arc, Mutex, PoisonError},
};

use samar_core::{
  conversation::{ConversationId, ConversationRecord, MessageRecord},
  feed::{Feed, Subscription},
  identity::{Identity, UserId},
  profile::ProfileRecord,
};

/// A keyed family of feeds with the same snapshot type.
struct FeedMap<K, T> {
  feeds: Mutex<HashMap<K, Arc<Feed<Vec<T>>>>>,
}

impl<K: Eq + Hash + Clone, T> FeedMap<K, T> {
  fn new() -> Self { Self { feeds: Mutex::new(HashMap::new()) } }

  /// Register a subscription on the feed for `key`, creating the feed if
  /// needed. The registration happens under the map lock so a concurrent
  /// [`FeedMap::live`] cannot prune the feed in between.
  fn subscribe(&self, key: &K) -> (Arc<Feed<Vec<T>>>, Subscription<Vec<T>>) {
    let mut feeds = self.feeds.lock().unwrap_or_else(PoisonError::into_inner);
    let feed = feeds
      .entry(key.clone())
      .or_insert_with(|| Arc::new(Feed::new(Vec::new())))
      .clone();
    let subscription = feed.subscribe();
    (feed, subscription)
  }

  /// The feed for `key` if anyone still listens to it.
  fn live(&self, key: &K) -> Option<Arc<Feed<Vec<T>>>> {
    let mut feeds = self.feeds.lock().unwrap_or_else(PoisonError::into_inner);
    match feeds.get(key) {
      Some(feed) if feed.listeners() > 0 => Some(feed.clone()),
      Some(_) => {
        feeds.remove(key);
        None
      }
      None => None,
    }
  }

  fn listeners(&self, key: &K) -> usize {
    let feeds = self.feeds.lock().unwrap_or_else(PoisonError::into_inner);
    feeds.get(key).map_or(0, |feed| feed.listeners())
  }
}

pub struct Feeds {
  pub identity:  Feed<Option<Identity>>,
  pub directory: Feed<Vec<ProfileRecord>>,
  conversations: FeedMap<UserId, ConversationRecord>,
  messages:      FeedMap<ConversationId, MessageRecord>,
}

impl Feeds {
  pub fn new() -> Self {
    Self {
      identity:      Feed::new(None),
      directory:     Feed::new(Vec::new()),
      conversations: FeedMap::new(),
      messages:      FeedMap::new(),
    }
  }

  pub fn subscribe_conversations(
    &self,
    user: &UserId,
  ) -> (Arc<Feed<Vec<ConversationRecord>>>, Subscription<Vec<ConversationRecord>>) {
    self.conversations.subscribe(user)
  }

  pub fn live_conversations_for(
    &self,
    user: &UserId,
  ) -> Option<Arc<Feed<Vec<ConversationRecord>>>> {
    self.conversations.live(user)
  }

  pub fn subscribe_messages(
    &self,
    id: ConversationId,
  ) -> (Arc<Feed<Vec<MessageRecord>>>, Subscription<Vec<MessageRecord>>) {
    self.messages.subscribe(&id)
  }

  pub fn live_messages_of(
    &self,
    id: ConversationId,
  ) -> Option<Arc<Feed<Vec<MessageRecord>>>> {
    self.messages.live(&id)
  }

  pub fn conversation_listeners(&self, user: &UserId) -> usize {
    self.conversations.listeners(user)
  }

  pub fn message_listeners(&self, id: ConversationId) -> usize {
    self.messages.listeners(&id)
  }
}

#[cfg(test)]
mod tests {
  use std::thread;

  use super::*;

  #[test]
  fn subscribed_feed_is_never_pruned() {
    let map: Arc<FeedMap<u32, u32>> = Arc::new(FeedMap::new());
    let pruner = {
      let map = map.clone();
      thread::spawn(move || {
        for _ in 0..2_000 {
          map.live(&7);
        }
      })
    };

    for _ in 0..2_000 {
      let (feed, subscription) = map.subscribe(&7);
      let live = map.live(&7).expect("feed with a listener stays registered");
      assert!(Arc::ptr_eq(&feed, &live));
      drop(subscription);
    }
    pruner.join().unwrap();
  }

  #[tokio::test]
  async fn publish_reaches_new_subscription() {
    let map: FeedMap<u32, u32> = FeedMap::new();
    let (_, mut subscription) = map.subscribe(&1);
    assert_eq!(map.listeners(&1), 1);

    map.live(&1).unwrap().publish(vec![4, 2]);
    assert_eq!(subscription.next().await, Some(vec![4, 2]));
  }
}
