//! Latest-value publish/subscribe.
//!
//! A [`Feed`] holds the most recent snapshot of some state and notifies every
//! registered [`Subscription`] when a newer snapshot is published. Snapshots
//! replace each other wholesale (last write wins); observers never see a
//! partial update. Backends use feeds to push query results, and the session
//! layer uses them to expose its derived state.

use tokio::sync::watch;

/// The publishing side: owns the latest snapshot.
#[derive(Debug)]
pub struct Feed<T> {
  tx: watch::Sender<T>,
}

impl<T> Feed<T> {
  pub fn new(initial: T) -> Self {
    let (tx, _) = watch::channel(initial);
    Self { tx }
  }

  /// Replace the snapshot and wake every live subscription.
  pub fn publish(&self, value: T) { self.tx.send_replace(value); }

  /// Register a new observer. The current snapshot counts as already seen;
  /// read it with [`Subscription::snapshot`].
  pub fn subscribe(&self) -> Subscription<T> {
    Subscription { rx: Some(self.tx.subscribe()) }
  }

  /// Number of subscriptions that have not been released.
  pub fn listeners(&self) -> usize { self.tx.receiver_count() }

  /// Mutate the snapshot in place and notify observers.
  pub fn update(&self, f: impl FnOnce(&mut T)) { self.tx.send_modify(f); }
}

impl<T: Clone> Feed<T> {
  pub fn latest(&self) -> T { self.tx.borrow().clone() }
}

impl<T: Default> Default for Feed<T> {
  fn default() -> Self { Self::new(T::default()) }
}

/// A releasable registration on a [`Feed`].
///
/// Dropping a subscription releases it.
#[derive(Debug)]
pub struct Subscription<T> {
  rx: Option<watch::Receiver<T>>,
}

impl<T: Clone> Subscription<T> {
  /// The current snapshot, or `None` once released.
  pub fn snapshot(&mut self) -> Option<T> {
    self.rx.as_mut().map(|rx| rx.borrow_and_update().clone())
  }

  /// Wait for the next published snapshot.
  ///
  /// Resolves to `None` immediately if the subscription was released, and
  /// once the feed itself has been dropped.
  pub async fn next(&mut self) -> Option<T> {
    let rx = self.rx.as_mut()?;
    rx.changed().await.ok()?;
    Some(rx.borrow_and_update().clone())
  }
}

impl<T> Subscription<T> {
  /// Stop receiving updates. Idempotent.
  pub fn release(&mut self) { self.rx = None; }

  pub fn is_released(&self) -> bool { self.rx.is_none() }
}
