//! Profile records — persisted per-identity metadata.
//!
//! One [`ProfileRecord`] exists per identity that has ever signed in. Records
//! are written whole with [`NewProfile`] (overwrite) or partially with
//! [`ProfilePatch`] (merge); they are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::identity::UserId;

// ─── Record ──────────────────────────────────────────────────────────────────

/// A stored profile document, keyed by [`UserId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
  pub user_id:      UserId,
  pub email:        String,
  pub display_name: String,
  /// A URL or an inline `data:` URL; empty when unset.
  pub avatar_url:   String,
  /// Free-form presence text, emoji-prefixed by convention.
  pub status:       String,
  pub is_online:    bool,
  pub last_seen:    DateTime<Utc>,
  /// Server-assigned on first write; never changes afterwards.
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl ProfileRecord {
  /// Placeholder records (e.g. created by a presence merge before the full
  /// profile was written) lack a name or an email.
  pub fn is_complete(&self) -> bool {
    !self.user_id.is_empty()
      && !self.display_name.is_empty()
      && !self.email.is_empty()
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Input to [`ChatStore::put_profile`](crate::store::ChatStore::put_profile).
/// Timestamps are always set by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
  pub email:        String,
  pub display_name: String,
  pub avatar_url:   String,
  pub status:       String,
  pub is_online:    bool,
}

/// Input to [`ChatStore::merge_profile`](crate::store::ChatStore::merge_profile).
///
/// `None` fields are left untouched. `updated_at` is always refreshed;
/// `last_seen` only when `touch_last_seen` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
  pub email:           Option<String>,
  pub display_name:    Option<String>,
  pub avatar_url:      Option<String>,
  pub status:          Option<String>,
  pub is_online:       Option<bool>,
  pub touch_last_seen: bool,
}

impl ProfilePatch {
  /// Volatile presence fields only: `is_online` and `last_seen`.
  pub fn presence(online: bool) -> Self {
    Self { is_online: Some(online), touch_last_seen: true, ..Self::default() }
  }

  pub fn status(text: impl Into<String>) -> Self {
    Self { status: Some(text.into()), ..Self::default() }
  }

  pub fn avatar(url: impl Into<String>) -> Self {
    Self { avatar_url: Some(url.into()), ..Self::default() }
  }
}

// ─── Status presets ──────────────────────────────────────────────────────────

/// Quick-pick presence states offered next to the free-form status editor.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter,
  EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusPreset {
  Available,
  Busy,
  Unavailable,
  Sleeping,
}

impl StatusPreset {
  pub fn emoji(self) -> &'static str {
    match self {
      Self::Available => "😊",
      Self::Busy => "🟡",
      Self::Unavailable => "🔴",
      Self::Sleeping => "😴",
    }
  }

  /// Status text for this preset with the given localised label.
  pub fn render(self, label: &str) -> String {
    format!("{} {label}", self.emoji())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use strum::IntoEnumIterator as _;

  use super::*;

  fn record(name: &str, email: &str) -> ProfileRecord {
    let now = Utc::now();
    ProfileRecord {
      user_id:      UserId::new("u1"),
      email:        email.into(),
      display_name: name.into(),
      avatar_url:   String::new(),
      status:       String::new(),
      is_online:    false,
      last_seen:    now,
      created_at:   now,
      updated_at:   now,
    }
  }

  #[test]
  fn placeholder_records_are_incomplete() {
    assert!(record("Mona", "mona@example.com").is_complete());
    assert!(!record("", "mona@example.com").is_complete());
    assert!(!record("Mona", "").is_complete());
  }

  #[test]
  fn presets_render_emoji_first() {
    assert_eq!(StatusPreset::Available.render("متاح"), "😊 متاح");
    assert_eq!(StatusPreset::Sleeping.render("asleep"), "😴 asleep");
    assert_eq!(StatusPreset::iter().count(), 4);
  }

  #[test]
  fn preset_names_are_lowercase() {
    let name: &'static str = StatusPreset::Unavailable.into();
    assert_eq!(name, "unavailable");
    assert_eq!(
      serde_json::to_string(&StatusPreset::Busy).unwrap(),
      "\"busy\""
    );
    assert_eq!("sleeping".parse::<StatusPreset>().unwrap(), StatusPreset::Sleeping);
    assert!("asleep".parse::<StatusPreset>().is_err());
  }
}
