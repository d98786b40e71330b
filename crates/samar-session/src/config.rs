//! Session configuration.
//!
//! Every field has a default, so an empty config section (or none at all)
//! yields a working session. The binary layers a config file and
//! environment variables on top.

use samar_core::profile::StatusPreset;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;

/// Behaviour knobs for [`Session`](crate::Session) and
/// [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  /// Status written into a freshly created profile.
  pub default_status:       String,
  /// Name used when the identity provider knows none.
  pub default_display_name: String,
  /// Shortest password accepted at sign-up, in characters.
  pub min_password_len:     usize,
  pub avatar:               AvatarPolicy,
  pub status_labels:        StatusLabels,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      default_status:       "😊 متاح".into(),
      default_display_name: "مستخدم جديد".into(),
      min_password_len:     6,
      avatar:               AvatarPolicy::default(),
      status_labels:        StatusLabels::default(),
    }
  }
}

impl SessionConfig {
  /// Status text for a quick-pick preset, e.g. `"🟡 مشغول"`.
  pub fn quick_status(&self, preset: StatusPreset) -> String {
    preset.render(self.status_labels.label(preset))
  }

  /// Every preset with its rendered status text, in menu order.
  pub fn quick_statuses(&self) -> Vec<(StatusPreset, String)> {
    StatusPreset::iter()
      .map(|preset| (preset, self.quick_status(preset)))
      .collect()
  }
}

// ─── Avatar ──────────────────────────────────────────────────────────────────

/// Where avatar images end up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarStorage {
  /// Encoded into the profile itself as a `data:` URL.
  #[default]
  Inline,
  /// Uploaded to the blob store; the profile keeps the returned URL.
  Blob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarPolicy {
  pub max_bytes:     usize,
  /// Accepted MIME types, compared case-insensitively.
  pub allowed_types: Vec<String>,
  pub storage:       AvatarStorage,
}

impl Default for AvatarPolicy {
  fn default() -> Self {
    Self {
      max_bytes:     5 * 1024 * 1024,
      allowed_types: ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"]
        .into_iter()
        .map(String::from)
        .collect(),
      storage:       AvatarStorage::Inline,
    }
  }
}

impl AvatarPolicy {
  pub fn allows(&self, media_type: &str) -> bool {
    let media_type = media_type.trim();
    self
      .allowed_types
      .iter()
      .any(|t| t.eq_ignore_ascii_case(media_type))
  }
}

// ─── Status labels ───────────────────────────────────────────────────────────

/// Localised labels for the quick status presets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusLabels {
  pub available:   String,
  pub busy:        String,
  pub unavailable: String,
  pub sleeping:    String,
}

impl Default for StatusLabels {
  fn default() -> Self {
    Self {
      available:   "متاح".into(),
      busy:        "مشغول".into(),
      unavailable: "غير متاح".into(),
      sleeping:    "نائم".into(),
    }
  }
}

impl StatusLabels {
  pub fn label(&self, preset: StatusPreset) -> &str {
    match preset {
      StatusPreset::Available => &self.available,
      StatusPreset::Busy => &self.busy,
      StatusPreset::Unavailable => &self.unavailable,
      StatusPreset::Sleeping => &self.sleeping,
    }
  }
}
