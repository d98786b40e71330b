//! Avatar validation and encoding.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use samar_core::identity::UserId;

use crate::{config::AvatarPolicy, error::ValidationError};

/// An image picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarUpload {
  pub file_name:  String,
  pub media_type: String,
  pub bytes:      Vec<u8>,
}

/// Check type and size against `policy`. Runs before any store call.
pub fn validate(policy: &AvatarPolicy, upload: &AvatarUpload) -> Result<(), ValidationError> {
  if !policy.allows(&upload.media_type) {
    return Err(ValidationError::ImageType(upload.media_type.clone()));
  }
  if upload.bytes.len() > policy.max_bytes {
    return Err(ValidationError::ImageTooLarge {
      size:  upload.bytes.len(),
      limit: policy.max_bytes,
    });
  }
  Ok(())
}

/// Inline form: `data:<type>;base64,<payload>`.
pub fn data_url(upload: &AvatarUpload) -> String {
  format!(
    "data:{};base64,{}",
    upload.media_type.trim().to_ascii_lowercase(),
    STANDARD.encode(&upload.bytes)
  )
}

/// Blob path for an upload: `profile-images/<uid>/<millis>_<file name>`.
pub fn blob_path(user: &UserId, at: DateTime<Utc>, file_name: &str) -> String {
  let file_name: String = file_name
    .chars()
    .map(|c| if c == '/' || c == '\\' { '_' } else { c })
    .collect();
  format!("profile-images/{user}/{}_{file_name}", at.timestamp_millis())
}

/// Whether `url` points at something a blob store may own.
pub(crate) fn is_stored(url: &str) -> bool { !url.is_empty() && !url.starts_with("data:") }

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  fn upload(media_type: &str, len: usize) -> AvatarUpload {
    AvatarUpload {
      file_name:  "me.png".into(),
      media_type: media_type.into(),
      bytes:      vec![7; len],
    }
  }

  #[test]
  fn rejects_wrong_type_and_oversize() {
    let policy = AvatarPolicy { max_bytes: 10, ..AvatarPolicy::default() };
    assert_eq!(
      validate(&policy, &upload("image/svg+xml", 1)),
      Err(ValidationError::ImageType("image/svg+xml".into()))
    );
    assert_eq!(
      validate(&policy, &upload("image/png", 11)),
      Err(ValidationError::ImageTooLarge { size: 11, limit: 10 })
    );
    assert_eq!(validate(&policy, &upload("image/png", 10)), Ok(()));
  }

  #[test]
  fn data_url_is_base64() {
    let url = data_url(&AvatarUpload {
      file_name:  "a.gif".into(),
      media_type: "Image/GIF".into(),
      bytes:      b"GIF89a".to_vec(),
    });
    assert_eq!(url, "data:image/gif;base64,R0lGODlh");
  }

  #[test]
  fn blob_path_is_scoped_per_user() {
    let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
    assert_eq!(
      blob_path(&UserId::new("u1"), at, "../me/pic.png"),
      "profile-images/u1/1700000000123_.._me_pic.png"
    );
  }

  #[test]
  fn inline_urls_are_not_stored_blobs() {
    assert!(!is_stored(""));
    assert!(!is_stored("data:image/png;base64,AA=="));
    assert!(is_stored("blob://profile-images/u1/1_me.png"));
  }
}
