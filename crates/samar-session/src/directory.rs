//! The "all users" directory used to start new conversations.

use samar_core::{identity::UserId, profile::ProfileRecord};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
  pub user_id:      UserId,
  pub display_name: String,
  pub email:        String,
  pub avatar_url:   String,
  pub status:       String,
  pub is_online:    bool,
}

impl From<ProfileRecord> for DirectoryEntry {
  fn from(p: ProfileRecord) -> Self {
    Self {
      user_id:      p.user_id,
      display_name: p.display_name,
      email:        p.email,
      avatar_url:   p.avatar_url,
      status:       p.status,
      is_online:    p.is_online,
    }
  }
}

/// Everyone but `me`, skipping placeholder records. Store order is kept.
pub fn directory_entries(me: &UserId, profiles: Vec<ProfileRecord>) -> Vec<DirectoryEntry> {
  profiles
    .into_iter()
    .filter(|p| &p.user_id != me && p.is_complete())
    .map(DirectoryEntry::from)
    .collect()
}

/// Entries whose name or email contains `query`, ignoring case. An empty
/// query matches everything.
pub fn filter_directory<'a>(
  entries: &'a [DirectoryEntry],
  query: &str,
) -> Vec<&'a DirectoryEntry> {
  let query = query.trim().to_lowercase();
  entries
    .iter()
    .filter(|e| {
      query.is_empty()
        || e.display_name.to_lowercase().contains(&query)
        || e.email.to_lowercase().contains(&query)
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn profile(id: &str, name: &str, email: &str) -> ProfileRecord {
    let now = Utc::now();
    ProfileRecord {
      user_id:      UserId::new(id),
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
  fn excludes_self_and_placeholders() {
    let entries = directory_entries(&UserId::new("me"), vec![
      profile("me", "Me", "me@x.io"),
      profile("a", "Amy", "amy@x.io"),
      profile("b", "", "b@x.io"),
      profile("c", "Cy", ""),
      profile("", "Ghost", "ghost@x.io"),
    ]);
    let ids: Vec<_> = entries.iter().map(|e| e.user_id.as_str()).collect();
    assert_eq!(ids, ["a"]);
  }

  #[test]
  fn filter_is_case_insensitive_over_name_and_email() {
    let entries = directory_entries(&UserId::new("me"), vec![
      profile("a", "Amy Stone", "amy@x.io"),
      profile("b", "Bashir", "b.STONE@y.io"),
      profile("c", "Cy", "cy@z.io"),
    ]);
    let hits = |q: &str| {
      filter_directory(&entries, q)
        .into_iter()
        .map(|e| e.user_id.as_str().to_owned())
        .collect::<Vec<_>>()
    };
    assert_eq!(hits("stone"), ["a", "b"]);
    assert_eq!(hits("  CY@ "), ["c"]);
    assert_eq!(hits("").len(), 3);
  }
}
