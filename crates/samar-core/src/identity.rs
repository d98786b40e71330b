//! Identity — the authenticated user's stable reference.
//!
//! Identities are issued by an [`IdentityProvider`](crate::store::IdentityProvider)
//! and are immutable for the lifetime of a session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, provider-assigned user id. Also the key of the user's
/// [`ProfileRecord`](crate::profile::ProfileRecord).
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for UserId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for UserId {
  fn from(s: String) -> Self { Self(s) }
}

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:           UserId,
  /// May be empty when the provider knows no name (e.g. fresh email sign-up
  /// without a display name).
  pub display_name: String,
  /// Empty when the provider has no avatar for the user.
  pub avatar_url:   String,
  pub email:        String,
}

/// A sign-in assertion already verified by an external (federated) provider,
/// e.g. the result of an OAuth popup flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedCredential {
  /// Provider name, e.g. `"google.com"`.
  pub provider:     String,
  /// The provider's stable subject id for the user.
  pub subject:      String,
  pub email:        String,
  pub display_name: String,
  pub avatar_url:   String,
}
