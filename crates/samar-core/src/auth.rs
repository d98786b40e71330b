//! Authentication failure taxonomy.
//!
//! Identity providers report failures as string codes (`auth/wrong-password`
//! and friends). [`AuthErrorKind`] parses those codes into a closed set, and
//! each kind carries a message that can be shown to the user as-is.

use std::str::FromStr as _;

use strum::EnumString;
use thiserror::Error;

/// Provider-defined failure codes, parsed from their wire form.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
pub enum AuthErrorKind {
  #[strum(serialize = "auth/user-not-found")]
  UserNotFound,
  #[strum(serialize = "auth/wrong-password")]
  WrongPassword,
  #[strum(serialize = "auth/invalid-email")]
  InvalidEmail,
  #[strum(serialize = "auth/email-already-in-use")]
  EmailAlreadyInUse,
  #[strum(serialize = "auth/weak-password")]
  WeakPassword,
  #[strum(serialize = "auth/too-many-requests")]
  TooManyRequests,
  #[strum(serialize = "auth/popup-closed-by-user")]
  PopupClosed,
  #[strum(serialize = "auth/popup-blocked")]
  PopupBlocked,
  #[strum(serialize = "auth/cancelled-popup-request")]
  PopupCancelled,
  #[strum(serialize = "auth/network-request-failed")]
  Network,
  #[strum(serialize = "auth/internal-error")]
  Internal,
  #[strum(serialize = "auth/invalid-api-key")]
  InvalidApiKey,
  #[strum(serialize = "auth/app-not-authorized")]
  AppNotAuthorized,
  /// Any code this client does not know about.
  #[strum(default)]
  Other(String),
}

impl AuthErrorKind {
  /// Parse a provider code. Unknown codes become [`AuthErrorKind::Other`].
  pub fn from_code(code: &str) -> Self {
    // `strum(default)` makes parsing infallible.
    Self::from_str(code).unwrap_or_else(|_| Self::Other(code.to_owned()))
  }

  /// The provider code this kind was parsed from.
  pub fn code(&self) -> &str {
    match self {
      Self::UserNotFound => "auth/user-not-found",
      Self::WrongPassword => "auth/wrong-password",
      Self::InvalidEmail => "auth/invalid-email",
      Self::EmailAlreadyInUse => "auth/email-already-in-use",
      Self::WeakPassword => "auth/weak-password",
      Self::TooManyRequests => "auth/too-many-requests",
      Self::PopupClosed => "auth/popup-closed-by-user",
      Self::PopupBlocked => "auth/popup-blocked",
      Self::PopupCancelled => "auth/cancelled-popup-request",
      Self::Network => "auth/network-request-failed",
      Self::Internal => "auth/internal-error",
      Self::InvalidApiKey => "auth/invalid-api-key",
      Self::AppNotAuthorized => "auth/app-not-authorized",
      Self::Other(code) => code,
    }
  }

  /// A message suitable for direct display next to a sign-in form.
  pub fn user_message(&self) -> &'static str {
    match self {
      Self::UserNotFound => "No account exists for this email",
      Self::WrongPassword => "Incorrect password",
      Self::InvalidEmail => "The email address is not valid",
      Self::EmailAlreadyInUse => "This email is already registered",
      Self::WeakPassword => "The password is too weak",
      Self::TooManyRequests => "Too many attempts, try again later",
      Self::PopupClosed => "The sign-in window was closed",
      Self::PopupBlocked => {
        "The browser blocked the sign-in window; allow popups and retry"
      }
      Self::PopupCancelled => "The sign-in request was cancelled",
      Self::Network => "Network error, check your connection",
      Self::Internal => "Internal error, try again",
      Self::InvalidApiKey => "The identity provider is misconfigured",
      Self::AppNotAuthorized => {
        "This application is not authorised to use federated sign-in"
      }
      Self::Other(_) => "Sign-in failed",
    }
  }
}

/// A failed identity-provider call.
#[derive(Debug, Clone, Error)]
#[error("{} ({})", .kind.user_message(), .kind.code())]
pub struct AuthError {
  pub kind:   AuthErrorKind,
  /// Provider-specific detail, for logs only.
  pub detail: Option<String>,
}

impl AuthError {
  pub fn new(kind: AuthErrorKind) -> Self { Self { kind, detail: None } }

  pub fn with_detail(kind: AuthErrorKind, detail: impl Into<String>) -> Self {
    Self { kind, detail: Some(detail.into()) }
  }

  /// Build from a raw provider code.
  pub fn from_code(code: &str) -> Self { Self::new(AuthErrorKind::from_code(code)) }
}

impl From<AuthErrorKind> for AuthError {
  fn from(kind: AuthErrorKind) -> Self { Self::new(kind) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_codes_round_trip() {
    for code in [
      "auth/user-not-found",
      "auth/wrong-password",
      "auth/email-already-in-use",
      "auth/popup-closed-by-user",
      "auth/network-request-failed",
    ] {
      assert_eq!(AuthErrorKind::from_code(code).code(), code);
    }
  }

  #[test]
  fn unknown_code_is_kept_verbatim() {
    let kind = AuthErrorKind::from_code("auth/quota-exceeded");
    assert_eq!(kind, AuthErrorKind::Other("auth/quota-exceeded".into()));
    assert_eq!(kind.code(), "auth/quota-exceeded");
    assert_eq!(kind.user_message(), "Sign-in failed");
  }

  #[test]
  fn display_includes_message_and_code() {
    let err = AuthError::from_code("auth/wrong-password");
    assert_eq!(err.to_string(), "Incorrect password (auth/wrong-password)");
  }
}
