//! Error types for `samar-session`.

use samar_core::auth::AuthError;
use thiserror::Error;

/// Input rejected before any collaborator is called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("email is required")]
  EmptyEmail,

  #[error("password is required")]
  EmptyPassword,

  #[error("display name is required")]
  EmptyDisplayName,

  #[error("password must be at least {0} characters")]
  PasswordTooShort(usize),

  #[error("unsupported image type {0:?}")]
  ImageType(String),

  #[error("image is {size} bytes, larger than the {limit} byte limit")]
  ImageTooLarge { size: usize, limit: usize },
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Auth(#[from] AuthError),

  #[error(transparent)]
  Core(#[from] samar_core::Error),

  /// The operation needs a signed-in session.
  #[error("not signed in")]
  SignedOut,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
