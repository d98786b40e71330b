//! [`IdentityProvider`] implementation: local accounts.
//!
//! Email/password accounts keep an argon2 PHC string. Federated accounts are
//! keyed by `(provider, subject)` and trust the caller to have verified the
//! assertion. The signed-in account survives restarts via `auth_session`.

use argon2::{
  PasswordHash, PasswordHasher as _, PasswordVerifier as _,
  password_hash::SaltString,
};
use chrono::Utc;
use rand_core::OsRng;
use rusqlite::OptionalExtension as _;
use samar_core::{
  auth::{AuthError, AuthErrorKind},
  feed::Subscription,
  identity::{FederatedCredential, Identity, UserId},
  store::IdentityProvider,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Result, SqliteStore,
  encode::{ACCOUNT_COLUMNS, RawAccount, encode_dt},
};

/// `accounts.provider` value for email/password accounts.
const PASSWORD_PROVIDER: &str = "password";

/// Shortest password accepted at sign-up, in characters.
const MIN_PASSWORD_LEN: usize = 6;

fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

fn is_valid_email(email: &str) -> bool {
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && domain.contains('.')
    && !domain.starts_with('.')
    && !domain.ends_with('.')
    && !email.chars().any(char::is_whitespace)
}

/// Storage failures surface to the user as a generic internal error.
fn internal(e: impl std::fmt::Display) -> AuthError {
  warn!(error = %e, "identity provider storage failure");
  AuthError::with_detail(AuthErrorKind::Internal, e.to_string())
}

impl SqliteStore {
  /// Load the persisted signed-in account, if any, into the identity feed.
  pub(crate) async fn restore_identity(&self) -> Result<()> {
    let raw: Option<RawAccount> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT a.user_id, a.email, a.display_name, a.avatar_url
               FROM auth_session s
               JOIN accounts a ON a.user_id = s.user_id
               WHERE s.slot = 0",
              [],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    self.feeds.identity.publish(raw.map(RawAccount::into_identity));
    Ok(())
  }

  async fn start_auth_session(
    &self,
    identity: Identity,
  ) -> Result<Identity, AuthError> {
    let id_str = identity.id.as_str().to_owned();
    let now    = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO auth_session (slot, user_id, started_at) VALUES (0, ?1, ?2)
           ON CONFLICT (slot) DO UPDATE SET
             user_id    = excluded.user_id,
             started_at = excluded.started_at",
          rusqlite::params![id_str, now],
        )?;
        Ok(())
      })
      .await
      .map_err(internal)?;

    info!(user = %identity.id, "signed in");
    self.feeds.identity.publish(Some(identity.clone()));
    Ok(identity)
  }

  async fn hash_password(&self, password: String) -> Result<String, AuthError> {
    let hasher = self.hasher.clone();
    tokio::task::spawn_blocking(move || {
      let salt = SaltString::generate(&mut OsRng);
      hasher
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
    })
    .await
    .map_err(internal)?
    .map_err(internal)
  }

  async fn verify_password(
    &self,
    password: String,
    phc: String,
  ) -> Result<bool, AuthError> {
    let hasher = self.hasher.clone();
    tokio::task::spawn_blocking(move || {
      let parsed = PasswordHash::new(&phc)?;
      Ok::<_, argon2::password_hash::Error>(
        hasher.verify_password(password.as_bytes(), &parsed).is_ok(),
      )
    })
    .await
    .map_err(internal)?
    .map_err(internal)
  }
}

impl IdentityProvider for SqliteStore {
  fn current_identity(&self) -> Subscription<Option<Identity>> {
    self.feeds.identity.subscribe()
  }

  async fn sign_in_email(
    &self,
    email: &str,
    password: &str,
  ) -> Result<Identity, AuthError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
      return Err(AuthErrorKind::InvalidEmail.into());
    }

    let row: Option<(RawAccount, Option<String>)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ACCOUNT_COLUMNS}, password_hash FROM accounts
                 WHERE provider = ?1 AND email = ?2"
              ),
              rusqlite::params![PASSWORD_PROVIDER, email],
              |row| Ok((RawAccount::from_row(row)?, row.get(4)?)),
            )
            .optional()?,
        )
      })
      .await
      .map_err(internal)?;

    let (account, phc) = row.ok_or(AuthError::new(AuthErrorKind::UserNotFound))?;
    let phc = phc.ok_or(AuthError::new(AuthErrorKind::WrongPassword))?;
    if !self.verify_password(password.to_owned(), phc).await? {
      return Err(AuthErrorKind::WrongPassword.into());
    }

    self.start_auth_session(account.into_identity()).await
  }

  async fn sign_in_federated(
    &self,
    credential: FederatedCredential,
  ) -> Result<Identity, AuthError> {
    if credential.provider.is_empty()
      || credential.subject.is_empty()
      || credential.provider == PASSWORD_PROVIDER
    {
      return Err(AuthError::with_detail(
        AuthErrorKind::from_code("auth/invalid-credential"),
        format!("unusable federated provider {:?}", credential.provider),
      ));
    }

    let new_id = Uuid::new_v4().simple().to_string();
    let now    = encode_dt(Utc::now());
    let email  = normalize_email(&credential.email);

    let account: RawAccount = self
      .conn
      .call(move |conn| {
        let existing: Option<String> = conn
          .query_row(
            "SELECT user_id FROM accounts
             WHERE provider = ?1 AND provider_subject = ?2",
            rusqlite::params![credential.provider, credential.subject],
            |row| row.get(0),
          )
          .optional()?;

        let user_id = match existing {
          Some(user_id) => {
            // Claims from the provider are authoritative; refresh them.
            conn.execute(
              "UPDATE accounts SET email = ?2, display_name = ?3, avatar_url = ?4
               WHERE user_id = ?1",
              rusqlite::params![
                user_id,
                email,
                credential.display_name,
                credential.avatar_url,
              ],
            )?;
            user_id
          }
          None => {
            conn.execute(
              "INSERT INTO accounts (
                 user_id, email, display_name, avatar_url,
                 provider, provider_subject, created_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
              rusqlite::params![
                new_id,
                email,
                credential.display_name,
                credential.avatar_url,
                credential.provider,
                credential.subject,
                now,
              ],
            )?;
            new_id
          }
        };

        Ok(conn.query_row(
          &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = ?1"),
          rusqlite::params![user_id],
          RawAccount::from_row,
        )?)
      })
      .await
      .map_err(internal)?;

    self.start_auth_session(account.into_identity()).await
  }

  async fn sign_up_email(
    &self,
    email: &str,
    password: &str,
    display_name: &str,
  ) -> Result<Identity, AuthError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
      return Err(AuthErrorKind::InvalidEmail.into());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
      return Err(AuthErrorKind::WeakPassword.into());
    }

    let phc      = self.hash_password(password.to_owned()).await?;
    let identity = Identity {
      id:           UserId::new(Uuid::new_v4().simple().to_string()),
      display_name: display_name.trim().to_owned(),
      avatar_url:   String::new(),
      email,
    };

    let id_str   = identity.id.as_str().to_owned();
    let email    = identity.email.clone();
    let name     = identity.display_name.clone();
    let now      = encode_dt(Utc::now());

    let created: bool = self
      .conn
      .call(move |conn| {
        let taken = conn
          .query_row(
            "SELECT 1 FROM accounts WHERE provider = ?1 AND email = ?2",
            rusqlite::params![PASSWORD_PROVIDER, email],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(false);
        }

        conn.execute(
          "INSERT INTO accounts (
             user_id, email, display_name, password_hash, provider, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, email, name, phc, PASSWORD_PROVIDER, now],
        )?;
        Ok(true)
      })
      .await
      .map_err(internal)?;

    if !created {
      return Err(AuthErrorKind::EmailAlreadyInUse.into());
    }

    self.start_auth_session(identity).await
  }

  async fn sign_out(&self) -> Result<(), AuthError> {
    self
      .conn
      .call(|conn| {
        conn.execute("DELETE FROM auth_session WHERE slot = 0", [])?;
        Ok(())
      })
      .await
      .map_err(internal)?;

    self.feeds.identity.publish(None);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn email_shape_checks() {
    assert!(is_valid_email("mona@example.com"));
    assert!(!is_valid_email("mona.example.com"));
    assert!(!is_valid_email("@example.com"));
    assert!(!is_valid_email("mona@example"));
    assert!(!is_valid_email("mona@.com"));
    assert!(!is_valid_email("mo na@example.com"));
    assert!(!is_valid_email("a@b@example.com"));
  }

  #[test]
  fn emails_are_normalised() {
    assert_eq!(normalize_email("  Mona@Example.COM "), "mona@example.com");
  }
}
