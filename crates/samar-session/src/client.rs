//! [`Client`]: sign-in orchestration around a [`Session`].

use std::sync::Arc;

use samar_core::{
  feed::Subscription,
  identity::{FederatedCredential, Identity, UserId},
  store::{BlobStore, ChatStore, IdentityProvider},
};
use tracing::{info, warn};

use crate::{
  Error, Result, SessionConfig, ValidationError,
  session::{Session, SessionEvent},
};

/// What a call to [`Client::pump`] changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
  /// A session was opened for this identity.
  SignedIn(Identity),
  /// The provider reported no identity; the session was torn down.
  SignedOut,
  Session(SessionEvent),
}

enum Wake {
  Identity(Option<Identity>),
  Session(SessionEvent),
}

async fn pump_session<S, B>(session: Option<&mut Session<S, B>>) -> Option<SessionEvent>
where
  S: ChatStore,
  B: BlobStore,
{
  session?.pump().await
}

/// Follows the identity provider and owns the session of whoever is signed
/// in.
pub struct Client<S, B, I> {
  store:    Arc<S>,
  blobs:    Arc<B>,
  provider: Arc<I>,
  config:   Arc<SessionConfig>,

  identity_sub: Subscription<Option<Identity>>,
  /// Pushed identity whose session is not open yet.
  pending:      Option<Identity>,
  /// Identity whose session failed to open; its pushes are ignored until
  /// the identity changes.
  failed:       Option<UserId>,
  session:      Option<Session<S, B>>,
}

impl<S, B, I> Client<S, B, I>
where
  S: ChatStore,
  B: BlobStore,
  I: IdentityProvider,
{
  pub fn new(store: Arc<S>, blobs: Arc<B>, provider: Arc<I>, config: SessionConfig) -> Self {
    let identity_sub = provider.current_identity();
    Self {
      store,
      blobs,
      provider,
      config: Arc::new(config),
      identity_sub,
      pending: None,
      failed: None,
      session: None,
    }
  }

  pub fn session(&self) -> Option<&Session<S, B>> { self.session.as_ref() }

  pub fn session_mut(&mut self) -> Option<&mut Session<S, B>> { self.session.as_mut() }

  /// The open session, or [`Error::SignedOut`].
  pub fn require_session(&mut self) -> Result<&mut Session<S, B>> {
    self.session.as_mut().ok_or(Error::SignedOut)
  }

  /// Open a session for an identity the provider already remembers.
  pub async fn resume(&mut self) -> Result<Option<Identity>> {
    let Some(identity) = self.identity_sub.snapshot().flatten() else {
      return Ok(None);
    };
    if let Err(e) = self.open_session(identity.clone()).await {
      self.failed = Some(identity.id);
      return Err(e);
    }
    Ok(Some(identity))
  }

  // ── Sign-in ───────────────────────────────────────────────────────────────

  pub async fn sign_in_email(&mut self, email: &str, password: &str) -> Result<Identity> {
    let email = email.trim();
    if email.is_empty() {
      return Err(ValidationError::EmptyEmail.into());
    }
    if password.is_empty() {
      return Err(ValidationError::EmptyPassword.into());
    }

    let identity = self.provider.sign_in_email(email, password).await?;
    self.open_or_abandon(identity).await
  }

  pub async fn sign_up_email(
    &mut self,
    email: &str,
    password: &str,
    display_name: &str,
  ) -> Result<Identity> {
    let email = email.trim();
    let display_name = display_name.trim();
    if display_name.is_empty() {
      return Err(ValidationError::EmptyDisplayName.into());
    }
    if email.is_empty() {
      return Err(ValidationError::EmptyEmail.into());
    }
    if password.is_empty() {
      return Err(ValidationError::EmptyPassword.into());
    }
    if password.chars().count() < self.config.min_password_len {
      return Err(ValidationError::PasswordTooShort(self.config.min_password_len).into());
    }

    let identity = self
      .provider
      .sign_up_email(email, password, display_name)
      .await?;
    self.open_or_abandon(identity).await
  }

  pub async fn sign_in_federated(&mut self, credential: FederatedCredential) -> Result<Identity> {
    let identity = self.provider.sign_in_federated(credential).await?;
    self.open_or_abandon(identity).await
  }

  /// Record offline presence, release every handle, then sign out of the
  /// provider.
  pub async fn sign_out(&mut self) -> Result<()> {
    if let Some(session) = self.session.take() {
      session.close().await;
    }
    self.provider.sign_out().await?;
    Ok(())
  }

  /// Open a session for an identity the provider just accepted. If that
  /// fails the provider is signed out again (best-effort), so a failed
  /// sign-in leaves nothing behind to resume or retry.
  async fn open_or_abandon(&mut self, identity: Identity) -> Result<Identity> {
    match self.open_session(identity.clone()).await {
      Ok(()) => Ok(identity),
      Err(e) => {
        self.abandon(&identity.id).await;
        Err(e)
      }
    }
  }

  async fn abandon(&mut self, user: &UserId) {
    warn!(%user, "session failed to open; signing out");
    self.failed = Some(user.clone());
    if let Err(e) = self.provider.sign_out().await {
      warn!(error = %e, %user, "failed to sign out after a failed sign-in");
    }
  }

  /// Open a session for `identity` unless one is already open for it.
  async fn open_session(&mut self, identity: Identity) -> Result<()> {
    if self
      .session
      .as_ref()
      .is_some_and(|s| s.identity().id == identity.id)
    {
      return Ok(());
    }
    if let Some(previous) = self.session.take() {
      previous.close().await;
    }

    let session = Session::open(
      self.store.clone(),
      self.blobs.clone(),
      self.config.clone(),
      identity,
    )
    .await?;
    self.failed = None;
    self.session = Some(session);
    Ok(())
  }

  // ── Pushes ────────────────────────────────────────────────────────────────

  /// Wait for the next identity change or session push and apply it.
  ///
  /// Identity pushes that change nothing are absorbed, as are pushes of an
  /// identity whose session already failed to open. Returns `Ok(None)` once
  /// neither the provider nor a session has anything left to deliver.
  /// Cancel-safe: an identity whose session was still opening when the
  /// future was dropped is picked up again by the next call.
  pub async fn pump(&mut self) -> Result<Option<ClientEvent>> {
    loop {
      if let Some(identity) = self.pending.clone() {
        let opened = self.open_session(identity.clone()).await;
        self.pending = None;
        if let Err(e) = opened {
          self.abandon(&identity.id).await;
          return Err(e);
        }
        return Ok(Some(ClientEvent::SignedIn(identity)));
      }

      let wake = tokio::select! {
        Some(identity) = self.identity_sub.next() => Wake::Identity(identity),
        Some(event) = pump_session(self.session.as_mut()) => Wake::Session(event),
        else => return Ok(None),
      };

      match wake {
        Wake::Session(event) => return Ok(Some(ClientEvent::Session(event))),
        Wake::Identity(Some(identity)) => {
          if self
            .session
            .as_ref()
            .is_some_and(|s| s.identity().id == identity.id)
          {
            continue;
          }
          if self.failed.as_ref() == Some(&identity.id) {
            continue;
          }
          info!(user = %identity.id, "identity changed; opening session");
          self.pending = Some(identity);
        }
        Wake::Identity(None) => {
          self.pending = None;
          self.failed = None;
          let Some(mut session) = self.session.take() else {
            continue;
          };
          info!(user = %session.identity().id, "signed out by provider; closing session");
          session.release_all();
          return Ok(Some(ClientEvent::SignedOut));
        }
      }
    }
  }
}
