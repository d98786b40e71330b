//! Profile self-repair.

use samar_core::{
  identity::Identity,
  profile::{NewProfile, ProfilePatch, ProfileRecord},
  store::ChatStore,
};
use tracing::{info, warn};

use crate::{Error, Result, SessionConfig};

/// Make sure `identity` has a profile and mark it online.
///
/// An existing record only gets its presence fields touched. A missing one
/// (or one that cannot be read) is written whole, with the configured
/// default status and the identity's own name and avatar.
pub async fn repair_profile<S: ChatStore>(
  store: &S,
  identity: &Identity,
  config: &SessionConfig,
) -> Result<ProfileRecord> {
  let existing = match store.get_profile(&identity.id).await {
    Ok(existing) => existing,
    Err(e) => {
      warn!(error = %e, user = %identity.id, "profile read failed; recreating");
      None
    }
  };

  let record = match existing {
    Some(_) => store.merge_profile(&identity.id, ProfilePatch::presence(true)).await,
    None => {
      info!(user = %identity.id, "creating missing profile");
      store.put_profile(&identity.id, new_profile(identity, config)).await
    }
  };
  record.map_err(Error::store)
}

fn new_profile(identity: &Identity, config: &SessionConfig) -> NewProfile {
  let display_name = identity.display_name.trim();
  NewProfile {
    email:        identity.email.clone(),
    display_name: if display_name.is_empty() {
      config.default_display_name.clone()
    } else {
      display_name.to_owned()
    },
    avatar_url:   identity.avatar_url.clone(),
    status:       config.default_status.clone(),
    is_online:    true,
  }
}
