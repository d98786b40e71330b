//! [`BlobStore`] implementation: binary objects stored in the `blobs` table.
//!
//! URLs have the form `blob://<path>`. URLs with any other scheme belong to
//! some other storage and are ignored by [`BlobStore::delete`].

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use samar_core::store::BlobStore;
use sha2::{Digest, Sha256};

use crate::{
  Result, SqliteStore,
  encode::{decode_dt, encode_dt},
};

const SCHEME: &str = "blob://";

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
  pub path:         String,
  pub media_type:   String,
  /// SHA-256 hex digest of `bytes`.
  pub content_hash: String,
  pub bytes:        Vec<u8>,
  pub created_at:   DateTime<Utc>,
}

fn path_of(url: &str) -> Option<&str> { url.strip_prefix(SCHEME) }

impl SqliteStore {
  /// Fetch the object behind a `blob://` URL.
  pub async fn read_blob(&self, url: &str) -> Result<Option<Blob>> {
    let Some(path) = path_of(url).map(str::to_owned) else {
      return Ok(None);
    };

    let raw: Option<(String, String, String, Vec<u8>, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT path, media_type, content_hash, bytes, created_at
               FROM blobs WHERE path = ?1",
              rusqlite::params![path],
              |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(path, media_type, content_hash, bytes, created_at)| {
        Ok(Blob {
          path,
          media_type,
          content_hash,
          bytes,
          created_at: decode_dt(&created_at)?,
        })
      })
      .transpose()
  }
}

impl BlobStore for SqliteStore {
  type Error = crate::Error;

  async fn upload(
    &self,
    path: &str,
    media_type: &str,
    bytes: &[u8],
  ) -> Result<String> {
    let content_hash = hex::encode(Sha256::digest(bytes));
    let path_str     = path.to_owned();
    let media_type   = media_type.to_owned();
    let bytes        = bytes.to_vec();
    let at_str       = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO blobs (path, media_type, content_hash, bytes, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (path) DO UPDATE SET
             media_type   = excluded.media_type,
             content_hash = excluded.content_hash,
             bytes        = excluded.bytes,
             created_at   = excluded.created_at",
          rusqlite::params![path_str, media_type, content_hash, bytes, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(format!("{SCHEME}{path}"))
  }

  async fn delete(&self, url: &str) -> Result<()> {
    let Some(path) = path_of(url).map(str::to_owned) else {
      return Ok(());
    };

    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM blobs WHERE path = ?1", rusqlite::params![path])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
