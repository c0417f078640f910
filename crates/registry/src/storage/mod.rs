//! Filesystem object store with signed view URLs.
//!
//! Objects live under a root directory at their [`PhotoPath`]. Nothing is
//! served without a signature: a view URL carries an expiry and an
//! HMAC-SHA256 over path and expiry, checked by [`FsObjectStore::verify`].
//!
//! ```text
//! {base}/photos/{owner}/{file}?expires={unix}&signature={hex}
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

use badge_core::PhotoPath;

use crate::services::{ObjectStore, StorageError, UploadOptions};

type HmacSha256 = Hmac<Sha256>;

/// URL prefix under which signed objects are served.
pub const PHOTOS_PREFIX: &str = "photos";

/// Why a signed URL was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signed URL has expired")]
    Expired,
    #[error("signature mismatch")]
    Invalid,
}

/// Private object storage on the local filesystem.
pub struct FsObjectStore {
    root: PathBuf,
    base_url: Url,
    signing_key: SecretString,
}

impl std::fmt::Debug for FsObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsObjectStore")
            .field("root", &self.root)
            .field("base_url", &self.base_url.as_str())
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

impl FsObjectStore {
    /// Create a store rooted at `root`, signing URLs under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute URL.
    pub fn new(
        root: impl Into<PathBuf>,
        base_url: &str,
        signing_key: SecretString,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            root: root.into(),
            base_url: Url::parse(base_url)?,
            signing_key,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, path: &PhotoPath) -> PathBuf {
        // PhotoPath is relative with no dot segments.
        self.root.join(path.as_str())
    }

    fn signature(&self, path: &PhotoPath, expires: i64) -> Result<String, StorageError> {
        let mut mac = HmacSha256::new_from_slice(self.signing_key.expose_secret().as_bytes())
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        mac.update(path.as_str().as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Build a view URL that expires at `expires` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Backend` if the base URL cannot hold a path.
    pub fn signed_url(&self, path: &PhotoPath, expires: i64) -> Result<String, StorageError> {
        let signature = self.signature(path, expires)?;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StorageError::Backend("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(PHOTOS_PREFIX)
            .extend(path.as_str().split('/'));
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &signature);

        Ok(url.into())
    }

    /// Check a signature presented with a view request at time `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] if the URL expired or was not issued here.
    pub fn verify(
        &self,
        path: &PhotoPath,
        expires: i64,
        signature: &str,
        now: i64,
    ) -> Result<(), SignatureError> {
        if now >= expires {
            return Err(SignatureError::Expired);
        }
        let expected = self
            .signature(path, expires)
            .map_err(|_| SignatureError::Invalid)?;
        if !constant_time_compare(&expected, signature) {
            return Err(SignatureError::Invalid);
        }
        Ok(())
    }

    /// Read a stored object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if nothing is stored at `path`.
    pub async fn read(&self, path: &PhotoPath) -> Result<Vec<u8>, StorageError> {
        tokio::fs::read(self.object_path(path))
            .await
            .map_err(|e| not_found_or(e, path))
    }
}

fn not_found_or(err: std::io::Error, path: &PhotoPath) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(path.clone())
    } else {
        StorageError::Io(err)
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

impl ObjectStore for FsObjectStore {
    async fn upload(
        &self,
        path: &PhotoPath,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> Result<(), StorageError> {
        let target = self.object_path(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut open = tokio::fs::OpenOptions::new();
        open.write(true);
        if options.overwrite {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }

        let mut file = open.open(&target).await.map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                StorageError::AlreadyExists(path.clone())
            } else {
                StorageError::Io(e)
            }
        })?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        tracing::debug!(
            photo_path = %path,
            bytes = bytes.len(),
            content_type = options.content_type,
            "object stored"
        );
        Ok(())
    }

    async fn sign_view(&self, path: &PhotoPath, ttl: Duration) -> Result<String, StorageError> {
        if !tokio::fs::try_exists(self.object_path(path)).await? {
            return Err(StorageError::NotFound(path.clone()));
        }
        let ttl = i64::try_from(ttl.as_secs())
            .map_err(|_| StorageError::Backend("signing TTL too large".to_string()))?;
        self.signed_url(path, chrono::Utc::now().timestamp() + ttl)
    }

    async fn remove(&self, path: &PhotoPath) -> Result<(), StorageError> {
        tokio::fs::remove_file(self.object_path(path))
            .await
            .map_err(|e| not_found_or(e, path))?;
        tracing::debug!(photo_path = %path, "object removed");
        Ok(())
    }
}
