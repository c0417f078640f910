//! Object storage keys for registration photos.
//!
//! Keys follow `{owner_email}/{timestamp_millis}-{random_hex}.jpg`. They are
//! generated once per submission and never change afterwards.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::email::Email;

/// File extension of every stored photo (the crop engine always emits JPEG).
pub const PHOTO_EXTENSION: &str = "jpg";

/// Errors that can occur when parsing a [`PhotoPath`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhotoPathError {
    /// The key is empty.
    #[error("photo path cannot be empty")]
    Empty,
    /// The key would escape its namespace or is otherwise not a plain relative key.
    #[error("photo path is not a plain relative key: {0}")]
    NotRelative(String),
    /// The key has no owner namespace.
    #[error("photo path must be namespaced by owner: {0}")]
    MissingNamespace(String),
}

/// A storage key for one uploaded photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct PhotoPath(String);

impl PhotoPath {
    /// Build the key for an upload made by `owner` at `timestamp_millis`.
    ///
    /// `suffix` is rendered as lowercase hex without padding.
    #[must_use]
    pub fn generate(owner: &Email, timestamp_millis: i64, suffix: u64) -> Self {
        Self(format!(
            "{owner}/{timestamp_millis}-{suffix:x}.{PHOTO_EXTENSION}"
        ))
    }

    /// Build a fresh key for `owner` from the current time and a random suffix.
    ///
    /// Uniqueness is best-effort; the object store rejects overwrites, so a
    /// collision surfaces as an upload error rather than lost data.
    #[must_use]
    pub fn generate_now(owner: &Email) -> Self {
        let suffix: u64 = rand::rng().random();
        Self::generate(owner, chrono::Utc::now().timestamp_millis(), suffix)
    }

    /// Parse an existing key (e.g. read back from the database or a URL).
    ///
    /// # Errors
    ///
    /// Returns an error for empty keys, absolute keys, keys with `..`,
    /// empty segments or backslashes, and keys without an owner segment.
    pub fn parse(s: &str) -> Result<Self, PhotoPathError> {
        if s.is_empty() {
            return Err(PhotoPathError::Empty);
        }

        if s.contains('\\') || s.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(PhotoPathError::NotRelative(s.to_owned()));
        }

        if !s.contains('/') {
            return Err(PhotoPathError::MissingNamespace(s.to_owned()));
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the owner namespace (the first path segment).
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }

    /// Returns true if this key lives under `owner`'s namespace.
    #[must_use]
    pub fn is_owned_by(&self, owner: &Email) -> bool {
        self.namespace() == owner.as_str()
    }
}

impl fmt::Display for PhotoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PhotoPath {
    type Error = PhotoPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhotoPath> for String {
    fn from(path: PhotoPath) -> Self {
        path.0
    }
}

impl AsRef<str> for PhotoPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PhotoPath {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PhotoPath {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PhotoPath {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
