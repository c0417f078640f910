//! Contracts for the external collaborators of the registration pipeline.
//!
//! The pipeline (`crate::page`) is generic over these traits. Bundled
//! implementations live in:
//!
//! - [`identity`] - session-backed identity with one-time login links
//! - `crate::db` - `PostgreSQL` allow-list and registration store
//! - `crate::storage` - filesystem object store with signed view URLs
//!
//! Every method returns a `Send` future so a page can be driven from an axum
//! handler. Errors carry the collaborator's own message; the page shows it
//! verbatim.

pub mod email;
pub mod identity;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use badge_core::{Email, PhotoPath, RegistrationId};

use crate::models::{AllowListEntry, NewRegistration, Registration, RegistrationUpdate};

pub use email::EmailService;
pub use identity::{LinkDelivery, SessionIdentity};

// =============================================================================
// Errors
// =============================================================================

/// Identity/session service failure.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The session could not be read or written.
    #[error("{0}")]
    Session(String),
    /// The login link could not be created or delivered.
    #[error("{0}")]
    LinkDelivery(String),
    /// The address given to `sign_in_with_link` is not a valid email.
    #[error("Invalid email address.")]
    InvalidEmail,
}

/// Allow-list lookup failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AllowListError {
    pub message: String,
}

impl AllowListError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Object storage failure (upload, signing or removal).
#[derive(Debug, Error)]
pub enum StorageError {
    /// Upload refused because the key is taken and overwrite was not allowed.
    #[error("The resource already exists")]
    AlreadyExists(PhotoPath),
    /// No object is stored under the key.
    #[error("Object not found")]
    NotFound(PhotoPath),
    /// Filesystem error from the bundled store.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

/// Persistence failure.
#[derive(Debug, Error)]
pub enum PersistError {
    /// No row matched the id and owner.
    #[error("Registration not found.")]
    NotFound,
    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

// =============================================================================
// Contracts
// =============================================================================

/// Options for [`ObjectStore::upload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_type: &'static str,
    /// When false, an existing object under the key makes the upload fail.
    pub overwrite: bool,
}

/// Identity/session service.
pub trait IdentityProvider: Send + Sync {
    /// Email of the live session, if any. Not yet normalized.
    fn current_email(&self) -> impl Future<Output = Result<Option<String>, IdentityError>> + Send;

    /// Dispatch a one-time login link that lands on `redirect_to`.
    fn sign_in_with_link(
        &self,
        email: &Email,
        redirect_to: &str,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// End the current session.
    fn sign_out(&self) -> impl Future<Output = Result<(), IdentityError>> + Send;
}

/// Allow-list lookup keyed by normalized email.
pub trait AllowList: Send + Sync {
    fn find_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<AllowListEntry>, AllowListError>> + Send;
}

/// Private object storage.
pub trait ObjectStore: Send + Sync {
    fn upload(
        &self,
        path: &PhotoPath,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Issue a URL that grants read access to `path` for `ttl`.
    fn sign_view(
        &self,
        path: &PhotoPath,
        ttl: Duration,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;

    fn remove(&self, path: &PhotoPath) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Registration persistence. Every read and write is filtered by owner.
pub trait RegistrationStore: Send + Sync {
    fn insert(
        &self,
        registration: NewRegistration,
    ) -> impl Future<Output = Result<Registration, PersistError>> + Send;

    /// Newest first by `created_at`, at most `limit` rows.
    fn list_by_owner(
        &self,
        owner: &Email,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Registration>, PersistError>> + Send;

    /// One owned row by id, listed or not.
    fn find(
        &self,
        id: RegistrationId,
        owner: &Email,
    ) -> impl Future<Output = Result<Option<Registration>, PersistError>> + Send;

    fn update(
        &self,
        id: RegistrationId,
        owner: &Email,
        update: RegistrationUpdate,
    ) -> impl Future<Output = Result<(), PersistError>> + Send;

    fn delete(
        &self,
        id: RegistrationId,
        owner: &Email,
    ) -> impl Future<Output = Result<(), PersistError>> + Send;
}

/// Everything a registration page talks to.
///
/// Blanket-implemented for any type that implements all four contracts.
pub trait Backend: IdentityProvider + AllowList + ObjectStore + RegistrationStore {}

impl<T> Backend for T where T: IdentityProvider + AllowList + ObjectStore + RegistrationStore {}
