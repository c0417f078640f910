//! The bundled backend: `PostgreSQL`, filesystem storage and session identity.
//!
//! A [`RequestBackend`] is built per request from shared state and the
//! request's session, and implements every contract a page needs.

use std::time::Duration;

use sqlx::PgPool;

use badge_core::{Email, PhotoPath, RegistrationId};

use crate::db::{AllowListRepository, RegistrationRepository, RepositoryError};
use crate::models::{AllowListEntry, NewRegistration, Registration, RegistrationUpdate};
use crate::services::{
    AllowList, AllowListError, IdentityError, IdentityProvider, ObjectStore, PersistError,
    RegistrationStore, SessionIdentity, StorageError, UploadOptions,
};
use crate::storage::FsObjectStore;

impl From<RepositoryError> for PersistError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Backend(other.to_string()),
        }
    }
}

impl From<RepositoryError> for AllowListError {
    fn from(err: RepositoryError) -> Self {
        Self::new(err.to_string())
    }
}

/// Backend for one request.
#[derive(Debug, Clone)]
pub struct RequestBackend<'a> {
    identity: SessionIdentity<'a>,
    pool: &'a PgPool,
    store: &'a FsObjectStore,
}

impl<'a> RequestBackend<'a> {
    #[must_use]
    pub const fn new(
        identity: SessionIdentity<'a>,
        pool: &'a PgPool,
        store: &'a FsObjectStore,
    ) -> Self {
        Self {
            identity,
            pool,
            store,
        }
    }

    #[must_use]
    pub const fn identity(&self) -> &SessionIdentity<'a> {
        &self.identity
    }
}

impl IdentityProvider for RequestBackend<'_> {
    async fn current_email(&self) -> Result<Option<String>, IdentityError> {
        self.identity.current_email().await
    }

    async fn sign_in_with_link(&self, email: &Email, redirect_to: &str) -> Result<(), IdentityError> {
        self.identity.sign_in_with_link(email, redirect_to).await
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.identity.sign_out().await
    }
}

impl AllowList for RequestBackend<'_> {
    async fn find_by_email(&self, email: &Email) -> Result<Option<AllowListEntry>, AllowListError> {
        Ok(AllowListRepository::new(self.pool)
            .get_by_email(email)
            .await?)
    }
}

impl ObjectStore for RequestBackend<'_> {
    async fn upload(
        &self,
        path: &PhotoPath,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> Result<(), StorageError> {
        self.store.upload(path, bytes, options).await
    }

    async fn sign_view(&self, path: &PhotoPath, ttl: Duration) -> Result<String, StorageError> {
        self.store.sign_view(path, ttl).await
    }

    async fn remove(&self, path: &PhotoPath) -> Result<(), StorageError> {
        self.store.remove(path).await
    }
}

impl RegistrationStore for RequestBackend<'_> {
    async fn insert(&self, registration: NewRegistration) -> Result<Registration, PersistError> {
        Ok(RegistrationRepository::new(self.pool)
            .create(&registration)
            .await?)
    }

    async fn list_by_owner(&self, owner: &Email, limit: u32) -> Result<Vec<Registration>, PersistError> {
        Ok(RegistrationRepository::new(self.pool)
            .list_by_owner(owner, limit)
            .await?)
    }

    async fn find(
        &self,
        id: RegistrationId,
        owner: &Email,
    ) -> Result<Option<Registration>, PersistError> {
        Ok(RegistrationRepository::new(self.pool).get(id, owner).await?)
    }

    async fn update(
        &self,
        id: RegistrationId,
        owner: &Email,
        update: RegistrationUpdate,
    ) -> Result<(), PersistError> {
        Ok(RegistrationRepository::new(self.pool)
            .update(id, owner, &update)
            .await?)
    }

    async fn delete(&self, id: RegistrationId, owner: &Email) -> Result<(), PersistError> {
        Ok(RegistrationRepository::new(self.pool).delete(id, owner).await?)
    }
}
