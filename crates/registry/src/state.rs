//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use tower_sessions::Session;

use crate::backend::RequestBackend;
use crate::config::RegistryConfig;
use crate::services::{EmailService, LinkDelivery, SessionIdentity};
use crate::storage::FsObjectStore;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid base_url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("SMTP setup failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RegistryConfig,
    pool: PgPool,
    store: FsObjectStore,
    delivery: LinkDelivery,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or SMTP cannot be set up.
    pub fn new(config: RegistryConfig, pool: PgPool) -> Result<Self, StateError> {
        let store = FsObjectStore::new(
            config.storage_dir.clone(),
            &config.base_url,
            config.storage_signing_key.clone(),
        )?;

        let delivery = match &config.email {
            Some(email) => LinkDelivery::Smtp(EmailService::new(email)?),
            None => {
                tracing::warn!("SMTP not configured, login links will be written to the log");
                LinkDelivery::Log
            }
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                store,
                delivery,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn store(&self) -> &FsObjectStore {
        &self.inner.store
    }

    /// Session identity for one request.
    #[must_use]
    pub fn identity(&self, session: Session) -> SessionIdentity<'_> {
        SessionIdentity::new(
            session,
            &self.inner.pool,
            &self.inner.delivery,
            &self.inner.config.base_url,
        )
    }

    /// Everything a page needs, bound to one request's session.
    #[must_use]
    pub fn backend(&self, session: Session) -> RequestBackend<'_> {
        RequestBackend::new(self.identity(session), &self.inner.pool, &self.inner.store)
    }
}
