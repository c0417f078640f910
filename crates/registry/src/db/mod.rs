//! Database operations for the badge registry `PostgreSQL`.
//!
//! ## Tables (schema `badge`)
//!
//! - `allowed_user` - Emails permitted to register, with active flag and default country
//! - `registration` - Submitted badge registrations, owned by email
//! - `login_link` - One-time login link tokens (hashed)
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/registry/migrations/` and run via:
//! ```bash
//! cargo run -p badge-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate builds
//! without a live database.

pub mod allowlist;
pub mod login_links;
pub mod registrations;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use allowlist::AllowListRepository;
pub use login_links::LoginLinkRepository;
pub use registrations::RegistrationRepository;

/// Embedded migrations for the registry database.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate photo path).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_or(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
