//! CLI subcommands.

pub mod allowlist;
pub mod links;
pub mod migrate;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Repository error.
    #[error(transparent)]
    Repository(#[from] badge_registry::db::RepositoryError),

    /// Email is not on the allow-list.
    #[error("Not on the allow-list: {0}")]
    NotListed(String),
}

/// Connect using `BADGE_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("BADGE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("BADGE_DATABASE_URL"))?;

    tracing::info!("Connecting to registry database...");
    let pool = badge_registry::db::create_pool(&SecretString::from(database_url)).await?;
    Ok(pool)
}
