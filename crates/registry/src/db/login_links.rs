//! One-time login link repository.
//!
//! Only the SHA-256 hash of a token is stored. A link is consumed atomically:
//! the first successful [`LoginLinkRepository::consume`] marks it used and
//! every later attempt finds nothing.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use badge_core::Email;

use super::{RepositoryError, conflict_or};

/// A consumed login link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedLink {
    pub email: Email,
    pub redirect_to: String,
}

#[derive(sqlx::FromRow)]
struct ConsumedRow {
    email: String,
    redirect_to: String,
}

/// Repository for login link tokens.
pub struct LoginLinkRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LoginLinkRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a token hash collision.
    pub async fn create(
        &self,
        email: &Email,
        token_hash: &str,
        redirect_to: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO badge.login_link (email, token_hash, redirect_to, expires_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(email.as_str())
        .bind(token_hash)
        .bind(redirect_to)
        .bind(expires_at)
        .execute(self.pool)
        .await
        .map_err(|e| conflict_or(e, "login link"))?;

        Ok(())
    }

    /// Mark an unused, unexpired link as used and return it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume(&self, token_hash: &str) -> Result<Option<ConsumedLink>, RepositoryError> {
        let row = sqlx::query_as::<_, ConsumedRow>(
            r"
            UPDATE badge.login_link
            SET used_at = NOW()
            WHERE token_hash = $1
              AND used_at IS NULL
              AND expires_at > NOW()
            RETURNING email, redirect_to
            ",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| {
            let email = Email::parse(&r.email).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in login link: {e}"))
            })?;
            Ok(ConsumedLink {
                email,
                redirect_to: r.redirect_to,
            })
        })
        .transpose()
    }

    /// Delete used and expired links. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_stale(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM badge.login_link WHERE used_at IS NOT NULL OR expires_at <= NOW()",
        )
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
