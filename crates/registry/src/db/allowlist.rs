//! Allow-list repository.

use sqlx::PgPool;

use badge_core::Email;

use super::RepositoryError;
use crate::models::AllowListEntry;

#[derive(sqlx::FromRow)]
struct AllowedUserRow {
    email: String,
    active: bool,
    country: Option<String>,
}

impl TryFrom<AllowedUserRow> for AllowListEntry {
    type Error = RepositoryError;

    fn try_from(row: AllowedUserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in allow-list: {e}"))
        })?;
        Ok(Self {
            email,
            active: row.active,
            default_country: row.country.filter(|c| !c.trim().is_empty()),
        })
    }
}

/// Repository for allow-list rows.
pub struct AllowListRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AllowListRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up an entry by normalized email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<AllowListEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, AllowedUserRow>(
            r"
            SELECT email, active, country
            FROM badge.allowed_user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(AllowListEntry::try_from).transpose()
    }

    /// Add an email, or reactivate it if already present.
    ///
    /// A `None` country leaves an existing default country unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        email: &Email,
        country: Option<&str>,
    ) -> Result<AllowListEntry, RepositoryError> {
        let row = sqlx::query_as::<_, AllowedUserRow>(
            r"
            INSERT INTO badge.allowed_user (email, active, country)
            VALUES ($1, TRUE, $2)
            ON CONFLICT (email) DO UPDATE
                SET active = TRUE,
                    country = COALESCE(EXCLUDED.country, badge.allowed_user.country)
            RETURNING email, active, country
            ",
        )
        .bind(email.as_str())
        .bind(country)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Mark an entry inactive.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the email is not listed.
    pub async fn deactivate(&self, email: &Email) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE badge.allowed_user SET active = FALSE WHERE email = $1")
            .bind(email.as_str())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// All entries, ordered by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<AllowListEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, AllowedUserRow>(
            r"
            SELECT email, active, country
            FROM badge.allowed_user
            ORDER BY email
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(AllowListEntry::try_from).collect()
    }
}
