//! Registration repository.
//!
//! Every read and write is filtered by `registered_by_email`, so a caller can
//! only ever see or change its own rows.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use badge_core::{Email, PhotoPath, RegistrationId};

use super::{RepositoryError, conflict_or};
use crate::models::{NewRegistration, Registration, RegistrationUpdate};

#[derive(sqlx::FromRow)]
struct RegistrationRow {
    id: i32,
    created_at: DateTime<Utc>,
    registered_by_email: String,
    full_name: String,
    country: String,
    photo_path: Option<String>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = RepositoryError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let registered_by_email = Email::parse(&row.registered_by_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid owner email in database: {e}"))
        })?;
        let photo_path = row
            .photo_path
            .as_deref()
            .map(PhotoPath::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid photo path in database: {e}"))
            })?;

        Ok(Self {
            id: RegistrationId::new(row.id),
            registered_by_email,
            full_name: row.full_name,
            country: row.country,
            photo_path,
            created_at: row.created_at,
        })
    }
}

/// Repository for registration rows.
pub struct RegistrationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RegistrationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a registration; id and `created_at` come from the database.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the photo path is already used.
    pub async fn create(&self, new: &NewRegistration) -> Result<Registration, RepositoryError> {
        let row = sqlx::query_as::<_, RegistrationRow>(
            r"
            INSERT INTO badge.registration (registered_by_email, full_name, country, photo_path)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at, registered_by_email, full_name, country, photo_path
            ",
        )
        .bind(new.registered_by_email.as_str())
        .bind(&new.full_name)
        .bind(&new.country)
        .bind(new.photo_path.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_or(e, "photo path"))?;

        row.try_into()
    }

    /// The owner's rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_owner(
        &self,
        owner: &Email,
        limit: u32,
    ) -> Result<Vec<Registration>, RepositoryError> {
        let rows = sqlx::query_as::<_, RegistrationRow>(
            r"
            SELECT id, created_at, registered_by_email, full_name, country, photo_path
            FROM badge.registration
            WHERE registered_by_email = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(owner.as_str())
        .bind(i64::from(limit))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Registration::try_from).collect()
    }

    /// One owned row, or `None` if id and owner do not match.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: RegistrationId,
        owner: &Email,
    ) -> Result<Option<Registration>, RepositoryError> {
        let row = sqlx::query_as::<_, RegistrationRow>(
            r"
            SELECT id, created_at, registered_by_email, full_name, country, photo_path
            FROM badge.registration
            WHERE id = $1 AND registered_by_email = $2
            ",
        )
        .bind(id.as_i32())
        .bind(owner.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Registration::try_from).transpose()
    }

    /// Change name and country of an owned row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row matches id and owner.
    pub async fn update(
        &self,
        id: RegistrationId,
        owner: &Email,
        update: &RegistrationUpdate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE badge.registration
            SET full_name = $3, country = $4
            WHERE id = $1 AND registered_by_email = $2
            ",
        )
        .bind(id.as_i32())
        .bind(owner.as_str())
        .bind(&update.full_name)
        .bind(&update.country)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete an owned row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row matches id and owner.
    pub async fn delete(&self, id: RegistrationId, owner: &Email) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM badge.registration WHERE id = $1 AND registered_by_email = $2")
                .bind(id.as_i32())
                .bind(owner.as_str())
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
