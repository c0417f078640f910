//! Allow-list management commands.
//!
//! Emails are normalized (trimmed, lowercased) before they are stored, so
//! they match what users type on the login page.

use badge_core::Email;
use badge_registry::db::{AllowListRepository, RepositoryError};

use super::{CommandError, connect};

fn parse_email(raw: &str) -> Result<Email, CommandError> {
    Email::parse_normalized(raw).map_err(|e| CommandError::InvalidEmail(format!("{raw}: {e}")))
}

/// Allow an email, or reactivate it.
pub async fn add(email: &str, country: Option<&str>) -> Result<(), CommandError> {
    let email = parse_email(email)?;
    let country = country.map(str::trim).filter(|c| !c.is_empty());
    let pool = connect().await?;

    let entry = AllowListRepository::new(&pool)
        .upsert(&email, country)
        .await?;

    tracing::info!(
        email = %entry.email,
        default_country = entry.default_country.as_deref().unwrap_or("-"),
        "Allow-list entry active"
    );
    Ok(())
}

/// Revoke an email. Existing registrations are kept.
pub async fn deactivate(email: &str) -> Result<(), CommandError> {
    let email = parse_email(email)?;
    let pool = connect().await?;

    match AllowListRepository::new(&pool).deactivate(&email).await {
        Ok(()) => {
            tracing::info!(email = %email, "Allow-list entry deactivated");
            Ok(())
        }
        Err(RepositoryError::NotFound) => Err(CommandError::NotListed(email.into_inner())),
        Err(e) => Err(e.into()),
    }
}

/// Log every entry.
pub async fn list() -> Result<(), CommandError> {
    let pool = connect().await?;
    let entries = AllowListRepository::new(&pool).list().await?;

    for entry in &entries {
        tracing::info!(
            email = %entry.email,
            active = entry.active,
            default_country = entry.default_country.as_deref().unwrap_or("-"),
        );
    }
    tracing::info!("{} allow-list entries", entries.len());
    Ok(())
}
