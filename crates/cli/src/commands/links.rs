//! Login link housekeeping.

use badge_registry::db::LoginLinkRepository;

use super::{CommandError, connect};

/// Delete used and expired login links.
pub async fn prune() -> Result<(), CommandError> {
    let pool = connect().await?;
    let deleted = LoginLinkRepository::new(&pool).delete_stale().await?;
    tracing::info!(deleted, "Pruned login links");
    Ok(())
}
