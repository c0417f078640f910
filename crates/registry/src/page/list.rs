//! List sync: the owner's registrations with temporary photo URLs.

use std::time::Duration;

use futures::future::join_all;

use badge_core::Email;

use super::RegistrationPage;
use super::state::PageEvent;
use crate::models::ListItem;
use crate::services::{Backend, ObjectStore, PersistError, RegistrationStore};

/// Most rows a single sync shows.
pub const LIST_LIMIT: u32 = 200;

/// Lifetime of a signed photo URL.
pub const PHOTO_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Fetch `owner`'s rows, newest first, and sign every photo concurrently.
///
/// A photo that fails to sign is shown without a URL; it never fails the
/// sync.
///
/// # Errors
///
/// Returns the store's [`PersistError`] if the rows cannot be read.
pub async fn load<B>(backend: &B, owner: &Email) -> Result<Vec<ListItem>, PersistError>
where
    B: ObjectStore + RegistrationStore,
{
    let rows = backend.list_by_owner(owner, LIST_LIMIT).await?;

    let items = join_all(rows.into_iter().map(|registration| async move {
        let photo_url = match &registration.photo_path {
            Some(path) => match backend.sign_view(path, PHOTO_URL_TTL).await {
                Ok(url) => Some(url),
                Err(err) => {
                    tracing::warn!(
                        registration_id = %registration.id,
                        photo_path = %path,
                        error = %err,
                        "could not sign photo url"
                    );
                    None
                }
            },
            None => None,
        };
        ListItem {
            registration,
            photo_url,
        }
    }))
    .await;

    Ok(items)
}

impl<B: Backend> RegistrationPage<'_, B> {
    /// Replace the shown list with a fresh read.
    ///
    /// Does nothing before the gate has resolved an identity. On failure the
    /// previous list stays and the page message is set.
    ///
    /// # Errors
    ///
    /// Returns the store's [`PersistError`].
    pub async fn refresh(&mut self) -> Result<(), PersistError> {
        let Some(owner) = self.state().identity().cloned() else {
            return Ok(());
        };

        self.dispatch(PageEvent::ListRequested);

        match load(self.backend(), &owner).await {
            Ok(items) => {
                tracing::debug!(count = items.len(), "list synced");
                self.dispatch(PageEvent::ListLoaded(items));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "list sync failed");
                self.dispatch(PageEvent::ListFailed(err.to_string()));
                Err(err)
            }
        }
    }
}
