//! Edit and delete flows for existing registrations.
//!
//! Only name and country can change. Deleting removes the row first and the
//! photo second; a photo that fails to go is logged and left behind.
//!
//! The `_by_id` variants serve callers that address a row directly rather
//! than through the shown list. Rows outside the list are read from the
//! store, whose owner filter decides whether they exist.

use thiserror::Error;

use badge_core::RegistrationId;

use super::RegistrationPage;
use super::state::{EditForm, PageEvent};
use super::submission::{ValidationError, validate_fields};
use crate::models::{Registration, RegistrationUpdate};
use crate::services::{Backend, PersistError};

/// Why an edit was not saved.
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl<B: Backend> RegistrationPage<'_, B> {
    /// Open the edit dialog pre-filled from the listed row.
    ///
    /// Returns false if `id` is not in the current list.
    pub fn open_edit(&mut self, id: RegistrationId) -> bool {
        let Some(item) = self.state().item(id) else {
            return false;
        };
        let form = EditForm {
            id,
            full_name: item.registration.full_name.clone(),
            country: item.registration.country.clone(),
            saving: false,
        };
        self.dispatch(PageEvent::EditOpened(form));
        true
    }

    /// Open the edit dialog for `id`, reading the row from the store when it
    /// is not in the current list.
    ///
    /// # Errors
    ///
    /// Returns `PersistError::NotFound` if the user owns no such row, or the
    /// store's error if the read fails. Either becomes the page message.
    pub async fn open_edit_by_id(&mut self, id: RegistrationId) -> Result<(), PersistError> {
        if self.open_edit(id) {
            return Ok(());
        }
        let registration = self.find_owned(id).await?;
        self.dispatch(PageEvent::EditOpened(EditForm {
            id,
            full_name: registration.full_name,
            country: registration.country,
            saving: false,
        }));
        Ok(())
    }

    /// Owned row by id, with the failure written to the page message.
    async fn find_owned(&mut self, id: RegistrationId) -> Result<Registration, PersistError> {
        let Some(owner) = self.state().identity().cloned() else {
            self.dispatch(PageEvent::MessageSet(ValidationError::NotLoggedIn.to_string()));
            return Err(PersistError::NotFound);
        };
        let found = match self.backend().find(id, &owner).await {
            Ok(Some(registration)) => return Ok(registration),
            Ok(None) => Err(PersistError::NotFound),
            Err(err) => Err(err),
        };
        if let Err(err) = &found {
            tracing::warn!(registration_id = %id, error = %err, "registration lookup failed");
            self.dispatch(PageEvent::MessageSet(err.to_string()));
        }
        found
    }

    pub fn set_edit_name(&mut self, value: impl Into<String>) {
        self.dispatch(PageEvent::EditNameChanged(value.into()));
    }

    pub fn set_edit_country(&mut self, value: impl Into<String>) {
        self.dispatch(PageEvent::EditCountryChanged(value.into()));
    }

    pub fn cancel_edit(&mut self) {
        self.dispatch(PageEvent::EditCancelled);
    }

    /// Save the open edit dialog.
    ///
    /// Does nothing if no dialog is open. On failure the dialog stays open
    /// with the typed values.
    ///
    /// # Errors
    ///
    /// Returns an [`EditError`] for blank fields or a store failure.
    pub async fn save_edit(&mut self) -> Result<(), EditError> {
        self.dispatch(PageEvent::MessageCleared);

        let Some(form) = self.state().edit().cloned() else {
            return Ok(());
        };

        let checked = self
            .state()
            .identity()
            .cloned()
            .ok_or(ValidationError::NotLoggedIn)
            .and_then(|owner| {
                validate_fields(&form.full_name, &form.country).map(|fields| (owner, fields))
            });
        let (owner, (full_name, country)) = match checked {
            Ok(checked) => checked,
            Err(err) => {
                self.dispatch(PageEvent::EditFailed(err.to_string()));
                return Err(err.into());
            }
        };

        self.dispatch(PageEvent::EditSaving);

        let update = RegistrationUpdate { full_name, country };
        if let Err(err) = self.backend().update(form.id, &owner, update).await {
            tracing::warn!(registration_id = %form.id, error = %err, "registration update failed");
            self.dispatch(PageEvent::EditFailed(err.to_string()));
            return Err(err.into());
        }

        tracing::info!(registration_id = %form.id, "registration updated");
        self.dispatch(PageEvent::EditSaved);

        if let Err(err) = self.refresh().await {
            tracing::debug!(error = %err, "list sync after edit failed");
        }
        Ok(())
    }

    /// Ask for confirmation before deleting a listed row.
    ///
    /// Returns false if `id` is not in the current list.
    pub fn request_delete(&mut self, id: RegistrationId) -> bool {
        if self.state().item(id).is_none() {
            return false;
        }
        self.dispatch(PageEvent::DeleteRequested(id));
        true
    }

    /// Ask for confirmation before deleting `id`, listed or not.
    ///
    /// Ownership is checked by the store when the delete is confirmed.
    pub fn request_delete_by_id(&mut self, id: RegistrationId) {
        self.dispatch(PageEvent::DeleteRequested(id));
    }

    pub fn cancel_delete(&mut self) {
        self.dispatch(PageEvent::DeleteCancelled);
    }

    /// Delete the row awaiting confirmation, then its photo.
    ///
    /// Does nothing if no delete is pending.
    ///
    /// # Errors
    ///
    /// Returns the store's [`PersistError`] if the row could not be deleted;
    /// nothing is removed from storage and the list is not re-read.
    pub async fn confirm_delete(&mut self) -> Result<(), PersistError> {
        self.dispatch(PageEvent::MessageCleared);

        let Some(id) = self.state().pending_delete() else {
            return Ok(());
        };
        let Some(owner) = self.state().identity().cloned() else {
            self.dispatch(PageEvent::DeleteCancelled);
            return Ok(());
        };
        self.dispatch(PageEvent::DeleteConfirmed);

        let listed = self
            .state()
            .item(id)
            .map(|item| item.registration.photo_path.clone());
        let photo_path = match listed {
            Some(path) => path,
            None => self.find_owned(id).await?.photo_path,
        };

        if let Err(err) = self.backend().delete(id, &owner).await {
            tracing::warn!(registration_id = %id, error = %err, "registration delete failed");
            self.dispatch(PageEvent::DeleteFailed(err.to_string()));
            return Err(err);
        }

        tracing::info!(registration_id = %id, "registration deleted");

        if let Some(path) = photo_path
            && let Err(err) = self.backend().remove(&path).await
        {
            tracing::warn!(
                registration_id = %id,
                photo_path = %path,
                error = %err,
                "photo removal failed, object left in storage"
            );
        }

        if let Err(err) = self.refresh().await {
            tracing::debug!(error = %err, "list sync after delete failed");
        }
        Ok(())
    }
}
