//! Submission flow: validate the draft, upload the photo, insert the row.

use chrono::Utc;
use thiserror::Error;

use badge_core::{Email, PhotoPath};

use super::RegistrationPage;
use super::state::{Draft, PageEvent, SUBMIT_SUCCESS_TEXT, SuccessNotice};
use crate::crop::JPEG_CONTENT_TYPE;
use crate::models::{NewRegistration, Registration};
use crate::services::{Backend, PersistError, StorageError, UploadOptions};

/// A draft or edit that cannot be sent. The display text is what the user
/// sees.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Not logged in.")]
    NotLoggedIn,
    #[error("Enter NAME SURNAME.")]
    MissingName,
    #[error("Enter COUNTRY.")]
    MissingCountry,
    #[error("Upload and crop a photo.")]
    MissingPhoto,
}

/// Why a submission did not produce a registration.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Upload(StorageError),
    #[error(transparent)]
    Persist(PersistError),
}

/// A draft that passed validation, trimmed and ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
    pub owner: Email,
    pub full_name: String,
    pub country: String,
    pub photo: Vec<u8>,
}

/// Check a draft, first failure wins.
///
/// # Errors
///
/// Returns the first [`ValidationError`] in the order identity, name,
/// country, photo.
pub fn validate(identity: Option<&Email>, draft: &Draft) -> Result<ValidDraft, ValidationError> {
    let owner = identity.ok_or(ValidationError::NotLoggedIn)?;
    let (full_name, country) = validate_fields(&draft.full_name, &draft.country)?;
    let photo = draft.photo.as_ref().ok_or(ValidationError::MissingPhoto)?;

    Ok(ValidDraft {
        owner: owner.clone(),
        full_name,
        country,
        photo: photo.photo().bytes().to_vec(),
    })
}

/// Trim name and country and reject blanks.
pub(crate) fn validate_fields(
    full_name: &str,
    country: &str,
) -> Result<(String, String), ValidationError> {
    let full_name = full_name.trim();
    if full_name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    let country = country.trim();
    if country.is_empty() {
        return Err(ValidationError::MissingCountry);
    }
    Ok((full_name.to_string(), country.to_string()))
}

impl<B: Backend> RegistrationPage<'_, B> {
    /// Send the draft.
    ///
    /// On success the name and photo are cleared, the country is kept, the
    /// list is re-read and a [`SuccessNotice`] is shown. On any failure the
    /// draft is untouched and the page message says why.
    ///
    /// A failed insert after a successful upload leaves the photo in storage;
    /// it is logged and not cleaned up.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitError`] for validation, upload or insert failure.
    pub async fn submit(&mut self) -> Result<Registration, SubmitError> {
        self.dispatch(PageEvent::MessageCleared);

        let draft = match validate(self.state().identity(), self.state().draft()) {
            Ok(draft) => draft,
            Err(err) => {
                self.dispatch(PageEvent::MessageSet(err.to_string()));
                return Err(err.into());
            }
        };

        let path = PhotoPath::generate_now(&draft.owner);
        let options = UploadOptions {
            content_type: JPEG_CONTENT_TYPE,
            overwrite: false,
        };

        if let Err(err) = self.backend().upload(&path, draft.photo, options).await {
            tracing::warn!(photo_path = %path, error = %err, "photo upload failed");
            self.dispatch(PageEvent::MessageSet(err.to_string()));
            return Err(SubmitError::Upload(err));
        }

        let new = NewRegistration {
            registered_by_email: draft.owner,
            full_name: draft.full_name,
            country: draft.country,
            photo_path: path.clone(),
        };

        let registration = match self.backend().insert(new).await {
            Ok(registration) => registration,
            Err(err) => {
                tracing::warn!(
                    photo_path = %path,
                    error = %err,
                    "registration insert failed, uploaded photo is orphaned"
                );
                self.dispatch(PageEvent::MessageSet(err.to_string()));
                return Err(SubmitError::Persist(err));
            }
        };

        tracing::info!(
            registration_id = %registration.id,
            photo_path = %path,
            "registration submitted"
        );
        self.dispatch(PageEvent::Submitted(registration.clone()));

        if let Err(err) = self.refresh().await {
            tracing::debug!(error = %err, "list sync after submit failed");
        }

        self.dispatch(PageEvent::NoticeShown(SuccessNotice::new(
            SUBMIT_SUCCESS_TEXT,
            Utc::now(),
        )));

        Ok(registration)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::parse("owner@example.com").unwrap()
    }

    fn draft(name: &str, country: &str) -> Draft {
        Draft {
            full_name: name.to_string(),
            country: country.to_string(),
            ..Draft::default()
        }
    }

    #[test]
    fn test_validation_order_identity_first() {
        let err = validate(None, &Draft::default()).unwrap_err();
        assert_eq!(err, ValidationError::NotLoggedIn);
        assert_eq!(err.to_string(), "Not logged in.");
    }

    #[test]
    fn test_validation_name_before_country() {
        let err = validate(Some(&email()), &draft("  ", "")).unwrap_err();
        assert_eq!(err.to_string(), "Enter NAME SURNAME.");
    }

    #[test]
    fn test_validation_country_before_photo() {
        let err = validate(Some(&email()), &draft("Ada", " \t")).unwrap_err();
        assert_eq!(err.to_string(), "Enter COUNTRY.");
    }

    #[test]
    fn test_validation_requires_photo() {
        let err = validate(Some(&email()), &draft("Ada", "UK")).unwrap_err();
        assert_eq!(err.to_string(), "Upload and crop a photo.");
    }

    #[test]
    fn test_fields_are_trimmed() {
        let (name, country) = validate_fields("  Ada Lovelace ", " UK ").unwrap();
        assert_eq!(name, "Ada Lovelace");
        assert_eq!(country, "UK");
    }
}
