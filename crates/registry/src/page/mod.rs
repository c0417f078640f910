//! The registration page.
//!
//! A [`RegistrationPage`] is one page entry: it runs the authorization gate,
//! then drives the submission, list and edit/delete flows against a
//! [`Backend`]. All state lives in a single [`PageState`] that only changes
//! through [`PageEvent`]s.
//!
//! The HTTP server builds a fresh page per request, so the gate runs again on
//! every entry and nothing about the session is cached between requests.

pub mod edit;
pub mod gate;
pub mod list;
pub mod login;
pub mod state;
pub mod submission;

use chrono::{DateTime, Utc};

use crate::crop::{CropError, CropGeometry, PhotoArtifact, SourceImage};
use crate::services::{Backend, IdentityError};

pub use edit::EditError;
pub use gate::{GateOutcome, GateState};
pub use list::{LIST_LIMIT, PHOTO_URL_TTL};
pub use login::{LoginError, LoginPage};
pub use state::{
    CropSession, Draft, EditForm, NOTICE_DURATION, PageEvent, PageState, Redirect, SuccessNotice,
};
pub use submission::{SubmitError, ValidationError};

/// Path of the login entry point.
pub const LOGIN_PATH: &str = "/login";

/// Path of the registration page; login links land here.
pub const REGISTER_PATH: &str = "/register";

/// One entry of the registration page.
pub struct RegistrationPage<'a, B> {
    backend: &'a B,
    state: PageState,
}

impl<B> std::fmt::Debug for RegistrationPage<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationPage")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a, B: Backend> RegistrationPage<'a, B> {
    #[must_use]
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            state: PageState::default(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &PageState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> PageState {
        self.state
    }

    pub(crate) const fn backend(&self) -> &'a B {
        self.backend
    }

    pub(crate) fn dispatch(&mut self, event: PageEvent) {
        tracing::trace!(?event, "page event");
        self.state.apply(event);
    }

    /// Run the gate and, if it lets the user in, load their list.
    pub async fn enter(&mut self) -> GateOutcome {
        let outcome = gate::run(self.backend).await;

        match &outcome {
            GateOutcome::Ready {
                email,
                default_country,
            } => {
                self.dispatch(PageEvent::SessionResolved {
                    email: email.clone(),
                    default_country: default_country.clone(),
                });
                if let Err(err) = self.refresh().await {
                    tracing::debug!(error = %err, "initial list sync failed");
                }
            }
            GateOutcome::Redirect(target) => self.dispatch(PageEvent::Redirected(*target)),
            GateOutcome::Halted(message) => self.dispatch(PageEvent::MessageSet(message.clone())),
        }

        outcome
    }

    // =========================================================================
    // Draft inputs
    // =========================================================================

    pub fn set_full_name(&mut self, value: impl Into<String>) {
        self.dispatch(PageEvent::FullNameChanged(value.into()));
    }

    pub fn set_country(&mut self, value: impl Into<String>) {
        self.dispatch(PageEvent::CountryChanged(value.into()));
    }

    /// Open the crop dialog for a newly picked file.
    ///
    /// The previous photo artifact stays until a new crop is applied.
    pub fn select_photo(&mut self, source: SourceImage) {
        self.dispatch(PageEvent::PhotoSelected(source));
    }

    /// Record the cropper's latest rectangle and zoom.
    pub fn set_crop(&mut self, geometry: CropGeometry) {
        self.dispatch(PageEvent::CropChanged(geometry));
    }

    pub fn cancel_crop(&mut self) {
        self.dispatch(PageEvent::CropCancelled);
    }

    /// Render the open crop session into the draft's photo.
    ///
    /// Does nothing if no dialog is open or the cropper has not reported a
    /// rectangle yet. Decoding and encoding run on the blocking pool; the
    /// `&mut self` borrow keeps crops on one page strictly sequential.
    ///
    /// # Errors
    ///
    /// Returns the [`CropError`]; the page message is set and the dialog stays
    /// open with the previous artifact untouched.
    pub async fn apply_crop(&mut self) -> Result<(), CropError> {
        self.dispatch(PageEvent::MessageCleared);

        let Some(session) = self.state.draft().crop.as_ref() else {
            return Ok(());
        };
        let Some(geometry) = session.geometry else {
            return Ok(());
        };
        let source = session.source.clone();

        let rendered =
            tokio::task::spawn_blocking(move || PhotoArtifact::render(&source, geometry))
                .await
                .unwrap_or_else(|e| Err(CropError::Encode(e.to_string())));

        match rendered {
            Ok(artifact) => {
                tracing::debug!(
                    width = artifact.photo().width(),
                    bytes = artifact.photo().bytes().len(),
                    "crop applied"
                );
                self.dispatch(PageEvent::CropApplied(artifact));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "crop failed");
                self.dispatch(PageEvent::CropFailed(err.clone()));
                Err(err)
            }
        }
    }

    // =========================================================================
    // Notice and session
    // =========================================================================

    /// Dismiss the success notice.
    pub fn acknowledge_notice(&mut self) {
        if self.state.notice().is_some() {
            self.dispatch(PageEvent::NoticeDismissed);
        }
    }

    /// Dismiss the success notice if it has run its course by `now`.
    pub fn expire_notice(&mut self, now: DateTime<Utc>) {
        let expired = self
            .state
            .notice()
            .is_some_and(|notice| !notice.is_visible_at(now));
        if expired {
            self.dispatch(PageEvent::NoticeDismissed);
        }
    }

    /// End the session and send the user to the login page.
    ///
    /// # Errors
    ///
    /// Returns the identity service error; the page message is set and the
    /// user stays on the page.
    pub async fn log_out(&mut self) -> Result<(), IdentityError> {
        match self.backend.sign_out().await {
            Ok(()) => {
                tracing::info!("signed out");
                self.dispatch(PageEvent::SignedOut);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "sign out failed");
                self.dispatch(PageEvent::MessageSet(err.to_string()));
                Err(err)
            }
        }
    }
}
