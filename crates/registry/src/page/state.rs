//! The page's single state record and the events that change it.
//!
//! Every completed operation becomes exactly one [`PageEvent`], and
//! [`PageState::apply`] is the only code that mutates state. Nothing changes
//! while a remote call is in flight.

use std::time::Duration;

use chrono::{DateTime, Utc};

use badge_core::{Email, RegistrationId, Zoom};

use crate::crop::{CropError, CropGeometry, PhotoArtifact, SourceImage};
use crate::models::{ListItem, Registration};

/// How long the success notice stays up without acknowledgment.
pub const NOTICE_DURATION: Duration = Duration::from_secs(2);

/// Text of the notice shown after a successful submission.
pub const SUBMIT_SUCCESS_TEXT: &str = "Registration saved.";

/// Message shown when the crop engine fails.
pub const CROP_FAILED_TEXT: &str = "Could not crop image.";

/// Where the page wants the user to go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    /// The login entry point.
    Login,
}

impl Redirect {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => super::LOGIN_PATH,
        }
    }
}

/// An open crop dialog: the picked image and the latest geometry the
/// cropper reported (none until the user has interacted).
#[derive(Debug, Clone, PartialEq)]
pub struct CropSession {
    pub source: SourceImage,
    pub geometry: Option<CropGeometry>,
}

impl CropSession {
    /// Zoom currently shown by the cropper.
    #[must_use]
    pub fn zoom(&self) -> Zoom {
        self.geometry.map(|g| g.zoom).unwrap_or_default()
    }
}

/// Form state for a registration that has not been submitted yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub full_name: String,
    pub country: String,
    pub photo: Option<PhotoArtifact>,
    pub crop: Option<CropSession>,
}

/// The open edit dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub id: RegistrationId,
    pub full_name: String,
    pub country: String,
    /// True while the update is outstanding.
    pub saving: bool,
}

/// Transient confirmation shown after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessNotice {
    pub text: String,
    pub shown_at: DateTime<Utc>,
}

impl SuccessNotice {
    #[must_use]
    pub fn new(text: impl Into<String>, shown_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            shown_at,
        }
    }

    /// When the notice dismisses itself.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.shown_at
            + chrono::Duration::from_std(NOTICE_DURATION).unwrap_or(chrono::Duration::zero())
    }

    #[must_use]
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

/// One discrete state transition.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// The gate accepted the session.
    SessionResolved {
        email: Email,
        default_country: Option<String>,
    },
    /// The gate (or logout) sends the user elsewhere.
    Redirected(Redirect),
    /// The session was ended by the user.
    SignedOut,
    MessageSet(String),
    MessageCleared,
    FullNameChanged(String),
    CountryChanged(String),
    PhotoSelected(SourceImage),
    CropChanged(CropGeometry),
    CropCancelled,
    CropApplied(PhotoArtifact),
    CropFailed(CropError),
    Submitted(Registration),
    NoticeShown(SuccessNotice),
    NoticeDismissed,
    ListRequested,
    ListLoaded(Vec<ListItem>),
    ListFailed(String),
    EditOpened(EditForm),
    EditNameChanged(String),
    EditCountryChanged(String),
    EditSaving,
    EditSaved,
    EditFailed(String),
    EditCancelled,
    DeleteRequested(RegistrationId),
    DeleteCancelled,
    DeleteConfirmed,
    DeleteFailed(String),
}

/// Everything the registration page shows.
#[derive(Debug, Clone, Default)]
pub struct PageState {
    identity: Option<Email>,
    draft: Draft,
    items: Vec<ListItem>,
    loading_list: bool,
    list_stale: bool,
    message: Option<String>,
    notice: Option<SuccessNotice>,
    edit: Option<EditForm>,
    pending_delete: Option<RegistrationId>,
    redirect: Option<Redirect>,
}

impl PageState {
    /// Session identity, once the gate has accepted it.
    #[must_use]
    pub const fn identity(&self) -> Option<&Email> {
        self.identity.as_ref()
    }

    #[must_use]
    pub const fn draft(&self) -> &Draft {
        &self.draft
    }

    #[must_use]
    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, id: RegistrationId) -> Option<&ListItem> {
        self.items.iter().find(|item| item.registration.id == id)
    }

    #[must_use]
    pub const fn is_loading_list(&self) -> bool {
        self.loading_list
    }

    /// True when the most recent list sync failed and `items` is out of date.
    #[must_use]
    pub const fn is_list_stale(&self) -> bool {
        self.list_stale
    }

    /// The latest user-facing message (errors and link confirmations).
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The success notice, regardless of expiry.
    #[must_use]
    pub const fn notice(&self) -> Option<&SuccessNotice> {
        self.notice.as_ref()
    }

    /// The success notice, if it has not been dismissed or expired by `now`.
    #[must_use]
    pub fn notice_at(&self, now: DateTime<Utc>) -> Option<&SuccessNotice> {
        self.notice.as_ref().filter(|n| n.is_visible_at(now))
    }

    #[must_use]
    pub const fn edit(&self) -> Option<&EditForm> {
        self.edit.as_ref()
    }

    #[must_use]
    pub const fn pending_delete(&self) -> Option<RegistrationId> {
        self.pending_delete
    }

    #[must_use]
    pub const fn redirect(&self) -> Option<Redirect> {
        self.redirect
    }

    /// Apply one event.
    pub(crate) fn apply(&mut self, event: PageEvent) {
        match event {
            PageEvent::SessionResolved {
                email,
                default_country,
            } => {
                self.identity = Some(email);
                self.redirect = None;
                // First touch wins: never overwrite what the user typed.
                if let Some(country) = default_country
                    && self.draft.country.trim().is_empty()
                {
                    self.draft.country = country;
                }
            }
            PageEvent::Redirected(target) => {
                self.redirect = Some(target);
            }
            PageEvent::SignedOut => {
                self.identity = None;
                self.redirect = Some(Redirect::Login);
            }
            PageEvent::MessageSet(message) => self.message = Some(message),
            PageEvent::MessageCleared => self.message = None,
            PageEvent::FullNameChanged(name) => self.draft.full_name = name,
            PageEvent::CountryChanged(country) => self.draft.country = country,
            PageEvent::PhotoSelected(source) => {
                self.draft.crop = Some(CropSession {
                    source,
                    geometry: None,
                });
            }
            PageEvent::CropChanged(geometry) => {
                if let Some(session) = self.draft.crop.as_mut() {
                    session.geometry = Some(geometry);
                }
            }
            PageEvent::CropCancelled => self.draft.crop = None,
            PageEvent::CropApplied(artifact) => {
                self.draft.photo = Some(artifact);
                self.draft.crop = None;
            }
            PageEvent::CropFailed(_) => {
                // Prior artifact and the open dialog both stay.
                self.message = Some(CROP_FAILED_TEXT.to_string());
            }
            PageEvent::Submitted(_) => {
                self.draft.full_name.clear();
                self.draft.photo = None;
            }
            PageEvent::NoticeShown(notice) => self.notice = Some(notice),
            PageEvent::NoticeDismissed => self.notice = None,
            PageEvent::ListRequested => self.loading_list = true,
            PageEvent::ListLoaded(items) => {
                self.items = items;
                self.loading_list = false;
                self.list_stale = false;
            }
            PageEvent::ListFailed(message) => {
                self.message = Some(message);
                self.loading_list = false;
                self.list_stale = true;
            }
            PageEvent::EditOpened(form) => self.edit = Some(form),
            PageEvent::EditNameChanged(name) => {
                if let Some(form) = self.edit.as_mut() {
                    form.full_name = name;
                }
            }
            PageEvent::EditCountryChanged(country) => {
                if let Some(form) = self.edit.as_mut() {
                    form.country = country;
                }
            }
            PageEvent::EditSaving => {
                if let Some(form) = self.edit.as_mut() {
                    form.saving = true;
                }
            }
            PageEvent::EditSaved | PageEvent::EditCancelled => self.edit = None,
            PageEvent::EditFailed(message) => {
                if let Some(form) = self.edit.as_mut() {
                    form.saving = false;
                }
                self.message = Some(message);
            }
            PageEvent::DeleteRequested(id) => self.pending_delete = Some(id),
            PageEvent::DeleteCancelled | PageEvent::DeleteConfirmed => self.pending_delete = None,
            PageEvent::DeleteFailed(message) => self.message = Some(message),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use badge_core::CropRect;

    use super::*;

    fn email() -> Email {
        Email::parse("user@example.com").unwrap()
    }

    fn registration(id: i32, full_name: &str) -> Registration {
        Registration {
            id: RegistrationId::new(id),
            registered_by_email: email(),
            full_name: full_name.to_string(),
            country: "UK".to_string(),
            photo_path: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_country_fills_empty_draft() {
        let mut state = PageState::default();
        state.apply(PageEvent::SessionResolved {
            email: email(),
            default_country: Some("France".to_string()),
        });
        assert_eq!(state.draft().country, "France");
        assert_eq!(state.identity(), Some(&email()));
    }

    #[test]
    fn test_default_country_never_overwrites_user_input() {
        let mut state = PageState::default();
        state.apply(PageEvent::CountryChanged("Italy".to_string()));
        state.apply(PageEvent::SessionResolved {
            email: email(),
            default_country: Some("France".to_string()),
        });
        assert_eq!(state.draft().country, "Italy");
    }

    #[test]
    fn test_blank_country_counts_as_empty() {
        let mut state = PageState::default();
        state.apply(PageEvent::CountryChanged("   ".to_string()));
        state.apply(PageEvent::SessionResolved {
            email: email(),
            default_country: Some("Spain".to_string()),
        });
        assert_eq!(state.draft().country, "Spain");
    }

    #[test]
    fn test_submitted_clears_name_and_photo_keeps_country() {
        let mut state = PageState::default();
        state.apply(PageEvent::FullNameChanged("Ada".to_string()));
        state.apply(PageEvent::CountryChanged("UK".to_string()));
        state.apply(PageEvent::Submitted(registration(1, "Ada")));
        assert!(state.draft().full_name.is_empty());
        assert!(state.draft().photo.is_none());
        assert_eq!(state.draft().country, "UK");
    }

    #[test]
    fn test_list_failed_keeps_previous_items() {
        let mut state = PageState::default();
        state.apply(PageEvent::ListRequested);
        assert!(state.is_loading_list());
        let listed = ListItem {
            registration: registration(4, "Ada"),
            photo_url: None,
        };
        state.apply(PageEvent::ListLoaded(vec![listed.clone()]));
        assert!(!state.is_list_stale());

        state.apply(PageEvent::ListRequested);
        state.apply(PageEvent::ListFailed("boom".to_string()));
        assert!(!state.is_loading_list());
        assert!(state.is_list_stale());
        assert_eq!(state.message(), Some("boom"));
        assert_eq!(state.items(), &[listed]);

        state.apply(PageEvent::ListLoaded(Vec::new()));
        assert!(!state.is_list_stale());
    }

    #[test]
    fn test_crop_geometry_ignored_without_session() {
        let mut state = PageState::default();
        let geometry = CropGeometry::new(CropRect::square(0, 0, 5).unwrap(), Zoom::default());
        state.apply(PageEvent::CropChanged(geometry));
        assert!(state.draft().crop.is_none());
    }

    #[test]
    fn test_crop_failure_keeps_dialog_open() {
        let mut state = PageState::default();
        state.apply(PageEvent::PhotoSelected(SourceImage::from_bytes(vec![1, 2, 3])));
        state.apply(PageEvent::CropFailed(CropError::Encode("x".to_string())));
        assert!(state.draft().crop.is_some());
        assert_eq!(state.message(), Some(CROP_FAILED_TEXT));
    }

    #[test]
    fn test_notice_expires_after_duration() {
        let shown_at = Utc::now();
        let notice = SuccessNotice::new(SUBMIT_SUCCESS_TEXT, shown_at);
        assert!(notice.is_visible_at(shown_at));
        assert!(notice.is_visible_at(shown_at + chrono::Duration::milliseconds(1999)));
        assert!(!notice.is_visible_at(shown_at + chrono::Duration::seconds(2)));
    }

    #[test]
    fn test_notice_dismissed_by_acknowledgment() {
        let mut state = PageState::default();
        let now = Utc::now();
        state.apply(PageEvent::NoticeShown(SuccessNotice::new("ok", now)));
        assert!(state.notice_at(now).is_some());
        state.apply(PageEvent::NoticeDismissed);
        assert!(state.notice_at(now).is_none());
    }

    #[test]
    fn test_edit_failure_keeps_form_values() {
        let mut state = PageState::default();
        state.apply(PageEvent::EditOpened(EditForm {
            id: RegistrationId::new(9),
            full_name: "Old".to_string(),
            country: "X".to_string(),
            saving: false,
        }));
        state.apply(PageEvent::EditNameChanged("New".to_string()));
        state.apply(PageEvent::EditSaving);
        state.apply(PageEvent::EditFailed("denied".to_string()));
        let form = state.edit().unwrap();
        assert_eq!(form.full_name, "New");
        assert!(!form.saving);
        assert_eq!(state.message(), Some("denied"));
    }

    #[test]
    fn test_signed_out_redirects_to_login() {
        let mut state = PageState::default();
        state.apply(PageEvent::SessionResolved {
            email: email(),
            default_country: None,
        });
        state.apply(PageEvent::SignedOut);
        assert!(state.identity().is_none());
        assert_eq!(state.redirect(), Some(Redirect::Login));
        assert_eq!(Redirect::Login.path(), "/login");
    }
}
