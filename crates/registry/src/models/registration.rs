//! Registration domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use badge_core::{Email, PhotoPath, RegistrationId};

/// A persisted badge registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Assigned by the persistence service at insert time.
    pub id: RegistrationId,
    /// Owner; equals the session identity at creation and never changes.
    pub registered_by_email: Email,
    /// Trimmed, non-empty.
    pub full_name: String,
    /// Trimmed, non-empty.
    pub country: String,
    /// Storage key of the cropped photo.
    pub photo_path: Option<PhotoPath>,
    /// Assigned by the persistence service; list order is newest first.
    pub created_at: DateTime<Utc>,
}

/// Values for a registration insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub registered_by_email: Email,
    pub full_name: String,
    pub country: String,
    pub photo_path: PhotoPath,
}

/// The only fields an existing registration may change. A different photo
/// means a new registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationUpdate {
    pub full_name: String,
    pub country: String,
}

/// A registration as shown in the owner's list, with a temporary photo URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    #[serde(flatten)]
    pub registration: Registration,
    /// Signed view URL, or `None` if the row has no photo or signing failed.
    pub photo_url: Option<String>,
}

/// An allow-list row as seen by the authorization gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListEntry {
    pub email: Email,
    pub active: bool,
    /// Used once to pre-fill an empty draft country.
    pub default_country: Option<String>,
}
