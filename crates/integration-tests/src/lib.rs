//! Integration tests for the badge registry.
//!
//! # Running Tests
//!
//! ```bash
//! # Page flows and router tests (no services needed)
//! cargo test -p badge-integration-tests
//!
//! # Repository tests against a scratch database
//! BADGE_TEST_DATABASE_URL=postgres://... cargo test -p badge-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `gate` - Authorization gate on page entry
//! - `submission` - Crop, validate, upload and insert
//! - `list_sync` - Owner-scoped list with signed photo URLs
//! - `edit_delete` - Edit and delete of existing rows
//! - `answers` - Route answers for admitted entries
//! - `login` - Login link request and logout
//! - `router` - HTTP routes without a session
//! - `repositories` - `PostgreSQL` repositories (ignored by default)
//!
//! The page flows run against [`MemoryBackend`], an in-memory stand-in for
//! all four collaborators that records every remote call and can be told to
//! fail any of them.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use image::{ImageFormat, Rgb, RgbImage};

use badge_core::{CropRect, Email, PhotoPath, RegistrationId, Zoom};
use badge_registry::crop::{CropGeometry, SourceImage};
use badge_registry::models::{AllowListEntry, NewRegistration, Registration, RegistrationUpdate};
use badge_registry::services::{
    AllowList, AllowListError, IdentityError, IdentityProvider, ObjectStore, PersistError,
    RegistrationStore, StorageError, UploadOptions,
};

/// One call into a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CurrentEmail,
    SignIn { email: String, redirect_to: String },
    SignOut,
    FindByEmail(String),
    Upload(String),
    SignView(String),
    Remove(String),
    Insert,
    List { owner: String, limit: u32 },
    Find(RegistrationId),
    Update(RegistrationId),
    Delete(RegistrationId),
}

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Session,
    SignIn,
    SignOut,
    AllowList,
    Upload,
    Remove,
    Insert,
    List,
    Find,
    Update,
    Delete,
}

#[derive(Default)]
struct Inner {
    session: Option<String>,
    allow_list: HashMap<String, AllowListEntry>,
    objects: HashMap<String, Vec<u8>>,
    rows: Vec<Registration>,
    next_id: i32,
    failures: HashMap<Op, String>,
    unsignable: HashSet<String>,
    calls: Vec<Call>,
}

/// In-memory identity, allow-list, object store and registration store.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start with a live session for `email` (stored as given).
    #[must_use]
    pub fn signed_in(self, email: &str) -> Self {
        self.lock().session = Some(email.to_string());
        self
    }

    /// Add an active allow-list entry.
    #[must_use]
    pub fn allow(self, email: &str, default_country: Option<&str>) -> Self {
        self.set_allowed(email, true, default_country);
        self
    }

    /// Add an inactive allow-list entry.
    #[must_use]
    pub fn allow_inactive(self, email: &str) -> Self {
        self.set_allowed(email, false, None);
        self
    }

    /// Make `op` fail with `message` until [`Self::recover`] is called.
    #[must_use]
    pub fn failing(self, op: Op, message: &str) -> Self {
        self.fail(op, message);
        self
    }

    pub fn set_allowed(&self, email: &str, active: bool, default_country: Option<&str>) {
        let email = email_of(email);
        self.lock().allow_list.insert(
            email.as_str().to_string(),
            AllowListEntry {
                email,
                active,
                default_country: default_country.map(str::to_string),
            },
        );
    }

    pub fn fail(&self, op: Op, message: &str) {
        self.lock().failures.insert(op, message.to_string());
    }

    pub fn recover(&self, op: Op) {
        self.lock().failures.remove(&op);
    }

    /// Make signing fail for one stored photo.
    pub fn fail_signing(&self, path: &PhotoPath) {
        self.lock().unsignable.insert(path.as_str().to_string());
    }

    /// Seed a row (and its photo, if any) without recording calls.
    pub fn seed(&self, owner: &str, full_name: &str, country: &str, with_photo: bool) -> Registration {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        let owner = email_of(owner);
        let photo_path = with_photo.then(|| PhotoPath::generate(&owner, i64::from(id), 0xab));
        if let Some(path) = &photo_path {
            inner.objects.insert(path.as_str().to_string(), vec![0xff, 0xd8]);
        }
        let row = Registration {
            id: RegistrationId::new(id),
            registered_by_email: owner,
            full_name: full_name.to_string(),
            country: country.to_string(),
            photo_path,
            created_at: tick(id),
        };
        inner.rows.push(row.clone());
        row
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    #[must_use]
    pub fn session(&self) -> Option<String> {
        self.lock().session.clone()
    }

    #[must_use]
    pub fn rows(&self) -> Vec<Registration> {
        self.lock().rows.clone()
    }

    #[must_use]
    pub fn row(&self, id: RegistrationId) -> Option<Registration> {
        self.lock().rows.iter().find(|r| r.id == id).cloned()
    }

    #[must_use]
    pub fn object(&self, path: &PhotoPath) -> Option<Vec<u8>> {
        self.lock().objects.get(path.as_str()).cloned()
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    fn record(&self, call: Call, op: Option<Op>) -> Result<(), String> {
        let mut inner = self.lock();
        inner.calls.push(call);
        match op.and_then(|op| inner.failures.get(&op)) {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }
}

impl IdentityProvider for MemoryBackend {
    async fn current_email(&self) -> Result<Option<String>, IdentityError> {
        self.record(Call::CurrentEmail, Some(Op::Session))
            .map_err(IdentityError::Session)?;
        Ok(self.session())
    }

    async fn sign_in_with_link(&self, email: &Email, redirect_to: &str) -> Result<(), IdentityError> {
        let call = Call::SignIn {
            email: email.as_str().to_string(),
            redirect_to: redirect_to.to_string(),
        };
        self.record(call, Some(Op::SignIn))
            .map_err(IdentityError::LinkDelivery)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.record(Call::SignOut, Some(Op::SignOut))
            .map_err(IdentityError::Session)?;
        self.lock().session = None;
        Ok(())
    }
}

impl AllowList for MemoryBackend {
    async fn find_by_email(&self, email: &Email) -> Result<Option<AllowListEntry>, AllowListError> {
        self.record(Call::FindByEmail(email.as_str().to_string()), Some(Op::AllowList))
            .map_err(AllowListError::new)?;
        Ok(self.lock().allow_list.get(email.as_str()).cloned())
    }
}

impl ObjectStore for MemoryBackend {
    async fn upload(
        &self,
        path: &PhotoPath,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> Result<(), StorageError> {
        self.record(Call::Upload(path.as_str().to_string()), Some(Op::Upload))
            .map_err(StorageError::Backend)?;
        let mut inner = self.lock();
        if !options.overwrite && inner.objects.contains_key(path.as_str()) {
            return Err(StorageError::AlreadyExists(path.clone()));
        }
        inner.objects.insert(path.as_str().to_string(), bytes);
        Ok(())
    }

    async fn sign_view(&self, path: &PhotoPath, ttl: Duration) -> Result<String, StorageError> {
        self.record(Call::SignView(path.as_str().to_string()), None)
            .map_err(StorageError::Backend)?;
        let inner = self.lock();
        if inner.unsignable.contains(path.as_str()) {
            return Err(StorageError::Backend("signing refused".to_string()));
        }
        if !inner.objects.contains_key(path.as_str()) {
            return Err(StorageError::NotFound(path.clone()));
        }
        Ok(format!("memory://{}?ttl={}", path.as_str(), ttl.as_secs()))
    }

    async fn remove(&self, path: &PhotoPath) -> Result<(), StorageError> {
        self.record(Call::Remove(path.as_str().to_string()), Some(Op::Remove))
            .map_err(StorageError::Backend)?;
        match self.lock().objects.remove(path.as_str()) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(path.clone())),
        }
    }
}

impl RegistrationStore for MemoryBackend {
    async fn insert(&self, registration: NewRegistration) -> Result<Registration, PersistError> {
        self.record(Call::Insert, Some(Op::Insert))
            .map_err(PersistError::Backend)?;
        let mut inner = self.lock();
        inner.next_id += 1;
        let row = Registration {
            id: RegistrationId::new(inner.next_id),
            registered_by_email: registration.registered_by_email,
            full_name: registration.full_name,
            country: registration.country,
            photo_path: Some(registration.photo_path),
            created_at: tick(inner.next_id),
        };
        inner.rows.push(row.clone());
        Ok(row)
    }

    async fn list_by_owner(
        &self,
        owner: &Email,
        limit: u32,
    ) -> Result<Vec<Registration>, PersistError> {
        let call = Call::List {
            owner: owner.as_str().to_string(),
            limit,
        };
        self.record(call, Some(Op::List))
            .map_err(PersistError::Backend)?;
        let mut rows: Vec<Registration> = self
            .lock()
            .rows
            .iter()
            .filter(|r| &r.registered_by_email == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn find(
        &self,
        id: RegistrationId,
        owner: &Email,
    ) -> Result<Option<Registration>, PersistError> {
        self.record(Call::Find(id), Some(Op::Find))
            .map_err(PersistError::Backend)?;
        Ok(self
            .lock()
            .rows
            .iter()
            .find(|r| r.id == id && &r.registered_by_email == owner)
            .cloned())
    }

    async fn update(
        &self,
        id: RegistrationId,
        owner: &Email,
        update: RegistrationUpdate,
    ) -> Result<(), PersistError> {
        self.record(Call::Update(id), Some(Op::Update))
            .map_err(PersistError::Backend)?;
        let mut inner = self.lock();
        let row = inner
            .rows
            .iter_mut()
            .find(|r| r.id == id && &r.registered_by_email == owner)
            .ok_or(PersistError::NotFound)?;
        row.full_name = update.full_name;
        row.country = update.country;
        Ok(())
    }

    async fn delete(&self, id: RegistrationId, owner: &Email) -> Result<(), PersistError> {
        self.record(Call::Delete(id), Some(Op::Delete))
            .map_err(PersistError::Backend)?;
        let mut inner = self.lock();
        let before = inner.rows.len();
        inner
            .rows
            .retain(|r| !(r.id == id && &r.registered_by_email == owner));
        if inner.rows.len() == before {
            return Err(PersistError::NotFound);
        }
        Ok(())
    }
}

/// Creation time for the `n`th row; later rows are newer.
#[must_use]
pub fn tick(n: i32) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + i64::from(n), 0)
        .single()
        .unwrap_or_default()
}

fn email_of(raw: &str) -> Email {
    Email::parse_normalized(raw).unwrap_or_else(|e| panic!("test email {raw:?}: {e}"))
}

/// PNG bytes of a `width` x `height` image with a red-to-green gradient.
#[must_use]
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        let r = u8::try_from(x * 255 / width.max(1)).unwrap_or(u8::MAX);
        let g = u8::try_from(y * 255 / height.max(1)).unwrap_or(u8::MAX);
        Rgb([r, g, 64])
    });
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .unwrap_or_else(|e| panic!("encode test png: {e}"));
    out.into_inner()
}

/// A picked PNG of the given size.
#[must_use]
pub fn source(width: u32, height: u32) -> SourceImage {
    SourceImage::from_bytes(png(width, height))
}

/// A square crop at (`x`, `y`) with no zoom.
#[must_use]
pub fn square(x: u32, y: u32, size: u32) -> CropGeometry {
    let rect = CropRect::square(x, y, size).unwrap_or_else(|e| panic!("test crop: {e}"));
    CropGeometry::new(rect, Zoom::default())
}
