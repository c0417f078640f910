//! Crop, validate, upload and insert.

#![allow(clippy::unwrap_used)]

use badge_core::{CropRect, Email, Zoom};
use badge_integration_tests::{Call, MemoryBackend, Op, source, square};
use badge_registry::RegistrationPage;
use badge_registry::crop::{CropError, CropGeometry, SourceImage};
use badge_registry::page::state::{CROP_FAILED_TEXT, SUBMIT_SUCCESS_TEXT};
use badge_registry::page::{NOTICE_DURATION, SubmitError, ValidationError};
use badge_registry::services::StorageError;

const USER: &str = "ada@example.com";

fn backend() -> MemoryBackend {
    MemoryBackend::new().signed_in(USER).allow(USER, None)
}

async fn cropped_page(backend: &MemoryBackend) -> RegistrationPage<'_, MemoryBackend> {
    let mut page = RegistrationPage::new(backend);
    assert!(page.enter().await.is_ready());
    page.set_full_name("  Ada Lovelace ");
    page.set_country(" UK ");
    page.select_photo(source(400, 300));
    page.set_crop(square(50, 20, 200));
    page.apply_crop().await.unwrap();
    backend.clear_calls();
    page
}

#[tokio::test]
async fn test_apply_crop_produces_square_photo_of_crop_size() {
    let backend = backend();
    let page = cropped_page(&backend).await;

    let photo = page.state().draft().photo.as_ref().unwrap().photo();
    assert_eq!((photo.width(), photo.height()), (200, 200));
    assert!(photo.preview().starts_with("data:image/jpeg;base64,"));
    assert!(page.state().draft().crop.is_none());

    let decoded = image::load_from_memory(photo.bytes()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (200, 200));
}

#[tokio::test]
async fn test_zoom_does_not_change_output() {
    let picked = source(300, 300);
    let rect = CropRect::square(10, 10, 120).unwrap();

    let plain = badge_registry::crop::PhotoArtifact::render(
        &picked,
        CropGeometry::new(rect, Zoom::default()),
    )
    .unwrap();
    let zoomed = badge_registry::crop::PhotoArtifact::render(
        &picked,
        CropGeometry::new(rect, Zoom::new(2.5).unwrap()),
    )
    .unwrap();

    assert_eq!(plain.photo().bytes(), zoomed.photo().bytes());
}

#[tokio::test]
async fn test_apply_crop_without_geometry_is_noop() {
    let backend = backend();
    let mut page = RegistrationPage::new(&backend);
    page.enter().await;
    page.select_photo(source(100, 100));

    page.apply_crop().await.unwrap();

    assert!(page.state().draft().crop.is_some());
    assert!(page.state().draft().photo.is_none());
}

#[tokio::test]
async fn test_crop_failure_keeps_previous_photo_and_dialog() {
    let backend = backend();
    let mut page = cropped_page(&backend).await;
    let before = page.state().draft().photo.clone();

    page.select_photo(SourceImage::from_bytes(b"not an image".to_vec()));
    page.set_crop(square(0, 0, 10));
    let err = page.apply_crop().await.unwrap_err();

    assert!(matches!(err, CropError::ImageLoad(_)));
    assert_eq!(page.state().message(), Some(CROP_FAILED_TEXT));
    assert!(page.state().draft().crop.is_some());
    assert_eq!(page.state().draft().photo, before);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_cancel_crop_keeps_previous_photo() {
    let backend = backend();
    let mut page = cropped_page(&backend).await;
    let before = page.state().draft().photo.clone();

    page.select_photo(source(50, 50));
    page.cancel_crop();

    assert!(page.state().draft().crop.is_none());
    assert_eq!(page.state().draft().photo, before);
}

#[tokio::test]
async fn test_submit_uploads_inserts_and_refreshes() {
    let backend = backend();
    let mut page = cropped_page(&backend).await;

    let registration = page.submit().await.unwrap();

    let owner = Email::parse(USER).unwrap();
    assert_eq!(registration.registered_by_email, owner);
    assert_eq!(registration.full_name, "Ada Lovelace");
    assert_eq!(registration.country, "UK");
    let path = registration.photo_path.clone().unwrap();
    assert!(path.is_owned_by(&owner));
    assert!(path.as_str().ends_with(".jpg"));
    assert!(backend.object(&path).is_some());

    let calls = backend.calls();
    assert_eq!(calls[0], Call::Upload(path.as_str().to_string()));
    assert_eq!(calls[1], Call::Insert);
    assert!(matches!(calls[2], Call::List { .. }));

    let state = page.state();
    assert!(state.draft().full_name.is_empty());
    assert!(state.draft().photo.is_none());
    assert_eq!(state.draft().country, " UK ");
    assert_eq!(state.items()[0].registration.id, registration.id);
    assert!(state.items()[0].photo_url.is_some());
    assert!(state.message().is_none());

    let notice = state.notice().unwrap();
    assert_eq!(notice.text, SUBMIT_SUCCESS_TEXT);
    assert!(state.notice_at(notice.shown_at).is_some());
}

#[tokio::test]
async fn test_notice_expires_or_is_acknowledged() {
    let backend = backend();
    let mut page = cropped_page(&backend).await;
    page.submit().await.unwrap();
    let shown_at = page.state().notice().unwrap().shown_at;

    page.expire_notice(shown_at);
    assert!(page.state().notice().is_some());

    let later = shown_at + chrono::Duration::from_std(NOTICE_DURATION).unwrap();
    page.expire_notice(later);
    assert!(page.state().notice().is_none());

    page.set_full_name("Grace Hopper");
    page.select_photo(source(64, 64));
    page.set_crop(square(0, 0, 64));
    page.apply_crop().await.unwrap();
    page.submit().await.unwrap();
    page.acknowledge_notice();
    assert!(page.state().notice().is_none());
}

#[tokio::test]
async fn test_validation_failures_make_no_remote_calls() {
    let backend = backend();
    let mut page = RegistrationPage::new(&backend);
    page.enter().await;
    backend.clear_calls();

    page.set_full_name("   ");
    page.set_country("UK");
    let err = page.submit().await.unwrap_err();
    assert!(matches!(err, SubmitError::Validation(ValidationError::MissingName)));
    assert_eq!(page.state().message(), Some("Enter NAME SURNAME."));

    page.set_full_name("Ada");
    page.set_country("");
    page.submit().await.unwrap_err();
    assert_eq!(page.state().message(), Some("Enter COUNTRY."));

    page.set_country("UK");
    page.submit().await.unwrap_err();
    assert_eq!(page.state().message(), Some("Upload and crop a photo."));

    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_submit_before_gate_is_not_logged_in() {
    let backend = backend();
    let mut page = RegistrationPage::new(&backend);
    page.set_full_name("Ada");

    let err = page.submit().await.unwrap_err();

    assert!(matches!(err, SubmitError::Validation(ValidationError::NotLoggedIn)));
    assert_eq!(page.state().message(), Some("Not logged in."));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_upload_failure_skips_insert_and_keeps_draft() {
    let backend = backend();
    let mut page = cropped_page(&backend).await;
    backend.fail(Op::Upload, "bucket unavailable");
    let draft = page.state().draft().clone();

    let err = page.submit().await.unwrap_err();

    assert!(matches!(err, SubmitError::Upload(StorageError::Backend(_))));
    assert_eq!(page.state().message(), Some("bucket unavailable"));
    assert_eq!(page.state().draft(), &draft);
    assert!(!backend.calls().contains(&Call::Insert));
    assert!(backend.rows().is_empty());
    assert!(page.state().notice().is_none());
}

#[tokio::test]
async fn test_insert_failure_leaves_orphan_photo() {
    let backend = backend();
    let mut page = cropped_page(&backend).await;
    backend.fail(Op::Insert, "insert refused");

    let err = page.submit().await.unwrap_err();

    assert!(matches!(err, SubmitError::Persist(_)));
    assert_eq!(page.state().message(), Some("insert refused"));
    assert_eq!(backend.object_count(), 1);
    assert!(backend.rows().is_empty());
    assert!(page.state().draft().photo.is_some());
    assert_eq!(page.state().draft().full_name, "  Ada Lovelace ");
}

#[tokio::test]
async fn test_retry_after_failure_uses_fresh_photo_path() {
    let backend = backend();
    let mut page = cropped_page(&backend).await;
    backend.fail(Op::Insert, "insert refused");
    page.submit().await.unwrap_err();
    backend.recover(Op::Insert);

    let registration = page.submit().await.unwrap();

    assert_eq!(backend.object_count(), 2);
    assert_eq!(backend.rows().len(), 1);
    assert!(backend.object(registration.photo_path.as_ref().unwrap()).is_some());
}

#[tokio::test]
async fn test_blank_name_reported_even_with_country_and_photo() {
    let backend = backend();
    let mut page = cropped_page(&backend).await;
    page.set_full_name("");
    page.set_country("France");

    let err = page.submit().await.unwrap_err();

    assert_eq!(err.to_string(), "Enter NAME SURNAME.");
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_two_submissions_get_distinct_paths_and_ids() {
    let backend = backend();
    let mut page = cropped_page(&backend).await;
    let first = page.submit().await.unwrap();

    page.set_full_name("Grace Hopper");
    page.select_photo(source(120, 120));
    page.set_crop(square(0, 0, 120));
    page.apply_crop().await.unwrap();
    let second = page.submit().await.unwrap();

    assert_ne!(first.id, second.id);
    assert_ne!(first.photo_path, second.photo_path);
    assert_eq!(page.state().items().len(), 2);
    assert_eq!(page.state().items()[0].registration.id, second.id);
}
