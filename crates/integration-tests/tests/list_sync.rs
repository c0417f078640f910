//! Owner-scoped list with signed photo URLs.

#![allow(clippy::unwrap_used)]

use badge_integration_tests::{Call, MemoryBackend, Op};
use badge_registry::RegistrationPage;
use badge_registry::page::{LIST_LIMIT, PHOTO_URL_TTL};
use badge_registry::services::PersistError;

const USER: &str = "ada@example.com";
const OTHER: &str = "grace@example.com";

fn backend() -> MemoryBackend {
    MemoryBackend::new()
        .signed_in(USER)
        .allow(USER, None)
        .allow(OTHER, None)
}

#[tokio::test]
async fn test_list_is_newest_first_and_owner_only() {
    let backend = backend();
    let first = backend.seed(USER, "First", "UK", true);
    backend.seed(OTHER, "Not Mine", "US", true);
    let second = backend.seed(USER, "Second", "FR", false);
    let mut page = RegistrationPage::new(&backend);

    page.enter().await;

    let ids: Vec<_> = page
        .state()
        .items()
        .iter()
        .map(|item| item.registration.id)
        .collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert!(
        page.state()
            .items()
            .iter()
            .all(|item| item.registration.registered_by_email.as_str() == USER)
    );
}

#[tokio::test]
async fn test_every_photo_gets_a_signed_url() {
    let backend = backend();
    let with_photo = backend.seed(USER, "Ada", "UK", true);
    let without_photo = backend.seed(USER, "Ada Again", "UK", false);
    let mut page = RegistrationPage::new(&backend);

    page.enter().await;

    let state = page.state();
    let signed = state.item(with_photo.id).unwrap();
    let url = signed.photo_url.as_deref().unwrap();
    assert!(url.contains(with_photo.photo_path.as_ref().unwrap().as_str()));
    assert!(url.ends_with(&format!("ttl={}", PHOTO_URL_TTL.as_secs())));
    assert!(state.item(without_photo.id).unwrap().photo_url.is_none());

    let sign_calls = backend
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::SignView(_)))
        .count();
    assert_eq!(sign_calls, 1);
}

#[tokio::test]
async fn test_signing_failure_drops_only_that_url() {
    let backend = backend();
    let good = backend.seed(USER, "Good", "UK", true);
    let bad = backend.seed(USER, "Bad", "UK", true);
    backend.seed(USER, "Also Good", "UK", true);
    backend.fail_signing(bad.photo_path.as_ref().unwrap());
    let mut page = RegistrationPage::new(&backend);

    page.enter().await;

    let state = page.state();
    assert_eq!(state.items().len(), 3);
    let unsigned = state
        .items()
        .iter()
        .filter(|item| item.photo_url.is_none())
        .count();
    assert_eq!(unsigned, 1);
    assert!(state.item(good.id).unwrap().photo_url.is_some());
    assert!(state.item(bad.id).unwrap().photo_url.is_none());
    assert!(state.message().is_none());
}

#[tokio::test]
async fn test_list_is_capped() {
    let backend = backend();
    for n in 0..(LIST_LIMIT + 5) {
        backend.seed(USER, &format!("Person {n}"), "UK", false);
    }
    let mut page = RegistrationPage::new(&backend);

    page.enter().await;

    assert_eq!(page.state().items().len(), LIST_LIMIT as usize);
    assert!(backend.calls().contains(&Call::List {
        owner: USER.to_string(),
        limit: LIST_LIMIT,
    }));
    assert_eq!(
        page.state().items()[0].registration.full_name,
        format!("Person {}", LIST_LIMIT + 4)
    );
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_list() {
    let backend = backend();
    let row = backend.seed(USER, "Ada", "UK", false);
    let mut page = RegistrationPage::new(&backend);
    page.enter().await;
    assert_eq!(page.state().items().len(), 1);

    backend.fail(Op::List, "list unavailable");
    let err = page.refresh().await.unwrap_err();

    assert!(matches!(err, PersistError::Backend(_)));
    assert_eq!(page.state().message(), Some("list unavailable"));
    assert!(!page.state().is_loading_list());
    assert_eq!(page.state().items()[0].registration.id, row.id);
}

#[tokio::test]
async fn test_refresh_before_gate_is_noop() {
    let backend = backend();
    backend.seed(USER, "Ada", "UK", false);
    let mut page = RegistrationPage::new(&backend);

    page.refresh().await.unwrap();

    assert!(page.state().items().is_empty());
    assert_eq!(backend.call_count(), 0);
}
