//! Route answers for admitted page entries.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use axum::response::Response;

use badge_core::RegistrationId;
use badge_integration_tests::{Call, MemoryBackend, Op};
use badge_registry::RegistrationPage;
use badge_registry::error::AppError;
use badge_registry::page::LIST_LIMIT;
use badge_registry::routes::register::{EditForm, answer_delete, answer_edit, answer_show};

const USER: &str = "ada@example.com";
const OTHER: &str = "grace@example.com";

fn backend() -> MemoryBackend {
    MemoryBackend::new().signed_in(USER).allow(USER, None)
}

fn form(full_name: &str, country: &str) -> EditForm {
    EditForm {
        full_name: full_name.to_string(),
        country: country.to_string(),
    }
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_failed_list_load_is_bad_gateway_with_message() {
    let backend = backend().failing(Op::List, "list unavailable");
    let row = backend.seed(USER, "Ada", "UK", true);
    let mut page = RegistrationPage::new(&backend);
    assert!(page.enter().await.is_ready());

    let response = answer_show(&page);
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["message"], "list unavailable");

    let response = answer_edit(&mut page, row.id, form("Changed", "FR")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["message"], "list unavailable");

    let response = answer_delete(&mut page, row.id, true).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["message"], "list unavailable");

    assert_eq!(backend.row(row.id).unwrap().full_name, "Ada");
}

#[tokio::test]
async fn test_rows_past_the_list_cap_can_be_edited_and_deleted() {
    let backend = backend();
    let oldest = backend.seed(USER, "Oldest", "UK", true);
    let path = oldest.photo_path.clone().unwrap();
    for n in 0..LIST_LIMIT {
        backend.seed(USER, &format!("Person {n}"), "UK", false);
    }

    let mut page = RegistrationPage::new(&backend);
    page.enter().await;
    let response = answer_edit(&mut page, oldest.id, form(" Renamed ", " NO ")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let row = backend.row(oldest.id).unwrap();
    assert_eq!((row.full_name.as_str(), row.country.as_str()), ("Renamed", "NO"));

    let mut page = RegistrationPage::new(&backend);
    page.enter().await;
    let response = answer_delete(&mut page, oldest.id, true).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(backend.row(oldest.id).is_none());
    assert!(backend.object(&path).is_none());
}

#[tokio::test]
async fn test_unowned_or_missing_rows_are_not_found() {
    let backend = backend();
    let theirs = backend.seed(OTHER, "Grace", "US", true);
    let mut page = RegistrationPage::new(&backend);
    page.enter().await;

    let response = answer_edit(&mut page, theirs.id, form("Hijacked", "XX")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Registration not found.");

    let response = answer_delete(&mut page, RegistrationId::new(999), true)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(backend.row(theirs.id).unwrap().full_name, "Grace");
    assert!(!backend.calls().iter().any(|c| matches!(c, Call::Update(_) | Call::Delete(_))));
}

#[tokio::test]
async fn test_edit_validation_is_unprocessable() {
    let backend = backend();
    let row = backend.seed(USER, "Ada", "UK", false);
    let mut page = RegistrationPage::new(&backend);
    page.enter().await;

    let response = answer_edit(&mut page, row.id, form("  ", "UK")).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Enter NAME SURNAME.");
    assert_eq!(body["edit"]["id"], row.id.as_i32());
}

#[tokio::test]
async fn test_unconfirmed_delete_is_refused_without_calls() {
    let backend = backend();
    let row = backend.seed(USER, "Ada", "UK", true);
    let mut page = RegistrationPage::new(&backend);
    page.enter().await;
    backend.clear_calls();

    let err = answer_delete(&mut page, row.id, false).await.unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(backend.call_count(), 0);
    assert!(backend.row(row.id).is_some());
}
