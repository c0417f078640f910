//! HTTP routes without a session.
//!
//! The pool is lazy and never connects: none of these requests touch the
//! database.

#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, Uri, header};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use badge_core::{Email, PhotoPath};
use badge_registry::services::{ObjectStore, UploadOptions};
use badge_registry::{AppState, RegistryConfig, routes};

fn config(storage_dir: PathBuf) -> RegistryConfig {
    RegistryConfig {
        database_url: SecretString::from("postgres://badge@localhost/badge_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        storage_dir,
        storage_signing_key: SecretString::from("k7Qm2vX9pL4nR8tW1zB6cF3hJ5dG0sYa"),
        email: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

fn state() -> AppState {
    let dir = std::env::temp_dir().join(format!("badge-router-{}", uuid::Uuid::new_v4()));
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://badge@localhost/badge_test")
        .unwrap();
    AppState::new(config(dir), pool).unwrap()
}

fn app(state: &AppState) -> Router {
    routes::app(state.clone())
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn photo_path() -> PhotoPath {
    PhotoPath::generate(&Email::parse("ada@example.com").unwrap(), 1_700_000_000_000, 0xbeef)
}

#[tokio::test]
async fn test_health() {
    let response = app(&state())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 16).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_register_redirects_browser_to_login() {
    let response = app(&state())
        .oneshot(Request::get("/register").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_register_rejects_api_client_with_401() {
    let response = app(&state())
        .oneshot(
            Request::get("/register")
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Not logged in.");
    assert_eq!(body["redirect"], "/login");
}

#[tokio::test]
async fn test_delete_without_session_is_gated() {
    let response = app(&state())
        .oneshot(
            Request::delete("/register/1?confirm=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_submit_without_session_is_gated_before_body() {
    let boundary = "badge-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"photo\"; filename=\"a.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         not really a png\r\n\
         --{boundary}--\r\n"
    );

    let response = app(&state())
        .oneshot(
            Request::post("/register")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_submit_without_session_or_form_is_gated() {
    let response = app(&state())
        .oneshot(
            Request::post("/register")
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_edit_without_session_is_gated_before_body() {
    let response = app(&state())
        .oneshot(
            Request::patch("/register/1")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_login_page_describes_form() {
    let response = app(&state())
        .oneshot(Request::get("/login").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["action"]["path"], "/login");
}

#[tokio::test]
async fn test_login_with_blank_email_is_bad_request() {
    let response = app(&state())
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email":"  "}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Enter your email address.");
}

#[tokio::test]
async fn test_login_with_malformed_email_is_bad_request() {
    let response = app(&state())
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email":"nobody"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Enter a valid email address."
    );
}

#[tokio::test]
async fn test_photo_with_bad_signature_is_forbidden() {
    let path = photo_path();
    let uri = format!("/photos/{}?expires=4102444800&signature=00", path.as_str());

    let response = app(&state())
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_photo_outside_owner_namespace_is_not_found() {
    let response = app(&state())
        .oneshot(
            Request::get("/photos/loose.jpg?expires=4102444800&signature=00")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signed_photo_is_served() {
    let state = state();
    let path = photo_path();
    let jpeg = vec![0xff, 0xd8, 0xff, 0xd9];
    let options = UploadOptions {
        content_type: "image/jpeg",
        overwrite: false,
    };
    state.store().upload(&path, jpeg.clone(), options).await.unwrap();

    let expires = chrono::Utc::now().timestamp() + 600;
    let signed: Uri = state
        .store()
        .signed_url(&path, expires)
        .unwrap()
        .parse()
        .unwrap();
    let target = signed.path_and_query().unwrap().as_str().to_string();

    let response = app(&state)
        .oneshot(Request::get(target).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], &jpeg[..]);
}

#[tokio::test]
async fn test_signed_link_to_missing_photo_is_not_found() {
    let state = state();
    let path = photo_path();
    let expires = chrono::Utc::now().timestamp() + 600;
    let signed: Uri = state
        .store()
        .signed_url(&path, expires)
        .unwrap()
        .parse()
        .unwrap();

    let response = app(&state)
        .oneshot(
            Request::get(signed.path_and_query().unwrap().as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
