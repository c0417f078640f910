//! Login link request and logout.

#![allow(clippy::unwrap_used)]

use badge_integration_tests::{Call, MemoryBackend, Op};
use badge_registry::RegistrationPage;
use badge_registry::page::login::LINK_SENT_TEXT;
use badge_registry::page::{LoginError, LoginPage, REGISTER_PATH, Redirect};

const USER: &str = "ada@example.com";

#[tokio::test]
async fn test_link_is_sent_for_normalized_email() {
    let backend = MemoryBackend::new();
    let mut page = LoginPage::new(&backend);

    page.send_link("  Ada@Example.com ").await.unwrap();

    assert_eq!(page.message(), Some(LINK_SENT_TEXT));
    assert_eq!(
        backend.calls(),
        vec![Call::SignIn {
            email: USER.to_string(),
            redirect_to: REGISTER_PATH.to_string(),
        }]
    );
}

#[tokio::test]
async fn test_blank_email_makes_no_call() {
    let backend = MemoryBackend::new();
    let mut page = LoginPage::new(&backend);

    let err = page.send_link("   ").await.unwrap_err();

    assert!(matches!(err, LoginError::MissingEmail));
    assert_eq!(page.message(), Some("Enter your email address."));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_email_makes_no_call() {
    let backend = MemoryBackend::new();
    let mut page = LoginPage::new(&backend);

    let err = page.send_link("not-an-email").await.unwrap_err();

    assert!(matches!(err, LoginError::InvalidEmail(_)));
    assert_eq!(page.message(), Some("Enter a valid email address."));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_delivery_failure_shows_service_message() {
    let backend = MemoryBackend::new().failing(Op::SignIn, "mail server down");
    let mut page = LoginPage::new(&backend);

    let err = page.send_link(USER).await.unwrap_err();

    assert!(matches!(err, LoginError::Identity(_)));
    assert_eq!(page.message(), Some("mail server down"));
}

#[tokio::test]
async fn test_log_out_ends_session_and_redirects() {
    let backend = MemoryBackend::new().signed_in(USER).allow(USER, None);
    let mut page = RegistrationPage::new(&backend);
    page.enter().await;

    page.log_out().await.unwrap();

    assert!(backend.session().is_none());
    assert!(page.state().identity().is_none());
    assert_eq!(page.state().redirect(), Some(Redirect::Login));
}

#[tokio::test]
async fn test_log_out_failure_keeps_user_on_page() {
    let backend = MemoryBackend::new()
        .signed_in(USER)
        .allow(USER, None)
        .failing(Op::SignOut, "cannot end session");
    let mut page = RegistrationPage::new(&backend);
    page.enter().await;

    page.log_out().await.unwrap_err();

    assert!(page.state().identity().is_some());
    assert!(page.state().redirect().is_none());
    assert_eq!(page.state().message(), Some("cannot end session"));
}
