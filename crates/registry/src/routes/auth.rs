//! Login, link verification and logout.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result, clear_sentry_user};
use crate::middleware::{ClientKind, PageEntry};
use crate::page::{LOGIN_PATH, LoginPage, RegistrationPage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

/// Where gate redirects land.
pub async fn login_page() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Enter your email address.",
        "action": { "method": "POST", "path": LOGIN_PATH, "fields": ["email"] },
    }))
}

/// Send a one-time login link.
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    entry: PageEntry,
    Json(form): Json<LoginForm>,
) -> Result<Response> {
    let identity = state.identity(entry.session);
    let mut page = LoginPage::new(&identity);
    page.send_link(&form.email).await?;

    let message = page.message().unwrap_or_default();
    Ok((StatusCode::ACCEPTED, Json(json!({ "message": message }))).into_response())
}

/// Consume a login link and continue to where it points.
#[tracing::instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    entry: PageEntry,
    Query(query): Query<VerifyQuery>,
) -> Result<Response> {
    let identity = state.identity(entry.session);
    match identity.complete_sign_in(&query.token).await? {
        Some(target) => Ok(Redirect::to(&target).into_response()),
        None => Err(AppError::BadRequest(
            "Login link is invalid or has expired.".to_string(),
        )),
    }
}

/// End the session.
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, entry: PageEntry) -> Result<Response> {
    let backend = state.backend(entry.session);
    let mut page = RegistrationPage::new(&backend);
    page.log_out().await?;
    clear_sentry_user();

    Ok(match entry.client {
        ClientKind::Browser => Redirect::to(LOGIN_PATH).into_response(),
        ClientKind::Api => StatusCode::NO_CONTENT.into_response(),
    })
}
