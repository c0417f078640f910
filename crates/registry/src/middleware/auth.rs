//! Gate rejections and the extractor that carries a page entry's inputs.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use thiserror::Error;
use tower_sessions::Session;

use crate::page::{GateOutcome, LOGIN_PATH};

/// How the caller wants rejections delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// Browser navigation: redirects.
    Browser,
    /// `Accept: application/json`: status codes.
    Api,
}

impl ClientKind {
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        let wants_json = parts
            .headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));
        if wants_json { Self::Api } else { Self::Browser }
    }
}

/// Extractor for a page entry: the request's session and client kind.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(State(state): State<AppState>, entry: PageEntry) -> Response {
///     let backend = state.backend(entry.session);
///     let mut page = RegistrationPage::new(&backend);
///     admit(page.enter().await, entry.client)?;
///     // ...
/// }
/// ```
pub struct PageEntry {
    pub session: Session,
    pub client: ClientKind,
}

/// Why a page entry was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateRejection {
    /// Redirect to the login page (for browser requests).
    #[error("Not logged in, redirecting to login.")]
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    #[error("Not logged in.")]
    Unauthorized,
    /// The allow-list could not be read.
    #[error("{0}")]
    Halted(String),
    /// No session layer in front of the handler.
    #[error("Session layer missing.")]
    MissingSession,
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Not logged in.", "redirect": LOGIN_PATH })),
            )
                .into_response(),
            Self::Halted(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": message })))
                    .into_response()
            }
            Self::MissingSession => {
                tracing::error!("session layer missing");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for PageEntry
where
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(GateRejection::MissingSession)?;

        Ok(Self {
            session,
            client: ClientKind::from_parts(parts),
        })
    }
}

/// Turn a gate outcome into "go ahead" or the matching rejection.
///
/// # Errors
///
/// Returns a [`GateRejection`] unless the outcome is `Ready`.
pub fn admit(outcome: &GateOutcome, client: ClientKind) -> Result<(), GateRejection> {
    match outcome {
        GateOutcome::Ready { email, .. } => {
            crate::error::set_sentry_user(email.as_str());
            Ok(())
        }
        GateOutcome::Redirect(_) => Err(match client {
            ClientKind::Browser => GateRejection::RedirectToLogin,
            ClientKind::Api => GateRejection::Unauthorized,
        }),
        GateOutcome::Halted(message) => Err(GateRejection::Halted(message.clone())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;
    use crate::page::Redirect as PageRedirect;

    fn parts(accept: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/register");
        if let Some(accept) = accept {
            builder = builder.header(header::ACCEPT, accept);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_client_kind_from_accept_header() {
        assert_eq!(ClientKind::from_parts(&parts(None)), ClientKind::Browser);
        assert_eq!(
            ClientKind::from_parts(&parts(Some("text/html"))),
            ClientKind::Browser
        );
        assert_eq!(
            ClientKind::from_parts(&parts(Some("application/json"))),
            ClientKind::Api
        );
    }

    #[test]
    fn test_redirect_outcome_depends_on_client() {
        let outcome = GateOutcome::Redirect(PageRedirect::Login);
        assert_eq!(
            admit(&outcome, ClientKind::Browser),
            Err(GateRejection::RedirectToLogin)
        );
        assert_eq!(
            admit(&outcome, ClientKind::Api),
            Err(GateRejection::Unauthorized)
        );
    }

    #[test]
    fn test_halt_is_service_unavailable() {
        let outcome = GateOutcome::Halted("allow-list down".to_string());
        let rejection = admit(&outcome, ClientKind::Browser).unwrap_err();
        assert_eq!(
            rejection.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_browser_redirect_is_see_other() {
        let response = GateRejection::RedirectToLogin.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }
}
