//! HTTP route handlers for the badge registry.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                - Liveness check
//! GET    /health/ready          - Database readiness
//!
//! # Auth
//! GET    /login                 - Login instructions
//! POST   /login                 - Send a login link (JSON {email})
//! GET    /auth/verify?token=    - Consume a login link, start the session
//! POST   /logout                - End the session
//!
//! # Registration page (gate runs on every request)
//! GET    /register              - Page view with the owner's list
//! POST   /register              - Submit (multipart)
//! PATCH  /register/{id}         - Edit name and country
//! DELETE /register/{id}         - Delete (requires ?confirm=true)
//!
//! # Photos
//! GET    /photos/{*path}        - Serve a stored photo with a valid signature
//! ```

pub mod auth;
pub mod health;
pub mod photos;
pub mod register;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};

use crate::middleware::create_session_layer;
use crate::state::AppState;

/// Largest accepted submit body (photo plus form fields).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/auth/verify", get(auth::verify))
        .route("/logout", post(auth::logout))
}

/// Create the registration page router.
pub fn register_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            get(register::show)
                .post(register::submit)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/register/{id}",
            patch(register::edit).delete(register::delete),
        )
}

/// Create the photo serving router.
pub fn photo_routes() -> Router<AppState> {
    Router::new().route("/photos/{*path}", get(photos::serve))
}

/// All application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(auth_routes())
        .merge(register_routes())
        .merge(photo_routes())
}

/// The application with sessions, ready for tracing and Sentry layers.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());
    routes().layer(session_layer).with_state(state)
}
