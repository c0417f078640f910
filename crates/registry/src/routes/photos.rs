//! Signed photo serving.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use badge_core::PhotoPath;

use crate::crop::JPEG_CONTENT_TYPE;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

/// Serve a stored photo if the URL was signed here and has not expired.
pub async fn serve(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Result<Response> {
    let path =
        PhotoPath::parse(&path).map_err(|_| AppError::NotFound("Photo not found.".to_string()))?;

    state
        .store()
        .verify(
            &path,
            query.expires,
            &query.signature,
            chrono::Utc::now().timestamp(),
        )
        .map_err(|e| {
            tracing::debug!(photo_path = %path, error = %e, "signed URL refused");
            AppError::Forbidden("Photo link is invalid or has expired.".to_string())
        })?;

    let bytes = state.store().read(&path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, JPEG_CONTENT_TYPE),
            (header::CACHE_CONTROL, "private, max-age=300"),
        ],
        bytes,
    )
        .into_response())
}
