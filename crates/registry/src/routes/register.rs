//! Registration page routes.
//!
//! Every handler is one page entry: it builds a fresh [`RegistrationPage`],
//! runs the gate, replays the request's inputs as page operations and
//! answers with a [`PageView`] of the resulting state.

use axum::{
    Json,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use badge_core::{CropRect, RegistrationId, Zoom};

use crate::crop::{CropGeometry, SourceImage};
use crate::error::{AppError, Result};
use crate::middleware::{PageEntry, admit};
use crate::models::ListItem;
use crate::page::{
    EditError, NOTICE_DURATION, PageState, RegistrationPage, SubmitError,
};
use crate::services::{Backend, PersistError};
use crate::state::AppState;

// =============================================================================
// View
// =============================================================================

#[derive(Debug, Serialize)]
pub struct DraftView {
    pub full_name: String,
    pub country: String,
    /// `data:` URL of the cropped photo.
    pub photo_preview: Option<String>,
    pub crop_open: bool,
    pub zoom: f32,
}

#[derive(Debug, Serialize)]
pub struct NoticeView {
    pub text: String,
    pub dismiss_after_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct EditView {
    pub id: RegistrationId,
    pub full_name: String,
    pub country: String,
    pub saving: bool,
}

/// Snapshot of the page returned by every registration route.
#[derive(Debug, Serialize)]
pub struct PageView {
    pub email: Option<String>,
    pub draft: DraftView,
    pub items: Vec<ListItem>,
    pub loading: bool,
    pub message: Option<String>,
    pub notice: Option<NoticeView>,
    pub edit: Option<EditView>,
    pub pending_delete: Option<RegistrationId>,
}

impl PageView {
    #[must_use]
    pub fn from_state(state: &PageState) -> Self {
        let draft = state.draft();
        Self {
            email: state.identity().map(|e| e.as_str().to_string()),
            draft: DraftView {
                full_name: draft.full_name.clone(),
                country: draft.country.clone(),
                photo_preview: draft.photo.as_ref().map(|a| a.photo().preview().to_string()),
                crop_open: draft.crop.is_some(),
                zoom: draft.crop.as_ref().map_or(1.0, |c| c.zoom().get()),
            },
            items: state.items().to_vec(),
            loading: state.is_loading_list(),
            message: state.message().map(str::to_string),
            notice: state.notice_at(Utc::now()).map(|n| NoticeView {
                text: n.text.clone(),
                dismiss_after_ms: u64::try_from(NOTICE_DURATION.as_millis()).unwrap_or(u64::MAX),
            }),
            edit: state.edit().map(|f| EditView {
                id: f.id,
                full_name: f.full_name.clone(),
                country: f.country.clone(),
                saving: f.saving,
            }),
            pending_delete: state.pending_delete(),
        }
    }
}

fn view<B: Backend>(status: StatusCode, page: &RegistrationPage<'_, B>) -> Response {
    (status, Json(PageView::from_state(page.state()))).into_response()
}

/// The page view with a 502 when the entry's list sync failed.
fn stale_list<B: Backend>(page: &RegistrationPage<'_, B>) -> Option<Response> {
    page.state()
        .is_list_stale()
        .then(|| view(StatusCode::BAD_GATEWAY, page))
}

const fn persist_status(err: &PersistError) -> StatusCode {
    match err {
        PersistError::NotFound => StatusCode::NOT_FOUND,
        PersistError::Backend(_) => StatusCode::BAD_GATEWAY,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Page entry: gate, then the owner's list.
pub async fn show(State(state): State<AppState>, entry: PageEntry) -> Result<Response> {
    let backend = state.backend(entry.session);
    let mut page = RegistrationPage::new(&backend);
    admit(&page.enter().await, entry.client)?;

    Ok(answer_show(&page))
}

/// Answer for an admitted page entry.
pub fn answer_show<B: Backend>(page: &RegistrationPage<'_, B>) -> Response {
    stale_list(page).unwrap_or_else(|| view(StatusCode::OK, page))
}

/// Submitted multipart form.
#[derive(Debug, Default)]
struct SubmitForm {
    full_name: Option<String>,
    country: Option<String>,
    photo: Option<SourceImage>,
    crop_x: Option<u32>,
    crop_y: Option<u32>,
    crop_size: Option<u32>,
    zoom: Option<f32>,
}

impl SubmitForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "photo" => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    if !bytes.is_empty() {
                        form.photo = Some(SourceImage::from_bytes(bytes.to_vec()));
                    }
                }
                "photo_data_url" => {
                    let text = field_text(field).await?;
                    if !text.is_empty() {
                        let source = SourceImage::from_data_url(&text)
                            .map_err(|e| AppError::BadRequest(e.to_string()))?;
                        form.photo = Some(source);
                    }
                }
                "full_name" => form.full_name = Some(field_text(field).await?),
                "country" => form.country = Some(field_text(field).await?),
                "crop_x" => form.crop_x = Some(parse_field(&name, &field_text(field).await?)?),
                "crop_y" => form.crop_y = Some(parse_field(&name, &field_text(field).await?)?),
                "crop_size" => {
                    form.crop_size = Some(parse_field(&name, &field_text(field).await?)?);
                }
                "zoom" => form.zoom = Some(parse_field(&name, &field_text(field).await?)?),
                _ => tracing::debug!(field = %name, "ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    /// Crop geometry, required whenever a photo is sent.
    fn geometry(&self) -> Result<Option<CropGeometry>> {
        if self.photo.is_none() {
            return Ok(None);
        }
        let (Some(x), Some(y), Some(size)) = (self.crop_x, self.crop_y, self.crop_size) else {
            return Err(AppError::BadRequest(
                "crop_x, crop_y and crop_size are required with a photo.".to_string(),
            ));
        };
        let rect = CropRect::square(x, y, size).map_err(|e| AppError::BadRequest(e.to_string()))?;
        let zoom = self
            .zoom
            .map(Zoom::new)
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?
            .unwrap_or_default();
        Ok(Some(CropGeometry::new(rect, zoom)))
    }
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

fn parse_field<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid value for {name}.")))
}

/// Submit a registration.
///
/// The body is only read once the gate has admitted the entry.
pub async fn submit(
    State(state): State<AppState>,
    entry: PageEntry,
    request: Request,
) -> Result<Response> {
    let backend = state.backend(entry.session);
    let mut page = RegistrationPage::new(&backend);
    admit(&page.enter().await, entry.client)?;

    let multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    let form = SubmitForm::read(multipart).await?;
    let geometry = form.geometry()?;

    if let Some(name) = form.full_name {
        page.set_full_name(name);
    }
    if let Some(country) = form.country {
        page.set_country(country);
    }
    if let (Some(source), Some(geometry)) = (form.photo, geometry) {
        page.select_photo(source);
        page.set_crop(geometry);
        if page.apply_crop().await.is_err() {
            return Ok(view(StatusCode::UNPROCESSABLE_ENTITY, &page));
        }
    }

    let status = match page.submit().await {
        Ok(_) => StatusCode::CREATED,
        Err(SubmitError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        Err(SubmitError::Upload(_)) => StatusCode::BAD_GATEWAY,
        Err(SubmitError::Persist(err)) => persist_status(&err),
    };
    Ok(view(status, &page))
}

#[derive(Debug, Deserialize)]
pub struct EditForm {
    pub full_name: String,
    pub country: String,
}

/// Edit name and country of an owned registration.
pub async fn edit(
    State(state): State<AppState>,
    entry: PageEntry,
    Path(id): Path<i32>,
    request: Request,
) -> Result<Response> {
    let id = RegistrationId::new(id);
    let backend = state.backend(entry.session);
    let mut page = RegistrationPage::new(&backend);
    admit(&page.enter().await, entry.client)?;

    let Json(form) = Json::<EditForm>::from_request(request, &state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;

    Ok(answer_edit(&mut page, id, form).await)
}

/// Apply an edit to an admitted page entry.
///
/// The row is addressed by id; the store's owner filter decides whether it
/// exists for this user.
pub async fn answer_edit<B: Backend>(
    page: &mut RegistrationPage<'_, B>,
    id: RegistrationId,
    form: EditForm,
) -> Response {
    if let Some(response) = stale_list(page) {
        return response;
    }
    if let Err(err) = page.open_edit_by_id(id).await {
        return view(persist_status(&err), page);
    }
    page.set_edit_name(form.full_name);
    page.set_edit_country(form.country);

    let status = match page.save_edit().await {
        Ok(()) => StatusCode::OK,
        Err(EditError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        Err(EditError::Persist(err)) => persist_status(&err),
    };
    view(status, page)
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// Delete an owned registration and its photo.
pub async fn delete(
    State(state): State<AppState>,
    entry: PageEntry,
    Path(id): Path<i32>,
    Query(query): Query<DeleteQuery>,
) -> Result<Response> {
    let id = RegistrationId::new(id);
    let backend = state.backend(entry.session);
    let mut page = RegistrationPage::new(&backend);
    admit(&page.enter().await, entry.client)?;

    answer_delete(&mut page, id, query.confirm).await
}

/// Delete by id from an admitted page entry.
///
/// # Errors
///
/// Returns `AppError::BadRequest` unless `confirm` is set.
pub async fn answer_delete<B: Backend>(
    page: &mut RegistrationPage<'_, B>,
    id: RegistrationId,
    confirm: bool,
) -> Result<Response> {
    if let Some(response) = stale_list(page) {
        return Ok(response);
    }
    if !confirm {
        return Err(AppError::BadRequest(
            "Deletion must be confirmed with confirm=true.".to_string(),
        ));
    }
    page.request_delete_by_id(id);

    let status = match page.confirm_delete().await {
        Ok(()) => StatusCode::OK,
        Err(err) => persist_status(&err),
    };
    Ok(view(status, page))
}
