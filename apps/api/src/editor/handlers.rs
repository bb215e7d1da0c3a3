use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::editor::{EducationField, EntryId, ExperienceField, FieldKey};
use crate::errors::AppError;
use crate::modal::ModalState;
use crate::models::{Document, ImageKind, ValidationError};
use crate::routes::uploads::collect_uploads;
use crate::session::handlers::ConfirmQuery;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TextUpdate {
    pub text: String,
}

#[derive(Deserialize)]
pub struct ExperienceUpdate {
    pub field: ExperienceField,
    pub text: String,
}

#[derive(Deserialize)]
pub struct EducationUpdate {
    pub field: EducationField,
    pub text: String,
}

#[derive(Serialize)]
pub struct EntryCreated {
    pub id: EntryId,
}

#[derive(Serialize)]
pub struct Removed {
    pub removed: bool,
}

/// GET /api/v1/document
pub async fn handle_get_document(State(state): State<AppState>) -> Json<Document> {
    Json(state.session.document())
}

/// PUT /api/v1/document
pub async fn handle_put_document(
    State(state): State<AppState>,
    Json(document): Json<Document>,
) -> Json<Document> {
    state.session.import(&document);
    Json(state.session.document())
}

/// PATCH /api/v1/fields/:field
pub async fn handle_set_field(
    State(state): State<AppState>,
    Path(field): Path<String>,
    Json(req): Json<TextUpdate>,
) -> Result<StatusCode, AppError> {
    let key: FieldKey = field.parse().map_err(AppError::NotFound)?;
    state.session.set_field(key, req.text);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/experience
pub async fn handle_add_experience(
    State(state): State<AppState>,
) -> (StatusCode, Json<EntryCreated>) {
    let id = state.session.add_experience();
    (StatusCode::CREATED, Json(EntryCreated { id }))
}

/// PATCH /api/v1/experience/:id
pub async fn handle_update_experience(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
    Json(req): Json<ExperienceUpdate>,
) -> Result<StatusCode, AppError> {
    state.session.update_experience(id, req.field, req.text)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/experience/:id
pub async fn handle_remove_experience(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> Result<StatusCode, AppError> {
    state.session.remove_experience(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/education
pub async fn handle_add_education(
    State(state): State<AppState>,
) -> (StatusCode, Json<EntryCreated>) {
    let id = state.session.add_education();
    (StatusCode::CREATED, Json(EntryCreated { id }))
}

/// PATCH /api/v1/education/:id
pub async fn handle_update_education(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
    Json(req): Json<EducationUpdate>,
) -> Result<StatusCode, AppError> {
    state.session.update_education(id, req.field, req.text)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/education/:id
pub async fn handle_remove_education(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> Result<StatusCode, AppError> {
    state.session.remove_education(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/photo
/// Uses the first file of the form.
pub async fn handle_upload_photo(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<StatusCode, AppError> {
    let uploads = collect_uploads(multipart, ImageKind::ProfilePhoto).await?;
    let upload = uploads.first().ok_or(ValidationError::Empty)?;
    state.session.set_profile_photo(upload)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/photo?confirm=true
pub async fn handle_delete_photo(
    State(state): State<AppState>,
    Query(params): Query<ConfirmQuery>,
) -> Result<Json<Removed>, AppError> {
    let removed = state.session.delete_profile_photo(params.confirm)?;
    Ok(Json(Removed { removed }))
}

/// POST /api/v1/photo/open
pub async fn handle_open_photo(
    State(state): State<AppState>,
) -> Result<Json<ModalState>, AppError> {
    if !state.session.open_profile_photo() {
        return Err(AppError::NotFound("No profile photo".to_string()));
    }
    Ok(Json(state.session.read(|p| p.modal.state().clone())))
}
