use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::errors::AppError;
use crate::gallery::BatchOutcome;
use crate::modal::ModalState;
use crate::models::{CertificateId, ImageKind, ValidationError};
use crate::routes::uploads::collect_uploads;
use crate::session::handlers::ConfirmQuery;
use crate::state::AppState;

fn gallery_view(state: &AppState) -> Result<Json<Value>, AppError> {
    let view = state
        .session
        .read(|p| serde_json::to_value(p.gallery.view()))
        .map_err(anyhow::Error::from)?;
    Ok(Json(view))
}

/// GET /api/v1/certificates
pub async fn handle_get_certificates(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    gallery_view(&state)
}

/// POST /api/v1/certificates
/// Each file is validated on its own; rejected files do not block the rest.
pub async fn handle_upload_certificates(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BatchOutcome>, AppError> {
    let uploads = collect_uploads(multipart, ImageKind::Certificate).await?;
    if uploads.is_empty() {
        return Err(ValidationError::Empty.into());
    }
    Ok(Json(state.session.upload_certificates(&uploads)))
}

/// DELETE /api/v1/certificates/:id?confirm=true
pub async fn handle_remove_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ConfirmQuery>,
) -> Result<StatusCode, AppError> {
    let id = CertificateId::from(id.as_str());
    if !state.session.remove_certificate(&id, params.confirm)? {
        return Err(AppError::NotFound(format!("Certificate {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/certificates/:id/open
pub async fn handle_open_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ModalState>, AppError> {
    let id = CertificateId::from(id.as_str());
    if !state.session.open_certificate(&id) {
        return Err(AppError::NotFound(format!("Certificate {id} not found")));
    }
    Ok(Json(state.session.read(|p| p.modal.state().clone())))
}

/// POST /api/v1/certificates/next
pub async fn handle_next_page(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.session.next_certificates();
    gallery_view(&state)
}

/// POST /api/v1/certificates/prev
pub async fn handle_previous_page(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    state.session.previous_certificates();
    gallery_view(&state)
}
