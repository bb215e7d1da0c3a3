use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::export::handlers::pdf_response;
use crate::modal::{Modal, ModalInput};
use crate::session::notices::Notice;
use crate::session::shortcuts::KeyPress;
use crate::session::{KeyOutcome, Stats};
use crate::state::AppState;
use crate::view::render_page;

/// `?confirm=true` acknowledges a destructive action.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Deserialize)]
pub struct ModalInputRequest {
    pub input: ModalInput,
}

#[derive(Serialize)]
pub struct ModalInputResponse {
    pub consumed: bool,
    pub modal: Modal,
}

#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum KeyResponse {
    Saved { saved: bool },
    ModalClosed { closed: bool },
    Ignored,
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub saved: bool,
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
}

/// GET /
pub async fn handle_index(State(state): State<AppState>) -> Html<String> {
    Html(state.session.read(render_page))
}

/// GET /api/v1/modal
pub async fn handle_get_modal(State(state): State<AppState>) -> Json<Modal> {
    Json(state.session.read(|p| p.modal.clone()))
}

/// POST /api/v1/modal/input
pub async fn handle_modal_input(
    State(state): State<AppState>,
    Json(req): Json<ModalInputRequest>,
) -> Json<ModalInputResponse> {
    let consumed = state.session.modal_input(req.input);
    Json(ModalInputResponse {
        consumed,
        modal: state.session.read(|p| p.modal.clone()),
    })
}

/// POST /api/v1/keys
/// Ctrl+E answers with the PDF itself.
pub async fn handle_key(
    State(state): State<AppState>,
    Json(press): Json<KeyPress>,
) -> Result<Response, AppError> {
    let response = match state.session.handle_key(&press).await {
        KeyOutcome::Saved(saved) => KeyResponse::Saved { saved },
        KeyOutcome::Exported(result) => return Ok(pdf_response(result?)),
        KeyOutcome::ModalClosed(closed) => KeyResponse::ModalClosed { closed },
        KeyOutcome::Ignored => KeyResponse::Ignored,
    };
    Ok(Json(response).into_response())
}

/// POST /api/v1/save
pub async fn handle_save(State(state): State<AppState>) -> Json<SaveResponse> {
    let saved = state.session.save_now().await;
    Json(SaveResponse { saved })
}

/// DELETE /api/v1/data?confirm=true
pub async fn handle_clear(
    State(state): State<AppState>,
    Query(params): Query<ConfirmQuery>,
) -> Result<Json<ClearResponse>, AppError> {
    let cleared = state.session.clear_all(params.confirm).await?;
    Ok(Json(ClearResponse { cleared }))
}

/// GET /api/v1/stats
pub async fn handle_stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.session.stats())
}

/// GET /api/v1/notices
/// Returns pending notices and forgets them.
pub async fn handle_notices(State(state): State<AppState>) -> Json<Vec<Notice>> {
    Json(state.session.drain_notices())
}
