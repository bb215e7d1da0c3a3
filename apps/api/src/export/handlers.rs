use axum::{
    extract::State,
    http::{header, HeaderName},
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::export::ExportArtifact;
use crate::state::AppState;

/// Download response for a finished PDF.
pub fn pdf_response(artifact: ExportArtifact) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.file_name),
        ),
        (
            HeaderName::from_static("x-page-count"),
            artifact.page_count.to_string(),
        ),
    ];
    (headers, artifact.bytes).into_response()
}

/// POST /api/v1/export
pub async fn handle_export(State(state): State<AppState>) -> Result<Response, AppError> {
    let artifact = state.session.export().await?;
    Ok(pdf_response(artifact))
}
