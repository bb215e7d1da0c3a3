use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use bytes::BytesMut;
use tracing::debug;

use crate::errors::AppError;
use crate::models::{ImageKind, Upload};

/// Largest request body accepted outside the upload routes.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Largest multipart body accepted on the upload routes. Single files are
/// capped separately while streaming, so this only bounds a whole batch.
pub const MAX_UPLOAD_BODY_BYTES: usize = 512 * 1024 * 1024;

fn read_error(e: MultipartError) -> AppError {
    AppError::Validation(e.body_text())
}

/// Collects every file part of a multipart form. Parts without a file name
/// are plain form fields and are skipped.
///
/// Each file keeps at most `kind.max_bytes() + 1` bytes; the rest of an
/// oversized part is drained and only its size is recorded, so validation
/// rejects that file alone.
pub async fn collect_uploads(
    mut multipart: Multipart,
    kind: ImageKind,
) -> Result<Vec<Upload>, AppError> {
    let cap = kind.max_bytes();
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field.content_type().map(str::to_string);
        let (bytes, size) = read_capped(field, cap + 1).await?;
        debug!("Received upload '{file_name}' ({size} bytes)");
        uploads.push(Upload::new(file_name, mime_type.as_deref(), bytes.freeze()).truncated(size));
    }
    Ok(uploads)
}

/// Reads a part chunk by chunk, keeping the first `keep` bytes.
/// Returns the kept bytes and the full size of the part.
async fn read_capped(mut field: Field<'_>, keep: usize) -> Result<(BytesMut, usize), AppError> {
    let mut kept = BytesMut::new();
    let mut size = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(read_error)? {
        size += chunk.len();
        let room = keep.saturating_sub(kept.len());
        kept.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
    Ok((kept, size))
}
