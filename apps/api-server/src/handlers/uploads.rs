//! Serving stored images.

use std::path::Path;

use actix_web::{HttpResponse, http::header, web};

use shutter_core::domain::{ImageKind, is_valid_stored_name};
use shutter_core::error::StorageError;

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /uploads/{filename}
pub async fn serve(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let filename = path.into_inner();
    let not_found = || AppError::NotFound(format!("upload {filename} not found"));

    if !is_valid_stored_name(&filename) {
        return Err(not_found());
    }

    let kind = Path::new(&filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageKind::from_extension)
        .ok_or_else(not_found)?;

    let bytes = match state.files.read(&filename).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_) | StorageError::InvalidName(_)) => return Err(not_found()),
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };

    Ok(HttpResponse::Ok()
        .content_type(kind.mime())
        .insert_header((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        // Stored names are never reused, so the content never changes.
        .insert_header((header::CACHE_CONTROL, "public, max-age=31536000, immutable"))
        .body(bytes))
}
