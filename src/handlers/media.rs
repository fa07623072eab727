use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use http::{header, HeaderMap, StatusCode};
use serde::Deserialize;
use tracing::warn;

use crate::auth;
use crate::errors::AppError;
use crate::uploads::{content_type_for_extension, Category, IngestResult};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct FromUrlBody {
    url: String,
    #[serde(default)]
    category: Category,
}

/// Multipart upload endpoint: `file` carries the image, `category` picks
/// the storage subdirectory.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth::require_session(&state.db, &headers)?;

    let mut file: Option<(bytes::Bytes, String, String)> = None;
    let mut category = Category::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                let declared_mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let contents = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                file = Some((contents, declared_mime, original_name));
            }
            Some("category") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                category = match value.as_str() {
                    "site" => Category::Site,
                    _ => Category::Blog,
                };
            }
            other => {
                warn!("ignoring unknown multipart field {:?}", other);
            }
        }
    }

    let Some((contents, declared_mime, original_name)) = file else {
        return Err(AppError::Validation("No file provided".into()));
    };

    let result = state
        .store
        .ingest_upload(&state.db, contents, &declared_mime, &original_name, category)
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// Imports a remote image so every referenced asset ends up on this server.
pub async fn upload_from_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<FromUrlBody>,
) -> Result<(StatusCode, Json<IngestResult>), AppError> {
    auth::require_session(&state.db, &headers)?;

    let trimmed = body.url.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Valid image URL is required".into()));
    }

    let result = state
        .store
        .ingest_from_url(&state.db, &state.http_client, trimmed, body.category)
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// Serves previously stored files. The traversal guard lives in
/// `UploadStore::resolve_for_serving`; everything here is read-and-reply.
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let resolved = state.store.resolve_for_serving(&segments).await?;

    let metadata = tokio::fs::metadata(&resolved)
        .await
        .map_err(|_| AppError::NotFound)?;
    if !metadata.is_file() {
        return Err(AppError::NotFound);
    }

    let contents = tokio::fs::read(&resolved)
        .await
        .map_err(|_| AppError::NotFound)?;

    let extension = resolved
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type_for_extension(extension)),
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable",
            ),
        ],
        contents,
    ))
}
