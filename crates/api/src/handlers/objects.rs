//! Handlers for artifact upload and download.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use lpms_core::error::CoreError;
use lpms_core::objects::NewObject;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /objects
///
/// Accepts a multipart form with a single `file` field and returns the
/// stored object's metadata. The returned `id` is what reserve records
/// reference in `site_photo` / `upload_cad_id`.
pub async fn upload_object(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.bin").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some((file_name, content_type, data.to_vec()));
    }

    let (file_name, content_type, bytes) = upload.ok_or_else(|| {
        AppError::Core(CoreError::InvalidArgument(
            "Multipart field 'file' is required".into(),
        ))
    })?;

    if bytes.is_empty() {
        return Err(CoreError::InvalidArgument("Uploaded file is empty".into()).into());
    }
    let max = state.config.max_upload_bytes;
    if bytes.len() > max {
        return Err(CoreError::InvalidArgument(format!(
            "Uploaded file is {} bytes; the limit is {max}",
            bytes.len()
        ))
        .into());
    }

    let stored = state
        .engine
        .objects()
        .put(NewObject {
            file_name,
            content_type,
            created_by: auth.open_id.clone(),
            bytes,
        })
        .await?;

    tracing::info!(
        object_id = %stored.id,
        size_bytes = stored.size_bytes,
        actor = %auth.open_id,
        "Object uploaded",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: stored })))
}

/// GET /objects/{id}
///
/// Streams the stored bytes back with their recorded content type.
pub async fn download_object(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let object = state
        .engine
        .objects()
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Object '{id}' not found")))?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        object.meta.file_name.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, object.meta.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        object.bytes,
    ))
}
