use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use futures::TryStreamExt;
use sea_orm::EntityTrait;
use serde::Serialize;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

use crate::entities::prelude::*;
use crate::error::AppError;
use crate::utils::auth::Claims;
use crate::utils::validation::sanitize_video_filename;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    /// Final on-disk name; differs from the uploaded name when a collision
    /// suffix was applied.
    pub filename: String,
    pub size: u64,
}

#[derive(Serialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<String>,
}

/// Resolves the authenticated user's username, which keys their partition.
async fn owner_username(state: &crate::AppState, claims: &Claims) -> Result<String, AppError> {
    let user = Users::find_by_id(&claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;
    Ok(user.username)
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = Multipart, description = "Video upload (field: video_file)"),
    responses(
        (status = 200, description = "Video uploaded", body = UploadResponse),
        (status = 400, description = "Missing file or unsupported format"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Collision retries exhausted"),
        (status = 413, description = "File too large")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn upload_video(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let owner = owner_username(&state, &claims).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("video_file") {
            continue;
        }

        let original_filename = field.file_name().unwrap_or("unnamed").to_string();
        let filename = sanitize_video_filename(&original_filename)?;

        // Stream the body straight into staging; the size cap is enforced
        // during the copy.
        let body_with_io_error =
            field.map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err));
        let mut reader = StreamReader::new(body_with_io_error);

        let staged = state
            .library
            .stage_upload(&mut reader, state.config.max_file_size)
            .await?;
        let size = staged.size;

        let final_name = state.library.commit(&owner, &filename, staged).await?;

        tracing::info!(
            owner = %owner,
            requested = %filename,
            stored = %final_name,
            size,
            "video uploaded"
        );

        return Ok(Json(UploadResponse {
            filename: final_name,
            size,
        }));
    }

    Err(AppError::BadRequest("No file provided".to_string()))
}

#[utoipa::path(
    get,
    path = "/files",
    responses(
        (status = 200, description = "Caller's file listing", body = FileListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn list_own_files(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<FileListResponse>, AppError> {
    let owner = owner_username(&state, &claims).await?;
    let files = state.library.list_files(&owner).await?;
    Ok(Json(FileListResponse { files }))
}

#[utoipa::path(
    delete,
    path = "/files/{filename}",
    params(
        ("filename" = String, Path, description = "Base name of the file to delete")
    ),
    responses(
        (status = 204, description = "File deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn delete_file(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(filename): Path<String>,
) -> Result<StatusCode, AppError> {
    let owner = owner_username(&state, &claims).await?;
    state.library.delete_file(&owner, &filename).await?;

    tracing::info!(owner = %owner, filename = %filename, "video deleted");
    Ok(StatusCode::NO_CONTENT)
}
