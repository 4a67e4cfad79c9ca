use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use utoipa::{IntoParams, ToSchema};

use crate::entities::{prelude::*, *};
use crate::error::AppError;
use crate::handlers::files::FileListResponse;
use crate::services::search::rank_candidates;
use crate::utils::validation::validate_search_keyword;

#[derive(Deserialize, IntoParams)]
pub struct SearchParams {
    /// Fuzzy search keyword
    pub q: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
}

#[utoipa::path(
    get,
    path = "/users/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Users ranked by similarity", body = [UserSummary]),
        (status = 400, description = "Empty keyword")
    )
)]
pub async fn search_users(
    State(state): State<crate::AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let raw = params.q.unwrap_or_default();
    let keyword = validate_search_keyword(&raw)?;

    // The full user set is the ranker's candidate pool; store order is the
    // tie-break baseline.
    let candidates = Users::find().all(&state.db).await?;
    let ranked = rank_candidates(keyword, candidates, |u| u.username.as_str());

    Ok(Json(
        ranked
            .into_iter()
            .map(|u| UserSummary {
                id: u.id,
                username: u.username,
            })
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{username}/files",
    params(
        ("username" = String, Path, description = "Owner of the listing")
    ),
    responses(
        (status = 200, description = "Public file listing", body = FileListResponse),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn list_user_files(
    State(state): State<crate::AppState>,
    Path(username): Path<String>,
) -> Result<Json<FileListResponse>, AppError> {
    let user = Users::find()
        .filter(users::Column::Username.eq(&username))
        .one(&state.db)
        .await?;
    if user.is_none() {
        return Err(AppError::NotFound("Unknown user".to_string()));
    }

    let files = state.library.list_files(&username).await?;
    Ok(Json(FileListResponse { files }))
}

#[utoipa::path(
    get,
    path = "/users/{username}/files/{filename}",
    params(
        ("username" = String, Path, description = "Owner of the file"),
        ("filename" = String, Path, description = "Base name of the file")
    ),
    responses(
        (status = 200, description = "Video stream"),
        (status = 404, description = "File not found")
    )
)]
pub async fn download_file(
    State(state): State<crate::AppState>,
    Path((username, filename)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let (file, len) = state.library.open_file(&username, &filename).await?;

    let body = Body::from_stream(ReaderStream::new(file));
    let encoded_name = utf8_percent_encode(&filename, NON_ALPHANUMERIC).to_string();

    let headers = [
        (header::CONTENT_TYPE, content_type_for(&filename).to_string()),
        (header::CONTENT_LENGTH, len.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename*=UTF-8''{encoded_name}"),
        ),
    ];

    Ok((headers, body).into_response())
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()) {
        Some(ext) if ext == "mp4" => "video/mp4",
        Some(ext) if ext == "mov" => "video/quicktime",
        Some(ext) if ext == "avi" => "video/x-msvideo",
        Some(ext) if ext == "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}
