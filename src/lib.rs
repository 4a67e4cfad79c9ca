pub mod config;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod infrastructure;
pub mod middleware;
pub mod services;
pub mod utils;

use crate::config::ServerConfig;
use crate::services::library::MediaLibrary;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::files::upload_video,
        handlers::files::list_own_files,
        handlers::files::delete_file,
        handlers::users::search_users,
        handlers::users::list_user_files,
        handlers::users::download_file,
    ),
    components(
        schemas(
            handlers::auth::AuthRequest,
            handlers::auth::AuthResponse,
            handlers::auth::LogoutResponse,
            handlers::files::UploadResponse,
            handlers::files::FileListResponse,
            handlers::users::UserSummary,
        )
    ),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "files", description = "Per-user video storage endpoints"),
        (name = "users", description = "Public browsing and fuzzy user search")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub library: Arc<MediaLibrary>,
    pub config: ServerConfig,
}

pub fn create_app(state: AppState) -> Router {
    let auth = from_fn_with_state(state.clone(), middleware::auth::auth_middleware);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route(
            "/logout",
            post(handlers::auth::logout).layer(auth.clone()),
        )
        .route(
            "/upload",
            post(handlers::files::upload_video).layer(auth.clone()),
        )
        .route(
            "/files",
            get(handlers::files::list_own_files).layer(auth.clone()),
        )
        .route(
            "/files/:filename",
            delete(handlers::files::delete_file).layer(auth),
        )
        .route("/users/search", get(handlers::users::search_users))
        .route("/users/:username/files", get(handlers::users::list_user_files))
        .route(
            "/users/:username/files/:filename",
            get(handlers::users::download_file),
        )
        .with_state(state)
}
