use axum::{Extension, Json, extract::State, http::StatusCode};
use argon2::{
    Argon2,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::env;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{prelude::*, *};
use crate::error::AppError;
use crate::utils::auth::{Claims, create_jwt};
use crate::utils::validation::validate_username;

#[derive(Deserialize, ToSchema, Validate)]
pub struct AuthRequest {
    pub username: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/register",
    request_body = AuthRequest,
    responses(
        (status = 201, description = "User registered successfully"),
        (status = 400, description = "Invalid username or password"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<StatusCode, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    validate_username(&payload.username)?;

    let existing = Users::find()
        .filter(users::Column::Username.eq(&payload.username))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .to_string();

    let user = users::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        username: Set(payload.username),
        password_hash: Set(password_hash),
        created_at: Set(Some(Utc::now())),
    };

    // The unique index still backstops a racing registration.
    user.insert(&state.db)
        .await
        .map_err(|_| AppError::Conflict("Username already exists".to_string()))?;

    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = Users::find()
        .filter(users::Column::Username.eq(&payload.username))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let parsed_hash = argon2::PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let secret = env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string());
    let token = create_jwt(&user.id, &secret).map_err(|e| AppError::Internal(e.to_string()))?;

    // Expired rows are dead weight once the middleware stops honoring them;
    // login is a convenient place to sweep them out.
    Tokens::delete_many()
        .filter(tokens::Column::ExpiresAt.lt(Utc::now()))
        .exec(&state.db)
        .await?;

    // Store the token for expiration/revocation tracking; the auth
    // middleware requires a live row, so deleting it revokes the token.
    let token_row = tokens::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user.id),
        token: Set(token.clone()),
        expires_at: Set(Utc::now() + chrono::Duration::hours(24)),
        created_at: Set(Some(Utc::now())),
    };
    token_row.insert(&state.db).await?;

    Ok(Json(AuthResponse { token }))
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn logout(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<LogoutResponse>, AppError> {
    Tokens::delete_many()
        .filter(tokens::Column::UserId.eq(&claims.sub))
        .exec(&state.db)
        .await?;

    Ok(Json(LogoutResponse {
        message: "Logged out".to_string(),
    }))
}
