use crate::entities::{prelude::*, *};
use crate::utils::auth::validate_jwt;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::env;

/// Bearer authentication backed by the tokens table.
///
/// A valid signature alone is not enough: the token must still have a live
/// row, so logout (which deletes the rows) and `expires_at` actually revoke
/// access.
pub async fn auth_middleware(
    State(state): State<crate::AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    if let Some(auth_header) = auth_header {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            let secret = env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string());

            if let Ok(claims) = validate_jwt(token, &secret) {
                let row = Tokens::find()
                    .filter(tokens::Column::Token.eq(token))
                    .filter(tokens::Column::UserId.eq(&claims.sub))
                    .one(&state.db)
                    .await
                    .map_err(|e| {
                        tracing::error!("Token lookup failed: {:?}", e);
                        StatusCode::INTERNAL_SERVER_ERROR
                    })?;

                match row {
                    Some(row) if row.expires_at > Utc::now() => {
                        req.extensions_mut().insert(claims);
                        return Ok(next.run(req).await);
                    }
                    Some(_) => {
                        tracing::debug!("Rejected expired token for user {}", claims.sub);
                    }
                    None => {
                        tracing::debug!("Rejected revoked or unknown token for user {}", claims.sub);
                    }
                }
            }
        }
    }

    Err(StatusCode::UNAUTHORIZED)
}
