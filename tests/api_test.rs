use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use rust_video_backend::config::ServerConfig;
use rust_video_backend::entities::{prelude::Tokens, tokens};
use rust_video_backend::infrastructure::database::run_migrations;
use rust_video_backend::services::library::MediaLibrary;
use rust_video_backend::utils::auth::create_jwt;
use rust_video_backend::{AppState, create_app};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

async fn test_app_with_db(storage_root: &std::path::Path) -> (Router, DatabaseConnection) {
    // A single pooled connection keeps the in-memory database alive and
    // shared across requests.
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    run_migrations(&db).await.unwrap();

    let config = ServerConfig::development(storage_root);
    let library = Arc::new(MediaLibrary::new(
        &config.storage_root,
        config.max_name_probes,
        config.upload_retry_limit,
    ));

    let app = create_app(AppState {
        db: db.clone(),
        library,
        config,
    });
    (app, db)
}

async fn test_app(storage_root: &std::path::Path) -> Router {
    test_app_with_db(storage_root).await.0
}

async fn list_files_status(app: &Router, token: &str) -> StatusCode {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/files")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    response.status()
}

async fn register(app: &Router, username: &str, password: &str) -> StatusCode {
    let body = serde_json::json!({ "username": username, "password": password });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    response.status()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let body = serde_json::json!({ "username": username, "password": password });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    json["token"].as_str().unwrap().to_string()
}

fn multipart_upload(token: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "---------------------------123456789012345678901234567";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"video_file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("Authorization", format!("Bearer {token}"))
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;

    assert_eq!(register(&app, "alice", "password123").await, StatusCode::CREATED);
    assert_eq!(register(&app, "alice", "other").await, StatusCode::CONFLICT);

    assert_eq!(register(&app, "", "pw").await, StatusCode::BAD_REQUEST);
    assert_eq!(register(&app, "bad/name", "pw").await, StatusCode::BAD_REQUEST);
    assert_eq!(register(&app, ".dot", "pw").await, StatusCode::BAD_REQUEST);
    assert_eq!(register(&app, "bob", "").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;

    register(&app, "alice", "password123").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"username": "alice", "password": "wrong"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_requires_auth() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;

    let request = multipart_upload("nope", "clip.mp4", b"bytes");
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_list_download_delete_flow() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;

    register(&app, "alice", "password123").await;
    let token = login(&app, "alice", "password123").await;

    // First upload keeps its name.
    let response = app
        .clone()
        .oneshot(multipart_upload(&token, "clip.mp4", b"first video"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["filename"], "clip.mp4");

    // Same requested name gets the smallest free suffix.
    let response = app
        .clone()
        .oneshot(multipart_upload(&token, "clip.mp4", b"second video"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["filename"], "clip_1.mp4");

    // Own listing shows both, sorted.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/files")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(
        json["files"],
        serde_json::json!(["clip.mp4", "clip_1.mp4"])
    );

    // Public browsing works without a token.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/alice/files")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/alice/files/clip.mp4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "video/mp4"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"first video");

    // Owner delete, then the file is gone for everyone.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/files/clip.mp4")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/files/clip.mp4")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_rejects_disallowed_extension() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;

    register(&app, "alice", "password123").await;
    let token = login(&app, "alice", "password123").await;

    let response = app
        .clone()
        .oneshot(multipart_upload(&token, "notes.txt", b"not a video"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(multipart_upload(&token, "clip.webm", b"wrong container"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_user_listing_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/ghost/files")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_ranks_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;

    for name in ["alice", "alice2", "bob"] {
        assert_eq!(register(&app, name, "password123").await, StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/search?q=ali")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let usernames: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    // "alice" and "alice2" tie on score and keep registration order; "bob"
    // shares no characters with "ali" and is dropped.
    assert_eq!(usernames, vec!["alice", "alice2"]);

    // No overlap at all yields an empty result, not an error.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/search?q=xyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json.as_array().unwrap().is_empty());

    // Empty or missing keyword is a validation failure.
    for uri in ["/users/search?q=", "/users/search?q=%20%20", "/users/search"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }

    // Case-insensitive keyword matches the same set.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/search?q=ALI")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;

    register(&app, "alice", "password123").await;
    let token = login(&app, "alice", "password123").await;

    assert_eq!(list_files_status(&app, &token).await, StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The signature is still valid, but the stored row is gone.
    assert_eq!(
        list_files_status(&app, &token).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_token_without_stored_row_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;

    register(&app, "alice", "password123").await;

    // Correctly signed, but never issued by /login.
    let forged = create_jwt("some-user-id", "secret").unwrap();
    assert_eq!(
        list_files_status(&app, &forged).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_expired_token_rejected_and_pruned_on_login() {
    let dir = tempfile::tempdir().unwrap();
    let (app, db) = test_app_with_db(dir.path()).await;

    register(&app, "alice", "password123").await;
    let token = login(&app, "alice", "password123").await;

    let row = Tokens::find().one(&db).await.unwrap().unwrap();
    let mut stale: tokens::ActiveModel = row.into();
    stale.expires_at = Set(Utc::now() - Duration::hours(1));
    stale.update(&db).await.unwrap();

    assert_eq!(
        list_files_status(&app, &token).await,
        StatusCode::UNAUTHORIZED
    );

    // A fresh login sweeps the expired row and leaves only the new one.
    let fresh = login(&app, "alice", "password123").await;
    assert_eq!(Tokens::find().all(&db).await.unwrap().len(), 1);
    assert_eq!(list_files_status(&app, &fresh).await, StatusCode::OK);
}
