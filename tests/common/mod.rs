#![allow(dead_code)]

use std::sync::Arc;

use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App, Error};
use async_trait::async_trait;
use dotenv::dotenv;
use serde_json::{json, Value};
use uuid::Uuid;

use video_sharing_backend::config::AppConfig;
use video_sharing_backend::services::{self, BlobStore, UploadedBlob};
use video_sharing_backend::{configure_routes, AppState};

/// Blob store double: fabricates stable URLs without touching the
/// filesystem or any object storage.
pub struct MemoryBlobStore;

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, local_path: &str) -> Option<UploadedBlob> {
        Some(UploadedBlob {
            url: format!(
                "http://blobs.test/{}/{}",
                Uuid::new_v4(),
                local_path.trim_start_matches('/')
            ),
            duration_seconds: Some(42),
        })
    }
}

/// Blob store double that always fails, for exercising upload error paths.
pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn upload(&self, _local_path: &str) -> Option<UploadedBlob> {
        None
    }
}

/// Builds the app under test, or `None` when no database is configured so
/// the test can skip itself.
pub async fn try_setup_app_with(
    blob_store: Arc<dyn BlobStore>,
) -> Option<impl Service<Request, Response = ServiceResponse, Error = Error>> {
    dotenv().ok();
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    }

    let config = AppConfig::from_env();
    let db_pool = services::init_db_pool(&config).await;
    let state = AppState {
        db_pool,
        blob_store,
        config,
    };

    Some(
        test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await,
    )
}

pub async fn try_setup_app(
) -> Option<impl Service<Request, Response = ServiceResponse, Error = Error>> {
    try_setup_app_with(Arc::new(MemoryBlobStore)).await
}

pub struct TestUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Registers a unique user and logs it in, returning ids and both tokens.
pub async fn register_and_login(
    app: &impl Service<Request, Response = ServiceResponse, Error = Error>,
) -> TestUser {
    let unique = Uuid::new_v4().to_string();
    let username = format!("testuser_{}", &unique[..8]);
    let email = format!("test_{}@example.com", &unique[..8]);
    let password = "password123".to_string();

    let register_req = test::TestRequest::post()
        .uri("/user/register")
        .set_json(json!({
            "username": username,
            "email": email,
            "fullName": "Test User",
            "password": password,
            "avatar": format!("/tmp/avatar_{}.png", &unique[..8]),
        }))
        .to_request();
    let register_resp = test::call_service(app, register_req).await;
    assert_eq!(register_resp.status().as_u16(), 201);
    let register_body: Value = test::read_body_json(register_resp).await;
    let id = register_body["data"]["id"].as_i64().unwrap() as i32;

    let login_req = test::TestRequest::post()
        .uri("/user/login")
        .set_json(json!({ "username": username, "password": password }))
        .to_request();
    let login_resp = test::call_service(app, login_req).await;
    assert!(login_resp.status().is_success());
    let login_body: Value = test::read_body_json(login_resp).await;

    TestUser {
        id,
        username,
        email,
        password,
        access_token: login_body["data"]["accessToken"]
            .as_str()
            .unwrap()
            .to_string(),
        refresh_token: login_body["data"]["refreshToken"]
            .as_str()
            .unwrap()
            .to_string(),
    }
}

/// Publishes a video for the given user and returns its envelope data.
pub async fn publish_video(
    app: &impl Service<Request, Response = ServiceResponse, Error = Error>,
    access_token: &str,
    title: &str,
    description: &str,
) -> Value {
    let req = test::TestRequest::post()
        .uri("/video/publish")
        .insert_header((
            actix_web::http::header::AUTHORIZATION,
            format!("Bearer {}", access_token),
        ))
        .set_json(json!({
            "title": title,
            "description": description,
            "videoFile": format!("/tmp/video_{}.webm", Uuid::new_v4()),
            "thumbnail": format!("/tmp/thumb_{}.jpg", Uuid::new_v4()),
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status().as_u16(), 201, "Failed to publish video");
    let body: Value = test::read_body_json(resp).await;
    body["data"].clone()
}

pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (
        actix_web::http::header::AUTHORIZATION,
        format!("Bearer {}", token),
    )
}
