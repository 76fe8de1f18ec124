use std::sync::Arc;

pub mod auth;
pub mod comments;
pub mod config;
pub mod errors;
pub mod likes;
pub mod models;
pub mod playlists;
pub mod services;
pub mod subscriptions;
pub mod users;
pub mod videos;
pub mod views;

use actix_web::web;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::BlobStore;

/// Shared per-worker state: the connection pool, the injected blob-store
/// capability and the resolved configuration. Cloning is cheap; requests do
/// not synchronize on anything but the store itself.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub blob_store: Arc<dyn BlobStore>,
    pub config: AppConfig,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    users::configure_routes(cfg);
    videos::configure_routes(cfg);
    comments::configure_routes(cfg);
    likes::configure_routes(cfg);
    subscriptions::configure_routes(cfg);
    playlists::configure_routes(cfg);
}
