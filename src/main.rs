use actix_cors::Cors;
use actix_web::{http, web, App, HttpServer};
use dotenv::dotenv;
use log::info;
use std::sync::Arc;

use video_sharing_backend::config::AppConfig;
use video_sharing_backend::services::{self, BlobStore, S3BlobStore};
use video_sharing_backend::{configure_routes, AppState};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();
    let db_pool = services::init_db_pool(&config).await;
    let blob_store: Arc<dyn BlobStore> = Arc::new(S3BlobStore::new(&config).await);

    let state = AppState {
        db_pool,
        blob_store,
        config: config.clone(),
    };

    info!("Starting HTTP server on 0.0.0.0:{}", config.server_port);
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
            .supports_credentials();

        for origin in state.config.cors_origins.split(',') {
            cors = cors.allowed_origin(origin.trim());
        }

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes)
    })
    .bind(("0.0.0.0", config.server_port))?
    .run()
    .await
}
