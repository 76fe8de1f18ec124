use std::env;

/// Runtime configuration, resolved from the environment once at startup and
/// injected through `AppState`. Handlers never read env vars directly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server_port: u16,
    pub cors_origins: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_expiry_secs: i64,
    pub refresh_token_expiry_secs: i64,
    pub blob_bucket: String,
    pub blob_public_url: String,
    pub app_env: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        AppConfig {
            database_url,
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5050),
            cors_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .unwrap_or_else(|_| "secure_access_secret_key_12345".to_string()),
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .unwrap_or_else(|_| "secure_refresh_secret_key_67890".to_string()),
            access_token_expiry_secs: env::var("ACCESS_TOKEN_EXPIRY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60 * 60 * 24),
            refresh_token_expiry_secs: env::var("REFRESH_TOKEN_EXPIRY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60 * 60 * 24 * 10),
            blob_bucket: env::var("MINIO_BUCKET").unwrap_or_else(|_| "media".to_string()),
            blob_public_url: env::var("BLOB_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}
