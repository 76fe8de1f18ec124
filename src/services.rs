use async_trait::async_trait;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use log::{error, info, warn};
use sqlx::{PgPool, Pool, Postgres};
use std::path::Path;
use tokio::process::Command;
use uuid::Uuid;

use crate::config::AppConfig;

pub async fn init_db_pool(config: &AppConfig) -> Pool<Postgres> {
    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    pool
}

#[derive(Debug, Clone)]
pub struct UploadedBlob {
    pub url: String,
    pub duration_seconds: Option<i32>,
}

/// Opaque media storage capability. Returns `None` on any failure; callers
/// decide whether that is fatal (avatar, video) or ignorable (cover image).
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, local_path: &str) -> Option<UploadedBlob>;
}

pub struct S3BlobStore {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3BlobStore {
    pub async fn new(config: &AppConfig) -> Self {
        let sdk_config = aws_config::from_env().load().await;
        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Ok(endpoint) = std::env::var("MINIO_ENDPOINT") {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint).force_path_style(true);
        }

        let access_key = std::env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minio".to_string());
        let secret_key =
            std::env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minio123".to_string());
        let credentials = Credentials::new(access_key, secret_key, None, None, "env");
        s3_config_builder = s3_config_builder.credentials_provider(credentials);

        if let Some(region) = sdk_config.region() {
            s3_config_builder = s3_config_builder.region(region.clone());
        } else {
            s3_config_builder = s3_config_builder.region(Region::new("us-east-1"));
        }

        let client = Client::from_conf(s3_config_builder.build());
        let store = S3BlobStore {
            client,
            bucket: config.blob_bucket.clone(),
            public_url: config.blob_public_url.clone(),
        };
        store.ensure_bucket_exists().await;
        store
    }

    async fn ensure_bucket_exists(&self) {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            return;
        }

        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => info!("Created blob bucket {}", self.bucket),
            Err(e) => error!("Failed to create blob bucket {}: {:?}", self.bucket, e),
        }
    }

    async fn put_file(
        &self,
        local_path: &str,
    ) -> Result<UploadedBlob, Box<dyn std::error::Error + Send + Sync>> {
        let file_name = Path::new(local_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("blob");
        let key = format!("{}-{}", Uuid::new_v4(), file_name);

        let body = ByteStream::from_path(local_path).await?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .send()
            .await?;

        // Duration comes back only for files ffprobe understands as media.
        let duration_seconds = extract_media_duration(local_path).await;

        Ok(UploadedBlob {
            url: format!("{}/{}/{}", self.public_url, self.bucket, key),
            duration_seconds,
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, local_path: &str) -> Option<UploadedBlob> {
        let outcome = self.put_file(local_path).await;

        // The staged temp file is removed whether or not the upload worked.
        if let Err(e) = tokio::fs::remove_file(local_path).await {
            warn!("Failed to remove staged file {}: {:?}", local_path, e);
        }

        match outcome {
            Ok(blob) => Some(blob),
            Err(e) => {
                error!("Blob upload failed for {}: {:?}", local_path, e);
                None
            }
        }
    }
}

async fn extract_media_duration(local_path: &str) -> Option<i32> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            local_path,
        ])
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).ok()?;
    let duration = parsed
        .get("format")?
        .get("duration")?
        .as_str()?
        .parse::<f64>()
        .ok()?;

    Some(duration.round() as i32)
}
