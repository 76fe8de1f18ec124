use actix_web::{delete, get, patch, post, web, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;
use sqlx::PgPool;

use crate::auth::AuthUser;
use crate::errors::{ApiError, ApiResponse};
use crate::models::{trimmed, PublishVideoRequest, ThumbnailUpdateRequest, Video, VideoUpdateRequest};
use crate::views::{self, FeedQuery};
use crate::AppState;

async fn find_video(pool: &PgPool, id: i32) -> Result<Option<Video>, ApiError> {
    let video = sqlx::query_as::<_, Video>("SELECT * FROM videos WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(video)
}

fn owned_by(video: &Video, user_id: i32) -> Result<(), ApiError> {
    if video.owner_id != user_id {
        return Err(ApiError::Forbidden(
            "You are not authorized to modify this video".to_string(),
        ));
    }
    Ok(())
}

#[get("/video/allVideos")]
async fn all_videos(
    _auth: AuthUser,
    query: web::Query<FeedQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let feed = views::video_feed(&state.db_pool, &query).await?;
    Ok(ApiResponse::ok(feed, "Videos fetched successfully"))
}

#[get("/video/v/{videoId}")]
async fn get_video(
    auth: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let video_id = path.into_inner();

    sqlx::query("UPDATE videos SET view_count = view_count + 1 WHERE id = $1")
        .bind(video_id)
        .execute(&state.db_pool)
        .await?;

    let video = views::video_with_owner(&state.db_pool, video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    // Watching a video appends it to the viewer's history; re-watching moves
    // it to the end of the sequence.
    sqlx::query(
        "INSERT INTO watch_history (user_id, video_id, watched_at) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, video_id) DO UPDATE SET watched_at = EXCLUDED.watched_at",
    )
    .bind(auth.id)
    .bind(video_id)
    .bind(Utc::now().naive_utc())
    .execute(&state.db_pool)
    .await?;

    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

#[delete("/video/v/{videoId}")]
async fn delete_video(
    auth: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let video_id = path.into_inner();
    let video = find_video(&state.db_pool, video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;
    owned_by(&video, auth.id)?;

    // Comments and likes pointing at the video are left in place; there is
    // no cascading cleanup across collections.
    sqlx::query("DELETE FROM videos WHERE id = $1")
        .bind(video_id)
        .execute(&state.db_pool)
        .await?;

    Ok(ApiResponse::ok(json!({}), "Video deleted successfully"))
}

#[post("/video/v/{videoId}")]
async fn toggle_publish(
    auth: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let video_id = path.into_inner();
    let video = find_video(&state.db_pool, video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;
    owned_by(&video, auth.id)?;

    let toggled = sqlx::query_as::<_, Video>(
        "UPDATE videos SET is_published = NOT is_published, updated_at = $1 \
         WHERE id = $2 RETURNING *",
    )
    .bind(Utc::now().naive_utc())
    .bind(video_id)
    .fetch_one(&state.db_pool)
    .await?;

    let message = if toggled.is_published {
        "Video is now published"
    } else {
        "Video is now unpublished"
    };
    Ok(ApiResponse::ok(toggled, message))
}

#[patch("/video/v/{videoId}")]
async fn update_video(
    auth: AuthUser,
    path: web::Path<i32>,
    req: web::Json<VideoUpdateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let video_id = path.into_inner();
    let title = trimmed(&req.title);
    let description = trimmed(&req.description);

    if title.is_none() && description.is_none() {
        return Err(ApiError::Validation(
            "At least one field is needed to update video info".to_string(),
        ));
    }

    let video = find_video(&state.db_pool, video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;
    owned_by(&video, auth.id)?;

    let updated = sqlx::query_as::<_, Video>(
        "UPDATE videos \
         SET title = COALESCE($1, title), \
             description = COALESCE($2, description), \
             updated_at = $3 \
         WHERE id = $4 RETURNING *",
    )
    .bind(&title)
    .bind(&description)
    .bind(Utc::now().naive_utc())
    .bind(video_id)
    .fetch_one(&state.db_pool)
    .await?;

    Ok(ApiResponse::ok(updated, "Video info updated successfully"))
}

#[post("/video/publish")]
async fn publish_video(
    auth: AuthUser,
    req: web::Json<PublishVideoRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let title = req.title.trim().to_string();
    let description = req.description.trim().to_string();
    if title.is_empty() || description.is_empty() {
        return Err(ApiError::Validation(
            "Title and description are required".to_string(),
        ));
    }

    let video_path = trimmed(&req.video_file)
        .ok_or_else(|| ApiError::Validation("videoFile not found".to_string()))?;
    let thumbnail_path = trimmed(&req.thumbnail)
        .ok_or_else(|| ApiError::Validation("thumbnailFile not found".to_string()))?;

    let video_blob = state
        .blob_store
        .upload(&video_path)
        .await
        .ok_or_else(|| ApiError::Upload("Video upload failed".to_string()))?;
    let thumbnail_blob = state
        .blob_store
        .upload(&thumbnail_path)
        .await
        .ok_or_else(|| ApiError::Upload("Thumbnail upload failed".to_string()))?;

    let now = Utc::now().naive_utc();
    let video = sqlx::query_as::<_, Video>(
        "INSERT INTO videos \
             (video_url, thumbnail_url, title, description, duration_seconds, owner_id, \
              created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
         RETURNING *",
    )
    .bind(&video_blob.url)
    .bind(&thumbnail_blob.url)
    .bind(&title)
    .bind(&description)
    .bind(video_blob.duration_seconds.unwrap_or(0))
    .bind(auth.id)
    .bind(now)
    .fetch_one(&state.db_pool)
    .await?;

    info!("User {} published video {}", auth.id, video.id);

    Ok(ApiResponse::created(video, "Video successfully published"))
}

#[patch("/video/change-thumbnail")]
async fn change_thumbnail(
    auth: AuthUser,
    req: web::Json<ThumbnailUpdateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let thumbnail_path = req.thumbnail.trim();
    if thumbnail_path.is_empty() {
        return Err(ApiError::Validation("File not found".to_string()));
    }

    let video = find_video(&state.db_pool, req.video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;
    owned_by(&video, auth.id)?;

    let blob = state
        .blob_store
        .upload(thumbnail_path)
        .await
        .ok_or_else(|| ApiError::Upload("Thumbnail upload failed".to_string()))?;

    let updated = sqlx::query_as::<_, Video>(
        "UPDATE videos SET thumbnail_url = $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(&blob.url)
    .bind(Utc::now().naive_utc())
    .bind(video.id)
    .fetch_one(&state.db_pool)
    .await?;

    Ok(ApiResponse::ok(
        updated,
        "Video thumbnail successfully updated",
    ))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(all_videos)
        .service(publish_video)
        .service(change_thumbnail)
        .service(get_video)
        .service(delete_video)
        .service(toggle_publish)
        .service(update_video);
}
