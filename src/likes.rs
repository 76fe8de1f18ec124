use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::auth::AuthUser;
use crate::errors::{ApiError, ApiResponse};
use crate::models::Like;
use crate::{views, AppState};

// Toggles are lookup-before-insert: at most one edge per (owner, target)
// holds for sequential callers; concurrent duplicate toggles can race.

#[post("/likes/toggle/video/{videoId}")]
async fn toggle_video_like(
    auth: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let video_id = path.into_inner();

    let video_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM videos WHERE id = $1)")
        .bind(video_id)
        .fetch_one(&state.db_pool)
        .await?;
    if !video_exists {
        return Err(ApiError::NotFound("Video not found".to_string()));
    }

    let existing: Option<i32> =
        sqlx::query_scalar("SELECT id FROM likes WHERE owner_id = $1 AND video_id = $2")
            .bind(auth.id)
            .bind(video_id)
            .fetch_optional(&state.db_pool)
            .await?;

    if let Some(like_id) = existing {
        sqlx::query("DELETE FROM likes WHERE id = $1")
            .bind(like_id)
            .execute(&state.db_pool)
            .await?;
        return Ok(ApiResponse::ok(json!({}), "Like removed from video"));
    }

    let like = sqlx::query_as::<_, Like>(
        "INSERT INTO likes (video_id, owner_id, created_at) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(video_id)
    .bind(auth.id)
    .bind(Utc::now().naive_utc())
    .fetch_one(&state.db_pool)
    .await?;

    Ok(ApiResponse::ok(like, "Video liked successfully"))
}

#[post("/likes/toggle/comment/{commentId}")]
async fn toggle_comment_like(
    auth: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let comment_id = path.into_inner();

    let comment_exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM comments WHERE id = $1)")
            .bind(comment_id)
            .fetch_one(&state.db_pool)
            .await?;
    if !comment_exists {
        return Err(ApiError::NotFound("Comment not found".to_string()));
    }

    let existing: Option<i32> =
        sqlx::query_scalar("SELECT id FROM likes WHERE owner_id = $1 AND comment_id = $2")
            .bind(auth.id)
            .bind(comment_id)
            .fetch_optional(&state.db_pool)
            .await?;

    if let Some(like_id) = existing {
        sqlx::query("DELETE FROM likes WHERE id = $1")
            .bind(like_id)
            .execute(&state.db_pool)
            .await?;
        return Ok(ApiResponse::ok(json!({}), "Like removed from comment"));
    }

    let like = sqlx::query_as::<_, Like>(
        "INSERT INTO likes (comment_id, owner_id, created_at) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(comment_id)
    .bind(auth.id)
    .bind(Utc::now().naive_utc())
    .fetch_one(&state.db_pool)
    .await?;

    Ok(ApiResponse::ok(like, "Comment liked successfully"))
}

#[get("/likes/likedVideos")]
async fn liked_videos(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let videos = views::liked_videos(&state.db_pool, auth.id).await?;
    Ok(ApiResponse::ok(videos, "Fetched liked videos successfully"))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(toggle_video_like)
        .service(toggle_comment_like)
        .service(liked_videos);
}
