use actix_web::{delete, get, patch, post, web, HttpResponse};
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;

use crate::auth::AuthUser;
use crate::errors::{ApiError, ApiResponse};
use crate::models::{Comment, CommentBody};
use crate::views::{self, page_and_limit, PageQuery};
use crate::AppState;

async fn find_comment(pool: &PgPool, id: i32) -> Result<Option<Comment>, ApiError> {
    let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(comment)
}

#[post("/comment/{videoId}")]
async fn add_comment(
    auth: AuthUser,
    path: web::Path<i32>,
    req: web::Json<CommentBody>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let video_id = path.into_inner();
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("Comment content is required".to_string()));
    }

    let video_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM videos WHERE id = $1)")
        .bind(video_id)
        .fetch_one(&state.db_pool)
        .await?;
    if !video_exists {
        return Err(ApiError::NotFound("Video not found".to_string()));
    }

    let now = Utc::now().naive_utc();
    let comment = sqlx::query_as::<_, Comment>(
        "INSERT INTO comments (content, video_id, owner_id, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $4) RETURNING *",
    )
    .bind(content)
    .bind(video_id)
    .bind(auth.id)
    .bind(now)
    .fetch_one(&state.db_pool)
    .await?;

    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

#[get("/comment/{videoId}")]
async fn get_comments(
    _auth: AuthUser,
    path: web::Path<i32>,
    query: web::Query<PageQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let video_id = path.into_inner();
    let (page, limit) = page_and_limit(query.page, query.limit);

    let comments = views::video_comments(&state.db_pool, video_id, page, limit).await?;
    Ok(ApiResponse::ok(comments, "Comments successfully fetched"))
}

#[patch("/comment/comment/{commentId}")]
async fn update_comment(
    auth: AuthUser,
    path: web::Path<i32>,
    req: web::Json<CommentBody>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let comment_id = path.into_inner();
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("Comment content is required".to_string()));
    }

    let comment = find_comment(&state.db_pool, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;
    if comment.owner_id != auth.id {
        return Err(ApiError::Forbidden(
            "You are not authorized to update this comment".to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, Comment>(
        "UPDATE comments SET content = $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(content)
    .bind(Utc::now().naive_utc())
    .bind(comment_id)
    .fetch_one(&state.db_pool)
    .await?;

    Ok(ApiResponse::ok(updated, "Comment updated successfully"))
}

#[delete("/comment/comment/{commentId}")]
async fn delete_comment(
    auth: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let comment_id = path.into_inner();
    let comment = find_comment(&state.db_pool, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;
    if comment.owner_id != auth.id {
        return Err(ApiError::Forbidden(
            "You are not authorized to delete this comment".to_string(),
        ));
    }

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(&state.db_pool)
        .await?;

    Ok(ApiResponse::ok(Value::Null, "Comment deleted successfully"))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(update_comment)
        .service(delete_comment)
        .service(add_comment)
        .service(get_comments);
}
