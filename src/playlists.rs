use actix_web::{delete, get, patch, post, web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

use crate::auth::AuthUser;
use crate::errors::{ApiError, ApiResponse};
use crate::models::{trimmed, Playlist, PlaylistCreateRequest, PlaylistUpdateRequest};
use crate::{views, AppState};

async fn find_playlist(pool: &PgPool, id: i32) -> Result<Option<Playlist>, ApiError> {
    let playlist = sqlx::query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(playlist)
}

fn owned_by(playlist: &Playlist, user_id: i32) -> Result<(), ApiError> {
    if playlist.owner_id != user_id {
        return Err(ApiError::Forbidden(
            "You are not authorized to modify this playlist".to_string(),
        ));
    }
    Ok(())
}

#[post("/playlist/")]
async fn create_playlist(
    auth: AuthUser,
    req: web::Json<PlaylistCreateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Playlist name is required".to_string()));
    }
    let description = trimmed(&req.description).unwrap_or_default();

    let now = Utc::now().naive_utc();
    let playlist = sqlx::query_as::<_, Playlist>(
        "INSERT INTO playlists (name, description, owner_id, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $4) RETURNING *",
    )
    .bind(name)
    .bind(&description)
    .bind(auth.id)
    .bind(now)
    .fetch_one(&state.db_pool)
    .await?;

    Ok(ApiResponse::created(playlist, "Playlist created"))
}

#[get("/playlist/user/{userId}")]
async fn user_playlists(
    _auth: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let playlists = views::user_playlists(&state.db_pool, user_id).await?;
    Ok(ApiResponse::ok(playlists, "Playlists fetched"))
}

#[get("/playlist/{playlistId}")]
async fn get_playlist(
    _auth: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let playlist_id = path.into_inner();
    let playlist = views::playlist_detail(&state.db_pool, playlist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    Ok(ApiResponse::ok(playlist, "Playlist fetched"))
}

#[delete("/playlist/{playlistId}")]
async fn delete_playlist(
    auth: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let playlist_id = path.into_inner();
    let playlist = find_playlist(&state.db_pool, playlist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    owned_by(&playlist, auth.id)?;

    // Membership rows go with the playlist.
    sqlx::query("DELETE FROM playlists WHERE id = $1")
        .bind(playlist_id)
        .execute(&state.db_pool)
        .await?;

    Ok(ApiResponse::ok(json!({}), "Playlist successfully deleted"))
}

#[patch("/playlist/{playlistId}")]
async fn update_playlist(
    auth: AuthUser,
    path: web::Path<i32>,
    req: web::Json<PlaylistUpdateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let playlist_id = path.into_inner();
    let name = trimmed(&req.name);
    let description = trimmed(&req.description);

    if name.is_none() && description.is_none() {
        return Err(ApiError::Validation(
            "Insufficient information to update playlist".to_string(),
        ));
    }

    let playlist = find_playlist(&state.db_pool, playlist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    owned_by(&playlist, auth.id)?;

    let updated = sqlx::query_as::<_, Playlist>(
        "UPDATE playlists \
         SET name = COALESCE($1, name), \
             description = COALESCE($2, description), \
             updated_at = $3 \
         WHERE id = $4 RETURNING *",
    )
    .bind(&name)
    .bind(&description)
    .bind(Utc::now().naive_utc())
    .bind(playlist_id)
    .fetch_one(&state.db_pool)
    .await?;

    Ok(ApiResponse::ok(updated, "Playlist updated successfully"))
}

#[patch("/playlist/addVideo/{playlistId}/{videoId}")]
async fn add_video(
    auth: AuthUser,
    path: web::Path<(i32, i32)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (playlist_id, video_id) = path.into_inner();

    let playlist = find_playlist(&state.db_pool, playlist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    owned_by(&playlist, auth.id)?;

    let video_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM videos WHERE id = $1)")
        .bind(video_id)
        .fetch_one(&state.db_pool)
        .await?;
    if !video_exists {
        return Err(ApiError::NotFound("Video not found".to_string()));
    }

    // Add-to-set: re-adding an existing member leaves the playlist unchanged.
    sqlx::query(
        "INSERT INTO playlist_videos (playlist_id, video_id, position) \
         VALUES ($1, $2, \
                 COALESCE((SELECT MAX(position) + 1 FROM playlist_videos \
                           WHERE playlist_id = $1), 0)) \
         ON CONFLICT (playlist_id, video_id) DO NOTHING",
    )
    .bind(playlist_id)
    .bind(video_id)
    .execute(&state.db_pool)
    .await?;

    let detail = views::playlist_detail(&state.db_pool, playlist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    Ok(ApiResponse::ok(detail, "Video added to playlist"))
}

#[patch("/playlist/removeVideo/{playlistId}/{videoId}")]
async fn remove_video(
    auth: AuthUser,
    path: web::Path<(i32, i32)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (playlist_id, video_id) = path.into_inner();

    let playlist = find_playlist(&state.db_pool, playlist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    owned_by(&playlist, auth.id)?;

    sqlx::query("DELETE FROM playlist_videos WHERE playlist_id = $1 AND video_id = $2")
        .bind(playlist_id)
        .bind(video_id)
        .execute(&state.db_pool)
        .await?;

    let detail = views::playlist_detail(&state.db_pool, playlist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    Ok(ApiResponse::ok(detail, "Video removed from playlist"))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_playlist)
        .service(user_playlists)
        .service(add_video)
        .service(remove_video)
        .service(get_playlist)
        .service(delete_playlist)
        .service(update_playlist);
}
