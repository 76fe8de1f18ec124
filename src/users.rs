use actix_web::{get, patch, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;
use sqlx::PgPool;

use crate::auth::{self, AuthUser, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::errors::{is_unique_violation, ApiError, ApiResponse};
use crate::models::{
    trimmed, AvatarUpdateRequest, ChangePasswordRequest, CoverImageUpdateRequest, LoginRequest,
    RefreshRequest, RegisterRequest, UpdateDetailsRequest, User, UserPublic,
};
use crate::{views, AppState};

async fn find_user_by_id(pool: &PgPool, id: i32) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

#[post("/user/register")]
async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let username = req.username.trim().to_lowercase();
    let email = req.email.trim().to_lowercase();
    let full_name = req.full_name.trim().to_string();
    let password = req.password.trim().to_string();

    if username.is_empty() || email.is_empty() || full_name.is_empty() || password.is_empty() {
        return Err(ApiError::Validation("All fields are required".to_string()));
    }

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)")
            .bind(&username)
            .bind(&email)
            .fetch_one(&state.db_pool)
            .await?;
    if exists {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let avatar_path = trimmed(&req.avatar)
        .ok_or_else(|| ApiError::Validation("Avatar is required".to_string()))?;

    let avatar = state
        .blob_store
        .upload(&avatar_path)
        .await
        .ok_or_else(|| ApiError::Upload("Avatar upload failed".to_string()))?;

    // Cover image is optional and its upload failure is not fatal.
    let cover_image_url = match trimmed(&req.cover_image) {
        Some(path) => state.blob_store.upload(&path).await.map(|blob| blob.url),
        None => None,
    };

    let password_hash = auth::hash_password(&password)?;
    let now = Utc::now().naive_utc();

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users \
             (username, email, full_name, avatar_url, cover_image_url, password_hash, \
              created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
         RETURNING *",
    )
    .bind(&username)
    .bind(&email)
    .bind(&full_name)
    .bind(&avatar.url)
    .bind(&cover_image_url)
    .bind(&password_hash)
    .bind(now)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("User already exists".to_string())
        } else {
            ApiError::from(e)
        }
    })?;

    info!("Registered user {} ({})", user.username, user.id);

    Ok(ApiResponse::created(
        UserPublic::from(user),
        "User registered successfully",
    ))
}

#[post("/user/login")]
async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let username = trimmed(&req.username).map(|u| u.to_lowercase());
    let email = trimmed(&req.email).map(|e| e.to_lowercase());

    if username.is_none() && email.is_none() {
        return Err(ApiError::Validation("Missing credentials".to_string()));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1 OR email = $2")
        .bind(&username)
        .bind(&email)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    if !auth::verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let tokens = auth::rotate_tokens(&state.db_pool, &user, &state.config).await?;

    let body = ApiResponse::new(
        200,
        json!({
            "user": UserPublic::from(user),
            "accessToken": tokens.access_token,
            "refreshToken": tokens.refresh_token,
        }),
        "User successfully logged in",
    );

    Ok(HttpResponse::Ok()
        .cookie(auth::session_cookie(ACCESS_COOKIE, &tokens.access_token))
        .cookie(auth::session_cookie(REFRESH_COOKIE, &tokens.refresh_token))
        .json(body))
}

#[post("/user/logout")]
async fn logout(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    auth::clear_refresh_token(&state.db_pool, auth.id).await?;

    let body = ApiResponse::new(200, json!({}), "User logged out");
    Ok(HttpResponse::Ok()
        .cookie(auth::removal_cookie(ACCESS_COOKIE))
        .cookie(auth::removal_cookie(REFRESH_COOKIE))
        .json(body))
}

#[post("/user/token-refresh")]
async fn token_refresh(
    http_req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let incoming = http_req
        .cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token))
        .ok_or_else(|| ApiError::Unauthorized("Missing refresh token".to_string()))?;

    let claims = auth::verify_refresh_token(&incoming, &state.config.refresh_token_secret)?;

    let user = find_user_by_id(&state.db_pool, claims.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    // Single-active-refresh-token semantics: only the exact token most
    // recently persisted for this user is redeemable.
    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        return Err(ApiError::Unauthorized(
            "Refresh token is expired or already used".to_string(),
        ));
    }

    let tokens = auth::rotate_tokens(&state.db_pool, &user, &state.config).await?;

    let body = ApiResponse::new(
        200,
        json!({
            "accessToken": tokens.access_token,
            "refreshToken": tokens.refresh_token,
        }),
        "Access token refreshed",
    );

    Ok(HttpResponse::Ok()
        .cookie(auth::session_cookie(ACCESS_COOKIE, &tokens.access_token))
        .cookie(auth::session_cookie(REFRESH_COOKIE, &tokens.refresh_token))
        .json(body))
}

#[post("/user/change-password")]
async fn change_password(
    auth: AuthUser,
    req: web::Json<ChangePasswordRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let new_password = req.new_password.trim();
    if new_password.is_empty() {
        return Err(ApiError::Validation("New password is required".to_string()));
    }

    let user = find_user_by_id(&state.db_pool, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    if !auth::verify_password(&req.old_password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Invalid old password".to_string()));
    }

    let password_hash = auth::hash_password(new_password)?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
        .bind(&password_hash)
        .bind(Utc::now().naive_utc())
        .bind(user.id)
        .execute(&state.db_pool)
        .await?;

    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

#[get("/user/current-user")]
async fn current_user(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user = find_user_by_id(&state.db_pool, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    Ok(ApiResponse::ok(
        UserPublic::from(user),
        "Current user fetched successfully",
    ))
}

#[patch("/user/update-details")]
async fn update_details(
    auth: AuthUser,
    req: web::Json<UpdateDetailsRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let full_name = trimmed(&req.full_name);
    let email = trimmed(&req.email).map(|e| e.to_lowercase());

    if full_name.is_none() && email.is_none() {
        return Err(ApiError::Validation(
            "At least one field is needed to update account details".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users \
         SET full_name = COALESCE($1, full_name), \
             email = COALESCE($2, email), \
             updated_at = $3 \
         WHERE id = $4 \
         RETURNING *",
    )
    .bind(&full_name)
    .bind(&email)
    .bind(Utc::now().naive_utc())
    .bind(auth.id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("Email already in use".to_string())
        } else {
            ApiError::from(e)
        }
    })?
    .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    Ok(ApiResponse::ok(
        UserPublic::from(user),
        "Account details updated successfully",
    ))
}

#[patch("/user/update-avatar")]
async fn update_avatar(
    auth: AuthUser,
    req: web::Json<AvatarUpdateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let path = req.avatar.trim();
    if path.is_empty() {
        return Err(ApiError::Validation("File not found".to_string()));
    }

    let blob = state
        .blob_store
        .upload(path)
        .await
        .ok_or_else(|| ApiError::Upload("Avatar upload failed".to_string()))?;

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET avatar_url = $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(&blob.url)
    .bind(Utc::now().naive_utc())
    .bind(auth.id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    Ok(ApiResponse::ok(
        UserPublic::from(user),
        "Avatar updated successfully",
    ))
}

#[patch("/user/update-coverimage")]
async fn update_cover_image(
    auth: AuthUser,
    req: web::Json<CoverImageUpdateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let path = req.cover_image.trim();
    if path.is_empty() {
        return Err(ApiError::Validation("File not found".to_string()));
    }

    let blob = state
        .blob_store
        .upload(path)
        .await
        .ok_or_else(|| ApiError::Upload("Cover image upload failed".to_string()))?;

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET cover_image_url = $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(&blob.url)
    .bind(Utc::now().naive_utc())
    .bind(auth.id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    Ok(ApiResponse::ok(
        UserPublic::from(user),
        "Cover image updated successfully",
    ))
}

#[get("/user/channel/{username}")]
async fn channel_info(
    auth: AuthUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let username = path.into_inner();
    let profile = views::channel_profile(&state.db_pool, &username, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Channel does not exist".to_string()))?;

    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

#[get("/user/history")]
async fn history(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let videos = views::watch_history(&state.db_pool, auth.id).await?;
    Ok(ApiResponse::ok(
        videos,
        "Watch history fetched successfully",
    ))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(logout)
        .service(token_refresh)
        .service(change_password)
        .service(current_user)
        .service(update_details)
        .service(update_avatar)
        .service(update_cover_image)
        .service(channel_info)
        .service(history);
}
