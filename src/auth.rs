use std::future::{ready, Ready};

use actix_web::cookie::Cookie;
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::models::User;
use crate::AppState;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub exp: usize,
}

/// Refresh claims carry a `jti` so consecutive rotations within the same
/// second still produce distinct tokens; the stored-token equality check
/// depends on that.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: i32,
    pub jti: String,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, ApiError> {
    bcrypt::verify(password, password_hash)
        .map_err(|e| ApiError::Internal(format!("Failed to verify password: {}", e)))
}

pub fn issue_access_token(user: &User, config: &AppConfig) -> Result<String, ApiError> {
    let claims = AccessClaims {
        user_id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        exp: expiry(config.access_token_expiry_secs),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.access_token_secret.as_ref()),
    )
    .map_err(|_| ApiError::TokenGeneration)
}

pub fn issue_refresh_token(user_id: i32, config: &AppConfig) -> Result<String, ApiError> {
    let claims = RefreshClaims {
        user_id,
        jti: uuid::Uuid::new_v4().to_string(),
        exp: expiry(config.refresh_token_expiry_secs),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.refresh_token_secret.as_ref()),
    )
    .map_err(|_| ApiError::TokenGeneration)
}

pub fn verify_access_token(token: &str, secret: &str) -> Result<AccessClaims, ApiError> {
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub fn verify_refresh_token(token: &str, secret: &str) -> Result<RefreshClaims, ApiError> {
    let data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Issues a fresh access/refresh pair and persists the refresh token on the
/// user row. Overwriting the stored token is the sole revocation mechanism:
/// the previous refresh token stops working everywhere at once.
pub async fn rotate_tokens(
    pool: &PgPool,
    user: &User,
    config: &AppConfig,
) -> Result<TokenPair, ApiError> {
    let access_token = issue_access_token(user, config)?;
    let refresh_token = issue_refresh_token(user.id, config)?;

    sqlx::query("UPDATE users SET refresh_token = $1, updated_at = $2 WHERE id = $3")
        .bind(&refresh_token)
        .bind(Utc::now().naive_utc())
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(|_| ApiError::TokenGeneration)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

pub async fn clear_refresh_token(pool: &PgPool, user_id: i32) -> Result<(), ApiError> {
    sqlx::query("UPDATE users SET refresh_token = NULL, updated_at = $1 WHERE id = $2")
        .bind(Utc::now().naive_utc())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

fn expiry(lifetime_secs: i64) -> usize {
    (Utc::now() + chrono::Duration::seconds(lifetime_secs)).timestamp() as usize
}

pub fn session_cookie(name: &str, value: &str) -> Cookie<'static> {
    Cookie::build(name.to_string(), value.to_string())
        .path("/")
        .http_only(true)
        .secure(true)
        .finish()
}

pub fn removal_cookie(name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name.to_string(), "")
        .path("/")
        .http_only(true)
        .secure(true)
        .finish();
    cookie.make_removal();
    cookie
}

/// The authenticated caller, decoded from the access token. Handlers take
/// this as an extractor; token decoding needs no store access so extraction
/// is synchronous.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub email: String,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal("Application state is not configured".to_string()))?;

    let token = bearer_token(req)
        .or_else(|| req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| ApiError::Unauthorized("Missing access token".to_string()))?;

    let claims = verify_access_token(&token, &state.config.access_token_secret)?;

    Ok(AuthUser {
        id: claims.user_id,
        username: claims.username,
        email: claims.email,
    })
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(String::from)
}
