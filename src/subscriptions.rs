use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::auth::AuthUser;
use crate::errors::{ApiError, ApiResponse};
use crate::models::Subscription;
use crate::{views, AppState};

#[post("/subscriptions/channel/{channelId}")]
async fn toggle_subscription(
    auth: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let channel_id = path.into_inner();

    let channel_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(channel_id)
        .fetch_one(&state.db_pool)
        .await?;
    if !channel_exists {
        return Err(ApiError::NotFound("Channel does not exist".to_string()));
    }

    // Same lookup-before-insert discipline as the like toggles.
    let existing: Option<i32> = sqlx::query_scalar(
        "SELECT id FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2",
    )
    .bind(auth.id)
    .bind(channel_id)
    .fetch_optional(&state.db_pool)
    .await?;

    if let Some(subscription_id) = existing {
        sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(subscription_id)
            .execute(&state.db_pool)
            .await?;
        return Ok(ApiResponse::ok(json!({}), "Unsubscribed successfully"));
    }

    let subscription = sqlx::query_as::<_, Subscription>(
        "INSERT INTO subscriptions (subscriber_id, channel_id, created_at) \
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(auth.id)
    .bind(channel_id)
    .bind(Utc::now().naive_utc())
    .fetch_one(&state.db_pool)
    .await?;

    Ok(ApiResponse::ok(subscription, "Subscribed successfully"))
}

#[get("/subscriptions/channel/{channelId}")]
async fn channel_subscribers(
    _auth: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let channel_id = path.into_inner();
    let subscribers = views::channel_subscribers(&state.db_pool, channel_id).await?;
    Ok(ApiResponse::ok(
        subscribers,
        "Subscribers fetched successfully",
    ))
}

#[get("/subscriptions/user/{userId}")]
async fn subscribed_channels(
    _auth: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let channels = views::subscribed_channels(&state.db_pool, user_id).await?;
    Ok(ApiResponse::ok(
        channels,
        "Fetched channels user is subscribed to successfully",
    ))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(toggle_subscription)
        .service(channel_subscribers)
        .service(subscribed_channels);
}
