//! Read-model composition. Every function here is a side-effect-free join
//! materialized at query time; handlers call in, fold the result into the
//! response envelope, and nothing is cached.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::errors::ApiError;
use crate::models::{Playlist, Video};

/// Public projection of a video owner, as nested inside feed, playlist,
/// history and comment read models.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OwnerInfo {
    pub username: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoWithOwner {
    #[serde(flatten)]
    pub video: Video,
    pub owner: Option<OwnerInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithOwner {
    pub id: i32,
    pub content: String,
    pub video_id: i32,
    pub owner_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub owner: Option<OwnerInfo>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub subscriber_count: i64,
    pub subscribed_to_count: i64,
    pub is_subscribed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub videos: Vec<VideoWithOwner>,
}

/// Pagination envelope mirroring the aggregate-paginate shape the API always
/// exposed: `{docs, totalDocs, page, limit, totalPages, hasNextPage,
/// hasPrevPage}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub docs: Vec<T>,
    pub total_docs: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> Paginated<T> {
    pub fn new(docs: Vec<T>, total_docs: i64, page: i64, limit: i64) -> Self {
        let total_pages = if total_docs == 0 {
            0
        } else {
            (total_docs + limit - 1) / limit
        };
        Paginated {
            docs,
            total_docs,
            page,
            limit,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1 && total_docs > 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// 1-based page (default 1) and page size (default 10, capped at 20 — one
/// clamp convention for every paginated pipeline).
pub fn page_and_limit(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(10).clamp(1, 20);
    (page, limit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSortKey {
    Views,
    CreatedAt,
}

impl FeedSortKey {
    pub fn parse(value: &str) -> Result<Self, ApiError> {
        match value {
            "views" => Ok(FeedSortKey::Views),
            "createdAt" => Ok(FeedSortKey::CreatedAt),
            _ => Err(ApiError::Validation("Invalid sort reference".to_string())),
        }
    }

    fn column(self) -> &'static str {
        match self {
            FeedSortKey::Views => "v.view_count",
            FeedSortKey::CreatedAt => "v.created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Result<Self, ApiError> {
        match value {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(ApiError::Validation("Invalid sort type".to_string())),
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub query: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortType")]
    pub sort_type: Option<String>,
}

const VIDEO_OWNER_COLUMNS: &str = "v.id, v.video_url, v.thumbnail_url, v.title, v.description, \
     v.duration_seconds, v.view_count, v.is_published, v.owner_id, \
     v.created_at, v.updated_at, \
     u.username AS owner_username, u.avatar_url AS owner_avatar_url, \
     u.cover_image_url AS owner_cover_image_url";

#[derive(Debug, FromRow)]
struct VideoOwnerRow {
    id: i32,
    video_url: String,
    thumbnail_url: String,
    title: String,
    description: String,
    duration_seconds: i32,
    view_count: i32,
    is_published: bool,
    owner_id: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    owner_username: Option<String>,
    owner_avatar_url: Option<String>,
    owner_cover_image_url: Option<String>,
}

impl From<VideoOwnerRow> for VideoWithOwner {
    fn from(row: VideoOwnerRow) -> Self {
        let owner = row.owner_username.map(|username| OwnerInfo {
            username,
            avatar_url: row.owner_avatar_url.unwrap_or_default(),
            cover_image_url: row.owner_cover_image_url,
        });
        VideoWithOwner {
            video: Video {
                id: row.id,
                video_url: row.video_url,
                thumbnail_url: row.thumbnail_url,
                title: row.title,
                description: row.description,
                duration_seconds: row.duration_seconds,
                view_count: row.view_count,
                is_published: row.is_published,
                owner_id: row.owner_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            owner,
        }
    }
}

/// Channel profile: the user matched by username, subscriber counts from the
/// subscription edges on both sides, and whether the requester subscribes.
pub async fn channel_profile(
    pool: &PgPool,
    username: &str,
    requester_id: i32,
) -> Result<Option<ChannelProfile>, ApiError> {
    let profile = sqlx::query_as::<_, ChannelProfile>(
        "SELECT u.id, u.username, u.full_name, u.avatar_url, u.cover_image_url, \
                u.created_at, u.updated_at, \
                (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id) AS subscriber_count, \
                (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id) AS subscribed_to_count, \
                EXISTS (SELECT 1 FROM subscriptions s \
                        WHERE s.channel_id = u.id AND s.subscriber_id = $2) AS is_subscribed \
         FROM users u \
         WHERE u.username = $1",
    )
    .bind(username)
    .bind(requester_id)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}

/// Full-text video feed. The query string is mandatory; sort key and
/// direction are validated before any SQL runs, and ids break ties so a page
/// boundary never reshuffles between requests.
pub async fn video_feed(
    pool: &PgPool,
    params: &FeedQuery,
) -> Result<Paginated<VideoWithOwner>, ApiError> {
    let query = crate::models::trimmed(&params.query)
        .ok_or_else(|| ApiError::Validation("Need valid query to fetch relevant results".to_string()))?;

    let sort_key = FeedSortKey::parse(params.sort_by.as_deref().unwrap_or("views"))?;
    let direction = SortDirection::parse(params.sort_type.as_deref().unwrap_or("desc"))?;
    let (page, limit) = page_and_limit(params.page, params.limit);

    let filter = "v.is_published \
         AND to_tsvector('english', v.title || ' ' || v.description) \
             @@ plainto_tsquery('english', $1)";

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM videos v WHERE {}",
        filter
    ))
    .bind(&query)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, VideoOwnerRow>(&format!(
        "SELECT {} FROM videos v \
         LEFT JOIN users u ON u.id = v.owner_id \
         WHERE {} \
         ORDER BY {} {}, v.id DESC \
         LIMIT $2 OFFSET $3",
        VIDEO_OWNER_COLUMNS,
        filter,
        sort_key.column(),
        direction.keyword(),
    ))
    .bind(&query)
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(pool)
    .await?;

    let docs = rows.into_iter().map(VideoWithOwner::from).collect();
    Ok(Paginated::new(docs, total, page, limit))
}

pub async fn video_with_owner(
    pool: &PgPool,
    video_id: i32,
) -> Result<Option<VideoWithOwner>, ApiError> {
    let row = sqlx::query_as::<_, VideoOwnerRow>(&format!(
        "SELECT {} FROM videos v \
         LEFT JOIN users u ON u.id = v.owner_id \
         WHERE v.id = $1",
        VIDEO_OWNER_COLUMNS
    ))
    .bind(video_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(VideoWithOwner::from))
}

/// The user's watch history in stored (append) order.
pub async fn watch_history(
    pool: &PgPool,
    user_id: i32,
) -> Result<Vec<VideoWithOwner>, ApiError> {
    let rows = sqlx::query_as::<_, VideoOwnerRow>(&format!(
        "SELECT {} FROM watch_history h \
         JOIN videos v ON v.id = h.video_id \
         LEFT JOIN users u ON u.id = v.owner_id \
         WHERE h.user_id = $1 \
         ORDER BY h.watched_at ASC, v.id ASC",
        VIDEO_OWNER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(VideoWithOwner::from).collect())
}

/// Videos the user has liked. Comment likes are excluded by the not-null
/// filter on the video reference.
pub async fn liked_videos(
    pool: &PgPool,
    user_id: i32,
) -> Result<Vec<VideoWithOwner>, ApiError> {
    let rows = sqlx::query_as::<_, VideoOwnerRow>(&format!(
        "SELECT {} FROM likes l \
         JOIN videos v ON v.id = l.video_id \
         LEFT JOIN users u ON u.id = v.owner_id \
         WHERE l.owner_id = $1 AND l.video_id IS NOT NULL \
         ORDER BY l.created_at DESC, l.id DESC",
        VIDEO_OWNER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(VideoWithOwner::from).collect())
}

#[derive(Debug, FromRow)]
struct CommentOwnerRow {
    id: i32,
    content: String,
    video_id: i32,
    owner_id: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    owner_username: Option<String>,
    owner_avatar_url: Option<String>,
    owner_cover_image_url: Option<String>,
}

impl From<CommentOwnerRow> for CommentWithOwner {
    fn from(row: CommentOwnerRow) -> Self {
        let owner = row.owner_username.map(|username| OwnerInfo {
            username,
            avatar_url: row.owner_avatar_url.unwrap_or_default(),
            cover_image_url: row.owner_cover_image_url,
        });
        CommentWithOwner {
            id: row.id,
            content: row.content,
            video_id: row.video_id,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            owner,
        }
    }
}

/// Comments on a video, owner joined, newest first.
pub async fn video_comments(
    pool: &PgPool,
    video_id: i32,
    page: i64,
    limit: i64,
) -> Result<Paginated<CommentWithOwner>, ApiError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE video_id = $1")
        .bind(video_id)
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query_as::<_, CommentOwnerRow>(
        "SELECT c.id, c.content, c.video_id, c.owner_id, c.created_at, c.updated_at, \
                u.username AS owner_username, u.avatar_url AS owner_avatar_url, \
                u.cover_image_url AS owner_cover_image_url \
         FROM comments c \
         LEFT JOIN users u ON u.id = c.owner_id \
         WHERE c.video_id = $1 \
         ORDER BY c.created_at DESC, c.id DESC \
         LIMIT $2 OFFSET $3",
    )
    .bind(video_id)
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(pool)
    .await?;

    let docs = rows.into_iter().map(CommentWithOwner::from).collect();
    Ok(Paginated::new(docs, total, page, limit))
}

/// Videos of one playlist in the playlist's own ordering, owners nested.
async fn playlist_videos(pool: &PgPool, playlist_id: i32) -> Result<Vec<VideoWithOwner>, ApiError> {
    let rows = sqlx::query_as::<_, VideoOwnerRow>(&format!(
        "SELECT {} FROM playlist_videos pv \
         JOIN videos v ON v.id = pv.video_id \
         LEFT JOIN users u ON u.id = v.owner_id \
         WHERE pv.playlist_id = $1 \
         ORDER BY pv.position ASC",
        VIDEO_OWNER_COLUMNS
    ))
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(VideoWithOwner::from).collect())
}

pub async fn playlist_detail(
    pool: &PgPool,
    playlist_id: i32,
) -> Result<Option<PlaylistDetail>, ApiError> {
    let playlist = sqlx::query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = $1")
        .bind(playlist_id)
        .fetch_optional(pool)
        .await?;

    let playlist = match playlist {
        Some(playlist) => playlist,
        None => return Ok(None),
    };

    let videos = playlist_videos(pool, playlist.id).await?;
    Ok(Some(PlaylistDetail { playlist, videos }))
}

pub async fn user_playlists(pool: &PgPool, user_id: i32) -> Result<Vec<PlaylistDetail>, ApiError> {
    let playlists = sqlx::query_as::<_, Playlist>(
        "SELECT * FROM playlists WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut details = Vec::with_capacity(playlists.len());
    for playlist in playlists {
        let videos = playlist_videos(pool, playlist.id).await?;
        details.push(PlaylistDetail { playlist, videos });
    }
    Ok(details)
}

/// Users subscribed to the channel, public projection only.
pub async fn channel_subscribers(
    pool: &PgPool,
    channel_id: i32,
) -> Result<Vec<OwnerInfo>, ApiError> {
    let subscribers = sqlx::query_as::<_, OwnerInfo>(
        "SELECT u.username, u.avatar_url, u.cover_image_url \
         FROM subscriptions s \
         JOIN users u ON u.id = s.subscriber_id \
         WHERE s.channel_id = $1 \
         ORDER BY s.created_at ASC, s.id ASC",
    )
    .bind(channel_id)
    .fetch_all(pool)
    .await?;

    Ok(subscribers)
}

/// Channels the user is subscribed to, public projection only.
pub async fn subscribed_channels(
    pool: &PgPool,
    user_id: i32,
) -> Result<Vec<OwnerInfo>, ApiError> {
    let channels = sqlx::query_as::<_, OwnerInfo>(
        "SELECT u.username, u.avatar_url, u.cover_image_url \
         FROM subscriptions s \
         JOIN users u ON u.id = s.channel_id \
         WHERE s.subscriber_id = $1 \
         ORDER BY s.created_at ASC, s.id ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(channels)
}
