use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::html::validate_not_blank;

/// Shared projection for post listings: author info plus live counts
/// aggregated from the relations.
pub const POST_VIEW_SELECT: &str = r#"
    SELECT
        p.id, p.author_id, a.username, a.avatar_url,
        p.content, p.image_url, p.created_at,
        (SELECT COUNT(*) FROM post_likes pl WHERE pl.post_id = p.id) AS like_count,
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
    FROM posts p
    JOIN accounts a ON a.id = p.author_id
"#;

/// A post as presented to clients.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub author_id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(
        length(
            min = 1,
            max = 5000,
            message = "Content length must be between 1 and 5000 chars"
        ),
        custom(function = validate_not_blank)
    )]
    pub content: String,

    #[validate(url(message = "Image must be a valid URL"))]
    pub image_url: Option<String>,
}

/// Query parameters for listing posts.
#[derive(Debug, Deserialize)]
pub struct PostListParams {
    /// Number of items to return (default: 10, max: 100).
    pub limit: Option<i64>,

    pub offset: Option<i64>,

    /// Only posts by this account.
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
}
