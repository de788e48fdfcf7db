use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::html::validate_not_blank;

pub const COMMENT_VIEW_SELECT: &str = r#"
    SELECT
        c.id, c.post_id, c.author_id, a.username, a.avatar_url,
        c.content, c.created_at,
        (SELECT COUNT(*) FROM comment_likes cl WHERE cl.comment_id = c.id) AS like_count
    FROM comments c
    JOIN accounts a ON a.id = c.author_id
"#;

/// DTO for displaying a comment with author info.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(
        length(
            min = 1,
            max = 1000,
            message = "Comment must be between 1 and 1000 characters"
        ),
        custom(function = validate_not_blank)
    )]
    pub content: String,
}
