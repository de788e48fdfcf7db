use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{AppJson, AppPath},
    guard::{Action, OwnershipGuard, ResourceKind},
    ledger::{InteractionLedger, TargetKind},
    models::comment::{COMMENT_VIEW_SELECT, CommentView, CreateCommentRequest},
    utils::html::clean_text,
};

/// List all comments for a post, newest first.
pub async fn list_comments(
    State(pool): State<SqlitePool>,
    AppPath(post_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let comments = sqlx::query_as::<_, CommentView>(&format!(
        "{} WHERE c.post_id = ?1 ORDER BY c.created_at DESC, c.id DESC",
        COMMENT_VIEW_SELECT
    ))
    .bind(post_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(comments))
}

/// Create a new comment on an existing post.
pub async fn create_comment(
    State(pool): State<SqlitePool>,
    AuthUser(account): AuthUser,
    AppPath(post_id): AppPath<i64>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let content = clean_text(&payload.content)
        .ok_or_else(|| AppError::BadRequest("Content is required".to_string()))?;

    let post_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = ?1)")
        .bind(post_id)
        .fetch_one(&pool)
        .await?;
    if !post_exists {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let comment_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO comments (post_id, author_id, content)
        VALUES (?1, ?2, ?3)
        RETURNING id
        "#,
    )
    .bind(post_id)
    .bind(account.id)
    .bind(&content)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // The post may have been deleted since the existence check.
        if let sqlx::Error::Database(db) = &e {
            if db.is_foreign_key_violation() {
                return AppError::NotFound("Post not found".to_string());
            }
        }
        tracing::error!("Failed to create comment: {:?}", e);
        AppError::from(e)
    })?;

    let comment = sqlx::query_as::<_, CommentView>(&format!(
        "{} WHERE c.id = ?1",
        COMMENT_VIEW_SELECT
    ))
    .bind(comment_id)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Delete a comment. Only its author may do so.
pub async fn delete_comment(
    State(pool): State<SqlitePool>,
    State(guard): State<OwnershipGuard>,
    AuthUser(account): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    guard
        .check(&account, Action::Delete, ResourceKind::Comment, id)
        .await?;

    let result = sqlx::query("DELETE FROM comments WHERE id = ?1 AND author_id = ?2")
        .bind(id)
        .bind(account.id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    Ok(Json(json!({ "message": "Comment deleted successfully" })))
}

pub async fn like_comment(
    State(ledger): State<InteractionLedger>,
    AuthUser(account): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let like_count = ledger.like(account.id, id, TargetKind::Comment).await?;

    Ok(Json(json!({
        "message": "Comment liked successfully",
        "like_count": like_count,
    })))
}

pub async fn unlike_comment(
    State(ledger): State<InteractionLedger>,
    AuthUser(account): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let like_count = ledger.unlike(account.id, id, TargetKind::Comment).await?;

    Ok(Json(json!({
        "message": "Comment unliked successfully",
        "like_count": like_count,
    })))
}
