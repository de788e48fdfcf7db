// src/handlers/posts.rs

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
    extract::{AppJson, AppPath, AppQuery},
    guard::{Action, OwnershipGuard, ResourceKind},
    ledger::{InteractionLedger, TargetKind},
    models::post::{CreatePostRequest, POST_VIEW_SELECT, PostListParams, PostView},
    utils::html::clean_text,
};

async fn fetch_post(pool: &SqlitePool, id: i64) -> Result<Option<PostView>, sqlx::Error> {
    sqlx::query_as::<_, PostView>(&format!("{} WHERE p.id = ?1", POST_VIEW_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// List posts (Recent first), optionally restricted to one author.
pub async fn list_posts(
    State(pool): State<SqlitePool>,
    AppQuery(params): AppQuery<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(10).clamp(1, 100); // Default 10, max 100
    let offset = params.offset.unwrap_or(0).max(0);

    let posts = sqlx::query_as::<_, PostView>(&format!(
        r#"{}
        WHERE (?1 IS NULL OR p.author_id = ?1)
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT ?2 OFFSET ?3
        "#,
        POST_VIEW_SELECT
    ))
    .bind(params.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list posts: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(posts))
}

/// Get a single post by ID.
pub async fn get_post(
    State(pool): State<SqlitePool>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = fetch_post(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Create a new post owned by the caller.
pub async fn create_post(
    State(pool): State<SqlitePool>,
    AuthUser(account): AuthUser,
    AppJson(payload): AppJson<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let content = clean_text(&payload.content)
        .ok_or_else(|| AppError::BadRequest("Content is required".to_string()))?;
    let image_url = payload
        .image_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());

    let post_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO posts (author_id, content, image_url)
        VALUES (?1, ?2, ?3)
        RETURNING id
        "#,
    )
    .bind(account.id)
    .bind(&content)
    .bind(image_url.as_deref())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::from(e)
    })?;

    let post = fetch_post(&pool, post_id)
        .await?
        .ok_or_else(|| AppError::InternalServerError(format!("post {} vanished", post_id)))?;

    tracing::info!(post_id, account_id = account.id, "post created");

    Ok((StatusCode::CREATED, Json(post)))
}

/// Delete a post. Only its author may do so; comments and likes go with it.
pub async fn delete_post(
    State(pool): State<SqlitePool>,
    State(guard): State<OwnershipGuard>,
    AuthUser(account): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    guard
        .check(&account, Action::Delete, ResourceKind::Post, id)
        .await?;

    let result = sqlx::query("DELETE FROM posts WHERE id = ?1 AND author_id = ?2")
        .bind(id)
        .bind(account.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::from(e)
        })?;

    // Lost a race with another delete.
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    tracing::info!(post_id = id, account_id = account.id, "post deleted");

    Ok(Json(json!({ "message": "Post deleted successfully" })))
}

pub async fn like_post(
    State(ledger): State<InteractionLedger>,
    AuthUser(account): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let like_count = ledger.like(account.id, id, TargetKind::Post).await?;

    Ok(Json(json!({
        "message": "Post liked successfully",
        "like_count": like_count,
    })))
}

pub async fn unlike_post(
    State(ledger): State<InteractionLedger>,
    AuthUser(account): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let like_count = ledger.unlike(account.id, id, TargetKind::Post).await?;

    Ok(Json(json!({
        "message": "Post unliked successfully",
        "like_count": like_count,
    })))
}
