use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    guard::{Action, OwnershipGuard, ResourceKind},
    models::account::{
        Account, ProfileChanges, PublicProfile, UpdateProfileRequest, UserListParams,
    },
    utils::html::clean_text,
};

/// Lists public profiles, oldest first.
pub async fn list_users(
    State(pool): State<SqlitePool>,
    AppQuery(params): AppQuery<UserListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);

    let users = sqlx::query_as::<_, PublicProfile>(
        r#"
        SELECT id, username, full_name, bio, avatar_url, created_at
        FROM accounts
        ORDER BY id ASC
        LIMIT ?1 OFFSET ?2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(users))
}

pub async fn get_user(
    State(pool): State<SqlitePool>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, PublicProfile>(
        r#"
        SELECT id, username, full_name, bio, avatar_url, created_at
        FROM accounts
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Updates the caller's own profile. The path id must be the caller's id.
pub async fn update_user(
    State(pool): State<SqlitePool>,
    State(guard): State<OwnershipGuard>,
    AuthUser(account): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(mut payload): AppJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let clear_avatar = payload.take_avatar_clear();
    payload.validate()?;

    guard
        .check(&account, Action::Update, ResourceKind::Account, id)
        .await?;

    // A name that sanitises to nothing is an error, not a no-op.
    let full_name = match payload.full_name.as_deref() {
        Some(raw) => Some(
            clean_text(raw)
                .ok_or_else(|| AppError::BadRequest("Full name cannot be empty".to_string()))?,
        ),
        None => None,
    };

    let changes = ProfileChanges {
        full_name,
        bio: payload.bio.as_deref().map(|bio| clean_text(bio).unwrap_or_default()),
        avatar_url: payload.avatar_url.map(|url| url.trim().to_string()),
        clear_avatar,
    };

    let updated = Account::update_profile(&pool, id, &changes)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    tracing::info!(account_id = updated.id, "profile updated");

    Ok(Json(updated))
}
