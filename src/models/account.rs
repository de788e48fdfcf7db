// src/models/account.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, external_subject_id, \
     full_name, bio, avatar_url, created_at, updated_at";

/// Represents the 'accounts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Unique, stored lower-cased.
    pub email: String,

    /// Argon2 hash; absent for accounts created through the identity provider.
    #[serde(skip)]
    pub password_hash: Option<String>,

    /// Identity provider subject id, unique when present.
    #[serde(skip)]
    pub external_subject_id: Option<String>,

    pub full_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create an account.
#[derive(Debug)]
pub struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: Option<&'a str>,
    pub external_subject_id: Option<&'a str>,
    pub full_name: &'a str,
}

impl Account {
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_external_subject(
        pool: &SqlitePool,
        subject: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE external_subject_id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(subject)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE email = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn username_or_email_taken(
        pool: &SqlitePool,
        username: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let hit: Option<i64> =
            sqlx::query_scalar("SELECT id FROM accounts WHERE username = ?1 OR email = ?2 LIMIT 1")
                .bind(username)
                .bind(email)
                .fetch_optional(pool)
                .await?;

        Ok(hit.is_some())
    }

    /// Inserts a new account. Uniqueness is enforced by the table, so a
    /// racing duplicate surfaces as a unique-violation `sqlx::Error`.
    pub async fn insert(pool: &SqlitePool, new: NewAccount<'_>) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (username, email, password_hash, external_subject_id, full_name)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.external_subject_id)
        .bind(new.full_name)
        .fetch_one(pool)
        .await
    }

    /// Applies the present fields of `changes`; absent fields keep their value.
    pub async fn update_profile(
        pool: &SqlitePool,
        id: i64,
        changes: &ProfileChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET full_name  = COALESCE(?1, full_name),
                bio        = COALESCE(?2, bio),
                avatar_url = CASE WHEN ?4 THEN NULL ELSE COALESCE(?3, avatar_url) END,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?5
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(changes.full_name.as_deref())
        .bind(changes.bio.as_deref())
        .bind(changes.avatar_url.as_deref())
        .bind(changes.clear_avatar)
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

/// Sanitised profile edits, ready to store.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    /// Set the avatar to NULL; wins over `avatar_url`.
    pub clear_avatar: bool,
}

/// The `user` object returned by register and login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
        }
    }
}

/// What anyone may see about an account.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// DTO for registration.
///
/// Either `password` or `externalToken` must be supplied.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,

    #[validate(email(message = "Email address is invalid."))]
    pub email: String,

    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: Option<String>,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Full name length must be between 1 and 100 characters."
    ))]
    pub full_name: String,

    /// Identity provider token; the account is then bound to its subject.
    #[serde(default, alias = "firebaseToken")]
    pub external_token: Option<String>,
}

impl RegisterRequest {
    /// Trims the username and lower-cases the email.
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = normalize_email(&self.email);
        self
    }
}

/// DTO for login, with either email/password or a provider token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default, alias = "firebaseToken")]
    pub external_token: Option<String>,
}

/// DTO for profile updates. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,

    #[validate(length(max = 500, message = "Bio must be at most 500 characters."))]
    pub bio: Option<String>,

    #[serde(default, alias = "profileImageUrl")]
    #[validate(url(message = "Avatar must be a valid URL."))]
    pub avatar_url: Option<String>,
}

impl UpdateProfileRequest {
    /// An empty `avatarUrl` means "remove the avatar". Strips it so the URL
    /// rule only sees real values, and reports whether it was present.
    pub fn take_avatar_clear(&mut self) -> bool {
        if self.avatar_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            self.avatar_url = None;
            true
        } else {
            false
        }
    }
}

/// Offset pagination for user listings.
#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
