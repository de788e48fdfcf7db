// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    auth::AuthUser,
    error::AppError,
    extract::AppJson,
    models::account::{
        Account, AccountSummary, LoginRequest, NewAccount, RegisterRequest, normalize_email,
    },
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        html::clean_text,
    },
};

const DUPLICATE_ACCOUNT: &str = "Username or email already exists";
const DUPLICATE_IDENTITY: &str = "Identity already registered";

/// Verifies a provider token and returns its subject id.
async fn external_subject(state: &AppState, token: &str) -> Result<String, AppError> {
    let scheme = state
        .external
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("External sign-in is not enabled".to_string()))?;

    let claims = scheme.decode(token).await.map_err(|e| {
        tracing::warn!("External token rejected: {}", e);
        AppError::AuthError("Invalid external token".to_string())
    })?;

    Ok(claims.sub)
}

/// Registers a new account, either with a password or bound to an
/// identity provider subject.
///
/// Returns 201 with the account summary and a session token.
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Length and format rules apply to what is stored, not to the raw input.
    let payload = payload.normalized();
    payload.validate()?;

    let username = payload.username.as_str();
    let email = payload.email.as_str();
    let full_name = clean_text(&payload.full_name)
        .ok_or_else(|| AppError::BadRequest("All fields are required".to_string()))?;

    let subject = match payload.external_token.as_deref() {
        Some(token) if !token.trim().is_empty() => Some(external_subject(&state, token.trim()).await?),
        _ => None,
    };

    let password_hash = match (&subject, payload.password) {
        (Some(_), _) => None,
        (None, Some(password)) if !password.is_empty() => Some(hash_password(password).await?),
        (None, _) => return Err(AppError::BadRequest("Password is required".to_string())),
    };

    if Account::username_or_email_taken(&state.pool, username, email).await? {
        return Err(AppError::BadRequest(DUPLICATE_ACCOUNT.to_string()));
    }
    if let Some(subject) = &subject {
        if Account::find_by_external_subject(&state.pool, subject)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest(DUPLICATE_IDENTITY.to_string()));
        }
    }

    let account = Account::insert(
        &state.pool,
        NewAccount {
            username,
            email,
            password_hash: password_hash.as_deref(),
            external_subject_id: subject.as_deref(),
            full_name: &full_name,
        },
    )
    .await
    .map_err(|e| {
        // A concurrent registration can slip past the pre-check.
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let message = if db.message().contains("external_subject_id") {
                    DUPLICATE_IDENTITY
                } else {
                    DUPLICATE_ACCOUNT
                };
                return AppError::BadRequest(message.to_string());
            }
        }
        tracing::error!("Failed to register account: {:?}", e);
        AppError::from(e)
    })?;

    let token = state.sessions.issue(&account)?;
    tracing::info!(
        account_id = account.id,
        external = account.external_subject_id.is_some(),
        "account registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user": AccountSummary::from(&account),
            "token": token,
        })),
    ))
}

/// Authenticates with email/password or a provider token and returns a
/// fresh session token.
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invalid = || AppError::AuthError("Invalid credentials".to_string());

    let account = match payload.external_token.as_deref() {
        Some(token) if !token.trim().is_empty() => {
            let subject = external_subject(&state, token.trim())
                .await
                .map_err(|_| invalid())?;
            Account::find_by_external_subject(&state.pool, &subject)
                .await?
                .ok_or_else(|| AppError::AuthError("No account linked to this identity".to_string()))?
        }
        _ => {
            let (email, password) = match (payload.email, payload.password) {
                (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                    (email, password)
                }
                _ => {
                    return Err(AppError::BadRequest(
                        "Email and password are required".to_string(),
                    ));
                }
            };

            let account = Account::find_by_email(&state.pool, &normalize_email(&email))
                .await?
                .ok_or_else(invalid)?;
            let stored_hash = account.password_hash.clone().ok_or_else(invalid)?;

            if !verify_password(password, stored_hash).await? {
                tracing::warn!(account_id = account.id, "password mismatch");
                return Err(invalid());
            }
            account
        }
    };

    let token = state.sessions.issue(&account)?;

    Ok(Json(json!({
        "user": AccountSummary::from(&account),
        "token": token,
    })))
}

/// The account the bearer credential resolves to.
pub async fn me(AuthUser(account): AuthUser) -> Json<Account> {
    Json(account)
}
