// src/error.rs

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{auth::AuthError, guard::AuthzError, ledger::LedgerError};

/// Global Application Error Enum.
/// Every failure leaving a handler is mapped to exactly one of these, and
/// each variant to exactly one HTTP status.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

/// Converts the error into a `{ "error": ... }` JSON body.
/// Internal details are logged, never sent to the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => msg,
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => "Expected a JSON request body",
            JsonRejection::JsonSyntaxError(_) => "Malformed JSON request body",
            JsonRejection::JsonDataError(_) => "All fields are required",
            _ => "Invalid request body",
        };
        AppError::BadRequest(message.to_string())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Rejected path: {}", rejection.body_text());
        AppError::BadRequest("Invalid path parameter".to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("Rejected query: {}", rejection.body_text());
        AppError::BadRequest("Invalid query parameters".to_string())
    }
}

/// Credential failures all look alike to the caller; which scheme rejected
/// the token only shows up in the logs.
impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Missing => AppError::AuthError("Unauthorized: No token provided".to_string()),
            AuthError::Store(e) => AppError::InternalServerError(e.to_string()),
            other => {
                tracing::warn!("Rejected credential: {}", other);
                AppError::AuthError("Unauthorized: Invalid token".to_string())
            }
        }
    }
}

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotFound(kind) => AppError::NotFound(format!("{} not found", kind.label())),
            AuthzError::Forbidden { .. } => AppError::Forbidden("Not authorized".to_string()),
            AuthzError::Store(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AlreadyLiked(kind) => {
                AppError::BadRequest(format!("{} already liked", kind.label()))
            }
            LedgerError::NotLiked(kind) => AppError::BadRequest(format!("{} not liked", kind.label())),
            LedgerError::TargetNotFound(kind) => {
                AppError::NotFound(format!("{} not found", kind.label()))
            }
            LedgerError::Store(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}
