// src/auth/extractor.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use super::bearer_token;
use crate::{error::AppError, models::account::Account, state::AppState};

/// The account behind the request's bearer credential.
///
/// Runs the credential verifier and then the identity resolver; handlers
/// that take this never look at the raw token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Account);

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = bearer_token(auth_header)?;

        let identity = state.verifier.verify(token).await?;
        let account = state.resolver.resolve(&identity).await?;

        Ok(AuthUser(account))
    }
}
