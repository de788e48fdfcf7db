use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;

use super::{AuthError, Identity};

/// Why a single scheme refused a token.
#[derive(Debug, thiserror::Error)]
pub enum SchemeError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("token rejected: {0}")]
    Rejected(String),

    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),
}

impl From<jsonwebtoken::errors::Error> for SchemeError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => SchemeError::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => SchemeError::Malformed(err.to_string()),
            _ => SchemeError::Rejected(err.to_string()),
        }
    }
}

/// One trust root able to turn a raw bearer token into an [`Identity`].
#[async_trait]
pub trait CredentialScheme: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn verify(&self, token: &str) -> Result<Identity, SchemeError>;
}

/// Ordered list of schemes; the first one to accept a token wins.
pub struct CredentialVerifier {
    schemes: Vec<Arc<dyn CredentialScheme>>,
}

impl CredentialVerifier {
    pub fn new(schemes: Vec<Arc<dyn CredentialScheme>>) -> Self {
        Self { schemes }
    }

    pub fn scheme_names(&self) -> Vec<&'static str> {
        self.schemes.iter().map(|s| s.name()).collect()
    }

    /// Tries each scheme in order and short-circuits on the first success.
    ///
    /// Per-scheme failures are logged at debug level only; callers just see
    /// [`AuthError::InvalidToken`].
    pub async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let mut failures: Vec<(&'static str, SchemeError)> = Vec::with_capacity(self.schemes.len());

        for scheme in &self.schemes {
            match scheme.verify(token).await {
                Ok(identity) => {
                    tracing::debug!(scheme = scheme.name(), "credential accepted");
                    return Ok(identity);
                }
                Err(e) => failures.push((scheme.name(), e)),
            }
        }

        let summary = failures
            .iter()
            .map(|(name, e)| format!("{}: {}", name, e))
            .collect::<Vec<_>>()
            .join("; ");
        tracing::debug!(failures = %summary, "credential rejected by all schemes");

        Err(AuthError::InvalidToken)
    }

    /// Same as [`verify`](Self::verify) but starting from the raw
    /// `Authorization` header value.
    pub async fn verify_header(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let token = bearer_token(header)?;
        self.verify(token).await
    }
}

/// Extracts `<token>` from `Bearer <token>`.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::Missing)
}
