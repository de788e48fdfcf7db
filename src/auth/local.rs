// src/auth/local.rs

use async_trait::async_trait;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};

use super::{CredentialScheme, Identity, SchemeError};
use crate::{error::AppError, models::account::Account};

/// Claims carried by a self-issued session token.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// Internal account id.
    pub account_id: i64,
    pub username: String,
    pub email: String,
    /// Issued-at, Unix seconds.
    pub iat: u64,
    /// Expiration time as Unix timestamp.
    pub exp: u64,
}

/// HS256 session tokens signed with the service secret.
pub struct LocalScheme {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
}

impl LocalScheme {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_seconds,
        }
    }

    /// Signs a new session token for `account`, valid for the configured TTL.
    pub fn issue(&self, account: &Account) -> Result<String, AppError> {
        let iat = get_current_timestamp();
        let claims = SessionClaims {
            account_id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            iat,
            exp: iat + self.ttl_seconds,
        };

        self.sign(&claims)
    }

    pub fn sign(&self, claims: &SessionClaims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(e.to_string()))
    }

    /// Checks signature and expiry, returning the embedded claims.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, SchemeError> {
        let token_data = decode::<SessionClaims>(token, &self.decoding, &self.validation)?;
        Ok(token_data.claims)
    }
}

#[async_trait]
impl CredentialScheme for LocalScheme {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn verify(&self, token: &str) -> Result<Identity, SchemeError> {
        let claims = self.decode(token)?;
        Ok(Identity::Local(claims.account_id))
    }
}
