//! Tokens minted by the third-party identity provider.
//!
//! Only RS256 tokens whose `kid` is known to the configured key source are
//! considered; issuer and audience are pinned to the provider project.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, jwk::JwkSet};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use super::{CredentialScheme, Identity, SchemeError};
use crate::config::IdentityProviderConfig;

/// How long a fetched key set is trusted before it is fetched again.
const JWKS_TTL: Duration = Duration::from_secs(60 * 60);

/// Unknown key ids trigger a refetch, but not more often than this.
const JWKS_MIN_REFRESH: Duration = Duration::from_secs(30);

/// Source of provider signing keys, by key id.
#[async_trait]
pub trait SigningKeys: Send + Sync {
    async fn key(&self, kid: &str) -> Result<DecodingKey, SchemeError>;
}

/// Fixed set of keys. Used for tests and for deployments that pin keys.
#[derive(Clone, Default)]
pub struct StaticKeys {
    keys: HashMap<String, DecodingKey>,
}

impl StaticKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, kid: impl Into<String>, key: DecodingKey) -> Self {
        self.keys.insert(kid.into(), key);
        self
    }
}

#[async_trait]
impl SigningKeys for StaticKeys {
    async fn key(&self, kid: &str) -> Result<DecodingKey, SchemeError> {
        self.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| unknown_kid(kid))
    }
}

struct CachedSet {
    keys: JwkSet,
    fetched_at: Instant,
}

impl CachedSet {
    /// `None` means the cache cannot answer and a fetch is due.
    fn lookup(
        &self,
        kid: &str,
        ttl: Duration,
        min_refresh: Duration,
    ) -> Option<Result<DecodingKey, SchemeError>> {
        let age = self.fetched_at.elapsed();
        if age >= ttl {
            return None;
        }
        match key_from_set(&self.keys, kid) {
            Some(found) => Some(found),
            None if age < min_refresh => Some(Err(unknown_kid(kid))),
            None => None,
        }
    }
}

fn unknown_kid(kid: &str) -> SchemeError {
    SchemeError::KeyUnavailable(format!("unknown key id {}", kid))
}

/// Key set published by the provider as a JWK document.
pub struct RemoteJwks {
    client: reqwest::Client,
    url: url::Url,
    ttl: Duration,
    min_refresh: Duration,
    cache: RwLock<Option<CachedSet>>,
    /// Held while fetching so concurrent misses share one request.
    refresh: Mutex<()>,
}

impl RemoteJwks {
    pub fn new(url: url::Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            ttl: JWKS_TTL,
            min_refresh: JWKS_MIN_REFRESH,
            cache: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Overrides the cache lifetime and the refetch throttle.
    pub fn with_timing(mut self, ttl: Duration, min_refresh: Duration) -> Self {
        self.ttl = ttl;
        self.min_refresh = min_refresh;
        self
    }

    async fn cached(&self, kid: &str) -> Option<Result<DecodingKey, SchemeError>> {
        self.cache
            .read()
            .await
            .as_ref()
            .and_then(|cached| cached.lookup(kid, self.ttl, self.min_refresh))
    }

    async fn fetch(&self) -> Result<JwkSet, SchemeError> {
        tracing::debug!(url = %self.url, "fetching identity provider keys");

        self.client
            .get(self.url.clone())
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| SchemeError::KeyUnavailable(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| SchemeError::KeyUnavailable(e.to_string()))
    }
}

fn key_from_set(keys: &JwkSet, kid: &str) -> Option<Result<DecodingKey, SchemeError>> {
    keys.find(kid).map(|jwk| {
        DecodingKey::from_jwk(jwk).map_err(|e| SchemeError::KeyUnavailable(e.to_string()))
    })
}

#[async_trait]
impl SigningKeys for RemoteJwks {
    async fn key(&self, kid: &str) -> Result<DecodingKey, SchemeError> {
        if let Some(answer) = self.cached(kid).await {
            return answer;
        }

        let _refresh = self.refresh.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(answer) = self.cached(kid).await {
            return answer;
        }

        let keys = self.fetch().await?;
        let found = key_from_set(&keys, kid);
        *self.cache.write().await = Some(CachedSet {
            keys,
            fetched_at: Instant::now(),
        });

        found.unwrap_or_else(|| Err(unknown_kid(kid)))
    }
}

/// Claims we read from a provider token.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalClaims {
    /// Provider-scoped stable user id.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

pub struct ExternalScheme {
    keys: Arc<dyn SigningKeys>,
    validation: Validation,
}

impl ExternalScheme {
    pub fn new(keys: Arc<dyn SigningKeys>, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Self { keys, validation }
    }

    pub fn from_config(config: &IdentityProviderConfig) -> Self {
        let keys = Arc::new(RemoteJwks::new(config.jwks_url.clone()));
        Self::new(keys, &config.issuer(), &config.project_id)
    }

    /// Validates signature, expiry, issuer and audience.
    pub async fn decode(&self, token: &str) -> Result<ExternalClaims, SchemeError> {
        let header = decode_header(token)?;

        // Session tokens are HS256; bail before any key lookup.
        if header.alg != Algorithm::RS256 {
            return Err(SchemeError::Rejected(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| SchemeError::Malformed("missing key id".to_string()))?;
        let key = self.keys.key(&kid).await?;

        let claims = decode::<ExternalClaims>(token, &key, &self.validation)?.claims;
        if claims.sub.trim().is_empty() {
            return Err(SchemeError::Rejected("empty subject".to_string()));
        }

        Ok(claims)
    }
}

#[async_trait]
impl CredentialScheme for ExternalScheme {
    fn name(&self) -> &'static str {
        "external"
    }

    async fn verify(&self, token: &str) -> Result<Identity, SchemeError> {
        let claims = self.decode(token).await?;
        Ok(Identity::External(claims.sub))
    }
}
