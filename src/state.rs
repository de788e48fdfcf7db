use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{
    auth::{CredentialScheme, CredentialVerifier, ExternalScheme, IdentityResolver, LocalScheme},
    config::Config,
    guard::OwnershipGuard,
    ledger::InteractionLedger,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub verifier: Arc<CredentialVerifier>,
    /// Issues and checks self-signed session tokens.
    pub sessions: Arc<LocalScheme>,
    /// Present only when an identity provider is configured.
    pub external: Option<Arc<ExternalScheme>>,
    pub resolver: IdentityResolver,
    pub guard: OwnershipGuard,
    pub ledger: InteractionLedger,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let external = config
            .identity_provider
            .as_ref()
            .map(|idp| Arc::new(ExternalScheme::from_config(idp)));
        Self::with_external(pool, config, external)
    }

    /// Builds the state around an explicit external scheme, e.g. one backed
    /// by pinned keys.
    pub fn with_external(
        pool: SqlitePool,
        config: Config,
        external: Option<Arc<ExternalScheme>>,
    ) -> Self {
        let sessions = Arc::new(LocalScheme::new(&config.jwt_secret, config.jwt_expiration));

        // The provider is tried first, then our own tokens.
        let mut schemes: Vec<Arc<dyn CredentialScheme>> = Vec::with_capacity(2);
        if let Some(external) = &external {
            schemes.push(external.clone());
        }
        schemes.push(sessions.clone());

        let verifier = Arc::new(CredentialVerifier::new(schemes));
        tracing::info!(schemes = ?verifier.scheme_names(), "credential verifier ready");

        Self {
            resolver: IdentityResolver::new(pool.clone()),
            guard: OwnershipGuard::new(pool.clone()),
            ledger: InteractionLedger::new(pool.clone()),
            pool,
            config,
            verifier,
            sessions,
            external,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for OwnershipGuard {
    fn from_ref(state: &AppState) -> Self {
        state.guard.clone()
    }
}

impl FromRef<AppState> for InteractionLedger {
    fn from_ref(state: &AppState) -> Self {
        state.ledger.clone()
    }
}
