//! Credential verification and identity resolution.
//!
//! A bearer credential flows through [`CredentialVerifier`] (pure token
//! checks against each trust root in order) and then [`IdentityResolver`]
//! (the only step that touches storage), yielding the [`Account`] every
//! downstream ownership decision is made against.
//!
//! [`Account`]: crate::models::account::Account

pub mod extractor;
pub mod external;
pub mod local;
pub mod resolver;
pub mod verifier;

pub use extractor::AuthUser;
pub use external::{ExternalScheme, RemoteJwks, SigningKeys, StaticKeys};
pub use local::{LocalScheme, SessionClaims};
pub use resolver::IdentityResolver;
pub use verifier::{CredentialScheme, CredentialVerifier, SchemeError, bearer_token};

/// Result of a successful token check, not yet matched against storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Subject id asserted by the external identity provider.
    External(String),
    /// Internal account id carried by a self-issued session token.
    Local(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no bearer credential supplied")]
    Missing,

    #[error("credential rejected by every scheme")]
    InvalidToken,

    #[error("external identity has no account")]
    UnknownExternalIdentity,

    #[error("account referenced by credential does not exist")]
    UnknownAccount,

    /// Lookup failed for reasons unrelated to the credential.
    #[error("account lookup failed: {0}")]
    Store(#[from] sqlx::Error),
}
