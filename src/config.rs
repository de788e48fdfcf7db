// src/config.rs

use std::env;

use dotenvy::dotenv;

/// Google's published JWK set for Firebase-style secure tokens.
pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

pub const DEFAULT_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings for the third-party identity provider.
#[derive(Debug, Clone)]
pub struct IdentityProviderConfig {
    /// Project id; doubles as the expected `aud` claim.
    pub project_id: String,
    pub jwks_url: url::Url,
    pub issuer_prefix: String,
}

impl IdentityProviderConfig {
    pub fn issuer(&self) -> String {
        format!("{}{}", self.issuer_prefix, self.project_id)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Lifetime of issued session tokens, in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    /// `None` disables the external credential scheme.
    pub identity_provider: Option<IdentityProviderConfig>,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://feed.db".to_string());

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: "must not be empty".to_string(),
            });
        }

        let jwt_expiration = parse_var("JWT_EXPIRATION", 86_400)?;
        let port = parse_var("PORT", 3000)?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let identity_provider = match env::var("IDP_PROJECT_ID") {
            Ok(project_id) if !project_id.trim().is_empty() => {
                let raw_url =
                    env::var("IDP_JWKS_URL").unwrap_or_else(|_| DEFAULT_JWKS_URL.to_string());
                let jwks_url = url::Url::parse(&raw_url).map_err(|e| ConfigError::Invalid {
                    name: "IDP_JWKS_URL",
                    reason: e.to_string(),
                })?;
                let issuer_prefix = env::var("IDP_ISSUER_PREFIX")
                    .unwrap_or_else(|_| DEFAULT_ISSUER_PREFIX.to_string());

                Some(IdentityProviderConfig {
                    project_id: project_id.trim().to_string(),
                    jwks_url,
                    issuer_prefix,
                })
            }
            _ => None,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            identity_provider,
            cors_origins,
        })
    }
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuer_joins_prefix_and_project() {
        let idp = IdentityProviderConfig {
            project_id: "demo".to_string(),
            jwks_url: url::Url::parse(DEFAULT_JWKS_URL).unwrap(),
            issuer_prefix: DEFAULT_ISSUER_PREFIX.to_string(),
        };
        assert_eq!(idp.issuer(), "https://securetoken.google.com/demo");
    }

    #[test]
    fn unset_numeric_var_falls_back_to_default() {
        let port: u16 = parse_var("FEED_TEST_UNSET_PORT_VAR", 4242).unwrap();
        assert_eq!(port, 4242);
    }

    #[test]
    fn config_error_names_the_variable() {
        let err = ConfigError::Missing("JWT_SECRET");
        assert_eq!(err.to_string(), "JWT_SECRET must be set");
    }
}
