// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;

use feed::{
    auth::{ExternalScheme, StaticKeys},
    config::Config,
    db, routes,
    state::AppState,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, encode, get_current_timestamp};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const IDP_PROJECT: &str = "feed-test";
pub const IDP_ISSUER: &str = "https://securetoken.google.com/feed-test";
pub const IDP_KID: &str = "test-key";

const IDP_PRIVATE: &str = include_str!("../fixtures/idp_private.pem");
const IDP_PUBLIC: &str = include_str!("../fixtures/idp_public.pem");

/// A migrated SQLite database in a temporary directory.
/// Keep the `TempDir` alive for as long as the pool is used.
pub async fn test_pool() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("feed.db").display());

    let pool = db::connect(&url, 8)
        .await
        .expect("Failed to open test database");
    db::migrate(&pool).await.expect("Failed to migrate database");

    (pool, dir)
}

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        identity_provider: None,
        cors_origins: vec!["http://localhost:3000".to_string()],
    }
}

/// External scheme trusting the fixture key instead of a remote JWK set.
pub fn test_external_scheme() -> Arc<ExternalScheme> {
    let key = DecodingKey::from_rsa_pem(IDP_PUBLIC.as_bytes()).expect("bad fixture key");
    let keys = StaticKeys::new().with_key(IDP_KID, key);
    Arc::new(ExternalScheme::new(Arc::new(keys), IDP_ISSUER, IDP_PROJECT))
}

/// Mints a provider token for `subject`, signed with the fixture key.
pub fn provider_token(subject: &str) -> String {
    let now = get_current_timestamp();
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(IDP_KID.to_string());

    encode(
        &header,
        &json!({
            "sub": subject,
            "iss": IDP_ISSUER,
            "aud": IDP_PROJECT,
            "iat": now,
            "exp": now + 600,
        }),
        &EncodingKey::from_rsa_pem(IDP_PRIVATE.as_bytes()).expect("bad fixture key"),
    )
    .expect("Failed to sign provider token")
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub state: AppState,
    pub client: reqwest::Client,
    _dir: TempDir,
}

/// Spawns the app on a random port for testing.
pub async fn spawn_app() -> TestApp {
    let (pool, dir) = test_pool().await;
    let config = test_config("sqlite://unused");

    let state = AppState::with_external(pool.clone(), config, Some(test_external_scheme()));
    let app = routes::create_router(state.clone());

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        state,
        client: reqwest::Client::new(),
        _dir: dir,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "username": username,
                "email": format!("{}@x.com", username),
                "password": password,
                "fullName": format!("{} Example", username),
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Registers `username` and returns `(account id, token)`.
    pub async fn register_ok(&self, username: &str) -> (i64, String) {
        let response = self.register(username, "pw123").await;
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        let id = body["user"]["id"].as_i64().expect("id not found");
        let token = body["token"].as_str().expect("token not found").to_string();
        (id, token)
    }

    pub async fn create_post(&self, token: &str, content: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/posts"))
            .bearer_auth(token)
            .json(&json!({ "content": content }))
            .send()
            .await
            .expect("Failed to execute request")
    }
}
