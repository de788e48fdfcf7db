// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{auth, comments, health, posts, users},
    state::AppState,
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Public reads (feed, profiles, comments) need no credential.
/// * Every mutation takes an `AuthUser`, so it is rejected with 401 before
///   the handler body runs when the bearer token does not resolve.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/{id}", get(users::get_user).put(users::update_user));

    let post_routes = Router::new()
        .route("/", get(posts::list_posts).post(posts::create_post))
        .route("/{id}", get(posts::get_post).delete(posts::delete_post))
        .route("/{id}/like", post(posts::like_post).delete(posts::unlike_post));

    let comment_routes = Router::new()
        .route(
            "/post/{post_id}",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/{id}", delete(comments::delete_comment))
        .route(
            "/{id}/like",
            post(comments::like_comment).delete(comments::unlike_comment),
        );

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/posts", post_routes)
        .nest("/api/comments", comment_routes)
        .fallback(health::not_found)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
