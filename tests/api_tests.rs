// tests/api_tests.rs

mod common;

use common::{provider_token, spawn_app};
use serde_json::{Value, json};

#[tokio::test]
async fn unknown_path_is_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn health_and_ready() {
    let app = spawn_app().await;

    let health = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(health.status().as_u16(), 200);

    let ready = app.client.get(app.url("/ready")).send().await.unwrap();
    assert_eq!(ready.status().as_u16(), 200);
    let body: Value = ready.json().await.unwrap();
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn register_returns_user_and_token_then_rejects_duplicates() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "pw123",
            "fullName": "Alice A"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["email"], "alice@x.com");
    assert_eq!(body["user"]["fullName"], "Alice A");
    assert!(body["user"]["id"].is_i64());
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    // Same username, different email
    let again = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": "alice",
            "email": "other@x.com",
            "password": "pw123",
            "fullName": "Alice B"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(again.status().as_u16(), 400);
    let body: Value = again.json().await.unwrap();
    assert_eq!(body["error"], "Username or email already exists");
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app().await;

    // Username too short
    let response = app.register("yo", "pw123").await;
    assert_eq!(response.status().as_u16(), 400);

    // No password and no provider token
    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": "nopass",
            "email": "nopass@x.com",
            "fullName": "No Pass"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn login_checks_the_password() {
    let app = spawn_app().await;
    app.register_ok("carol").await;

    let ok = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "carol@x.com", "password": "pw123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status().as_u16(), 200);
    let body: Value = ok.json().await.unwrap();
    assert_eq!(body["user"]["username"], "carol");
    let token = body["token"].as_str().unwrap().to_string();

    let wrong = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "carol@x.com", "password": "anything-else" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 401);
    let body: Value = wrong.json().await.unwrap();
    assert_eq!(body["error"], "Invalid credentials");

    let unknown = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "nobody@x.com", "password": "pw123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 401);

    // The login token works for /me
    let me: Value = app
        .client
        .get(app.url("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["username"], "carol");
    assert!(me.get("passwordHash").is_none());
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer() {
    let app = spawn_app().await;

    let missing = app.client.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(missing.status().as_u16(), 401);

    let garbage = app
        .client
        .get(app.url("/api/auth/me"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status().as_u16(), 401);
    let body: Value = garbage.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Unauthorized"));

    let wrong_scheme = app
        .client
        .post(app.url("/api/posts"))
        .header("Authorization", "Basic abc")
        .json(&json!({ "content": "hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_scheme.status().as_u16(), 401);
}

#[tokio::test]
async fn token_of_deleted_account_is_rejected() {
    let app = spawn_app().await;
    let (id, token) = app.register_ok("ghost").await;

    sqlx::query("DELETE FROM accounts WHERE id = ?1")
        .bind(id)
        .execute(&app.pool)
        .await
        .unwrap();

    let response = app
        .client
        .get(app.url("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn like_unlike_scenario() {
    let app = spawn_app().await;
    let (_, alice) = app.register_ok("alice").await;
    let (_, bob) = app.register_ok("bob").await;

    // Alice posts
    let created = app.create_post(&alice, "hello").await;
    assert_eq!(created.status().as_u16(), 201);
    let post: Value = created.json().await.unwrap();
    assert_eq!(post["content"], "hello");
    assert_eq!(post["like_count"], 0);
    assert_eq!(post["comment_count"], 0);
    let post_id = post["id"].as_i64().unwrap();
    let like_url = app.url(&format!("/api/posts/{}/like", post_id));

    // Bob likes it
    let liked = app.client.post(&like_url).bearer_auth(&bob).send().await.unwrap();
    assert_eq!(liked.status().as_u16(), 200);
    let body: Value = liked.json().await.unwrap();
    assert_eq!(body["like_count"], 1);
    assert!(body["message"].is_string());

    // Bob likes it again
    let again = app.client.post(&like_url).bearer_auth(&bob).send().await.unwrap();
    assert_eq!(again.status().as_u16(), 400);
    let body: Value = again.json().await.unwrap();
    assert_eq!(body["error"], "Post already liked");

    let fetched: Value = app
        .client
        .get(app.url(&format!("/api/posts/{}", post_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["like_count"], 1);

    // Bob unlikes
    let unliked = app.client.delete(&like_url).bearer_auth(&bob).send().await.unwrap();
    assert_eq!(unliked.status().as_u16(), 200);
    let body: Value = unliked.json().await.unwrap();
    assert_eq!(body["like_count"], 0);

    // Unlike again
    let not_liked = app.client.delete(&like_url).bearer_auth(&bob).send().await.unwrap();
    assert_eq!(not_liked.status().as_u16(), 400);

    // Unknown post
    let missing = app
        .client
        .post(app.url("/api/posts/999999/like"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn only_the_author_can_delete_a_post() {
    let app = spawn_app().await;
    let (_, alice) = app.register_ok("alice").await;
    let (_, bob) = app.register_ok("bob").await;

    let post: Value = app.create_post(&alice, "mine").await.json().await.unwrap();
    let post_url = app.url(&format!("/api/posts/{}", post["id"].as_i64().unwrap()));

    let forbidden = app.client.delete(&post_url).bearer_auth(&bob).send().await.unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);

    let deleted = app.client.delete(&post_url).bearer_auth(&alice).send().await.unwrap();
    assert_eq!(deleted.status().as_u16(), 200);

    let gone = app.client.get(&post_url).send().await.unwrap();
    assert_eq!(gone.status().as_u16(), 404);

    // Deleting what no longer exists is not-found, not forbidden
    let again = app.client.delete(&post_url).bearer_auth(&bob).send().await.unwrap();
    assert_eq!(again.status().as_u16(), 404);
}

#[tokio::test]
async fn blank_post_is_rejected() {
    let app = spawn_app().await;
    let (_, alice) = app.register_ok("alice").await;

    let response = app.create_post(&alice, "   ").await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn feed_lists_newest_first_with_counts() {
    let app = spawn_app().await;
    let (alice_id, alice) = app.register_ok("alice").await;
    let (_, bob) = app.register_ok("bob").await;

    let first: Value = app.create_post(&alice, "first").await.json().await.unwrap();
    app.create_post(&bob, "second").await;

    app.client
        .post(app.url(&format!("/api/posts/{}/like", first["id"])))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();

    let feed: Vec<Value> = app
        .client
        .get(app.url("/api/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0]["content"], "second");
    assert_eq!(feed[1]["like_count"], 1);

    let only_alice: Vec<Value> = app
        .client
        .get(app.url(&format!("/api/posts?userId={}&limit=5", alice_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(only_alice.len(), 1);
    assert_eq!(only_alice[0]["username"], "alice");

    let paged: Vec<Value> = app
        .client
        .get(app.url("/api/posts?limit=1&offset=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0]["content"], "first");
}

#[tokio::test]
async fn comment_lifecycle() {
    let app = spawn_app().await;
    let (_, alice) = app.register_ok("alice").await;
    let (_, bob) = app.register_ok("bob").await;

    let post: Value = app.create_post(&alice, "discuss").await.json().await.unwrap();
    let post_id = post["id"].as_i64().unwrap();

    let created = app
        .client
        .post(app.url(&format!("/api/comments/post/{}", post_id)))
        .bearer_auth(&bob)
        .json(&json!({ "content": "nice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);
    let comment: Value = created.json().await.unwrap();
    assert_eq!(comment["like_count"], 0);
    assert_eq!(comment["username"], "bob");
    let comment_id = comment["id"].as_i64().unwrap();

    // Alice likes Bob's comment
    let liked: Value = app
        .client
        .post(app.url(&format!("/api/comments/{}/like", comment_id)))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(liked["like_count"], 1);

    let listed: Vec<Value> = app
        .client
        .get(app.url(&format!("/api/comments/post/{}", post_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["like_count"], 1);

    let post_view: Value = app
        .client
        .get(app.url(&format!("/api/posts/{}", post_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(post_view["comment_count"], 1);

    // Alice owns the post but not the comment
    let forbidden = app
        .client
        .delete(app.url(&format!("/api/comments/{}", comment_id)))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);

    let deleted = app
        .client
        .delete(app.url(&format!("/api/comments/{}", comment_id)))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 200);

    // Commenting on a missing post
    let missing = app
        .client
        .post(app.url("/api/comments/post/424242"))
        .bearer_auth(&bob)
        .json(&json!({ "content": "hello?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn deleting_a_post_removes_its_comments() {
    let app = spawn_app().await;
    let (_, alice) = app.register_ok("alice").await;

    let post: Value = app.create_post(&alice, "short lived").await.json().await.unwrap();
    let post_id = post["id"].as_i64().unwrap();

    app.client
        .post(app.url(&format!("/api/comments/post/{}", post_id)))
        .bearer_auth(&alice)
        .json(&json!({ "content": "self reply" }))
        .send()
        .await
        .unwrap();

    app.client
        .delete(app.url(&format!("/api/posts/{}", post_id)))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = ?1")
        .bind(post_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn profile_updates_are_owner_only() {
    let app = spawn_app().await;
    let (alice_id, alice) = app.register_ok("alice").await;
    let (bob_id, _) = app.register_ok("bob").await;

    let updated = app
        .client
        .put(app.url(&format!("/api/users/{}", alice_id)))
        .bearer_auth(&alice)
        .json(&json!({ "bio": "hi there", "avatarUrl": "https://img.example/a.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status().as_u16(), 200);
    let body: Value = updated.json().await.unwrap();
    assert_eq!(body["bio"], "hi there");
    assert_eq!(body["avatarUrl"], "https://img.example/a.png");
    assert_eq!(body["fullName"], "alice Example");

    let forbidden = app
        .client
        .put(app.url(&format!("/api/users/{}", bob_id)))
        .bearer_auth(&alice)
        .json(&json!({ "bio": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);

    let missing = app
        .client
        .put(app.url("/api/users/987654"))
        .bearer_auth(&alice)
        .json(&json!({ "bio": "nobody" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);

    let public: Value = app
        .client
        .get(app.url(&format!("/api/users/{}", alice_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(public["bio"], "hi there");
    assert!(public.get("email").is_none());

    let users: Vec<Value> = app
        .client
        .get(app.url("/api/users?limit=10"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 2);
}

#[tokio::test]
async fn provider_token_registration_and_use() {
    let app = spawn_app().await;
    let provider = provider_token("firebase-uid-123");

    // Unknown provider identity is unauthorized
    let before = app
        .client
        .get(app.url("/api/auth/me"))
        .bearer_auth(&provider)
        .send()
        .await
        .unwrap();
    assert_eq!(before.status().as_u16(), 401);

    let registered = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": "dave",
            "email": "dave@x.com",
            "fullName": "Dave D",
            "firebaseToken": provider
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(registered.status().as_u16(), 201);
    let body: Value = registered.json().await.unwrap();
    let dave_id = body["user"]["id"].as_i64().unwrap();

    // Provider token and session token resolve to the same account
    let via_provider: Value = app
        .client
        .get(app.url("/api/auth/me"))
        .bearer_auth(&provider)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(via_provider["id"], dave_id);

    let session = body["token"].as_str().unwrap();
    let via_session: Value = app
        .client
        .get(app.url("/api/auth/me"))
        .bearer_auth(session)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(via_session["id"], dave_id);

    // Provider login
    let login = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "externalToken": provider }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 200);

    // Provider-created accounts have no password to log in with
    let password_login = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "dave@x.com", "password": "guess" }))
        .send()
        .await
        .unwrap();
    assert_eq!(password_login.status().as_u16(), 401);

    // The same subject cannot register twice
    let duplicate = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": "dave2",
            "email": "dave2@x.com",
            "fullName": "Dave Again",
            "externalToken": provider
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status().as_u16(), 400);
    let body: Value = duplicate.json().await.unwrap();
    assert_eq!(body["error"], "Identity already registered");

    // Posts created with the provider token are owned by the same account
    let post: Value = app
        .create_post(&provider, "from the provider")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(post["author_id"], dave_id);
}

#[tokio::test]
async fn provider_login_without_account_is_unauthorized() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "externalToken": provider_token("stranger") }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No account linked to this identity");
}

#[tokio::test]
async fn unparseable_bodies_get_a_json_400() {
    let app = spawn_app().await;
    let (_, alice) = app.register_ok("alice").await;

    // Required field missing
    let empty_post = app
        .client
        .post(app.url("/api/posts"))
        .bearer_auth(&alice)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty_post.status().as_u16(), 400);
    let body: Value = empty_post.json().await.unwrap();
    assert!(body["error"].is_string());

    let no_full_name = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": "nofullname",
            "email": "nofullname@x.com",
            "password": "pw123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(no_full_name.status().as_u16(), 400);
    let body: Value = no_full_name.json().await.unwrap();
    assert_eq!(body["error"], "All fields are required");

    // Broken JSON
    let malformed = app
        .client
        .post(app.url("/api/posts"))
        .bearer_auth(&alice)
        .header("Content-Type", "application/json")
        .body("{\"content\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status().as_u16(), 400);
    let body: Value = malformed.json().await.unwrap();
    assert!(body["error"].is_string());

    // No content type at all
    let plain = app
        .client
        .post(app.url("/api/auth/login"))
        .body("email=alice@x.com")
        .send()
        .await
        .unwrap();
    assert_eq!(plain.status().as_u16(), 400);
    let body: Value = plain.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn bad_path_and_query_values_get_a_json_400() {
    let app = spawn_app().await;

    let path = app.client.get(app.url("/api/posts/abc")).send().await.unwrap();
    assert_eq!(path.status().as_u16(), 400);
    let body: Value = path.json().await.unwrap();
    assert!(body["error"].is_string());

    let query = app
        .client
        .get(app.url("/api/posts?limit=lots"))
        .send()
        .await
        .unwrap();
    assert_eq!(query.status().as_u16(), 400);
    let body: Value = query.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn username_length_is_checked_after_trimming() {
    let app = spawn_app().await;

    let short = app.register("  ab  ", "pw123").await;
    assert_eq!(short.status().as_u16(), 400);

    let padded = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": "  abc  ",
            "email": " ABC@x.com ",
            "password": "pw123",
            "fullName": "Abc"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(padded.status().as_u16(), 201);
    let body: Value = padded.json().await.unwrap();
    assert_eq!(body["user"]["username"], "abc");
    assert_eq!(body["user"]["email"], "abc@x.com");
}

#[tokio::test]
async fn avatar_can_be_cleared_and_blank_names_are_rejected() {
    let app = spawn_app().await;
    let (alice_id, alice) = app.register_ok("alice").await;
    let profile_url = app.url(&format!("/api/users/{}", alice_id));

    let set: Value = app
        .client
        .put(&profile_url)
        .bearer_auth(&alice)
        .json(&json!({ "avatarUrl": "https://img.example/a.png" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(set["avatarUrl"], "https://img.example/a.png");

    let cleared = app
        .client
        .put(&profile_url)
        .bearer_auth(&alice)
        .json(&json!({ "avatarUrl": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(cleared.status().as_u16(), 200);
    let body: Value = cleared.json().await.unwrap();
    assert!(body["avatarUrl"].is_null());

    // Sanitises to nothing
    let blank = app
        .client
        .put(&profile_url)
        .bearer_auth(&alice)
        .json(&json!({ "fullName": "<script></script>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(blank.status().as_u16(), 400);

    let unchanged: Value = app
        .client
        .get(&profile_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unchanged["fullName"], "alice Example");
}
