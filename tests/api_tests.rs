use blog_platform::{AppConfig, AppState, MemoryRepository, create_router, policy::Role};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryRepository>,
    pub client: reqwest::Client,
}

async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryRepository::new());
    let state = AppState {
        repo: store.clone(),
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        store,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers an account and returns `(user id, bearer token)`.
    async fn register(&self, email: &str) -> (i64, String) {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({ "email": email, "password": "secret123", "name": "Test User" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        (
            body["user"]["id"].as_i64().unwrap(),
            body["access_token"].as_str().unwrap().to_string(),
        )
    }

    async fn register_admin(&self, email: &str) -> String {
        let (id, token) = self.register(email).await;
        assert!(self.store.set_role(id, Role::Admin).await);
        token
    }

    async fn create_post(&self, token: &str) -> i64 {
        let response = self
            .client
            .post(self.url("/posts"))
            .bearer_auth(token)
            .json(&json!({ "title": "Integration post", "content": "Body of the integration post" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["published"], json!(false));
        body["id"].as_i64().unwrap()
    }

    async fn create_comment(&self, token: &str, post_id: i64) -> reqwest::Response {
        self.client
            .post(self.url("/comments"))
            .bearer_auth(token)
            .json(&json!({ "content": "A thoughtful comment", "postId": post_id }))
            .send()
            .await
            .unwrap()
    }

    async fn feed_len(&self, post_id: i64) -> usize {
        let body: Value = self
            .client
            .get(self.url(&format!("/comments/post/{post_id}")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["comments"].as_array().unwrap().len()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/health")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_register_then_login() {
    let app = spawn_app().await;
    app.register("login@example.com").await;

    let response = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "login@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["role"], json!("USER"));
    assert!(body["user"].get("passwordHash").is_none());

    let response = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "login@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "statusCode": 401, "message": "Invalid credentials" }));
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = spawn_app().await;
    app.register("dup@example.com").await;

    let response = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({ "email": "dup@example.com", "password": "secret123", "name": "Again" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_registration_validates_input() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({ "email": "not-an-email", "password": "123", "name": "X" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/posts"))
        .json(&json!({ "title": "No token here", "content": "Should never be stored" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .get(app.url("/users/profile"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_foreign_post_edit_is_indistinguishable_from_missing() {
    let app = spawn_app().await;
    let (_, author) = app.register("author@example.com").await;
    let (_, other) = app.register("other@example.com").await;
    let post_id = app.create_post(&author).await;

    let foreign = app
        .client
        .patch(app.url(&format!("/posts/{post_id}")))
        .bearer_auth(&other)
        .json(&json!({ "title": "Stolen title" }))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
    let body: Value = foreign.json().await.unwrap();
    assert_eq!(
        body["message"],
        json!(format!("Post with ID {post_id} not found or unauthorized"))
    );

    let missing = app
        .client
        .patch(app.url("/posts/424242"))
        .bearer_auth(&other)
        .json(&json!({ "title": "Stolen title" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    // The public read is unaffected and the title is unchanged.
    let body: Value = app
        .client
        .get(app.url(&format!("/posts/{post_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["title"], json!("Integration post"));
    assert_eq!(body["author"]["email"], json!("author@example.com"));
}

#[tokio::test]
async fn test_admin_can_delete_any_post() {
    let app = spawn_app().await;
    let (_, author) = app.register("author@example.com").await;
    let admin = app.register_admin("admin@example.com").await;
    let post_id = app.create_post(&author).await;

    let response = app
        .client
        .delete(app.url(&format!("/posts/{post_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .client
        .get(app.url(&format!("/posts/{post_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comment_moderation_over_http() {
    let app = spawn_app().await;
    let (_, author) = app.register("author@example.com").await;
    let (_, reader) = app.register("reader@example.com").await;
    let admin = app.register_admin("admin@example.com").await;
    let post_id = app.create_post(&author).await;

    let response = app.create_comment(&reader, post_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let comment: Value = response.json().await.unwrap();
    assert_eq!(comment["approved"], json!(false));
    assert_eq!(comment["postId"], json!(post_id));
    let comment_id = comment["id"].as_i64().unwrap();
    assert_eq!(app.feed_len(post_id).await, 0);

    // Anonymous readers cannot see the pending comment; its author can.
    let response = app
        .client
        .get(app.url(&format!("/comments/{comment_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app
        .client
        .get(app.url(&format!("/comments/{comment_id}")))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let moderate = |token: String| {
        app.client
            .post(app.url(&format!("/comments/{comment_id}/moderate")))
            .bearer_auth(token)
            .json(&json!({ "approved": true }))
            .send()
    };

    let response = moderate(reader.clone()).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "statusCode": 403, "message": "Only admins can moderate comments" })
    );
    assert_eq!(app.feed_len(post_id).await, 0);

    let response = moderate(admin.clone()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.feed_len(post_id).await, 1);

    let stats: Value = app
        .client
        .get(app.url("/admin/stats"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        stats,
        json!({ "totalUsers": 3, "totalPosts": 1, "totalComments": 1, "pendingComments": 0 })
    );
}

#[tokio::test]
async fn test_comment_on_missing_post_is_not_found() {
    let app = spawn_app().await;
    let (_, reader) = app.register("reader@example.com").await;

    let response = app.create_comment(&reader, 999).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.store.comment_count().await, 0);
}

#[tokio::test]
async fn test_admin_routes_reject_plain_users() {
    let app = spawn_app().await;
    let (_, user) = app.register("user@example.com").await;

    let response = app
        .client
        .get(app.url("/admin/comments/pending"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_pagination_query_is_validated() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/posts?page=0"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .client
        .get(app.url(&format!("/posts?page={}", i64::MAX)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .client
        .get(app.url(&format!("/comments/post/1?page={}&limit=50", i64::MAX)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = app
        .client
        .get(app.url("/posts?limit=5000"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["meta"]["limit"], json!(100));
    assert_eq!(body["meta"]["totalPages"], json!(0));
}
