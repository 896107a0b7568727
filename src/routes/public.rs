use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints. Comment reads only return approved comments unless
/// the caller proves they are the author or an admin.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register, POST /auth/login
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        // GET /posts?page=&limit=
        .route("/posts", get(handlers::get_posts))
        // GET /posts/{id}
        // Post detail with its approved comments.
        .route("/posts/{id}", get(handlers::get_post))
        // GET /comments/post/{post_id}?page=&limit=
        // Approved-only feed for one post.
        .route("/comments/post/{post_id}", get(handlers::get_post_comments))
        // GET /comments/{id}
        // Optional auth: pending comments are visible to their author and admins.
        .route("/comments/{id}", get(handlers::get_comment))
}
