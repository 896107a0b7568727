use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Authenticated Router Module
///
/// Every handler here receives a verified `AuthUser`. Ownership and role
/// decisions are taken by `crate::policy` inside the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Posts ---
        .route("/posts", post(handlers::create_post))
        // Author-only update; author or admin delete.
        .route(
            "/posts/{id}",
            patch(handlers::update_post).delete(handlers::delete_post),
        )
        // --- Comments ---
        // New comments start pending moderation.
        .route("/comments", post(handlers::create_comment))
        .route(
            "/comments/{id}",
            patch(handlers::update_comment).delete(handlers::delete_comment),
        )
        // POST /comments/{id}/moderate
        .route("/comments/{id}/moderate", post(handlers::moderate_comment))
        // --- Users ---
        .route("/users", get(handlers::get_users))
        .route(
            "/users/profile",
            get(handlers::get_profile)
                .patch(handlers::update_profile)
                .delete(handlers::delete_profile),
        )
        .route("/users/{id}", get(handlers::get_user))
}
