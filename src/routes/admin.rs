use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Nested under `/admin`. Handlers reject non-admins with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/comments/pending
        // The moderation queue.
        .route("/comments/pending", get(handlers::get_pending_comments))
        // GET /admin/stats
        .route("/stats", get(handlers::get_admin_stats))
}
