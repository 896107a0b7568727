use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{AdminStats, CommentListResponse},
    pagination::{ListQuery, PageMeta},
    policy::{self, Actor},
    repository::CommentFilter,
};

fn require_moderator(actor: &Actor) -> AppResult<()> {
    if policy::can_moderate(actor) {
        Ok(())
    } else {
        tracing::warn!(actor_id = actor.id, "admin route denied");
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}

/// get_pending_comments
///
/// [Admin Route] The moderation queue: comments still awaiting approval, newest first.
#[utoipa::path(
    get,
    path = "/admin/comments/pending",
    params(ListQuery),
    responses(
        (status = 200, description = "Pending comments", body = CommentListResponse),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_pending_comments(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<CommentListResponse>> {
    require_moderator(&actor)?;
    let page = super::page_request(&state, query)?;
    let (comments, total) = state.repo.list_comments(CommentFilter::Pending, page).await?;
    Ok(Json(CommentListResponse {
        comments,
        meta: PageMeta::new(total, &page),
    }))
}

/// get_admin_stats
///
/// [Admin Route] Dashboard counters.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_stats(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<AdminStats>> {
    require_moderator(&actor)?;
    Ok(Json(state.repo.get_stats().await?))
}
