use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, MaybeAuthUser},
    error::{AppError, AppResult},
    models::{
        Comment, CommentListResponse, CommentView, CreateCommentRequest, ModerateCommentRequest,
        UpdateCommentRequest,
    },
    moderation::{self, ModerationState},
    pagination::{ListQuery, PageMeta},
    policy::{self, Action, Owned},
    repository::CommentFilter,
};

fn comment_not_found(id: i64) -> String {
    format!("Comment with ID {id} not found")
}

/// create_comment
///
/// [Authenticated Route] Adds a comment to an existing post. The parent post is
/// checked before anything is written; the new comment always starts pending.
#[utoipa::path(
    post,
    path = "/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Created (pending moderation)", body = Comment),
        (status = 404, description = "Post not found")
    )
)]
pub async fn create_comment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    payload.validate()?;

    let post = state.repo.get_post(payload.post_id).await?;
    policy::evaluate(&actor, Action::Create, post.as_ref()).require(
        format!("Post with ID {} not found", payload.post_id),
        "You are not authorized to comment on this post",
    )?;

    let comment = state
        .repo
        .create_comment(
            actor.id,
            payload.post_id,
            payload.content,
            moderation::initial_approval(),
        )
        .await?;

    tracing::info!(comment_id = comment.id, post_id = comment.post_id, "comment created, pending moderation");
    Ok((StatusCode::CREATED, Json(comment)))
}

/// get_post_comments
///
/// [Public Route] Approved comments of a post, most recent first.
#[utoipa::path(
    get,
    path = "/comments/post/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID"), ListQuery),
    responses((status = 200, description = "Approved comments", body = CommentListResponse))
)]
pub async fn get_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<CommentListResponse>> {
    let page = super::page_request(&state, query)?;
    let (comments, total) = state
        .repo
        .list_post_comments(post_id, CommentFilter::Approved, page)
        .await?;
    Ok(Json(CommentListResponse {
        comments,
        meta: PageMeta::new(total, &page),
    }))
}

/// get_comment
///
/// [Public Route, optional auth] A single comment. Pending comments are only
/// returned to their author and to admins; everyone else gets a 404.
#[utoipa::path(
    get,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Found", body = CommentView),
        (status = 404, description = "Not found or not visible")
    )
)]
pub async fn get_comment(
    MaybeAuthUser(actor): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<CommentView>> {
    let comment = state
        .repo
        .get_comment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(comment_not_found(id)))?;

    let resource = comment.resource();
    let visible = match actor {
        Some(actor) => policy::can_view_comment(&actor, &resource),
        None => policy::is_public_comment(&resource),
    };
    if !visible {
        return Err(AppError::NotFound(comment_not_found(id)));
    }

    Ok(Json(comment))
}

/// update_comment
///
/// [Authenticated Route] Author-only content edit. Approval state is untouched.
#[utoipa::path(
    patch,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_comment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> AppResult<Json<Comment>> {
    payload.validate()?;

    let existing = state.repo.get_comment(id).await?;
    policy::evaluate(&actor, Action::Update, existing.as_ref()).require(
        comment_not_found(id),
        "You are not authorized to update this comment",
    )?;

    state
        .repo
        .update_comment_content(id, payload.content)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(comment_not_found(id)))
}

/// delete_comment
///
/// [Authenticated Route] Allowed for the author and for admins.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author or an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let existing = state.repo.get_comment(id).await?;
    policy::evaluate(&actor, Action::Delete, existing.as_ref()).require(
        comment_not_found(id),
        "You are not authorized to delete this comment",
    )?;

    if !state.repo.delete_comment(id).await? {
        return Err(AppError::NotFound(comment_not_found(id)));
    }
    tracing::info!(comment_id = id, actor_id = actor.id, role = actor.role.as_str(), "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// moderate_comment
///
/// [Authenticated Route, admin] Approves or un-approves a comment, whoever wrote it.
#[utoipa::path(
    post,
    path = "/comments/{id}/moderate",
    params(("id" = i64, Path, description = "Comment ID")),
    request_body = ModerateCommentRequest,
    responses(
        (status = 200, description = "Moderated", body = Comment),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn moderate_comment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ModerateCommentRequest>,
) -> AppResult<Json<Comment>> {
    const ADMINS_ONLY: &str = "Only admins can moderate comments";

    let existing = state.repo.get_comment(id).await?;
    let outcome = policy::evaluate(&actor, Action::Moderate, existing.as_ref());
    if outcome == policy::Outcome::Forbidden {
        tracing::warn!(comment_id = id, actor_id = actor.id, "moderation denied");
    }
    outcome.require(comment_not_found(id), ADMINS_ONLY)?;

    let current = existing
        .map(|view| ModerationState::from_approved(view.comment.approved))
        .ok_or_else(|| AppError::NotFound(comment_not_found(id)))?;
    let next = current
        .transition(&actor, ModerationState::from_approved(payload.approved))
        .map_err(|_| AppError::Forbidden(ADMINS_ONLY.to_string()))?;

    let comment = state
        .repo
        .set_comment_approval(id, next.is_approved())
        .await?
        .ok_or_else(|| AppError::NotFound(comment_not_found(id)))?;

    tracing::info!(comment_id = id, moderator_id = actor.id, state = ?next, "comment moderated");
    Ok(Json(comment))
}
