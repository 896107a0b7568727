use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{AuthorSummary, CreatePostRequest, Post, PostDetail, PostListResponse, UpdatePostRequest},
    pagination::{ListQuery, PageMeta},
    policy::{self, Action},
};

fn not_found(id: i64) -> String {
    format!("Post with ID {id} not found")
}

/// Shared by update and delete. Non-owners get the same answer as for a
/// missing post, so post existence is not revealed to them.
fn not_found_or_unauthorized(id: i64) -> String {
    format!("Post with ID {id} not found or unauthorized")
}

/// create_post
///
/// [Authenticated Route] The author is always the caller.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_post(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<Post>)> {
    payload.validate()?;
    let post = state.repo.create_post(actor.id, payload).await?;
    tracing::info!(post_id = post.id, author_id = actor.id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// get_posts
///
/// [Public Route] Paginated post listing, most recent first.
#[utoipa::path(
    get,
    path = "/posts",
    params(ListQuery),
    responses((status = 200, description = "Posts", body = PostListResponse))
)]
pub async fn get_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PostListResponse>> {
    let page = super::page_request(&state, query)?;
    let (posts, total) = state.repo.list_posts(page).await?;
    Ok(Json(PostListResponse {
        posts,
        meta: PageMeta::new(total, &page),
    }))
}

/// get_post
///
/// [Public Route] A single post with its author and approved comments.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PostDetail>> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound(not_found(id)))?;

    let author = state
        .repo
        .get_user(post.author_id)
        .await?
        .map(|user| AuthorSummary {
            id: user.id,
            name: user.name,
            email: user.email,
        })
        .ok_or_else(|| AppError::Internal(format!("author of post {id} is missing")))?;

    let comments = state.repo.approved_comments(id).await?;

    Ok(Json(PostDetail {
        post,
        author,
        comments,
    }))
}

/// update_post
///
/// [Authenticated Route] Author-only partial update.
#[utoipa::path(
    patch,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 404, description = "Not found or not the author")
    )
)]
pub async fn update_post(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> AppResult<Json<Post>> {
    payload.validate()?;

    let existing = state.repo.get_post(id).await?;
    let outcome = policy::evaluate(&actor, Action::Update, existing.as_ref());
    if !outcome.is_allowed() {
        tracing::warn!(post_id = id, actor_id = actor.id, ?outcome, "post update denied");
    }
    outcome.require_concealed(not_found_or_unauthorized(id))?;

    state
        .repo
        .update_post(id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundOrForbidden(not_found_or_unauthorized(id)))
}

/// delete_post
///
/// [Authenticated Route] Allowed for the author and for admins.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not permitted")
    )
)]
pub async fn delete_post(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let existing = state.repo.get_post(id).await?;
    let outcome = policy::evaluate(&actor, Action::Delete, existing.as_ref());
    if !outcome.is_allowed() {
        tracing::warn!(post_id = id, actor_id = actor.id, ?outcome, "post delete denied");
    }
    outcome.require_concealed(not_found_or_unauthorized(id))?;

    if !state.repo.delete_post(id).await? {
        return Err(AppError::NotFoundOrForbidden(not_found_or_unauthorized(id)));
    }
    tracing::info!(post_id = id, actor_id = actor.id, role = actor.role.as_str(), "post deleted");
    Ok(StatusCode::NO_CONTENT)
}
