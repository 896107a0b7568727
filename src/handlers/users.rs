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
    models::{UpdateUserRequest, User, UserListResponse},
    pagination::{ListQuery, PageMeta},
};

fn user_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("User with ID {id} not found"))
}

/// get_users
///
/// [Authenticated Route] Paginated user directory, newest accounts first.
#[utoipa::path(
    get,
    path = "/users",
    params(ListQuery),
    responses((status = 200, description = "Users", body = UserListResponse))
)]
pub async fn get_users(
    AuthUser(_actor): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<UserListResponse>> {
    let page = super::page_request(&state, query)?;
    let (users, total) = state.repo.list_users(page).await?;
    Ok(Json(UserListResponse {
        users,
        meta: PageMeta::new(total, &page),
    }))
}

/// get_profile
///
/// [Authenticated Route] The caller's own account.
#[utoipa::path(
    get,
    path = "/users/profile",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_profile(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<User>> {
    state
        .repo
        .get_user(actor.id)
        .await?
        .map(Json)
        .ok_or_else(|| user_not_found(actor.id))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    AuthUser(_actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<User>> {
    state
        .repo
        .get_user(id)
        .await?
        .map(Json)
        .ok_or_else(|| user_not_found(id))
}

/// update_profile
///
/// [Authenticated Route] Only the display name is writable, so there is no path
/// for an owner to change their own role.
#[utoipa::path(
    patch,
    path = "/users/profile",
    request_body = UpdateUserRequest,
    responses((status = 200, description = "Updated", body = User))
)]
pub async fn update_profile(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    payload.validate()?;

    let updated = match payload.name {
        Some(name) => state.repo.update_user_name(actor.id, name).await?,
        None => state.repo.get_user(actor.id).await?,
    };
    updated.map(Json).ok_or_else(|| user_not_found(actor.id))
}

/// delete_profile
///
/// [Authenticated Route] Permanently removes the caller's account. Their posts
/// and comments go with it.
#[utoipa::path(
    delete,
    path = "/users/profile",
    responses((status = 204, description = "Deleted"))
)]
pub async fn delete_profile(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<StatusCode> {
    if !state.repo.delete_user(actor.id).await? {
        return Err(user_not_found(actor.id));
    }
    tracing::info!(user_id = actor.id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}
