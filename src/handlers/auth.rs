use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::{
    AppState,
    auth::issue_token,
    credentials::{hash_password, verify_credentials},
    error::{AppError, AppResult},
    models::{AuthResponse, LoginRequest, NewUser, RegisterRequest},
};

/// register
///
/// [Public Route] Creates a `USER` account and signs the caller in.
/// The request carries no role: elevated roles are never self-assigned.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    payload.validate()?;

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .repo
        .create_user(NewUser {
            email: payload.email,
            password_hash,
            name: payload.name,
        })
        .await?;

    tracing::info!(user_id = user.id, "user registered");

    let access_token = issue_token(&state.config, &user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { access_token, user })))
}

/// login
///
/// [Public Route] Exchanges an email/password pair for an identity token.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.validate()?;

    let account = verify_credentials(state.repo.as_ref(), &payload.email, &payload.password).await?;
    let user = state
        .repo
        .get_user(account.id)
        .await?
        .ok_or_else(AppError::unauthenticated)?;

    let access_token = issue_token(&state.config, &user)?;
    Ok(Json(AuthResponse { access_token, user }))
}
