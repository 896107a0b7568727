use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// AppError
///
/// The single failure type surfaced by handlers and the repository layer.
/// Every variant is a business-rule outcome or a store failure; none of them are retryable.
#[derive(Debug, Error)]
pub enum AppError {
    /// The referenced Post, Comment or User does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The actor lacks the ownership relationship or role the action needs.
    #[error("{0}")]
    Forbidden(String),

    /// Denial that must not reveal whether the resource exists.
    /// Answers with the same status as `NotFound`.
    #[error("{0}")]
    NotFoundOrForbidden(String),

    #[error("{0}")]
    Validation(String),

    /// Missing, malformed or expired identity token, or bad credentials.
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used by handlers and repositories.
pub type AppResult<T> = Result<T, AppError>;

/// ErrorBody
///
/// JSON shape of every error response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::NotFoundOrForbidden(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthenticated() -> Self {
        AppError::Unauthenticated("Unauthorized".to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Store and internal failures are logged here and answered opaquely.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("store failure: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("internal failure: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            status_code: status.as_u16(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
