use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core: ownership & moderation decisions, pagination rules.
pub mod moderation;
pub mod pagination;
pub mod policy;

// Collaborators: identity tokens, credentials, persistence.
pub mod auth;
pub mod credentials;
pub mod repository;

// HTTP layer and ambient concerns.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generated OpenAPI document, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login,
        handlers::get_posts, handlers::get_post, handlers::create_post,
        handlers::update_post, handlers::delete_post,
        handlers::create_comment, handlers::get_post_comments, handlers::get_comment,
        handlers::update_comment, handlers::delete_comment, handlers::moderate_comment,
        handlers::get_users, handlers::get_profile, handlers::get_user,
        handlers::update_profile, handlers::delete_profile,
        handlers::get_pending_comments, handlers::get_admin_stats
    ),
    components(
        schemas(
            models::User, models::Post, models::Comment, models::PostSummary,
            models::PostDetail, models::CommentView, models::AuthorSummary,
            models::CommentAuthor, models::RegisterRequest, models::LoginRequest,
            models::AuthResponse, models::UpdateUserRequest, models::CreatePostRequest,
            models::UpdatePostRequest, models::CreateCommentRequest,
            models::UpdateCommentRequest, models::ModerateCommentRequest,
            models::PostListResponse, models::CommentListResponse, models::UserListResponse,
            models::AdminStats, pagination::PageMeta, policy::Role,
            moderation::ModerationState, error::ErrorBody,
        )
    ),
    tags(
        (name = "blog-platform", description = "Blog posts, comments and moderation API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single immutable container shared by all requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in deployment, in-memory for local runs and tests.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`: a request whose `AuthUser` cannot be extracted
/// is rejected with 401 before the handler runs.
async fn auth_middleware(
    _auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles public, authenticated and admin routes, the OpenAPI UI, and the
/// request-id / tracing / CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let require_auth = || middleware::from_fn_with_state(state.clone(), auth_middleware);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Methods registered here on a path shared with a public route (e.g.
        // PATCH /posts/{id} next to GET /posts/{id}) are guarded individually.
        .merge(authenticated::authenticated_routes().route_layer(require_auth()))
        .nest("/admin", admin::admin_routes().route_layer(require_auth()))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Span for one request, tagged with its request id so every log line of that
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
