//! Request handlers that turn HTTP calls into policy-checked
//! repository operations. Every mutation runs through `crate::policy` first.

pub mod admin;
pub mod auth;
pub mod comments;
pub mod posts;
pub mod users;

pub use admin::{get_admin_stats, get_pending_comments};
pub use auth::{login, register};
pub use comments::{
    create_comment, delete_comment, get_comment, get_post_comments, moderate_comment,
    update_comment,
};
pub use posts::{create_post, delete_post, get_post, get_posts, update_post};
pub use users::{delete_profile, get_profile, get_user, get_users, update_profile};

// utoipa's `paths(...)` resolves the generated `__path_*` items alongside each handler.
pub use admin::{__path_get_admin_stats, __path_get_pending_comments};
pub use auth::{__path_login, __path_register};
pub use comments::{
    __path_create_comment, __path_delete_comment, __path_get_comment, __path_get_post_comments,
    __path_moderate_comment, __path_update_comment,
};
pub use posts::{
    __path_create_post, __path_delete_post, __path_get_post, __path_get_posts, __path_update_post,
};
pub use users::{
    __path_delete_profile, __path_get_profile, __path_get_user, __path_get_users,
    __path_update_profile,
};

use crate::{
    AppState,
    error::AppResult,
    pagination::{ListQuery, PageRequest},
};

/// Validates `?page=&limit=` against the configured cap.
pub(crate) fn page_request(state: &AppState, query: ListQuery) -> AppResult<PageRequest> {
    PageRequest::from_query(query, state.config.max_page_limit)
}
