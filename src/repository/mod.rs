use async_trait::async_trait;
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{
    AdminStats, Comment, CommentView, CreatePostRequest, NewUser, Post, PostSummary,
    UpdatePostRequest, User, UserCredentials,
};
use crate::pagination::PageRequest;

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// CommentFilter
///
/// Which comments a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentFilter {
    /// Public feed: approved comments only.
    Approved,
    /// Moderation queue: pending comments only.
    Pending,
}

impl CommentFilter {
    pub fn approved(self) -> bool {
        self == CommentFilter::Approved
    }
}

/// Repository Trait
///
/// The persistence contract the handlers depend on. Every method is a single
/// store round trip and performs no authorization: callers run the policy first.
///
/// Listing methods return the page slice together with the total row count.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Fails with `AppError::Conflict` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn get_user(&self, id: i64) -> AppResult<Option<User>>;
    async fn find_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>>;
    async fn list_users(&self, page: PageRequest) -> AppResult<(Vec<User>, i64)>;
    async fn update_user_name(&self, id: i64, name: String) -> AppResult<Option<User>>;
    async fn delete_user(&self, id: i64) -> AppResult<bool>;

    // --- Posts ---
    async fn create_post(&self, author_id: i64, req: CreatePostRequest) -> AppResult<Post>;
    async fn get_post(&self, id: i64) -> AppResult<Option<Post>>;
    async fn list_posts(&self, page: PageRequest) -> AppResult<(Vec<PostSummary>, i64)>;
    /// Partial update: `None` fields keep their stored value.
    async fn update_post(&self, id: i64, req: UpdatePostRequest) -> AppResult<Option<Post>>;
    async fn delete_post(&self, id: i64) -> AppResult<bool>;

    // --- Comments ---
    async fn create_comment(
        &self,
        author_id: i64,
        post_id: i64,
        content: String,
        approved: bool,
    ) -> AppResult<Comment>;
    async fn get_comment(&self, id: i64) -> AppResult<Option<CommentView>>;
    /// Comments of one post, newest first.
    async fn list_post_comments(
        &self,
        post_id: i64,
        filter: CommentFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<CommentView>, i64)>;
    /// Comments across all posts, newest first.
    async fn list_comments(
        &self,
        filter: CommentFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<CommentView>, i64)>;
    /// Every approved comment of a post, oldest first, for the post detail view.
    async fn approved_comments(&self, post_id: i64) -> AppResult<Vec<CommentView>>;
    async fn update_comment_content(&self, id: i64, content: String) -> AppResult<Option<Comment>>;
    async fn set_comment_approval(&self, id: i64, approved: bool) -> AppResult<Option<Comment>>;
    async fn delete_comment(&self, id: i64) -> AppResult<bool>;

    async fn get_stats(&self) -> AppResult<AdminStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
