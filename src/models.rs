use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::Validate;

use crate::pagination::PageMeta;
use crate::policy::{Owned, Resource, Role};

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Public view of a row in the `users` table. The password hash never leaves
/// the repository through this type.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// UserCredentials
///
/// Internal row used only by the credential verifier during login.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
}

/// Insert payload for a new account. The role is not part of it: new accounts are always `USER`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

/// Post
///
/// A row from the `posts` table. Owned by `author_id` for mutation purposes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub author_id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Owned for Post {
    fn resource(&self) -> Resource {
        Resource::post(self.author_id)
    }
}

/// Comment
///
/// A row from the `comments` table. `approved` carries the moderation state.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub post_id: i64,
    pub author_id: i64,
    pub approved: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Owned for Comment {
    fn resource(&self) -> Resource {
        Resource::comment(self.author_id, self.approved)
    }
}

// --- Joined / Enriched Output Schemas ---

/// AuthorSummary
///
/// Author block embedded in post listings and post details.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct AuthorSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Author block embedded in comments. Commenter emails are not exposed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct CommentAuthor {
    pub id: i64,
    pub name: String,
}

/// PostSummary
///
/// One entry of the paginated post listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(flatten)]
    pub post: Post,
    pub author: AuthorSummary,
    pub comment_count: i64,
}

/// CommentView
///
/// A comment joined with its author's public details.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: CommentAuthor,
}

impl Owned for CommentView {
    fn resource(&self) -> Resource {
        self.comment.resource()
    }
}

/// PostDetail
///
/// Single post view. `comments` only ever contains approved comments.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub author: AuthorSummary,
    pub comments: Vec<CommentView>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for `POST /auth/register`. It has no role field.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct RegisterRequest {
    #[validate(email(message = "email must be a valid email address"))]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 2, message = "name must be at least 2 characters"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

/// UpdateUserRequest
///
/// Self-service profile update. Only the display name can change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, message = "name must be at least 2 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    #[validate(length(min = 5, message = "title must be at least 5 characters"))]
    pub title: String,
    #[validate(length(min = 10, message = "content must be at least 10 characters"))]
    pub content: String,
    #[serde(default)]
    pub published: bool,
}

/// UpdatePostRequest
///
/// Partial update payload for `PATCH /posts/{id}`; absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 5, message = "title must be at least 5 characters"))]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 10, message = "content must be at least 10 characters"))]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(min = 5, message = "content must be at least 5 characters"))]
    pub content: String,
    #[validate(range(min = 1, message = "postId must be a positive integer"))]
    pub post_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 5, message = "content must be at least 5 characters"))]
    pub content: String,
}

/// ModerateCommentRequest
///
/// Target approval state for `POST /comments/{id}/moderate`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ModerateCommentRequest {
    pub approved: bool,
}

// --- Response Payloads ---

/// AuthResponse
///
/// Returned by both register and login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostListResponse {
    pub posts: Vec<PostSummary>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentListResponse {
    pub comments: Vec<CommentView>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub meta: PageMeta,
}

/// AdminStats
///
/// Output schema for `GET /admin/stats`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: i64,
    pub total_posts: i64,
    pub total_comments: i64,
    /// Comments still waiting for moderation.
    pub pending_comments: i64,
}
