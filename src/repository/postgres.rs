use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::{CommentFilter, Repository};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminStats, AuthorSummary, Comment, CommentAuthor, CommentView, CreatePostRequest, NewUser,
    Post, PostSummary, UpdatePostRequest, User, UserCredentials,
};
use crate::pagination::PageRequest;

const USER_COLUMNS: &str = "id, email, name, role, created_at, updated_at";
const POST_COLUMNS: &str = "id, title, content, published, author_id, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, content, post_id, author_id, approved, created_at, updated_at";

/// Flat row for the post listing join.
#[derive(FromRow)]
struct PostSummaryRow {
    id: i64,
    title: String,
    content: String,
    published: bool,
    author_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_name: String,
    author_email: String,
    comment_count: i64,
}

impl From<PostSummaryRow> for PostSummary {
    fn from(row: PostSummaryRow) -> Self {
        PostSummary {
            author: AuthorSummary {
                id: row.author_id,
                name: row.author_name,
                email: row.author_email,
            },
            comment_count: row.comment_count,
            post: Post {
                id: row.id,
                title: row.title,
                content: row.content,
                published: row.published,
                author_id: row.author_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

/// Flat row for comments joined with their author.
#[derive(FromRow)]
struct CommentViewRow {
    id: i64,
    content: String,
    post_id: i64,
    author_id: i64,
    approved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_name: String,
}

impl From<CommentViewRow> for CommentView {
    fn from(row: CommentViewRow) -> Self {
        CommentView {
            author: CommentAuthor {
                id: row.author_id,
                name: row.author_name,
            },
            comment: Comment {
                id: row.id,
                content: row.content,
                post_id: row.post_id,
                author_id: row.author_id,
                approved: row.approved,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

const COMMENT_VIEW_SELECT: &str = r#"
    SELECT c.id, c.content, c.post_id, c.author_id, c.approved, c.created_at, c.updated_at,
           u.name AS author_name
    FROM comments c
    JOIN users u ON c.author_id = u.id
"#;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are built at runtime and bound
/// positionally, so the crate compiles without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str) -> AppResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.pool).await?)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// create_user
    ///
    /// The `role` column defaults to `USER` in the schema; the insert never sets it.
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, name) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::Conflict(format!("User with email {} already exists", user.email))
                }
                other => AppError::Database(other),
            })
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        Ok(sqlx::query_as::<_, UserCredentials>(
            "SELECT id, email, password_hash, name, role FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_users(&self, page: PageRequest) -> AppResult<(Vec<User>, i64)> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total = self.count("SELECT COUNT(*) FROM users").await?;
        Ok((users, total))
    }

    async fn update_user_name(&self, id: i64, name: String) -> AppResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn create_post(&self, author_id: i64, req: CreatePostRequest) -> AppResult<Post> {
        let sql = format!(
            "INSERT INTO posts (title, content, published, author_id) VALUES ($1, $2, $3, $4) RETURNING {POST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(req.title)
            .bind(req.content)
            .bind(req.published)
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_post(&self, id: i64) -> AppResult<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// list_posts
    ///
    /// Joins the author and counts every comment (approved or not) per post.
    async fn list_posts(&self, page: PageRequest) -> AppResult<(Vec<PostSummary>, i64)> {
        let rows = sqlx::query_as::<_, PostSummaryRow>(
            r#"
            SELECT p.id, p.title, p.content, p.published, p.author_id, p.created_at, p.updated_at,
                   u.name AS author_name, u.email AS author_email,
                   (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
            FROM posts p
            JOIN users u ON p.author_id = u.id
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        let total = self.count("SELECT COUNT(*) FROM posts").await?;
        Ok((rows.into_iter().map(PostSummary::from).collect(), total))
    }

    async fn update_post(&self, id: i64, req: UpdatePostRequest) -> AppResult<Option<Post>> {
        let sql = format!(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                published = COALESCE($4, published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(req.title)
            .bind(req.content)
            .bind(req.published)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_post(&self, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn create_comment(
        &self,
        author_id: i64,
        post_id: i64,
        content: String,
        approved: bool,
    ) -> AppResult<Comment> {
        let sql = format!(
            "INSERT INTO comments (content, post_id, author_id, approved) VALUES ($1, $2, $3, $4) RETURNING {COMMENT_COLUMNS}"
        );
        // The parent post can disappear between the handler's lookup and this insert.
        sqlx::query_as::<_, Comment>(&sql)
            .bind(content)
            .bind(post_id)
            .bind(author_id)
            .bind(approved)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    AppError::NotFound(format!("Post with ID {post_id} not found"))
                }
                other => AppError::Database(other),
            })
    }

    async fn get_comment(&self, id: i64) -> AppResult<Option<CommentView>> {
        let sql = format!("{COMMENT_VIEW_SELECT} WHERE c.id = $1");
        let row = sqlx::query_as::<_, CommentViewRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(CommentView::from))
    }

    async fn list_post_comments(
        &self,
        post_id: i64,
        filter: CommentFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<CommentView>, i64)> {
        let sql = format!(
            "{COMMENT_VIEW_SELECT} WHERE c.post_id = $1 AND c.approved = $2 ORDER BY c.created_at DESC, c.id DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, CommentViewRow>(&sql)
            .bind(post_id)
            .bind(filter.approved())
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM comments WHERE post_id = $1 AND approved = $2",
        )
        .bind(post_id)
        .bind(filter.approved())
        .fetch_one(&self.pool)
        .await?;
        Ok((rows.into_iter().map(CommentView::from).collect(), total))
    }

    async fn list_comments(
        &self,
        filter: CommentFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<CommentView>, i64)> {
        let sql = format!(
            "{COMMENT_VIEW_SELECT} WHERE c.approved = $1 ORDER BY c.created_at DESC, c.id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, CommentViewRow>(&sql)
            .bind(filter.approved())
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE approved = $1")
            .bind(filter.approved())
            .fetch_one(&self.pool)
            .await?;
        Ok((rows.into_iter().map(CommentView::from).collect(), total))
    }

    async fn approved_comments(&self, post_id: i64) -> AppResult<Vec<CommentView>> {
        let sql = format!(
            "{COMMENT_VIEW_SELECT} WHERE c.post_id = $1 AND c.approved = true ORDER BY c.created_at ASC, c.id ASC"
        );
        let rows = sqlx::query_as::<_, CommentViewRow>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(CommentView::from).collect())
    }

    async fn update_comment_content(&self, id: i64, content: String) -> AppResult<Option<Comment>> {
        let sql = format!(
            "UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(content)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_comment_approval(&self, id: i64, approved: bool) -> AppResult<Option<Comment>> {
        let sql = format!(
            "UPDATE comments SET approved = $2, updated_at = NOW() WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(approved)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_comment(&self, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_stats(&self) -> AppResult<AdminStats> {
        Ok(AdminStats {
            total_users: self.count("SELECT COUNT(*) FROM users").await?,
            total_posts: self.count("SELECT COUNT(*) FROM posts").await?,
            total_comments: self.count("SELECT COUNT(*) FROM comments").await?,
            pending_comments: self
                .count("SELECT COUNT(*) FROM comments WHERE approved = false")
                .await?,
        })
    }
}
