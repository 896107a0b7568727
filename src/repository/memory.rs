use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{CommentFilter, Repository};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminStats, AuthorSummary, Comment, CommentAuthor, CommentView, CreatePostRequest, NewUser,
    Post, PostSummary, UpdatePostRequest, User, UserCredentials,
};
use crate::pagination::PageRequest;
use crate::policy::Role;

#[derive(Debug, Clone)]
struct UserRow {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, UserRow>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn comment_view(&self, comment: &Comment) -> CommentView {
        let name = self
            .users
            .get(&comment.author_id)
            .map(|row| row.user.name.clone())
            .unwrap_or_default();
        CommentView {
            comment: comment.clone(),
            author: CommentAuthor {
                id: comment.author_id,
                name,
            },
        }
    }

    /// Comments matching `keep`, newest first.
    fn comments_newest_first(&self, keep: impl Fn(&Comment) -> bool) -> Vec<CommentView> {
        let mut matched: Vec<&Comment> = self.comments.values().filter(|c| keep(*c)).collect();
        matched.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));
        matched.into_iter().map(|c| self.comment_view(c)).collect()
    }
}

fn newest_first(a: (DateTime<Utc>, i64), b: (DateTime<Utc>, i64)) -> std::cmp::Ordering {
    b.cmp(&a)
}

fn slice<T>(items: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
    (items.into_iter().skip(offset).take(limit).collect(), total)
}

/// MemoryRepository
///
/// In-process `Repository` used for local runs without Postgres and by the test
/// suite. Ids come from one shared sequence, so creation order matches id order.
/// Deletes cascade the same way the SQL foreign keys do.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a user's role directly. Stands in for an operator editing the store;
    /// no API path changes roles.
    pub async fn set_role(&self, id: i64, role: Role) -> bool {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(row) => {
                row.user.role = role;
                true
            }
            None => false,
        }
    }

    /// Number of stored comments, regardless of approval.
    pub async fn comment_count(&self) -> usize {
        self.tables.read().await.comments.len()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|row| row.user.email == user.email) {
            return Err(AppError::Conflict(format!(
                "User with email {} already exists",
                user.email
            )));
        }
        let now = Utc::now();
        let created = User {
            id: tables.next_id(),
            email: user.email,
            name: user.name,
            role: Role::User,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            created.id,
            UserRow {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|row| row.user.clone()))
    }

    async fn find_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|row| row.user.email == email)
            .map(|row| UserCredentials {
                id: row.user.id,
                email: row.user.email.clone(),
                password_hash: row.password_hash.clone(),
                name: row.user.name.clone(),
                role: row.user.role,
            }))
    }

    async fn list_users(&self, page: PageRequest) -> AppResult<(Vec<User>, i64)> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().map(|row| row.user.clone()).collect();
        users.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));
        Ok(slice(users, page))
    }

    async fn update_user_name(&self, id: i64, name: String) -> AppResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|row| {
            row.user.name = name;
            row.user.updated_at = Utc::now();
            row.user.clone()
        }))
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.posts.retain(|_, post| post.author_id != id);
        let Tables {
            posts, comments, ..
        } = &mut *tables;
        comments.retain(|_, c| c.author_id != id && posts.contains_key(&c.post_id));
        Ok(true)
    }

    async fn create_post(&self, author_id: i64, req: CreatePostRequest) -> AppResult<Post> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let post = Post {
            id: tables.next_id(),
            title: req.title,
            content: req.content,
            published: req.published,
            author_id,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: i64) -> AppResult<Option<Post>> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn list_posts(&self, page: PageRequest) -> AppResult<(Vec<PostSummary>, i64)> {
        let tables = self.tables.read().await;
        let mut posts: Vec<&Post> = tables.posts.values().collect();
        posts.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));
        let summaries = posts
            .into_iter()
            .map(|post| {
                let author = tables
                    .users
                    .get(&post.author_id)
                    .map(|row| AuthorSummary {
                        id: row.user.id,
                        name: row.user.name.clone(),
                        email: row.user.email.clone(),
                    })
                    .unwrap_or_else(|| AuthorSummary {
                        id: post.author_id,
                        ..AuthorSummary::default()
                    });
                let comment_count = tables
                    .comments
                    .values()
                    .filter(|c| c.post_id == post.id)
                    .count() as i64;
                PostSummary {
                    post: post.clone(),
                    author,
                    comment_count,
                }
            })
            .collect();
        Ok(slice(summaries, page))
    }

    async fn update_post(&self, id: i64, req: UpdatePostRequest) -> AppResult<Option<Post>> {
        let mut tables = self.tables.write().await;
        Ok(tables.posts.get_mut(&id).map(|post| {
            if let Some(title) = req.title {
                post.title = title;
            }
            if let Some(content) = req.content {
                post.content = content;
            }
            if let Some(published) = req.published {
                post.published = published;
            }
            post.updated_at = Utc::now();
            post.clone()
        }))
    }

    async fn delete_post(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, c| c.post_id != id);
        Ok(true)
    }

    async fn create_comment(
        &self,
        author_id: i64,
        post_id: i64,
        content: String,
        approved: bool,
    ) -> AppResult<Comment> {
        let mut tables = self.tables.write().await;
        // Mirrors the foreign key: the row is rejected, not silently orphaned.
        if !tables.posts.contains_key(&post_id) {
            return Err(AppError::NotFound(format!("Post with ID {post_id} not found")));
        }
        let now = Utc::now();
        let comment = Comment {
            id: tables.next_id(),
            content,
            post_id,
            author_id,
            approved,
            created_at: now,
            updated_at: now,
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: i64) -> AppResult<Option<CommentView>> {
        let tables = self.tables.read().await;
        Ok(tables.comments.get(&id).map(|c| tables.comment_view(c)))
    }

    async fn list_post_comments(
        &self,
        post_id: i64,
        filter: CommentFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<CommentView>, i64)> {
        let tables = self.tables.read().await;
        let matched = tables
            .comments_newest_first(|c| c.post_id == post_id && c.approved == filter.approved());
        Ok(slice(matched, page))
    }

    async fn list_comments(
        &self,
        filter: CommentFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<CommentView>, i64)> {
        let tables = self.tables.read().await;
        let matched = tables.comments_newest_first(|c| c.approved == filter.approved());
        Ok(slice(matched, page))
    }

    async fn approved_comments(&self, post_id: i64) -> AppResult<Vec<CommentView>> {
        let tables = self.tables.read().await;
        let mut matched = tables.comments_newest_first(|c| c.post_id == post_id && c.approved);
        matched.reverse();
        Ok(matched)
    }

    async fn update_comment_content(&self, id: i64, content: String) -> AppResult<Option<Comment>> {
        let mut tables = self.tables.write().await;
        Ok(tables.comments.get_mut(&id).map(|c| {
            c.content = content;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn set_comment_approval(&self, id: i64, approved: bool) -> AppResult<Option<Comment>> {
        let mut tables = self.tables.write().await;
        Ok(tables.comments.get_mut(&id).map(|c| {
            c.approved = approved;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_comment(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }

    async fn get_stats(&self) -> AppResult<AdminStats> {
        let tables = self.tables.read().await;
        Ok(AdminStats {
            total_users: tables.users.len() as i64,
            total_posts: tables.posts.len() as i64,
            total_comments: tables.comments.len() as i64,
            pending_comments: tables.comments.values().filter(|c| !c.approved).count() as i64,
        })
    }
}
