use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use blog_platform::{
    AppError, AppState, MemoryRepository,
    auth::{AuthUser, MaybeAuthUser},
    config::AppConfig,
    handlers,
    models::{
        CreateCommentRequest, CreatePostRequest, ModerateCommentRequest, NewUser,
        UpdateCommentRequest, UpdatePostRequest, UpdateUserRequest,
    },
    pagination::ListQuery,
    policy::{Actor, Role},
    repository::Repository,
};
use std::sync::Arc;
use tokio::test;

// --- Test Utilities ---

struct Fixture {
    store: Arc<MemoryRepository>,
    state: AppState,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryRepository::new());
    let state = AppState {
        repo: store.clone(),
        config: AppConfig::default(),
    };
    Fixture { store, state }
}

async fn seed_user(f: &Fixture, email: &str, role: Role) -> Actor {
    let user = f
        .store
        .create_user(NewUser {
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            name: email.split('@').next().unwrap_or("user").to_string(),
        })
        .await
        .unwrap();
    if role != Role::User {
        assert!(f.store.set_role(user.id, role).await);
    }
    Actor::new(user.id, role)
}

async fn seed_post(f: &Fixture, author: Actor) -> i64 {
    let (status, Json(post)) = handlers::create_post(
        AuthUser(author),
        State(f.state.clone()),
        Json(CreatePostRequest {
            title: "A first post".to_string(),
            content: "Content long enough to pass".to_string(),
            published: true,
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    post.id
}

async fn seed_comment(f: &Fixture, author: Actor, post_id: i64) -> i64 {
    let (status, Json(comment)) = handlers::create_comment(
        AuthUser(author),
        State(f.state.clone()),
        Json(CreateCommentRequest {
            content: "Great read, thanks".to_string(),
            post_id,
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    comment.id
}

async fn moderate(f: &Fixture, actor: Actor, id: i64, approved: bool) -> Result<bool, AppError> {
    handlers::moderate_comment(
        AuthUser(actor),
        State(f.state.clone()),
        Path(id),
        Json(ModerateCommentRequest { approved }),
    )
    .await
    .map(|Json(comment)| comment.approved)
}

async fn public_feed_ids(f: &Fixture, post_id: i64) -> Vec<i64> {
    let Json(feed) = handlers::get_post_comments(
        State(f.state.clone()),
        Path(post_id),
        Query(ListQuery::default()),
    )
    .await
    .unwrap();
    feed.comments.iter().map(|c| c.comment.id).collect()
}

// --- Posts ---

#[test]
async fn test_create_post_sets_caller_as_author() {
    let f = fixture();
    let author = seed_user(&f, "author@example.com", Role::User).await;

    let post_id = seed_post(&f, author).await;

    let Json(detail) = handlers::get_post(State(f.state.clone()), Path(post_id))
        .await
        .unwrap();
    assert_eq!(detail.post.author_id, author.id);
    assert_eq!(detail.author.id, author.id);
    assert!(detail.comments.is_empty());
}

#[test]
async fn test_create_post_rejects_short_title() {
    let f = fixture();
    let author = seed_user(&f, "author@example.com", Role::User).await;

    let result = handlers::create_post(
        AuthUser(author),
        State(f.state.clone()),
        Json(CreatePostRequest {
            title: "Hey".to_string(),
            content: "Content long enough to pass".to_string(),
            published: false,
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[test]
async fn test_post_ownership_end_to_end() {
    let f = fixture();
    let author = seed_user(&f, "u1@example.com", Role::User).await;
    let other = seed_user(&f, "u2@example.com", Role::User).await;
    let admin = seed_user(&f, "admin@example.com", Role::Admin).await;
    let post_id = seed_post(&f, author).await;

    // A different user cannot edit.
    let denied = handlers::update_post(
        AuthUser(other),
        State(f.state.clone()),
        Path(post_id),
        Json(UpdatePostRequest {
            title: Some("Hijacked title".to_string()),
            ..UpdatePostRequest::default()
        }),
    )
    .await;
    assert!(matches!(denied, Err(AppError::NotFoundOrForbidden(_))));

    // Nor can an admin; editing is author-only.
    let denied = handlers::update_post(
        AuthUser(admin),
        State(f.state.clone()),
        Path(post_id),
        Json(UpdatePostRequest {
            title: Some("Admin title".to_string()),
            ..UpdatePostRequest::default()
        }),
    )
    .await;
    assert!(matches!(denied, Err(AppError::NotFoundOrForbidden(_))));

    // The author can.
    let Json(updated) = handlers::update_post(
        AuthUser(author),
        State(f.state.clone()),
        Path(post_id),
        Json(UpdatePostRequest {
            title: Some("Renamed post".to_string()),
            ..UpdatePostRequest::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(updated.title, "Renamed post");
    assert_eq!(updated.content, "Content long enough to pass");

    // A different user cannot delete.
    let denied =
        handlers::delete_post(AuthUser(other), State(f.state.clone()), Path(post_id)).await;
    assert!(matches!(denied, Err(AppError::NotFoundOrForbidden(_))));

    // An admin can.
    let status = handlers::delete_post(AuthUser(admin), State(f.state.clone()), Path(post_id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(f.store.get_post(post_id).await.unwrap().is_none());
}

#[test]
async fn test_denied_and_missing_post_answer_identically() {
    let f = fixture();
    let author = seed_user(&f, "u1@example.com", Role::User).await;
    let other = seed_user(&f, "u2@example.com", Role::User).await;
    let post_id = seed_post(&f, author).await;

    let foreign = handlers::delete_post(AuthUser(other), State(f.state.clone()), Path(post_id))
        .await
        .unwrap_err();
    let missing = handlers::delete_post(AuthUser(other), State(f.state.clone()), Path(9_999))
        .await
        .unwrap_err();

    assert_eq!(foreign.status(), missing.status());
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_get_missing_post_is_not_found() {
    let f = fixture();
    let result = handlers::get_post(State(f.state.clone()), Path(42)).await;
    assert!(matches!(result, Err(AppError::NotFound(m)) if m == "Post with ID 42 not found"));
}

#[test]
async fn test_post_listing_reports_meta_and_comment_counts() {
    let f = fixture();
    let author = seed_user(&f, "u1@example.com", Role::User).await;
    let first = seed_post(&f, author).await;
    seed_comment(&f, author, first).await;
    for _ in 0..2 {
        seed_post(&f, author).await;
    }

    let Json(page) = handlers::get_posts(
        State(f.state.clone()),
        Query(ListQuery {
            page: Some(1),
            limit: Some(2),
        }),
    )
    .await
    .unwrap();

    assert_eq!(page.meta.total, 3);
    assert_eq!(page.meta.total_pages, 2);
    assert_eq!(page.posts.len(), 2);

    let Json(last) = handlers::get_posts(
        State(f.state.clone()),
        Query(ListQuery {
            page: Some(2),
            limit: Some(2),
        }),
    )
    .await
    .unwrap();
    assert_eq!(last.posts.len(), 1);
    assert_eq!(last.posts[0].post.id, first);
    assert_eq!(last.posts[0].comment_count, 1);
    assert_eq!(last.posts[0].author.email, "u1@example.com");
}

#[test]
async fn test_listing_rejects_zero_page() {
    let f = fixture();
    let result = handlers::get_posts(
        State(f.state.clone()),
        Query(ListQuery {
            page: Some(0),
            limit: None,
        }),
    )
    .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

// --- Comments ---

#[test]
async fn test_comment_on_missing_post_writes_nothing() {
    let f = fixture();
    let user = seed_user(&f, "u1@example.com", Role::User).await;

    let result = handlers::create_comment(
        AuthUser(user),
        State(f.state.clone()),
        Json(CreateCommentRequest {
            content: "Orphaned comment".to_string(),
            post_id: 777,
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound(m)) if m == "Post with ID 777 not found"));
    assert_eq!(f.store.comment_count().await, 0);
}

#[test]
async fn test_admin_comment_still_starts_pending() {
    let f = fixture();
    let admin = seed_user(&f, "admin@example.com", Role::Admin).await;
    let post_id = seed_post(&f, admin).await;

    let comment_id = seed_comment(&f, admin, post_id).await;

    let stored = f.store.get_comment(comment_id).await.unwrap().unwrap();
    assert!(!stored.comment.approved);
    assert!(public_feed_ids(&f, post_id).await.is_empty());
}

#[test]
async fn test_moderation_flow_end_to_end() {
    let f = fixture();
    let author = seed_user(&f, "writer@example.com", Role::User).await;
    let commenter = seed_user(&f, "reader@example.com", Role::User).await;
    let admin = seed_user(&f, "admin@example.com", Role::Admin).await;
    let post_id = seed_post(&f, author).await;

    let comment_id = seed_comment(&f, commenter, post_id).await;
    assert!(public_feed_ids(&f, post_id).await.is_empty());

    // The commenter cannot approve their own comment.
    let denied = moderate(&f, commenter, comment_id, true).await;
    assert!(matches!(
        denied,
        Err(AppError::Forbidden(m)) if m == "Only admins can moderate comments"
    ));
    assert!(public_feed_ids(&f, post_id).await.is_empty());

    assert!(moderate(&f, admin, comment_id, true).await.unwrap());
    assert_eq!(public_feed_ids(&f, post_id).await, vec![comment_id]);

    // Approved comments also appear on the post detail.
    let Json(detail) = handlers::get_post(State(f.state.clone()), Path(post_id))
        .await
        .unwrap();
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.comments[0].author.name, "reader");

    // Approval is reversible.
    assert!(!moderate(&f, admin, comment_id, false).await.unwrap());
    assert!(public_feed_ids(&f, post_id).await.is_empty());
}

#[test]
async fn test_moderation_role_check_precedes_lookup() {
    let f = fixture();
    let user = seed_user(&f, "u1@example.com", Role::User).await;
    let admin = seed_user(&f, "admin@example.com", Role::Admin).await;

    assert!(matches!(
        moderate(&f, user, 404, true).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        moderate(&f, admin, 404, true).await,
        Err(AppError::NotFound(_))
    ));
}

#[test]
async fn test_pending_comment_visibility() {
    let f = fixture();
    let commenter = seed_user(&f, "u1@example.com", Role::User).await;
    let stranger = seed_user(&f, "u2@example.com", Role::User).await;
    let admin = seed_user(&f, "admin@example.com", Role::Admin).await;
    let post_id = seed_post(&f, commenter).await;
    let comment_id = seed_comment(&f, commenter, post_id).await;

    for viewer in [Some(commenter), Some(admin)] {
        let Json(view) = handlers::get_comment(
            MaybeAuthUser(viewer),
            State(f.state.clone()),
            Path(comment_id),
        )
        .await
        .unwrap();
        assert_eq!(view.comment.id, comment_id);
    }

    for viewer in [Some(stranger), None] {
        let hidden = handlers::get_comment(
            MaybeAuthUser(viewer),
            State(f.state.clone()),
            Path(comment_id),
        )
        .await;
        assert!(matches!(hidden, Err(AppError::NotFound(_))));
    }

    moderate(&f, admin, comment_id, true).await.unwrap();
    let Json(view) =
        handlers::get_comment(MaybeAuthUser(None), State(f.state.clone()), Path(comment_id))
            .await
            .unwrap();
    assert!(view.comment.approved);
}

#[test]
async fn test_comment_update_is_author_only_and_keeps_approval() {
    let f = fixture();
    let commenter = seed_user(&f, "u1@example.com", Role::User).await;
    let admin = seed_user(&f, "admin@example.com", Role::Admin).await;
    let post_id = seed_post(&f, commenter).await;
    let comment_id = seed_comment(&f, commenter, post_id).await;
    moderate(&f, admin, comment_id, true).await.unwrap();

    let denied = handlers::update_comment(
        AuthUser(admin),
        State(f.state.clone()),
        Path(comment_id),
        Json(UpdateCommentRequest {
            content: "Edited by admin".to_string(),
        }),
    )
    .await;
    assert!(matches!(
        denied,
        Err(AppError::Forbidden(m)) if m == "You are not authorized to update this comment"
    ));

    let Json(updated) = handlers::update_comment(
        AuthUser(commenter),
        State(f.state.clone()),
        Path(comment_id),
        Json(UpdateCommentRequest {
            content: "Edited by author".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(updated.content, "Edited by author");
    assert!(updated.approved);
}

#[test]
async fn test_update_missing_comment_is_not_found() {
    let f = fixture();
    let user = seed_user(&f, "u1@example.com", Role::User).await;
    let result = handlers::update_comment(
        AuthUser(user),
        State(f.state.clone()),
        Path(31),
        Json(UpdateCommentRequest {
            content: "Nothing to edit".to_string(),
        }),
    )
    .await;
    assert!(matches!(result, Err(AppError::NotFound(m)) if m == "Comment with ID 31 not found"));
}

#[test]
async fn test_comment_delete_by_author_or_admin() {
    let f = fixture();
    let commenter = seed_user(&f, "u1@example.com", Role::User).await;
    let stranger = seed_user(&f, "u2@example.com", Role::User).await;
    let admin = seed_user(&f, "admin@example.com", Role::Admin).await;
    let post_id = seed_post(&f, commenter).await;
    let first = seed_comment(&f, commenter, post_id).await;
    let second = seed_comment(&f, commenter, post_id).await;

    let denied =
        handlers::delete_comment(AuthUser(stranger), State(f.state.clone()), Path(first)).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let status = handlers::delete_comment(AuthUser(commenter), State(f.state.clone()), Path(first))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let status = handlers::delete_comment(AuthUser(admin), State(f.state.clone()), Path(second))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(f.store.comment_count().await, 0);

    let gone =
        handlers::delete_comment(AuthUser(admin), State(f.state.clone()), Path(second)).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));
}

// --- Users ---

#[test]
async fn test_profile_update_changes_name_only() {
    let f = fixture();
    let user = seed_user(&f, "u1@example.com", Role::User).await;

    let Json(updated) = handlers::update_profile(
        AuthUser(user),
        State(f.state.clone()),
        Json(UpdateUserRequest {
            name: Some("New Name".to_string()),
        }),
    )
    .await
    .unwrap();

    assert_eq!(updated.name, "New Name");
    assert_eq!(updated.role, Role::User);
    assert_eq!(updated.email, "u1@example.com");
}

#[test]
async fn test_delete_profile_cascades_content() {
    let f = fixture();
    let user = seed_user(&f, "u1@example.com", Role::User).await;
    let post_id = seed_post(&f, user).await;
    seed_comment(&f, user, post_id).await;

    let status = handlers::delete_profile(AuthUser(user), State(f.state.clone()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(f.store.get_post(post_id).await.unwrap().is_none());
    assert_eq!(f.store.comment_count().await, 0);

    let gone = handlers::get_profile(AuthUser(user), State(f.state.clone())).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));
}

// --- Admin ---

#[test]
async fn test_admin_queue_and_stats() {
    let f = fixture();
    let user = seed_user(&f, "u1@example.com", Role::User).await;
    let admin = seed_user(&f, "admin@example.com", Role::Admin).await;
    let post_id = seed_post(&f, user).await;
    let approved = seed_comment(&f, user, post_id).await;
    let pending = seed_comment(&f, user, post_id).await;
    moderate(&f, admin, approved, true).await.unwrap();

    let Json(queue) = handlers::get_pending_comments(
        AuthUser(admin),
        State(f.state.clone()),
        Query(ListQuery::default()),
    )
    .await
    .unwrap();
    let ids: Vec<i64> = queue.comments.iter().map(|c| c.comment.id).collect();
    assert_eq!(ids, vec![pending]);

    let Json(stats) = handlers::get_admin_stats(AuthUser(admin), State(f.state.clone()))
        .await
        .unwrap();
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.total_posts, 1);
    assert_eq!(stats.total_comments, 2);
    assert_eq!(stats.pending_comments, 1);

    let denied = handlers::get_admin_stats(AuthUser(user), State(f.state.clone())).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
}
