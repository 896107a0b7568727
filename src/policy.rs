use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Role
///
/// The RBAC field stored on every user. Registration always produces `User`;
/// no endpoint lets an owner change their own role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

/// Actor
///
/// The identity a request acts as. Rebuilt for every request from a verified
/// identity token and passed explicitly into policy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }
}

/// Resource
///
/// Descriptor of a policy target. `approved` is only present for comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub author_id: i64,
    pub approved: Option<bool>,
}

impl Resource {
    pub fn post(author_id: i64) -> Self {
        Self {
            author_id,
            approved: None,
        }
    }

    pub fn comment(author_id: i64, approved: bool) -> Self {
        Self {
            author_id,
            approved: Some(approved),
        }
    }

    pub fn is_comment(&self) -> bool {
        self.approved.is_some()
    }
}

/// Implemented by every stored entity that has an owning author.
pub trait Owned {
    fn resource(&self) -> Resource;
}

/// Action
///
/// What the actor is attempting on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Moderate,
}

/// Only the original author may edit content. Admins get no exception here.
pub fn can_modify(actor: &Actor, resource: &Resource) -> bool {
    actor.id == resource.author_id
}

pub fn can_delete(actor: &Actor, resource: &Resource) -> bool {
    actor.id == resource.author_id || can_moderate(actor)
}

/// The one place the moderator role test lives.
pub fn can_moderate(actor: &Actor) -> bool {
    actor.role == Role::Admin
}

/// Whether anyone, including anonymous callers, may see the comment.
/// A missing approval flag counts as pending.
pub fn is_public_comment(comment: &Resource) -> bool {
    comment.approved.unwrap_or(false)
}

pub fn can_view_comment(actor: &Actor, comment: &Resource) -> bool {
    is_public_comment(comment) || actor.id == comment.author_id || can_moderate(actor)
}

/// permits
///
/// Maps an `Action` onto the named checks above for a target known to exist.
/// Creating is open to any authenticated actor; parent existence is the caller's concern.
pub fn permits(actor: &Actor, action: Action, resource: &Resource) -> bool {
    match action {
        Action::Create => true,
        Action::Read if resource.is_comment() => can_view_comment(actor, resource),
        Action::Read => true,
        Action::Update => can_modify(actor, resource),
        Action::Delete => can_delete(actor, resource),
        Action::Moderate => resource.is_comment() && can_moderate(actor),
    }
}

/// Outcome
///
/// Result of evaluating an action against a possibly-absent target.
/// `NotFound` and `Forbidden` stay distinct here; the handlers decide
/// whether to conceal the difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    Forbidden,
    NotFound,
}

/// evaluate
///
/// Existence is checked first, then the policy. Moderation is the exception: it
/// depends on the role alone, so a non-moderator is refused before the lookup matters.
pub fn evaluate<R: Owned>(actor: &Actor, action: Action, target: Option<&R>) -> Outcome {
    if action == Action::Moderate && !can_moderate(actor) {
        return Outcome::Forbidden;
    }
    match target {
        None => Outcome::NotFound,
        Some(target) if permits(actor, action, &target.resource()) => Outcome::Allowed,
        Some(_) => Outcome::Forbidden,
    }
}

impl Outcome {
    pub fn is_allowed(self) -> bool {
        self == Outcome::Allowed
    }

    /// Surfaces not-found and forbidden as different errors.
    pub fn require(self, not_found: impl Into<String>, forbidden: impl Into<String>) -> AppResult<()> {
        match self {
            Outcome::Allowed => Ok(()),
            Outcome::NotFound => Err(AppError::NotFound(not_found.into())),
            Outcome::Forbidden => Err(AppError::Forbidden(forbidden.into())),
        }
    }

    /// Surfaces every denial with one not-found-shaped message so callers
    /// cannot probe for the existence of resources they do not own.
    pub fn require_concealed(self, message: impl Into<String>) -> AppResult<()> {
        match self {
            Outcome::Allowed => Ok(()),
            Outcome::NotFound | Outcome::Forbidden => {
                Err(AppError::NotFoundOrForbidden(message.into()))
            }
        }
    }
}
