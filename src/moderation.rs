use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::policy::{self, Actor};

/// ModerationState
///
/// Approval lifecycle of a comment. Persisted as the `approved` boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModerationState {
    Pending,
    Approved,
}

/// Returned when a non-moderator attempts a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModerationDenied;

impl ModerationState {
    /// Every comment starts pending, whoever wrote it.
    pub const INITIAL: ModerationState = ModerationState::Pending;

    pub fn from_approved(approved: bool) -> Self {
        if approved {
            ModerationState::Approved
        } else {
            ModerationState::Pending
        }
    }

    pub fn is_approved(self) -> bool {
        self == ModerationState::Approved
    }

    /// transition
    ///
    /// Moves to `target` on behalf of `actor` and returns the state to persist.
    /// Both directions are allowed and can repeat indefinitely; re-applying the
    /// current state is accepted as a no-op.
    pub fn transition(
        self,
        actor: &Actor,
        target: ModerationState,
    ) -> Result<ModerationState, ModerationDenied> {
        if !policy::can_moderate(actor) {
            return Err(ModerationDenied);
        }
        if self != target {
            tracing::debug!(from = ?self, to = ?target, actor = actor.id, "moderation transition");
        }
        Ok(target)
    }
}

/// Approval flag stored on a freshly created comment.
pub fn initial_approval() -> bool {
    ModerationState::INITIAL.is_approved()
}
