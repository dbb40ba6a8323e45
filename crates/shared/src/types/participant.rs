//! Participant references.
//!
//! Every payment, split, and settlement endpoint points at exactly one of a
//! registered account or a pending placeholder. Storage keeps two nullable
//! columns; this type is the only shape the rest of the code sees.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::{PendingParticipantId, UserId};

/// Who a ledger line or settlement endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ParticipantRef {
    /// A registered account.
    User(UserId),
    /// A person known only by email, awaiting registration.
    Pending(PendingParticipantId),
}

impl ParticipantRef {
    /// Returns the account id when this is a registered user.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Pending(_) => None,
        }
    }

    /// Returns the placeholder id when this is a pending participant.
    #[must_use]
    pub const fn pending_id(&self) -> Option<PendingParticipantId> {
        match self {
            Self::User(_) => None,
            Self::Pending(id) => Some(*id),
        }
    }

    /// Returns `true` for a placeholder reference.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Builds a reference from the `(user_id, pending_user_id)` column pair.
    ///
    /// Returns `None` unless exactly one side is set.
    #[must_use]
    pub fn from_columns(user_id: Option<Uuid>, pending_id: Option<Uuid>) -> Option<Self> {
        match (user_id, pending_id) {
            (Some(user), None) => Some(Self::User(UserId::from_uuid(user))),
            (None, Some(pending)) => Some(Self::Pending(PendingParticipantId::from_uuid(pending))),
            _ => None,
        }
    }

    /// Splits the reference into the `(user_id, pending_user_id)` column pair.
    #[must_use]
    pub const fn into_columns(self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            Self::User(id) => (Some(id.into_inner()), None),
            Self::Pending(id) => (None, Some(id.into_inner())),
        }
    }
}

impl From<UserId> for ParticipantRef {
    fn from(id: UserId) -> Self {
        Self::User(id)
    }
}

impl From<PendingParticipantId> for ParticipantRef {
    fn from(id: PendingParticipantId) -> Self {
        Self::Pending(id)
    }
}

impl std::fmt::Display for ParticipantRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Pending(id) => write!(f, "pending:{id}"),
        }
    }
}
