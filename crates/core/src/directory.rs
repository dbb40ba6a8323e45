//! Read-only view of the social graph owned by other parts of the system.
//!
//! Groups, memberships, friendships and categories are managed elsewhere;
//! the ledger only needs to look them up.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use splitledger_shared::types::{CategoryId, GroupId, UserId};

use crate::ledger::FriendPair;
use crate::store::StoreResult;

/// Group metadata needed by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Group ID.
    pub id: GroupId,
    /// Display name.
    pub name: String,
    /// Currency every group expense defaults to.
    pub currency: String,
}

/// Role a member holds in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Group administrator.
    Admin,
    /// Regular member.
    Member,
}

impl MemberRole {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "owner" => Ok(Self::Admin),
            "member" | "" => Ok(Self::Member),
            other => Err(format!("unknown member role '{other}'")),
        }
    }
}

/// An active membership of a user in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Group ID.
    pub group_id: GroupId,
    /// Member account.
    pub user_id: UserId,
    /// Role held.
    pub role: MemberRole,
}

/// State of a friendship between two accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    /// Request sent, not yet answered.
    Pending,
    /// Both sides agreed.
    Accepted,
    /// Request refused.
    Declined,
    /// One side blocked the other.
    Blocked,
}

impl FriendshipStatus {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Blocked => "blocked",
        }
    }
}

impl std::str::FromStr for FriendshipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "blocked" => Ok(Self::Blocked),
            other => Err(format!("unknown friendship status '{other}'")),
        }
    }
}

/// Category metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    /// Category ID.
    pub id: CategoryId,
    /// Owning group.
    pub group_id: GroupId,
    /// Display name.
    pub name: String,
}

/// Lookups into groups, memberships, friendships and categories.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Returns the group, if it exists.
    async fn group(&self, id: GroupId) -> StoreResult<Option<GroupInfo>>;

    /// Returns the active membership of `user` in `group`, if any.
    async fn membership(&self, group: GroupId, user: UserId) -> StoreResult<Option<Membership>>;

    /// Returns the friendship status for the pair, if a friendship row exists.
    async fn friendship(&self, pair: FriendPair) -> StoreResult<Option<FriendshipStatus>>;

    /// Returns the category, if it exists.
    async fn category(&self, id: CategoryId) -> StoreResult<Option<CategoryInfo>>;
}
