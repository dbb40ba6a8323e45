//! Identity domain types: placeholders, invitations and merge results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use splitledger_shared::types::{GroupId, InvitationId, PendingParticipantId, UserId};

use crate::directory::{MemberRole, Membership};

/// A person known only by email, standing in until they register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingParticipant {
    /// Placeholder ID.
    pub id: PendingParticipantId,
    /// Normalized (trimmed, lower-case) email.
    pub email: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Invitation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    /// Waiting for the invitee.
    Pending,
    /// Invitee joined.
    Accepted,
    /// Invitee refused.
    Declined,
}

impl InvitationStatus {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

impl std::str::FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => Err(format!("unknown invitation status '{other}'")),
        }
    }
}

/// A group invitation addressed to an email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// Invitation ID.
    pub id: InvitationId,
    /// Target group.
    pub group_id: GroupId,
    /// Normalized invitee email.
    pub email: String,
    /// Opaque token sent to the invitee.
    pub token: String,
    /// Role granted on acceptance.
    pub role: MemberRole,
    /// Lifecycle state.
    pub status: InvitationStatus,
    /// Inviting member.
    pub invited_by: UserId,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    /// Returns true once `now` is past the expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A validated invitation ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvitation {
    /// Target group.
    pub group_id: GroupId,
    /// Normalized invitee email.
    pub email: String,
    /// Opaque token.
    pub token: String,
    /// Role granted on acceptance.
    pub role: MemberRole,
    /// Inviting member.
    pub invited_by: UserId,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

/// Input for inviting someone to a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvitationInput {
    /// Target group.
    pub group_id: GroupId,
    /// Inviting member.
    pub invited_by: UserId,
    /// Invitee email, any case.
    pub email: String,
    /// Role to grant; `None` means member.
    pub role: Option<MemberRole>,
    /// Display name for the placeholder.
    pub name: Option<String>,
}

/// How many references a merge rewrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergeReport {
    /// Payments rebound to the account.
    pub payments: u64,
    /// Splits rebound to the account.
    pub splits: u64,
    /// Settlements whose payer was rebound.
    pub settlement_payers: u64,
    /// Settlements whose payee was rebound.
    pub settlement_payees: u64,
    /// Settlements between the placeholder and the account itself, deleted
    /// because rebinding would make payer and payee the same user.
    pub self_settlements_removed: u64,
    /// Whether the placeholder row was reclaimed.
    pub placeholder_removed: bool,
}

impl MergeReport {
    /// Total references rewritten.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.payments + self.splits + self.settlement_payers + self.settlement_payees
    }
}

/// Result of accepting an invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AcceptOutcome {
    /// Membership created and placeholder references merged.
    Joined {
        /// New membership.
        membership: Membership,
        /// What the merge rewrote.
        merge: MergeReport,
    },
    /// The user was already a member; nothing was rebound.
    AlreadyMember {
        /// Existing membership.
        membership: Membership,
    },
}

impl AcceptOutcome {
    /// The membership in either case.
    #[must_use]
    pub const fn membership(&self) -> &Membership {
        match self {
            Self::Joined { membership, .. } | Self::AlreadyMember { membership } => membership,
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: UserId,
    /// Email.
    pub email: String,
    /// Display name.
    pub name: String,
}

/// Input for the join flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinGroupInput {
    /// Invitation token.
    pub token: String,
    /// Password for login or registration.
    pub password: Option<String>,
    /// Display name for a new account.
    pub name: Option<String>,
    /// Already-authenticated caller, if any.
    pub authenticated_user: Option<UserId>,
}

/// Result of the join flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    /// The account that joined.
    pub account: Account,
    /// Whether an account was created during the flow.
    pub registered: bool,
    /// Acceptance result.
    pub accept: AcceptOutcome,
}
