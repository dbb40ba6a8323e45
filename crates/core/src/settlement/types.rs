//! Settlement domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use splitledger_shared::types::{GroupId, ParticipantRef, SettlementId, UserId};

use crate::ledger::LedgerScope;

/// Lifecycle of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    /// Recorded, not yet confirmed.
    #[default]
    Pending,
    /// Money has changed hands.
    Completed,
    /// Withdrawn.
    Cancelled,
}

impl SettlementStatus {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses an optional caller value; blank means `Pending`.
    pub(crate) fn parse_or_default(raw: Option<&str>) -> Result<Self, String> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::Pending),
            Some(value) => value.parse(),
        }
    }
}

impl std::str::FromStr for SettlementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(other.to_string()),
        }
    }
}

/// Input for recording a group settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSettlementInput {
    /// Owning group.
    pub group_id: GroupId,
    /// Who pays.
    pub payer: ParticipantRef,
    /// Who receives.
    pub payee: ParticipantRef,
    /// Decimal string > 0.
    pub amount: String,
    /// Blank means the group's currency.
    pub currency: Option<String>,
    /// Blank means pending.
    pub status: Option<String>,
    /// Method tag.
    pub payment_method: Option<String>,
    /// External reference (bank transfer id, ...).
    pub transaction_reference: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Recording user.
    pub created_by: UserId,
}

/// Input for recording a settlement between two friends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFriendSettlementInput {
    /// The other party.
    pub friend_id: UserId,
    /// Who pays (one of the pair).
    pub payer: UserId,
    /// Who receives (the other one).
    pub payee: UserId,
    /// Decimal string > 0.
    pub amount: String,
    /// Blank means the configured fallback currency.
    pub currency: Option<String>,
    /// Blank means pending.
    pub status: Option<String>,
    /// Method tag.
    pub payment_method: Option<String>,
    /// External reference.
    pub transaction_reference: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Recording user.
    pub created_by: UserId,
}

/// Input for editing a settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettlementInput {
    /// Settlement to edit.
    pub settlement_id: SettlementId,
    /// New payer.
    pub payer: ParticipantRef,
    /// New payee.
    pub payee: ParticipantRef,
    /// New amount.
    pub amount: String,
    /// Blank keeps the current currency.
    pub currency: Option<String>,
    /// Blank keeps the current status.
    pub status: Option<String>,
    /// Method tag.
    pub payment_method: Option<String>,
    /// External reference.
    pub transaction_reference: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Editing user.
    pub updated_by: UserId,
}

/// A validated settlement ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSettlement {
    /// Where it lives.
    pub scope: LedgerScope,
    /// Who pays.
    pub payer: ParticipantRef,
    /// Who receives.
    pub payee: ParticipantRef,
    /// Amount, > 0.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Status.
    pub status: SettlementStatus,
    /// Method tag.
    pub payment_method: Option<String>,
    /// External reference.
    pub transaction_reference: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Recording user.
    pub created_by: UserId,
}

/// Validated replacement values for a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementChanges {
    /// Who pays.
    pub payer: ParticipantRef,
    /// Who receives.
    pub payee: ParticipantRef,
    /// Amount.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Status.
    pub status: SettlementStatus,
    /// Method tag.
    pub payment_method: Option<String>,
    /// External reference.
    pub transaction_reference: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Editing user.
    pub updated_by: UserId,
}

/// A persisted settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Settlement ID.
    pub id: SettlementId,
    /// Where it lives.
    pub scope: LedgerScope,
    /// Who pays.
    pub payer: ParticipantRef,
    /// Who receives.
    pub payee: ParticipantRef,
    /// Amount.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Status.
    pub status: SettlementStatus,
    /// Method tag.
    pub payment_method: Option<String>,
    /// External reference.
    pub transaction_reference: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Recording user.
    pub created_by: UserId,
    /// Last editor.
    pub updated_by: Option<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Settlement {
    /// Returns true if `participant` is either endpoint.
    #[must_use]
    pub fn involves(&self, participant: &ParticipantRef) -> bool {
        self.payer == *participant || self.payee == *participant
    }
}
