//! Domain types for expenses and their payment/split lines.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use splitledger_shared::types::{
    CategoryId, ExpenseId, GroupId, PageRequest, ParticipantRef, PaymentId, SplitId, UserId,
};

/// Two accounts in canonical order (lower id first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FriendPair {
    low: UserId,
    high: UserId,
}

impl FriendPair {
    /// Builds the canonical pair. Argument order does not matter.
    #[must_use]
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Lower id of the pair.
    #[must_use]
    pub const fn low(&self) -> UserId {
        self.low
    }

    /// Higher id of the pair.
    #[must_use]
    pub const fn high(&self) -> UserId {
        self.high
    }

    /// Returns true when both sides are the same account.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.low == self.high
    }

    /// Returns true if `user` is one of the two friends.
    #[must_use]
    pub fn contains(&self, user: UserId) -> bool {
        self.low == user || self.high == user
    }

    /// Returns true if the participant is a registered account in the pair.
    #[must_use]
    pub fn admits(&self, participant: &ParticipantRef) -> bool {
        participant.user_id().is_some_and(|id| self.contains(id))
    }
}

/// Where a ledger record lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerScope {
    /// Owned by a group.
    Group {
        /// Owning group.
        group_id: GroupId,
    },
    /// Direct two-party record with no group.
    Friend {
        /// The two friends.
        pair: FriendPair,
    },
}

impl LedgerScope {
    /// Returns the owning group, if group-scoped.
    #[must_use]
    pub const fn group_id(&self) -> Option<GroupId> {
        match self {
            Self::Group { group_id } => Some(*group_id),
            Self::Friend { .. } => None,
        }
    }

    /// Returns the kind tag.
    #[must_use]
    pub const fn kind(&self) -> LedgerKind {
        match self {
            Self::Group { .. } => LedgerKind::Group,
            Self::Friend { .. } => LedgerKind::Friend,
        }
    }
}

/// Kind tag stored alongside expenses and settlements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Group record.
    Group,
    /// Friend record.
    Friend,
}

impl LedgerKind {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Friend => "friend",
        }
    }
}

/// How a split amount was derived. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SplitType {
    /// Divided evenly.
    #[default]
    Equal,
    /// Entered directly.
    Fixed,
    /// Derived from a percentage.
    Percentage,
    /// Derived from share counts.
    Shares,
}

impl SplitType {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Fixed => "fixed",
            Self::Percentage => "percentage",
            Self::Shares => "shares",
        }
    }
}

impl std::str::FromStr for SplitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" | "" => Ok(Self::Equal),
            "fixed" | "exact" => Ok(Self::Fixed),
            "percentage" | "percent" => Ok(Self::Percentage),
            "shares" => Ok(Self::Shares),
            other => Err(format!("unknown split type '{other}'")),
        }
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// One payment line as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInput {
    /// Who fronted the money.
    pub participant: ParticipantRef,
    /// Decimal string, must be > 0.
    pub amount: String,
    /// Optional method tag ("cash", "card", ...).
    pub method: Option<String>,
}

/// One split line as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitInput {
    /// Who owes.
    pub participant: ParticipantRef,
    /// Decimal string, must be >= 0.
    pub amount: String,
    /// How the amount was derived.
    pub split_type: SplitType,
    /// Percentage or share count the amount was derived from, if any.
    pub share_value: Option<Decimal>,
}

/// Input for creating a group expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExpenseInput {
    /// Owning group.
    pub group_id: GroupId,
    /// Title, must be non-empty after trimming.
    pub title: String,
    /// Optional notes.
    pub notes: Option<String>,
    /// Total, decimal string > 0.
    pub amount: String,
    /// Currency code; blank means the group's currency.
    pub currency: Option<String>,
    /// Date of the expense.
    pub date: NaiveDate,
    /// Optional category; must belong to the group.
    pub category_id: Option<CategoryId>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Creating user, must be a member.
    pub created_by: UserId,
    /// Who fronted money.
    pub payments: Vec<PaymentInput>,
    /// Who owes money.
    pub splits: Vec<SplitInput>,
}

/// Input for creating a two-party friend expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFriendExpenseInput {
    /// The other party.
    pub friend_id: UserId,
    /// Title, must be non-empty after trimming.
    pub title: String,
    /// Optional notes.
    pub notes: Option<String>,
    /// Total, decimal string > 0.
    pub amount: String,
    /// Currency code; blank means the configured fallback.
    pub currency: Option<String>,
    /// Date of the expense.
    pub date: NaiveDate,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Creating user, one of the two friends.
    pub created_by: UserId,
    /// Who fronted money.
    pub payments: Vec<PaymentInput>,
    /// Who owes money.
    pub splits: Vec<SplitInput>,
}

/// Input for replacing an existing expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateExpenseInput {
    /// Expense to update.
    pub expense_id: ExpenseId,
    /// New title.
    pub title: String,
    /// New notes.
    pub notes: Option<String>,
    /// New total.
    pub amount: String,
    /// New currency; blank keeps the current one.
    pub currency: Option<String>,
    /// New date.
    pub date: NaiveDate,
    /// New category (group expenses only).
    pub category_id: Option<CategoryId>,
    /// New tags.
    pub tags: Vec<String>,
    /// Editing user.
    pub updated_by: UserId,
    /// Replacement payments.
    pub payments: Vec<PaymentInput>,
    /// Replacement splits.
    pub splits: Vec<SplitInput>,
}

/// Filters for expense search. Every filter is optional and they combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseSearch {
    /// Case-insensitive text matched against title and notes.
    pub text: Option<String>,
    /// Category filter.
    pub category_id: Option<CategoryId>,
    /// Inclusive lower bound on the total (decimal string).
    pub min_amount: Option<String>,
    /// Inclusive upper bound on the total (decimal string).
    pub max_amount: Option<String>,
    /// Inclusive lower bound on the date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the date.
    pub date_to: Option<NaiveDate>,
    /// Only expenses this participant paid into.
    pub payer: Option<ParticipantRef>,
    /// Only expenses this participant owes on.
    pub ower: Option<ParticipantRef>,
    /// Only expenses created by this user.
    pub created_by: Option<UserId>,
    /// Page to return.
    pub page: PageRequest,
}

/// Normalized search handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseQuery {
    /// Group to search in.
    pub group_id: GroupId,
    /// Lower-cased, trimmed text; `None` when blank.
    pub text: Option<String>,
    /// Category filter.
    pub category_id: Option<CategoryId>,
    /// Parsed lower bound.
    pub min_amount: Option<Decimal>,
    /// Parsed upper bound.
    pub max_amount: Option<Decimal>,
    /// Date lower bound.
    pub date_from: Option<NaiveDate>,
    /// Date upper bound.
    pub date_to: Option<NaiveDate>,
    /// Payer filter.
    pub payer: Option<ParticipantRef>,
    /// Ower filter.
    pub ower: Option<ParticipantRef>,
    /// Creator filter.
    pub created_by: Option<UserId>,
    /// Clamped page.
    pub page: PageRequest,
}

// ============================================================================
// Validated records
// ============================================================================

/// A validated payment line ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    /// Who fronted the money.
    pub participant: ParticipantRef,
    /// Amount, > 0.
    pub amount: Decimal,
    /// Optional method tag.
    pub method: Option<String>,
}

/// A validated split line ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSplit {
    /// Who owes.
    pub participant: ParticipantRef,
    /// Amount owed, >= 0.
    pub amount: Decimal,
    /// How the amount was derived.
    pub split_type: SplitType,
    /// Percentage or share count, if any.
    pub share_value: Option<Decimal>,
}

/// A fully validated expense. Sums of payments and splits equal `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    /// Where the expense lives.
    pub scope: LedgerScope,
    /// Trimmed title.
    pub title: String,
    /// Notes.
    pub notes: Option<String>,
    /// Total.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Date of the expense.
    pub date: NaiveDate,
    /// Category.
    pub category_id: Option<CategoryId>,
    /// Tags.
    pub tags: Vec<String>,
    /// Creator.
    pub created_by: UserId,
    /// Payment lines.
    pub payments: Vec<NewPayment>,
    /// Split lines.
    pub splits: Vec<NewSplit>,
}

/// Validated replacement values for an existing expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseChanges {
    /// Trimmed title.
    pub title: String,
    /// Notes.
    pub notes: Option<String>,
    /// Total.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Date.
    pub date: NaiveDate,
    /// Category.
    pub category_id: Option<CategoryId>,
    /// Tags.
    pub tags: Vec<String>,
    /// Editor.
    pub updated_by: UserId,
    /// Replacement payments.
    pub payments: Vec<NewPayment>,
    /// Replacement splits.
    pub splits: Vec<NewSplit>,
}

// ============================================================================
// Persisted records
// ============================================================================

/// A persisted expense header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Expense ID.
    pub id: ExpenseId,
    /// Where the expense lives.
    pub scope: LedgerScope,
    /// Title.
    pub title: String,
    /// Notes.
    pub notes: Option<String>,
    /// Total.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Date.
    pub date: NaiveDate,
    /// Category.
    pub category_id: Option<CategoryId>,
    /// Tags.
    pub tags: Vec<String>,
    /// Creator.
    pub created_by: UserId,
    /// Last editor.
    pub updated_by: Option<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// A persisted payment line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment ID.
    pub id: PaymentId,
    /// Owning expense.
    pub expense_id: ExpenseId,
    /// Who fronted the money.
    pub participant: ParticipantRef,
    /// Amount.
    pub amount: Decimal,
    /// Method tag.
    pub method: Option<String>,
}

/// A persisted split line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Split ID.
    pub id: SplitId,
    /// Owning expense.
    pub expense_id: ExpenseId,
    /// Who owes.
    pub participant: ParticipantRef,
    /// Amount owed.
    pub amount: Decimal,
    /// How it was derived.
    pub split_type: SplitType,
    /// Percentage or share count.
    pub share_value: Option<Decimal>,
}

/// An expense together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseWithLines {
    /// Header.
    pub expense: Expense,
    /// Payments.
    pub payments: Vec<Payment>,
    /// Splits.
    pub splits: Vec<Split>,
}

impl ExpenseWithLines {
    /// Sum of payment amounts.
    #[must_use]
    pub fn total_paid(&self) -> Decimal {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// Sum of split amounts.
    #[must_use]
    pub fn total_owed(&self) -> Decimal {
        self.splits.iter().map(|s| s.amount).sum()
    }

    /// Returns true when both line sums equal the total.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_paid() == self.expense.amount && self.total_owed() == self.expense.amount
    }
}

/// Side of a ledger line for balance aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSide {
    /// Money fronted (payment).
    Paid,
    /// Money owed (split).
    Owed,
}

/// A single payment or split flattened for balance computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    /// Group of the owning expense, `None` for friend expenses.
    pub group_id: Option<GroupId>,
    /// Participant on the line.
    pub participant: ParticipantRef,
    /// Payment or split.
    pub side: LineSide,
    /// Line amount.
    pub amount: Decimal,
}
