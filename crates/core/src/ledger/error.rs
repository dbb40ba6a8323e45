//! Ledger error types for validation, access and state errors.

use rust_decimal::Decimal;
use splitledger_shared::AppError;
use splitledger_shared::types::{AmountError, CategoryId, ExpenseId, GroupId, ParticipantRef, SettlementId};
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during expense and settlement operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount failed to parse or has the wrong sign.
    #[error("Invalid amount: {0}")]
    InvalidAmount(AmountError),

    /// Currency code is malformed.
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Expense has no payment lines.
    #[error("Expense must have at least one payment")]
    NoPayments,

    /// Expense has no split lines.
    #[error("Expense must have at least one split")]
    NoSplits,

    /// A payment line is not strictly positive.
    #[error("Payment amount must be greater than zero: {0}")]
    InvalidPaymentAmount(AmountError),

    /// A split line is negative or malformed.
    #[error("Split amount must not be negative: {0}")]
    InvalidSplitAmount(AmountError),

    /// Payments do not add up to the total.
    #[error("Payments total {actual} does not match expense amount {expected}")]
    PaymentTotalMismatch {
        /// Expense total.
        expected: Decimal,
        /// Sum of payments.
        actual: Decimal,
    },

    /// Splits do not add up to the total.
    #[error("Splits total {actual} does not match expense amount {expected}")]
    SplitTotalMismatch {
        /// Expense total.
        expected: Decimal,
        /// Sum of splits.
        actual: Decimal,
    },

    /// Title is blank.
    #[error("Title must not be empty")]
    EmptyTitle,

    /// Settlement payer and payee are the same participant.
    #[error("Payer and payee must be different")]
    SamePayerAndPayee,

    /// Unknown settlement status string.
    #[error("Invalid settlement status: {0}")]
    InvalidSettlementStatus(String),

    /// Search bounds are inverted.
    #[error("Invalid search range: {0}")]
    InvalidSearchRange(String),

    /// Split calculator inputs do not describe the total.
    #[error("Invalid split breakdown: {0}")]
    InvalidBreakdown(String),

    // ========== Authorization Errors ==========
    /// Caller is not a member of the group.
    #[error("User is not a member of group {0}")]
    NotGroupMember(GroupId),

    /// Settlement endpoint is not a group member.
    #[error("Participant {0} is not a member of the group")]
    ParticipantNotMember(ParticipantRef),

    /// The two users have no accepted friendship.
    #[error("Users are not friends")]
    NotFriends,

    /// A friend-scoped line names someone outside the pair.
    #[error("Participant {0} is not part of this friendship")]
    ParticipantOutsideFriendship(ParticipantRef),

    // ========== Not Found Errors ==========
    /// Group does not exist.
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// Expense does not exist or is out of reach.
    #[error("Expense not found: {0}")]
    ExpenseNotFound(ExpenseId),

    /// Settlement does not exist or is out of reach.
    #[error("Settlement not found: {0}")]
    SettlementNotFound(SettlementId),

    /// Category does not exist or belongs to another group.
    #[error("Category not found in this group: {0}")]
    CategoryNotFound(CategoryId),

    // ========== Storage Errors ==========
    /// Storage failure, nothing was committed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidCurrency(_) => "INVALID_CURRENCY",
            Self::NoPayments => "NO_PAYMENTS",
            Self::NoSplits => "NO_SPLITS",
            Self::InvalidPaymentAmount(_) => "INVALID_PAYMENT_AMOUNT",
            Self::InvalidSplitAmount(_) => "INVALID_SPLIT_AMOUNT",
            Self::PaymentTotalMismatch { .. } => "PAYMENT_TOTAL_MISMATCH",
            Self::SplitTotalMismatch { .. } => "SPLIT_TOTAL_MISMATCH",
            Self::EmptyTitle => "EMPTY_TITLE",
            Self::SamePayerAndPayee => "SAME_PAYER_AND_PAYEE",
            Self::InvalidSettlementStatus(_) => "INVALID_SETTLEMENT_STATUS",
            Self::InvalidSearchRange(_) => "INVALID_SEARCH_RANGE",
            Self::InvalidBreakdown(_) => "INVALID_SPLIT_BREAKDOWN",
            Self::NotGroupMember(_) => "NOT_GROUP_MEMBER",
            Self::ParticipantNotMember(_) => "PARTICIPANT_NOT_MEMBER",
            Self::NotFriends => "NOT_FRIENDS",
            Self::ParticipantOutsideFriendship(_) => "PARTICIPANT_OUTSIDE_FRIENDSHIP",
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::ExpenseNotFound(_) => "EXPENSE_NOT_FOUND",
            Self::SettlementNotFound(_) => "SETTLEMENT_NOT_FOUND",
            Self::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            Self::Store(err) => err.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_)
            | Self::InvalidCurrency(_)
            | Self::NoPayments
            | Self::NoSplits
            | Self::InvalidPaymentAmount(_)
            | Self::InvalidSplitAmount(_)
            | Self::PaymentTotalMismatch { .. }
            | Self::SplitTotalMismatch { .. }
            | Self::EmptyTitle
            | Self::SamePayerAndPayee
            | Self::InvalidSettlementStatus(_)
            | Self::InvalidSearchRange(_)
            | Self::InvalidBreakdown(_) => 400,

            // 403 Forbidden - authorization errors
            Self::NotGroupMember(_)
            | Self::ParticipantNotMember(_)
            | Self::NotFriends
            | Self::ParticipantOutsideFriendship(_) => 403,

            // 404 Not Found
            Self::GroupNotFound(_)
            | Self::ExpenseNotFound(_)
            | Self::SettlementNotFound(_)
            | Self::CategoryNotFound(_) => 404,

            Self::Store(err) => err.http_status_code(),
        }
    }

    /// Returns true for errors reported before any write was attempted.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.http_status_code() == 400
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.http_status_code() {
            400 => Self::Validation(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => match err {
                LedgerError::Store(store) => store.into(),
                _ => Self::Internal(message),
            },
        }
    }
}
