//! Recurring scheduler error types.

use chrono::NaiveDate;
use splitledger_shared::AppError;
use splitledger_shared::types::RecurringExpenseId;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::store::StoreError;

/// Errors that can occur while managing or firing recurring templates.
#[derive(Debug, Error)]
pub enum RecurringError {
    // ========== Validation Errors ==========
    /// Interval is not one of daily, weekly, monthly or yearly.
    #[error("Invalid repeat interval: '{0}'")]
    InvalidInterval(String),

    /// Day fields do not fit the interval.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(&'static str),

    /// Start date falls after the end date.
    #[error("Start date {start} must be on or before end date {end}")]
    InvalidDateRange {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },

    // ========== Not Found Errors ==========
    /// Template does not exist.
    #[error("Recurring expense not found: {0}")]
    NotFound(RecurringExpenseId),

    // ========== State Errors ==========
    /// Template is inactive and cannot fire.
    #[error("Recurring expense {0} is not active")]
    TemplateInactive(RecurringExpenseId),

    /// Next occurrence is still in the future.
    #[error("Recurring expense {id} is not due until {next}")]
    NotDue {
        /// Template.
        id: RecurringExpenseId,
        /// Scheduled date.
        next: NaiveDate,
    },

    /// The next occurrence cannot be represented.
    #[error("Recurring expense {0} has no representable next occurrence")]
    ScheduleExhausted(RecurringExpenseId),

    // ========== Delegated Errors ==========
    /// Access, amount or line validation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RecurringError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInterval(_) => "INVALID_RECURRING_INTERVAL",
            Self::InvalidSchedule(_) => "INVALID_SCHEDULE",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::NotFound(_) => "RECURRING_EXPENSE_NOT_FOUND",
            Self::TemplateInactive(_) => "RECURRING_EXPENSE_INACTIVE",
            Self::NotDue { .. } => "RECURRING_EXPENSE_NOT_DUE",
            Self::ScheduleExhausted(_) => "SCHEDULE_EXHAUSTED",
            Self::Ledger(err) => err.error_code(),
            Self::Store(err) => err.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidInterval(_) | Self::InvalidSchedule(_) | Self::InvalidDateRange { .. } => {
                400
            }
            Self::NotFound(_) => 404,
            Self::TemplateInactive(_) | Self::NotDue { .. } | Self::ScheduleExhausted(_) => 409,
            Self::Ledger(err) => err.http_status_code(),
            Self::Store(err) => err.http_status_code(),
        }
    }

    /// Returns true for conflict and state errors.
    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            Self::TemplateInactive(_) | Self::NotDue { .. } | Self::ScheduleExhausted(_)
        )
    }
}

impl From<RecurringError> for AppError {
    fn from(err: RecurringError) -> Self {
        let message = err.to_string();
        match err {
            RecurringError::InvalidInterval(_)
            | RecurringError::InvalidSchedule(_)
            | RecurringError::InvalidDateRange { .. } => Self::Validation(message),
            RecurringError::NotFound(_) => Self::NotFound(message),
            RecurringError::TemplateInactive(_)
            | RecurringError::NotDue { .. }
            | RecurringError::ScheduleExhausted(_) => Self::Conflict(message),
            RecurringError::Ledger(ledger) => ledger.into(),
            RecurringError::Store(store) => store.into(),
        }
    }
}
