//! Recurring template types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use splitledger_shared::types::{ExpenseId, GroupId, RecurringExpenseId, UserId};

use super::schedule::Schedule;
use crate::ledger::{ExpenseWithLines, NewExpense, SplitType};

/// A payment line on a template. Templates only reference real accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePayment {
    /// Payer.
    pub user_id: UserId,
    /// Amount, > 0.
    pub amount: Decimal,
    /// Optional payment method.
    pub method: Option<String>,
}

/// A split line on a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSplit {
    /// Ower.
    pub user_id: UserId,
    /// Amount owed, >= 0.
    pub amount: Decimal,
    /// Informational split type.
    pub split_type: SplitType,
}

/// A stored recurring template with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    /// Template ID.
    pub id: RecurringExpenseId,
    /// Owning group.
    pub group_id: GroupId,
    /// Title copied onto each occurrence.
    pub title: String,
    /// Notes copied onto each occurrence.
    pub notes: Option<String>,
    /// Total per occurrence.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Interval and day field.
    pub schedule: Schedule,
    /// First occurrence.
    pub start_date: NaiveDate,
    /// Exclusive end; an occurrence landing on it is never generated.
    pub end_date: Option<NaiveDate>,
    /// Date the next occurrence will carry.
    pub next_occurrence_date: NaiveDate,
    /// Whether the template still fires.
    pub is_active: bool,
    /// Creator; the batch job generates on their behalf.
    pub created_by: UserId,
    /// Last editor.
    pub updated_by: Option<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Payment lines.
    pub payments: Vec<TemplatePayment>,
    /// Split lines.
    pub splits: Vec<TemplateSplit>,
}

impl RecurringTemplate {
    /// Returns true when the template is active and `next_occurrence_date <= today`.
    #[must_use]
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.is_active && self.next_occurrence_date <= today
    }
}

/// Payment line input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringPaymentInput {
    /// Payer.
    pub user_id: UserId,
    /// Decimal string, > 0.
    pub amount: String,
    /// Optional payment method.
    pub method: Option<String>,
}

/// Split line input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringSplitInput {
    /// Ower.
    pub user_id: UserId,
    /// Decimal string, >= 0.
    pub amount: String,
    /// Informational split type.
    #[serde(default)]
    pub split_type: SplitType,
}

/// Input for creating a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecurringInput {
    /// Owning group.
    pub group_id: GroupId,
    /// Title.
    pub title: String,
    /// Notes.
    pub notes: Option<String>,
    /// Decimal string, > 0.
    pub amount: String,
    /// Currency; blank means the group's.
    pub currency: Option<String>,
    /// daily, weekly, monthly or yearly.
    pub repeat_interval: String,
    /// Required for monthly and yearly.
    pub day_of_month: Option<i32>,
    /// Required for weekly.
    pub day_of_week: Option<i32>,
    /// First occurrence.
    pub start_date: NaiveDate,
    /// Optional exclusive end.
    pub end_date: Option<NaiveDate>,
    /// Creator.
    pub created_by: UserId,
    /// Payment lines.
    pub payments: Vec<RecurringPaymentInput>,
    /// Split lines.
    pub splits: Vec<RecurringSplitInput>,
}

/// Input for replacing a template's values and lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecurringInput {
    /// Template.
    pub id: RecurringExpenseId,
    /// Title.
    pub title: String,
    /// Notes.
    pub notes: Option<String>,
    /// Decimal string, > 0.
    pub amount: String,
    /// Currency; blank keeps the current one.
    pub currency: Option<String>,
    /// daily, weekly, monthly or yearly.
    pub repeat_interval: String,
    /// Required for monthly and yearly.
    pub day_of_month: Option<i32>,
    /// Required for weekly.
    pub day_of_week: Option<i32>,
    /// First occurrence.
    pub start_date: NaiveDate,
    /// Optional exclusive end.
    pub end_date: Option<NaiveDate>,
    /// New active flag; `None` keeps it.
    pub is_active: Option<bool>,
    /// Editor.
    pub updated_by: UserId,
    /// Payment lines.
    pub payments: Vec<RecurringPaymentInput>,
    /// Split lines.
    pub splits: Vec<RecurringSplitInput>,
}

/// A validated template ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecurringTemplate {
    /// Owning group.
    pub group_id: GroupId,
    /// Trimmed title.
    pub title: String,
    /// Notes.
    pub notes: Option<String>,
    /// Total.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Interval and day field.
    pub schedule: Schedule,
    /// First occurrence, also the initial next occurrence.
    pub start_date: NaiveDate,
    /// Optional exclusive end.
    pub end_date: Option<NaiveDate>,
    /// Creator.
    pub created_by: UserId,
    /// Payment lines.
    pub payments: Vec<TemplatePayment>,
    /// Split lines.
    pub splits: Vec<TemplateSplit>,
}

/// Validated replacement values for a template. Lines are replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringChanges {
    /// Trimmed title.
    pub title: String,
    /// Notes.
    pub notes: Option<String>,
    /// Total.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Interval and day field.
    pub schedule: Schedule,
    /// First occurrence.
    pub start_date: NaiveDate,
    /// Optional exclusive end.
    pub end_date: Option<NaiveDate>,
    /// Next occurrence.
    pub next_occurrence_date: NaiveDate,
    /// Active flag.
    pub is_active: bool,
    /// Editor.
    pub updated_by: UserId,
    /// Payment lines.
    pub payments: Vec<TemplatePayment>,
    /// Split lines.
    pub splits: Vec<TemplateSplit>,
}

/// One firing: the expense to insert plus the guarded template advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceCommit {
    /// Template being advanced.
    pub template_id: RecurringExpenseId,
    /// The advance only applies if the stored next date still equals this.
    pub expected_next: NaiveDate,
    /// New next occurrence.
    pub next_occurrence_date: NaiveDate,
    /// New active flag.
    pub is_active: bool,
    /// Expense materialized for this occurrence.
    pub expense: NewExpense,
}

/// Result of firing a template once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedOccurrence {
    /// Template that fired.
    pub template_id: RecurringExpenseId,
    /// Date the expense carries.
    pub occurrence_date: NaiveDate,
    /// Next scheduled date.
    pub next_occurrence_date: NaiveDate,
    /// Whether the template is still active.
    pub is_active: bool,
    /// Created expense.
    pub expense: ExpenseWithLines,
}

/// What happened to one due template during a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TemplateOutcome {
    /// An expense was created and the template advanced.
    Generated {
        /// Template.
        template_id: RecurringExpenseId,
        /// Created expense.
        expense_id: ExpenseId,
        /// Date the expense carries.
        occurrence_date: NaiveDate,
    },
    /// Generation failed; the template did not advance.
    Failed {
        /// Template.
        template_id: RecurringExpenseId,
        /// Stable error code.
        code: String,
        /// Error message.
        message: String,
    },
    /// Not attempted because the run was cancelled.
    Skipped {
        /// Template.
        template_id: RecurringExpenseId,
    },
}

impl TemplateOutcome {
    /// The template this outcome is about.
    #[must_use]
    pub const fn template_id(&self) -> RecurringExpenseId {
        match self {
            Self::Generated { template_id, .. }
            | Self::Failed { template_id, .. }
            | Self::Skipped { template_id } => *template_id,
        }
    }
}

/// Per-template results of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Date the run treated as today.
    pub run_date: Option<NaiveDate>,
    /// One entry per due template, in processing order.
    pub outcomes: Vec<TemplateOutcome>,
}

impl BatchReport {
    /// Number of templates that generated an expense.
    #[must_use]
    pub fn generated(&self) -> usize {
        self.count(|o| matches!(o, TemplateOutcome::Generated { .. }))
    }

    /// Number of templates that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TemplateOutcome::Failed { .. }))
    }

    /// Number of templates skipped after cancellation.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TemplateOutcome::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&TemplateOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}
