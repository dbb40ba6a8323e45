//! Persistence port for recurring templates.

use async_trait::async_trait;
use chrono::NaiveDate;
use splitledger_shared::types::{GroupId, RecurringExpenseId, UserId};

use super::types::{NewRecurringTemplate, OccurrenceCommit, RecurringChanges, RecurringTemplate};
use crate::ledger::ExpenseWithLines;
use crate::store::StoreResult;

/// Storage for templates and their lines.
#[async_trait]
pub trait RecurringStore: Send + Sync {
    /// Inserts a template with its lines in one transaction.
    async fn insert_template(&self, template: NewRecurringTemplate)
    -> StoreResult<RecurringTemplate>;

    /// Loads a template with its lines.
    async fn find_template(&self, id: RecurringExpenseId) -> StoreResult<Option<RecurringTemplate>>;

    /// Lists a group's templates, oldest first.
    async fn list_group_templates(&self, group_id: GroupId) -> StoreResult<Vec<RecurringTemplate>>;

    /// Replaces a template's values and lines in one transaction.
    async fn update_template(
        &self,
        id: RecurringExpenseId,
        changes: RecurringChanges,
    ) -> StoreResult<Option<RecurringTemplate>>;

    /// Sets the active flag.
    async fn set_active(
        &self,
        id: RecurringExpenseId,
        is_active: bool,
        updated_by: UserId,
    ) -> StoreResult<Option<RecurringTemplate>>;

    /// Deletes a template and its lines.
    async fn delete_template(&self, id: RecurringExpenseId) -> StoreResult<bool>;

    /// Active templates with `next_occurrence_date <= today`, soonest first.
    async fn due_templates(&self, today: NaiveDate) -> StoreResult<Vec<RecurringTemplate>>;

    /// In one transaction, inserts the occurrence's expense and advances the
    /// template, but only if its next date still equals `expected_next`.
    ///
    /// A lost race returns `StoreError::Conflict` and writes nothing.
    async fn commit_occurrence(&self, commit: OccurrenceCommit) -> StoreResult<ExpenseWithLines>;
}
