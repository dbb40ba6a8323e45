//! Recurring template service and batch generation.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use splitledger_shared::types::{GroupId, ParticipantRef, RecurringExpenseId, UserId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::RecurringError;
use super::schedule::{RepeatInterval, Schedule};
use super::store::RecurringStore;
use super::types::{
    BatchReport, CreateRecurringInput, GeneratedOccurrence, NewRecurringTemplate,
    OccurrenceCommit, RecurringChanges, RecurringPaymentInput, RecurringSplitInput,
    RecurringTemplate, TemplateOutcome, TemplatePayment, TemplateSplit, UpdateRecurringInput,
};
use crate::access::Access;
use crate::directory::Directory;
use crate::ledger::service::resolve_currency;
use crate::ledger::validation::{
    normalize_optional, validate_payments, validate_splits, validate_title, validate_total,
};
use crate::ledger::{CreateExpenseInput, ExpenseService, PaymentInput, SplitInput};

/// Manages templates and materializes their occurrences as group expenses.
pub struct RecurringService {
    store: Arc<dyn RecurringStore>,
    expenses: Arc<ExpenseService>,
    access: Access,
}

impl RecurringService {
    /// Creates a new recurring service.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecurringStore>,
        expenses: Arc<ExpenseService>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            store,
            expenses,
            access: Access::new(directory),
        }
    }

    /// Creates a template. Its first occurrence is the start date.
    ///
    /// Validation order: group, membership, interval, amount, title, date
    /// range, payments, splits.
    ///
    /// # Errors
    ///
    /// Returns a validation or access error before any write.
    pub async fn create_template(
        &self,
        input: CreateRecurringInput,
    ) -> Result<RecurringTemplate, RecurringError> {
        let group = self
            .access
            .require_group_member(input.group_id, input.created_by)
            .await?;

        let schedule = parse_schedule(&input.repeat_interval, input.day_of_month, input.day_of_week)?;
        let amount = validate_total(&input.amount)?;
        let currency = resolve_currency(input.currency.as_deref(), &group.currency)?;
        let title = validate_title(&input.title)?;
        check_date_range(input.start_date, input.end_date)?;
        let (payments, splits) = validate_lines(amount, &input.payments, &input.splits)?;

        let template = self
            .store
            .insert_template(NewRecurringTemplate {
                group_id: group.id,
                title,
                notes: normalize_optional(input.notes.as_deref()),
                amount,
                currency,
                schedule,
                start_date: input.start_date,
                end_date: input.end_date,
                created_by: input.created_by,
                payments,
                splits,
            })
            .await?;

        info!(
            recurring_id = %template.id,
            group_id = %template.group_id,
            interval = %template.schedule.interval(),
            next = %template.next_occurrence_date,
            "recurring expense created"
        );
        Ok(template)
    }

    /// Loads a template.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `NotGroupMember`.
    pub async fn get_template(
        &self,
        id: RecurringExpenseId,
        requester: UserId,
    ) -> Result<RecurringTemplate, RecurringError> {
        self.load_authorized(id, requester).await
    }

    /// Lists a group's templates.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` or `NotGroupMember`.
    pub async fn list_by_group(
        &self,
        group_id: GroupId,
        requester: UserId,
    ) -> Result<Vec<RecurringTemplate>, RecurringError> {
        self.access.require_group_member(group_id, requester).await?;
        Ok(self.store.list_group_templates(group_id).await?)
    }

    /// Replaces a template's values and lines.
    ///
    /// The schedule position is kept. A template that has never fired moves
    /// its next occurrence along with a changed start date.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, an access error, or a validation error before any
    /// write.
    pub async fn update_template(
        &self,
        input: UpdateRecurringInput,
    ) -> Result<RecurringTemplate, RecurringError> {
        let existing = self.load_authorized(input.id, input.updated_by).await?;

        let schedule = parse_schedule(&input.repeat_interval, input.day_of_month, input.day_of_week)?;
        let amount = validate_total(&input.amount)?;
        let currency = resolve_currency(input.currency.as_deref(), &existing.currency)?;
        let title = validate_title(&input.title)?;
        check_date_range(input.start_date, input.end_date)?;
        let (payments, splits) = validate_lines(amount, &input.payments, &input.splits)?;

        let never_fired = existing.next_occurrence_date == existing.start_date;
        let next_occurrence_date = if never_fired {
            input.start_date
        } else {
            existing.next_occurrence_date
        };

        let updated = self
            .store
            .update_template(
                input.id,
                RecurringChanges {
                    title,
                    notes: normalize_optional(input.notes.as_deref()),
                    amount,
                    currency,
                    schedule,
                    start_date: input.start_date,
                    end_date: input.end_date,
                    next_occurrence_date,
                    is_active: input.is_active.unwrap_or(existing.is_active),
                    updated_by: input.updated_by,
                    payments,
                    splits,
                },
            )
            .await?
            .ok_or(RecurringError::NotFound(input.id))?;

        info!(recurring_id = %updated.id, active = updated.is_active, "recurring expense updated");
        Ok(updated)
    }

    /// Stops a template from firing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `NotGroupMember`.
    pub async fn deactivate_template(
        &self,
        id: RecurringExpenseId,
        requester: UserId,
    ) -> Result<RecurringTemplate, RecurringError> {
        self.load_authorized(id, requester).await?;

        let updated = self
            .store
            .set_active(id, false, requester)
            .await?
            .ok_or(RecurringError::NotFound(id))?;

        info!(recurring_id = %id, "recurring expense deactivated");
        Ok(updated)
    }

    /// Deletes a template. Expenses it already generated are kept.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `NotGroupMember`.
    pub async fn delete_template(
        &self,
        id: RecurringExpenseId,
        requester: UserId,
    ) -> Result<(), RecurringError> {
        self.load_authorized(id, requester).await?;

        if !self.store.delete_template(id).await? {
            return Err(RecurringError::NotFound(id));
        }

        info!(recurring_id = %id, "recurring expense deleted");
        Ok(())
    }

    /// Fires one occurrence of a template.
    ///
    /// The template must be active and due on `today`. Its lines go through
    /// the regular expense pipeline, dated at the occurrence and created by
    /// `actor`. The expense insert and the schedule advance commit together,
    /// so a failed creation leaves the template where it was. The template
    /// deactivates once the next date reaches its end date.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `TemplateInactive`, `NotDue`, a ledger error from
    /// the expense pipeline, or a store error (`Conflict` if another run
    /// advanced the template first).
    pub async fn generate_from_template(
        &self,
        id: RecurringExpenseId,
        actor: UserId,
        today: NaiveDate,
    ) -> Result<GeneratedOccurrence, RecurringError> {
        let template = self.load_authorized(id, actor).await?;

        if !template.is_active {
            return Err(RecurringError::TemplateInactive(id));
        }
        if template.next_occurrence_date > today {
            return Err(RecurringError::NotDue {
                id,
                next: template.next_occurrence_date,
            });
        }

        let occurrence_date = template.next_occurrence_date;
        let expense = self
            .expenses
            .prepare_group_expense(&occurrence_input(&template, actor))
            .await?;

        let next_occurrence_date = template
            .schedule
            .next_after(occurrence_date)
            .ok_or(RecurringError::ScheduleExhausted(id))?;
        let is_active = template.end_date.is_none_or(|end| next_occurrence_date < end);

        let created = self
            .store
            .commit_occurrence(OccurrenceCommit {
                template_id: id,
                expected_next: occurrence_date,
                next_occurrence_date,
                is_active,
                expense,
            })
            .await?;

        info!(
            recurring_id = %id,
            expense_id = %created.expense.id,
            occurrence = %occurrence_date,
            next = %next_occurrence_date,
            active = is_active,
            "recurring occurrence generated"
        );
        self.expenses.log_expense_created(&created, actor).await;

        Ok(GeneratedOccurrence {
            template_id: id,
            occurrence_date,
            next_occurrence_date,
            is_active,
            expense: created,
        })
    }

    /// Fires every template due on `today`, once each, as its creator.
    ///
    /// A failing template is recorded and the run moves on. After `cancel`
    /// fires, remaining templates are reported as skipped; a template already
    /// in flight completes or rolls back on its own.
    ///
    /// # Errors
    ///
    /// Returns a store error only if the due list cannot be loaded.
    pub async fn process_due(
        &self,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, RecurringError> {
        let due = self.store.due_templates(today).await?;
        debug!(count = due.len(), %today, "due recurring expenses");

        let mut report = BatchReport {
            run_date: Some(today),
            outcomes: Vec::with_capacity(due.len()),
        };

        for template in due {
            if cancel.is_cancelled() {
                report.outcomes.push(TemplateOutcome::Skipped {
                    template_id: template.id,
                });
                continue;
            }

            let outcome = match self
                .generate_from_template(template.id, template.created_by, today)
                .await
            {
                Ok(generated) => TemplateOutcome::Generated {
                    template_id: template.id,
                    expense_id: generated.expense.expense.id,
                    occurrence_date: generated.occurrence_date,
                },
                Err(err) => {
                    warn!(recurring_id = %template.id, error = %err, "recurring generation failed");
                    TemplateOutcome::Failed {
                        template_id: template.id,
                        code: err.error_code().to_string(),
                        message: err.to_string(),
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        info!(
            generated = report.generated(),
            failed = report.failed(),
            skipped = report.skipped(),
            "recurring batch finished"
        );
        Ok(report)
    }

    async fn load_authorized(
        &self,
        id: RecurringExpenseId,
        requester: UserId,
    ) -> Result<RecurringTemplate, RecurringError> {
        let template = self
            .store
            .find_template(id)
            .await?
            .ok_or(RecurringError::NotFound(id))?;
        self.access.require_member(template.group_id, requester).await?;
        Ok(template)
    }
}

fn parse_schedule(
    interval: &str,
    day_of_month: Option<i32>,
    day_of_week: Option<i32>,
) -> Result<Schedule, RecurringError> {
    let interval: RepeatInterval = interval.parse()?;
    Schedule::from_parts(interval, day_of_month, day_of_week)
}

fn check_date_range(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), RecurringError> {
    match end {
        Some(end) if start > end => Err(RecurringError::InvalidDateRange { start, end }),
        _ => Ok(()),
    }
}

/// Runs template lines through the expense line checks.
fn validate_lines(
    amount: Decimal,
    payments: &[RecurringPaymentInput],
    splits: &[RecurringSplitInput],
) -> Result<(Vec<TemplatePayment>, Vec<TemplateSplit>), RecurringError> {
    let payment_inputs: Vec<PaymentInput> = payments
        .iter()
        .map(|p| PaymentInput {
            participant: ParticipantRef::User(p.user_id),
            amount: p.amount.clone(),
            method: p.method.clone(),
        })
        .collect();
    let split_inputs: Vec<SplitInput> = splits
        .iter()
        .map(|s| SplitInput {
            participant: ParticipantRef::User(s.user_id),
            amount: s.amount.clone(),
            split_type: s.split_type,
            share_value: None,
        })
        .collect();

    let payments = validate_payments(amount, &payment_inputs)?
        .into_iter()
        .zip(payments)
        .map(|(line, input)| TemplatePayment {
            user_id: input.user_id,
            amount: line.amount,
            method: line.method,
        })
        .collect();
    let splits = validate_splits(amount, &split_inputs)?
        .into_iter()
        .zip(splits)
        .map(|(line, input)| TemplateSplit {
            user_id: input.user_id,
            amount: line.amount,
            split_type: line.split_type,
        })
        .collect();

    Ok((payments, splits))
}

/// The expense request one occurrence of `template` stands for.
fn occurrence_input(template: &RecurringTemplate, actor: UserId) -> CreateExpenseInput {
    CreateExpenseInput {
        group_id: template.group_id,
        title: template.title.clone(),
        notes: template.notes.clone(),
        amount: template.amount.to_string(),
        currency: Some(template.currency.clone()),
        date: template.next_occurrence_date,
        category_id: None,
        tags: Vec::new(),
        created_by: actor,
        payments: template
            .payments
            .iter()
            .map(|p| PaymentInput {
                participant: ParticipantRef::User(p.user_id),
                amount: p.amount.to_string(),
                method: p.method.clone(),
            })
            .collect(),
        splits: template
            .splits
            .iter()
            .map(|s| SplitInput {
                participant: ParticipantRef::User(s.user_id),
                amount: s.amount.to_string(),
                split_type: s.split_type,
                share_value: None,
            })
            .collect(),
    }
}
