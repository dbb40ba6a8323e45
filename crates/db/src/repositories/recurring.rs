//! Recurring template repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use splitledger_core::ledger::ExpenseWithLines;
use splitledger_core::recurring::{
    NewRecurringTemplate, OccurrenceCommit, RecurringChanges, RecurringStore, RecurringTemplate,
    RepeatInterval, Schedule, TemplatePayment, TemplateSplit,
};
use splitledger_core::{StoreError, StoreResult};
use splitledger_shared::types::{GroupId, RecurringExpenseId, UserId};
use tracing::debug;
use uuid::Uuid;

use super::convert::{db_error, now, parse_column, position, utc};
use super::expense::insert_expense_rows;
use crate::entities::{recurring_expense_payments, recurring_expense_splits, recurring_expenses};

/// Recurring template repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct RecurringRepository {
    db: DatabaseConnection,
}

impl RecurringRepository {
    /// Creates a new recurring template repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn schedule_from_model(model: &recurring_expenses::Model) -> StoreResult<Schedule> {
    let interval: RepeatInterval =
        parse_column(&model.repeat_interval, "recurring_expenses.repeat_interval")?;
    Schedule::from_parts(interval, model.day_of_month, model.day_of_week)
        .map_err(|err| StoreError::Corrupt(format!("recurring_expenses {}: {err}", model.id)))
}

/// Attaches lines to headers, preserving header order.
async fn with_lines<C: ConnectionTrait>(
    conn: &C,
    models: Vec<recurring_expenses::Model>,
) -> StoreResult<Vec<RecurringTemplate>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

    let mut payments: HashMap<Uuid, Vec<TemplatePayment>> = HashMap::new();
    for row in recurring_expense_payments::Entity::find()
        .filter(recurring_expense_payments::Column::RecurringExpenseId.is_in(ids.clone()))
        .order_by_asc(recurring_expense_payments::Column::Position)
        .all(conn)
        .await
        .map_err(db_error)?
    {
        payments
            .entry(row.recurring_expense_id)
            .or_default()
            .push(TemplatePayment {
                user_id: UserId::from_uuid(row.user_id),
                amount: row.amount,
                method: row.payment_method,
            });
    }

    let mut splits: HashMap<Uuid, Vec<TemplateSplit>> = HashMap::new();
    for row in recurring_expense_splits::Entity::find()
        .filter(recurring_expense_splits::Column::RecurringExpenseId.is_in(ids))
        .order_by_asc(recurring_expense_splits::Column::Position)
        .all(conn)
        .await
        .map_err(db_error)?
    {
        let split_type = parse_column(&row.split_type, "recurring_expense_splits.split_type")?;
        splits
            .entry(row.recurring_expense_id)
            .or_default()
            .push(TemplateSplit {
                user_id: UserId::from_uuid(row.user_id),
                amount: row.amount_owed,
                split_type,
            });
    }

    models
        .into_iter()
        .map(|model| {
            let schedule = schedule_from_model(&model)?;
            Ok(RecurringTemplate {
                id: RecurringExpenseId::from_uuid(model.id),
                group_id: GroupId::from_uuid(model.group_id),
                title: model.title,
                notes: model.notes,
                amount: model.amount,
                currency: model.currency.trim().to_string(),
                schedule,
                start_date: model.start_date,
                end_date: model.end_date,
                next_occurrence_date: model.next_occurrence_date,
                is_active: model.is_active,
                created_by: UserId::from_uuid(model.created_by),
                updated_by: model.updated_by.map(UserId::from_uuid),
                created_at: utc(model.created_at),
                updated_at: utc(model.updated_at),
                payments: payments.remove(&model.id).unwrap_or_default(),
                splits: splits.remove(&model.id).unwrap_or_default(),
            })
        })
        .collect()
}

async fn with_lines_one<C: ConnectionTrait>(
    conn: &C,
    model: recurring_expenses::Model,
) -> StoreResult<RecurringTemplate> {
    let id = model.id;
    with_lines(conn, vec![model])
        .await?
        .pop()
        .ok_or_else(|| StoreError::Missing(format!("recurring expense {id}")))
}

async fn insert_template_lines<C: ConnectionTrait>(
    conn: &C,
    template_id: Uuid,
    payments: &[TemplatePayment],
    splits: &[TemplateSplit],
) -> StoreResult<()> {
    for (index, payment) in payments.iter().enumerate() {
        recurring_expense_payments::ActiveModel {
            id: Set(Uuid::now_v7()),
            recurring_expense_id: Set(template_id),
            user_id: Set(payment.user_id.into_inner()),
            amount: Set(payment.amount),
            payment_method: Set(payment.method.clone()),
            position: Set(position(index)?),
        }
        .insert(conn)
        .await
        .map_err(db_error)?;
    }
    for (index, split) in splits.iter().enumerate() {
        recurring_expense_splits::ActiveModel {
            id: Set(Uuid::now_v7()),
            recurring_expense_id: Set(template_id),
            user_id: Set(split.user_id.into_inner()),
            amount_owed: Set(split.amount),
            split_type: Set(split.split_type.as_str().to_string()),
            position: Set(position(index)?),
        }
        .insert(conn)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

async fn delete_template_lines<C: ConnectionTrait>(conn: &C, template_id: Uuid) -> StoreResult<()> {
    recurring_expense_payments::Entity::delete_many()
        .filter(recurring_expense_payments::Column::RecurringExpenseId.eq(template_id))
        .exec(conn)
        .await
        .map_err(db_error)?;
    recurring_expense_splits::Entity::delete_many()
        .filter(recurring_expense_splits::Column::RecurringExpenseId.eq(template_id))
        .exec(conn)
        .await
        .map_err(db_error)?;
    Ok(())
}

#[async_trait]
impl RecurringStore for RecurringRepository {
    async fn insert_template(
        &self,
        template: NewRecurringTemplate,
    ) -> StoreResult<RecurringTemplate> {
        let timestamp = now();
        let id = Uuid::now_v7();
        let txn = self.db.begin().await.map_err(db_error)?;

        let header = recurring_expenses::ActiveModel {
            id: Set(id),
            group_id: Set(template.group_id.into_inner()),
            title: Set(template.title),
            notes: Set(template.notes),
            amount: Set(template.amount),
            currency: Set(template.currency),
            repeat_interval: Set(template.schedule.interval().as_str().to_string()),
            day_of_month: Set(template.schedule.day_of_month()),
            day_of_week: Set(template.schedule.day_of_week()),
            start_date: Set(template.start_date),
            end_date: Set(template.end_date),
            next_occurrence_date: Set(template.start_date),
            is_active: Set(true),
            created_by: Set(template.created_by.into_inner()),
            updated_by: Set(None),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;

        insert_template_lines(&txn, id, &template.payments, &template.splits).await?;
        let stored = with_lines_one(&txn, header).await?;
        txn.commit().await.map_err(db_error)?;

        Ok(stored)
    }

    async fn find_template(
        &self,
        id: RecurringExpenseId,
    ) -> StoreResult<Option<RecurringTemplate>> {
        let Some(header) = recurring_expenses::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };
        with_lines_one(&self.db, header).await.map(Some)
    }

    async fn list_group_templates(
        &self,
        group_id: GroupId,
    ) -> StoreResult<Vec<RecurringTemplate>> {
        let headers = recurring_expenses::Entity::find()
            .filter(recurring_expenses::Column::GroupId.eq(group_id.into_inner()))
            .order_by_asc(recurring_expenses::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        with_lines(&self.db, headers).await
    }

    async fn update_template(
        &self,
        id: RecurringExpenseId,
        changes: RecurringChanges,
    ) -> StoreResult<Option<RecurringTemplate>> {
        let txn = self.db.begin().await.map_err(db_error)?;

        let Some(existing) = recurring_expenses::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        let mut header: recurring_expenses::ActiveModel = existing.into();
        header.title = Set(changes.title);
        header.notes = Set(changes.notes);
        header.amount = Set(changes.amount);
        header.currency = Set(changes.currency);
        header.repeat_interval = Set(changes.schedule.interval().as_str().to_string());
        header.day_of_month = Set(changes.schedule.day_of_month());
        header.day_of_week = Set(changes.schedule.day_of_week());
        header.start_date = Set(changes.start_date);
        header.end_date = Set(changes.end_date);
        header.next_occurrence_date = Set(changes.next_occurrence_date);
        header.is_active = Set(changes.is_active);
        header.updated_by = Set(Some(changes.updated_by.into_inner()));
        header.updated_at = Set(now());
        let header = header.update(&txn).await.map_err(db_error)?;

        delete_template_lines(&txn, id.into_inner()).await?;
        insert_template_lines(&txn, id.into_inner(), &changes.payments, &changes.splits).await?;

        let stored = with_lines_one(&txn, header).await?;
        txn.commit().await.map_err(db_error)?;
        Ok(Some(stored))
    }

    async fn set_active(
        &self,
        id: RecurringExpenseId,
        is_active: bool,
        updated_by: UserId,
    ) -> StoreResult<Option<RecurringTemplate>> {
        let Some(existing) = recurring_expenses::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        let mut header: recurring_expenses::ActiveModel = existing.into();
        header.is_active = Set(is_active);
        header.updated_by = Set(Some(updated_by.into_inner()));
        header.updated_at = Set(now());
        let header = header.update(&self.db).await.map_err(db_error)?;

        with_lines_one(&self.db, header).await.map(Some)
    }

    async fn delete_template(&self, id: RecurringExpenseId) -> StoreResult<bool> {
        let result = recurring_expenses::Entity::delete_by_id(id.into_inner())
            .exec(&self.db)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected > 0)
    }

    async fn due_templates(&self, today: NaiveDate) -> StoreResult<Vec<RecurringTemplate>> {
        let headers = recurring_expenses::Entity::find()
            .filter(recurring_expenses::Column::IsActive.eq(true))
            .filter(recurring_expenses::Column::NextOccurrenceDate.lte(today))
            .order_by_asc(recurring_expenses::Column::NextOccurrenceDate)
            .order_by_asc(recurring_expenses::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        with_lines(&self.db, headers).await
    }

    async fn commit_occurrence(&self, commit: OccurrenceCommit) -> StoreResult<ExpenseWithLines> {
        let template_id = commit.template_id.into_inner();
        let txn = self.db.begin().await.map_err(db_error)?;

        let advanced = recurring_expenses::Entity::update_many()
            .col_expr(
                recurring_expenses::Column::NextOccurrenceDate,
                Expr::value(commit.next_occurrence_date),
            )
            .col_expr(recurring_expenses::Column::IsActive, Expr::value(commit.is_active))
            .col_expr(recurring_expenses::Column::UpdatedAt, Expr::value(now()))
            .filter(recurring_expenses::Column::Id.eq(template_id))
            .filter(recurring_expenses::Column::NextOccurrenceDate.eq(commit.expected_next))
            .filter(recurring_expenses::Column::IsActive.eq(true))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        if advanced.rows_affected == 0 {
            return Err(StoreError::Conflict(format!(
                "recurring expense {template_id} already advanced past {}",
                commit.expected_next
            )));
        }

        let stored = insert_expense_rows(&txn, commit.expense, Some(template_id)).await?;
        txn.commit().await.map_err(db_error)?;

        debug!(
            recurring_id = %template_id,
            expense_id = %stored.expense.id,
            next = %commit.next_occurrence_date,
            "occurrence committed"
        );
        Ok(stored)
    }
}
