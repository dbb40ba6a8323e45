//! Expense repository: headers, payment lines and split lines.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use splitledger_core::StoreResult;
use splitledger_core::ledger::{
    Expense, ExpenseChanges, ExpenseQuery, ExpenseStore, ExpenseWithLines, FriendPair, LedgerKind,
    LedgerLine, LineSide, NewExpense, NewPayment, NewSplit, Payment, Split,
};
use splitledger_shared::types::{CategoryId, ExpenseId, GroupId, PaymentId, SplitId, UserId};
use uuid::Uuid;

use super::convert::{
    db_error, now, parse_column, participant, participant_eq, position, scope_columns,
    scope_from_columns, tags_from_json, tags_to_json, utc,
};
use crate::entities::{expense_payments, expense_splits, expenses};

/// Expense repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn lines_for<C: ConnectionTrait>(
        conn: &C,
        expense_id: Uuid,
    ) -> StoreResult<(Vec<Payment>, Vec<Split>)> {
        let payments = expense_payments::Entity::find()
            .filter(expense_payments::Column::ExpenseId.eq(expense_id))
            .order_by_asc(expense_payments::Column::Position)
            .all(conn)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(payment_from_model)
            .collect::<StoreResult<Vec<_>>>()?;

        let splits = expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.eq(expense_id))
            .order_by_asc(expense_splits::Column::Position)
            .all(conn)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(split_from_model)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok((payments, splits))
    }

    fn newest_first(query: Select<expenses::Entity>) -> Select<expenses::Entity> {
        query
            .order_by_desc(expenses::Column::ExpenseDate)
            .order_by_desc(expenses::Column::CreatedAt)
    }

    fn search_condition(query: &ExpenseQuery) -> Condition {
        let mut condition =
            Condition::all().add(expenses::Column::GroupId.eq(query.group_id.into_inner()));

        if let Some(text) = &query.text {
            let pattern = format!("%{}%", escape_like(text));
            condition = condition.add(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(expenses::Column::Title))).like(&pattern))
                    .add(Expr::expr(Func::lower(Expr::col(expenses::Column::Notes))).like(&pattern)),
            );
        }
        if let Some(category) = query.category_id {
            condition = condition.add(expenses::Column::CategoryId.eq(category.into_inner()));
        }
        if let Some(min) = query.min_amount {
            condition = condition.add(expenses::Column::Amount.gte(min));
        }
        if let Some(max) = query.max_amount {
            condition = condition.add(expenses::Column::Amount.lte(max));
        }
        if let Some(from) = query.date_from {
            condition = condition.add(expenses::Column::ExpenseDate.gte(from));
        }
        if let Some(to) = query.date_to {
            condition = condition.add(expenses::Column::ExpenseDate.lte(to));
        }
        if let Some(payer) = query.payer {
            condition = condition.add(
                expenses::Column::Id.in_subquery(
                    Query::select()
                        .column(expense_payments::Column::ExpenseId)
                        .from(expense_payments::Entity)
                        .and_where(participant_eq(
                            expense_payments::Column::UserId,
                            expense_payments::Column::PendingUserId,
                            payer,
                        ))
                        .to_owned(),
                ),
            );
        }
        if let Some(ower) = query.ower {
            condition = condition.add(
                expenses::Column::Id.in_subquery(
                    Query::select()
                        .column(expense_splits::Column::ExpenseId)
                        .from(expense_splits::Entity)
                        .and_where(participant_eq(
                            expense_splits::Column::UserId,
                            expense_splits::Column::PendingUserId,
                            ower,
                        ))
                        .to_owned(),
                ),
            );
        }
        if let Some(creator) = query.created_by {
            condition = condition.add(expenses::Column::CreatedBy.eq(creator.into_inner()));
        }

        condition
    }
}

/// Inserts an expense header and its lines on `conn`.
///
/// The caller owns the transaction.
pub(crate) async fn insert_expense_rows<C: ConnectionTrait>(
    conn: &C,
    expense: NewExpense,
    recurring_expense_id: Option<Uuid>,
) -> StoreResult<ExpenseWithLines> {
    let timestamp = now();
    let id = Uuid::now_v7();
    let (kind, group_id, friend_low_id, friend_high_id) = scope_columns(&expense.scope);

    let header = expenses::ActiveModel {
        id: Set(id),
        group_id: Set(group_id),
        kind: Set(kind.to_string()),
        friend_low_id: Set(friend_low_id),
        friend_high_id: Set(friend_high_id),
        title: Set(expense.title),
        notes: Set(expense.notes),
        amount: Set(expense.amount),
        currency: Set(expense.currency),
        expense_date: Set(expense.date),
        category_id: Set(expense.category_id.map(CategoryId::into_inner)),
        tags: Set(tags_to_json(&expense.tags)),
        recurring_expense_id: Set(recurring_expense_id),
        created_by: Set(expense.created_by.into_inner()),
        updated_by: Set(None),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
    }
    .insert(conn)
    .await
    .map_err(db_error)?;

    let (payments, splits) = insert_lines(conn, id, &expense.payments, &expense.splits).await?;

    Ok(ExpenseWithLines {
        expense: expense_from_model(header)?,
        payments,
        splits,
    })
}

async fn insert_lines<C: ConnectionTrait>(
    conn: &C,
    expense_id: Uuid,
    payments: &[NewPayment],
    splits: &[NewSplit],
) -> StoreResult<(Vec<Payment>, Vec<Split>)> {
    let mut stored_payments = Vec::with_capacity(payments.len());
    for (index, payment) in payments.iter().enumerate() {
        let (user_id, pending_user_id) = payment.participant.into_columns();
        let row = expense_payments::ActiveModel {
            id: Set(Uuid::now_v7()),
            expense_id: Set(expense_id),
            user_id: Set(user_id),
            pending_user_id: Set(pending_user_id),
            amount: Set(payment.amount),
            payment_method: Set(payment.method.clone()),
            position: Set(position(index)?),
        }
        .insert(conn)
        .await
        .map_err(db_error)?;
        stored_payments.push(payment_from_model(row)?);
    }

    let mut stored_splits = Vec::with_capacity(splits.len());
    for (index, split) in splits.iter().enumerate() {
        let (user_id, pending_user_id) = split.participant.into_columns();
        let row = expense_splits::ActiveModel {
            id: Set(Uuid::now_v7()),
            expense_id: Set(expense_id),
            user_id: Set(user_id),
            pending_user_id: Set(pending_user_id),
            amount_owed: Set(split.amount),
            split_type: Set(split.split_type.as_str().to_string()),
            share_value: Set(split.share_value),
            position: Set(position(index)?),
        }
        .insert(conn)
        .await
        .map_err(db_error)?;
        stored_splits.push(split_from_model(row)?);
    }

    Ok((stored_payments, stored_splits))
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub(crate) fn expense_from_model(model: expenses::Model) -> StoreResult<Expense> {
    Ok(Expense {
        id: ExpenseId::from_uuid(model.id),
        scope: scope_from_columns(
            &model.kind,
            model.group_id,
            model.friend_low_id,
            model.friend_high_id,
        )?,
        title: model.title,
        notes: model.notes,
        amount: model.amount,
        currency: model.currency,
        date: model.expense_date,
        category_id: model.category_id.map(CategoryId::from_uuid),
        tags: tags_from_json(model.tags)?,
        created_by: UserId::from_uuid(model.created_by),
        updated_by: model.updated_by.map(UserId::from_uuid),
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

fn payment_from_model(model: expense_payments::Model) -> StoreResult<Payment> {
    Ok(Payment {
        id: PaymentId::from_uuid(model.id),
        expense_id: ExpenseId::from_uuid(model.expense_id),
        participant: participant(model.user_id, model.pending_user_id, "payment")?,
        amount: model.amount,
        method: model.payment_method,
    })
}

fn split_from_model(model: expense_splits::Model) -> StoreResult<Split> {
    Ok(Split {
        id: SplitId::from_uuid(model.id),
        expense_id: ExpenseId::from_uuid(model.expense_id),
        participant: participant(model.user_id, model.pending_user_id, "split")?,
        amount: model.amount_owed,
        split_type: parse_column(&model.split_type, "split_type")?,
        share_value: model.share_value,
    })
}

fn headers(models: Vec<expenses::Model>) -> StoreResult<Vec<Expense>> {
    models.into_iter().map(expense_from_model).collect()
}

#[async_trait]
impl ExpenseStore for ExpenseRepository {
    async fn insert_expense(&self, expense: NewExpense) -> StoreResult<ExpenseWithLines> {
        let txn = self.db.begin().await.map_err(db_error)?;
        let stored = insert_expense_rows(&txn, expense, None).await?;
        txn.commit().await.map_err(db_error)?;

        tracing::debug!(expense_id = %stored.expense.id, "expense inserted");
        Ok(stored)
    }

    async fn replace_expense(
        &self,
        id: ExpenseId,
        changes: ExpenseChanges,
    ) -> StoreResult<Option<ExpenseWithLines>> {
        let txn = self.db.begin().await.map_err(db_error)?;

        let Some(existing) = expenses::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        let mut header: expenses::ActiveModel = existing.into();
        header.title = Set(changes.title);
        header.notes = Set(changes.notes);
        header.amount = Set(changes.amount);
        header.currency = Set(changes.currency);
        header.expense_date = Set(changes.date);
        header.category_id = Set(changes.category_id.map(CategoryId::into_inner));
        header.tags = Set(tags_to_json(&changes.tags));
        header.updated_by = Set(Some(changes.updated_by.into_inner()));
        header.updated_at = Set(now());
        let header = header.update(&txn).await.map_err(db_error)?;

        expense_payments::Entity::delete_many()
            .filter(expense_payments::Column::ExpenseId.eq(id.into_inner()))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        expense_splits::Entity::delete_many()
            .filter(expense_splits::Column::ExpenseId.eq(id.into_inner()))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        let (payments, splits) =
            insert_lines(&txn, id.into_inner(), &changes.payments, &changes.splits).await?;

        txn.commit().await.map_err(db_error)?;

        Ok(Some(ExpenseWithLines {
            expense: expense_from_model(header)?,
            payments,
            splits,
        }))
    }

    async fn delete_expense(&self, id: ExpenseId) -> StoreResult<bool> {
        let result = expenses::Entity::delete_by_id(id.into_inner())
            .exec(&self.db)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected > 0)
    }

    async fn find_expense(&self, id: ExpenseId) -> StoreResult<Option<ExpenseWithLines>> {
        let Some(header) = expenses::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        let (payments, splits) = Self::lines_for(&self.db, header.id).await?;
        Ok(Some(ExpenseWithLines {
            expense: expense_from_model(header)?,
            payments,
            splits,
        }))
    }

    async fn list_group_expenses(&self, group: GroupId) -> StoreResult<Vec<Expense>> {
        let query =
            expenses::Entity::find().filter(expenses::Column::GroupId.eq(group.into_inner()));
        let models = Self::newest_first(query)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        headers(models)
    }

    async fn list_friend_expenses(&self, pair: FriendPair) -> StoreResult<Vec<Expense>> {
        let query = expenses::Entity::find()
            .filter(expenses::Column::Kind.eq(LedgerKind::Friend.as_str()))
            .filter(expenses::Column::FriendLowId.eq(pair.low().into_inner()))
            .filter(expenses::Column::FriendHighId.eq(pair.high().into_inner()));
        let models = Self::newest_first(query)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        headers(models)
    }

    async fn search_expenses(&self, query: &ExpenseQuery) -> StoreResult<(Vec<Expense>, u64)> {
        let filtered = expenses::Entity::find().filter(Self::search_condition(query));

        let total = filtered.clone().count(&self.db).await.map_err(db_error)?;
        let models = Self::newest_first(filtered)
            .offset(query.page.offset())
            .limit(query.page.limit())
            .all(&self.db)
            .await
            .map_err(db_error)?;

        Ok((headers(models)?, total))
    }

    async fn group_lines(&self, group: GroupId) -> StoreResult<Vec<LedgerLine>> {
        let payments = expense_payments::Entity::find()
            .inner_join(expenses::Entity)
            .filter(expenses::Column::GroupId.eq(group.into_inner()))
            .all(&self.db)
            .await
            .map_err(db_error)?;
        let splits = expense_splits::Entity::find()
            .inner_join(expenses::Entity)
            .filter(expenses::Column::GroupId.eq(group.into_inner()))
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let mut lines = Vec::with_capacity(payments.len() + splits.len());
        for payment in payments {
            lines.push(LedgerLine {
                group_id: Some(group),
                participant: participant(payment.user_id, payment.pending_user_id, "payment")?,
                side: LineSide::Paid,
                amount: payment.amount,
            });
        }
        for split in splits {
            lines.push(LedgerLine {
                group_id: Some(group),
                participant: participant(split.user_id, split.pending_user_id, "split")?,
                side: LineSide::Owed,
                amount: split.amount_owed,
            });
        }
        Ok(lines)
    }

    async fn user_lines(&self, user: UserId) -> StoreResult<Vec<LedgerLine>> {
        let payments = expense_payments::Entity::find()
            .find_also_related(expenses::Entity)
            .filter(expense_payments::Column::UserId.eq(user.into_inner()))
            .filter(expenses::Column::GroupId.is_not_null())
            .all(&self.db)
            .await
            .map_err(db_error)?;
        let splits = expense_splits::Entity::find()
            .find_also_related(expenses::Entity)
            .filter(expense_splits::Column::UserId.eq(user.into_inner()))
            .filter(expenses::Column::GroupId.is_not_null())
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let owner = |header: Option<expenses::Model>| {
            header
                .and_then(|h| h.group_id)
                .map(GroupId::from_uuid)
        };

        let mut lines = Vec::with_capacity(payments.len() + splits.len());
        for (payment, header) in payments {
            lines.push(LedgerLine {
                group_id: owner(header),
                participant: user.into(),
                side: LineSide::Paid,
                amount: payment.amount,
            });
        }
        for (split, header) in splits {
            lines.push(LedgerLine {
                group_id: owner(header),
                participant: user.into(),
                side: LineSide::Owed,
                amount: split.amount_owed,
            });
        }
        Ok(lines)
    }
}
