//! Expense service.
//!
//! Runs the validation pipeline, checks access against the directory, hands
//! validated records to the store in a single call, and records activity.
//!
//! Validation order for a group expense:
//! 1. Group exists and the creator is a member
//! 2. Amount parses and is positive
//! 3. Payments are present, each positive, summing to the total
//! 4. Splits are present, each non-negative, summing to the total
//! 5. Title is non-empty
//! 6. Currency resolves (blank means the group's)
//! 7. Category, if given, belongs to the group

use std::sync::Arc;

use serde_json::json;
use splitledger_shared::config::LedgerConfig;
use splitledger_shared::types::money::{format_amount, parse_non_negative_amount};
use splitledger_shared::types::{AmountError, CurrencyCode, ExpenseId, GroupId, PageResponse, UserId};
use tracing::{debug, info};

use super::error::LedgerError;
use super::store::ExpenseStore;
use super::types::{
    CreateExpenseInput, Expense, ExpenseChanges, ExpenseQuery, ExpenseSearch, ExpenseWithLines,
    LedgerScope, NewExpense, UpdateExpenseInput,
};
use super::validation::{normalize_optional, normalize_tags, validate_expense_body};
use crate::access::Access;
use crate::activity::{ActivityAction, ActivityLog, ActivitySink};
use crate::directory::Directory;

/// Expense operations for groups and friend pairs.
pub struct ExpenseService {
    pub(crate) store: Arc<dyn ExpenseStore>,
    pub(crate) access: Access,
    activity: ActivityLog,
    pub(crate) settings: LedgerConfig,
}

impl ExpenseService {
    /// Creates a new expense service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ExpenseStore>,
        directory: Arc<dyn Directory>,
        activity: Arc<dyn ActivitySink>,
        settings: LedgerConfig,
    ) -> Self {
        Self {
            store,
            access: Access::new(directory),
            activity: ActivityLog::new(activity),
            settings,
        }
    }

    /// Validates a group expense without persisting it.
    ///
    /// Used directly by the recurring scheduler so that generation can commit
    /// the expense and the template advance together.
    pub async fn prepare_group_expense(
        &self,
        input: &CreateExpenseInput,
    ) -> Result<NewExpense, LedgerError> {
        let group = self
            .access
            .require_group_member(input.group_id, input.created_by)
            .await?;

        let (lines, title) =
            validate_expense_body(&input.amount, &input.payments, &input.splits, &input.title)?;
        let currency = resolve_currency(input.currency.as_deref(), &group.currency)?;
        self.access.check_category(group.id, input.category_id).await?;

        Ok(NewExpense {
            scope: LedgerScope::Group { group_id: group.id },
            title,
            notes: normalize_optional(input.notes.as_deref()),
            amount: lines.amount,
            currency,
            date: input.date,
            category_id: input.category_id,
            tags: normalize_tags(&input.tags),
            created_by: input.created_by,
            payments: lines.payments,
            splits: lines.splits,
        })
    }

    /// Creates a group expense with its payments and splits.
    ///
    /// # Errors
    ///
    /// Returns a validation, authorization or not-found error before any
    /// write, or a store error if the transaction failed.
    pub async fn create_expense(
        &self,
        input: CreateExpenseInput,
    ) -> Result<ExpenseWithLines, LedgerError> {
        let expense = self.prepare_group_expense(&input).await?;
        let created = self.store.insert_expense(expense).await?;

        info!(
            expense_id = %created.expense.id,
            group_id = %input.group_id,
            amount = %created.expense.amount,
            "expense created"
        );
        self.log_expense_created(&created, input.created_by).await;

        Ok(created)
    }

    /// Replaces an expense's values and lines.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseNotFound`, an access error, or a validation error
    /// before any write. Nothing is partially applied.
    pub async fn update_expense(
        &self,
        input: UpdateExpenseInput,
    ) -> Result<ExpenseWithLines, LedgerError> {
        let before = self.load_authorized(input.expense_id, input.updated_by).await?;

        let (lines, title) =
            validate_expense_body(&input.amount, &input.payments, &input.splits, &input.title)?;
        let currency = resolve_currency(input.currency.as_deref(), &before.expense.currency)?;

        let category_id = match before.expense.scope {
            LedgerScope::Group { group_id } => {
                self.access.check_category(group_id, input.category_id).await?;
                input.category_id
            }
            LedgerScope::Friend { pair } => {
                super::friend::check_pair_participants(pair, &lines.payments, &lines.splits)?;
                None
            }
        };

        let changes = ExpenseChanges {
            title,
            notes: normalize_optional(input.notes.as_deref()),
            amount: lines.amount,
            currency,
            date: input.date,
            category_id,
            tags: normalize_tags(&input.tags),
            updated_by: input.updated_by,
            payments: lines.payments,
            splits: lines.splits,
        };

        let after = self
            .store
            .replace_expense(input.expense_id, changes)
            .await?
            .ok_or(LedgerError::ExpenseNotFound(input.expense_id))?;

        info!(expense_id = %input.expense_id, "expense updated");

        if let Some(group_id) = after.expense.scope.group_id() {
            let mut metadata = expense_metadata(&after);
            metadata["before"] = expense_metadata(&before);
            metadata["after"] = expense_metadata(&after);
            self.activity
                .log(
                    group_id,
                    input.updated_by,
                    ActivityAction::ExpenseUpdated,
                    after.expense.id,
                    metadata,
                )
                .await;
        }

        Ok(after)
    }

    /// Deletes an expense and its lines.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseNotFound` or an access error.
    pub async fn delete_expense(&self, id: ExpenseId, requester: UserId) -> Result<(), LedgerError> {
        let existing = self.load_authorized(id, requester).await?;

        if !self.store.delete_expense(id).await? {
            return Err(LedgerError::ExpenseNotFound(id));
        }

        info!(expense_id = %id, "expense deleted");

        if let Some(group_id) = existing.expense.scope.group_id() {
            self.activity
                .log(
                    group_id,
                    requester,
                    ActivityAction::ExpenseDeleted,
                    id,
                    expense_metadata(&existing),
                )
                .await;
        }

        Ok(())
    }

    /// Loads one expense with its lines.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseNotFound` or an access error.
    pub async fn get_expense(
        &self,
        id: ExpenseId,
        requester: UserId,
    ) -> Result<ExpenseWithLines, LedgerError> {
        self.load_authorized(id, requester).await
    }

    /// Lists a group's expenses.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` or `NotGroupMember`.
    pub async fn list_by_group(
        &self,
        group_id: GroupId,
        requester: UserId,
    ) -> Result<Vec<Expense>, LedgerError> {
        self.access.require_group_member(group_id, requester).await?;

        Ok(self.store.list_group_expenses(group_id).await?)
    }

    /// Searches a group's expenses.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound`, `NotGroupMember`, `InvalidAmount` for a
    /// malformed amount bound, or `InvalidSearchRange` for inverted bounds.
    pub async fn search_expenses(
        &self,
        group_id: GroupId,
        search: ExpenseSearch,
        requester: UserId,
    ) -> Result<PageResponse<Expense>, LedgerError> {
        self.access.require_group_member(group_id, requester).await?;

        let min_amount = parse_bound(search.min_amount.as_deref())?;
        let max_amount = parse_bound(search.max_amount.as_deref())?;
        if let (Some(min), Some(max)) = (min_amount, max_amount)
            && min > max
        {
            return Err(LedgerError::InvalidSearchRange(format!(
                "min_amount {min} is greater than max_amount {max}"
            )));
        }
        if let (Some(from), Some(to)) = (search.date_from, search.date_to)
            && from > to
        {
            return Err(LedgerError::InvalidSearchRange(format!(
                "date_from {from} is after date_to {to}"
            )));
        }

        let query = ExpenseQuery {
            group_id,
            text: normalize_optional(search.text.as_deref()).map(|t| t.to_lowercase()),
            category_id: search.category_id,
            min_amount,
            max_amount,
            date_from: search.date_from,
            date_to: search.date_to,
            payer: search.payer,
            ower: search.ower,
            created_by: search.created_by,
            page: search
                .page
                .clamped(self.settings.search_default_limit, self.settings.search_max_limit),
        };

        let (rows, total) = self.store.search_expenses(&query).await?;
        debug!(group_id = %group_id, total, "expense search");

        Ok(PageResponse::new(rows, query.page, total))
    }

    async fn load_authorized(
        &self,
        id: ExpenseId,
        requester: UserId,
    ) -> Result<ExpenseWithLines, LedgerError> {
        let expense = self
            .store
            .find_expense(id)
            .await?
            .ok_or(LedgerError::ExpenseNotFound(id))?;
        self.access
            .authorize_scope(&expense.expense.scope, requester)
            .await?;
        Ok(expense)
    }

    pub(crate) async fn log_expense_created(&self, created: &ExpenseWithLines, actor: UserId) {
        if let Some(group_id) = created.expense.scope.group_id() {
            self.activity
                .log(
                    group_id,
                    actor,
                    ActivityAction::ExpenseCreated,
                    created.expense.id,
                    expense_metadata(created),
                )
                .await;
        }
    }
}

/// Resolves a caller-supplied currency against a fallback code.
pub(crate) fn resolve_currency(input: Option<&str>, fallback: &str) -> Result<String, LedgerError> {
    let fallback = CurrencyCode::parse(fallback).map_err(currency_error)?;
    CurrencyCode::resolve(input, &fallback)
        .map(String::from)
        .map_err(currency_error)
}

fn currency_error(err: AmountError) -> LedgerError {
    match err {
        AmountError::InvalidCurrency(code) => LedgerError::InvalidCurrency(code),
        other => LedgerError::InvalidCurrency(other.to_string()),
    }
}

fn parse_bound(raw: Option<&str>) -> Result<Option<rust_decimal::Decimal>, LedgerError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_non_negative_amount(value)
            .map(Some)
            .map_err(LedgerError::InvalidAmount),
    }
}

/// Activity metadata for an expense: summary, split type and lines.
pub(crate) fn expense_metadata(expense: &ExpenseWithLines) -> serde_json::Value {
    let split_type = expense
        .splits
        .first()
        .map_or("equal", |s| s.split_type.as_str());

    json!({
        "summary": {
            "title": expense.expense.title,
            "amount": format_amount(expense.expense.amount),
            "currency_code": expense.expense.currency,
        },
        "split_type": split_type,
        "payments": expense.payments.iter().map(|p| json!({
            "participant": p.participant.to_string(),
            "amount": format_amount(p.amount),
        })).collect::<Vec<_>>(),
        "splits": expense.splits.iter().map(|s| json!({
            "participant": s.participant.to_string(),
            "amount_owed": format_amount(s.amount),
        })).collect::<Vec<_>>(),
    })
}
