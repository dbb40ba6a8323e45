//! Friend expenses: two-party records with no group.
//!
//! Same invariants as group expenses. Every line must name one of the two
//! friends, and every access requires an accepted friendship.

use splitledger_shared::types::UserId;
use tracing::info;

use super::error::LedgerError;
use super::service::{ExpenseService, resolve_currency};
use super::types::{
    CreateFriendExpenseInput, Expense, ExpenseWithLines, FriendPair, LedgerScope, NewExpense,
    NewPayment, NewSplit,
};
use super::validation::{normalize_optional, normalize_tags, validate_expense_body};

/// Rejects any line whose participant is not one of the two friends.
pub(crate) fn check_pair_participants(
    pair: FriendPair,
    payments: &[NewPayment],
    splits: &[NewSplit],
) -> Result<(), LedgerError> {
    let outsider = payments
        .iter()
        .map(|p| p.participant)
        .chain(splits.iter().map(|s| s.participant))
        .find(|participant| !pair.admits(participant));

    match outsider {
        Some(participant) => Err(LedgerError::ParticipantOutsideFriendship(participant)),
        None => Ok(()),
    }
}

impl ExpenseService {
    /// Creates an expense between the creator and one friend.
    ///
    /// # Errors
    ///
    /// Returns `NotFriends` without an accepted friendship, a validation
    /// error, or `ParticipantOutsideFriendship` when a line names anyone else.
    pub async fn create_friend_expense(
        &self,
        input: CreateFriendExpenseInput,
    ) -> Result<ExpenseWithLines, LedgerError> {
        let pair = FriendPair::new(input.created_by, input.friend_id);
        self.access.require_friendship(pair).await?;

        let (lines, title) =
            validate_expense_body(&input.amount, &input.payments, &input.splits, &input.title)?;
        check_pair_participants(pair, &lines.payments, &lines.splits)?;
        let currency = resolve_currency(input.currency.as_deref(), &self.settings.friend_currency)?;

        let expense = NewExpense {
            scope: LedgerScope::Friend { pair },
            title,
            notes: normalize_optional(input.notes.as_deref()),
            amount: lines.amount,
            currency,
            date: input.date,
            category_id: None,
            tags: normalize_tags(&input.tags),
            created_by: input.created_by,
            payments: lines.payments,
            splits: lines.splits,
        };

        let created = self.store.insert_expense(expense).await?;
        info!(expense_id = %created.expense.id, "friend expense created");

        Ok(created)
    }

    /// Lists the expenses shared between `user` and `friend`.
    ///
    /// # Errors
    ///
    /// Returns `NotFriends` without an accepted friendship.
    pub async fn list_friend_expenses(
        &self,
        user: UserId,
        friend: UserId,
    ) -> Result<Vec<Expense>, LedgerError> {
        let pair = FriendPair::new(user, friend);
        self.access.require_friendship(pair).await?;

        Ok(self.store.list_friend_expenses(pair).await?)
    }
}
