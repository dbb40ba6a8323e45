//! Persistence port for expenses.
//!
//! Every mutating method is one atomic unit: the header and all of its lines
//! are written (or replaced, or removed) together or not at all.

use async_trait::async_trait;
use splitledger_shared::types::{ExpenseId, GroupId, UserId};

use super::types::{
    Expense, ExpenseChanges, ExpenseQuery, ExpenseWithLines, FriendPair, LedgerLine, NewExpense,
};
use crate::store::StoreResult;

/// Storage for expenses and their payment/split lines.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Inserts the expense with all of its lines in one transaction.
    async fn insert_expense(&self, expense: NewExpense) -> StoreResult<ExpenseWithLines>;

    /// Updates the header and replaces every line in one transaction.
    ///
    /// Returns `None` if the expense no longer exists.
    async fn replace_expense(
        &self,
        id: ExpenseId,
        changes: ExpenseChanges,
    ) -> StoreResult<Option<ExpenseWithLines>>;

    /// Deletes the expense and its lines. Returns `false` if it did not exist.
    async fn delete_expense(&self, id: ExpenseId) -> StoreResult<bool>;

    /// Loads an expense with its lines.
    async fn find_expense(&self, id: ExpenseId) -> StoreResult<Option<ExpenseWithLines>>;

    /// Lists a group's expenses, newest first.
    async fn list_group_expenses(&self, group: GroupId) -> StoreResult<Vec<Expense>>;

    /// Lists the friend expenses between two users, newest first.
    async fn list_friend_expenses(&self, pair: FriendPair) -> StoreResult<Vec<Expense>>;

    /// Runs a filtered, paginated search. Returns the page and the total match count.
    async fn search_expenses(&self, query: &ExpenseQuery) -> StoreResult<(Vec<Expense>, u64)>;

    /// Flattens every payment and split of a group's expenses.
    async fn group_lines(&self, group: GroupId) -> StoreResult<Vec<LedgerLine>>;

    /// Flattens every group-scoped payment and split naming `user`.
    async fn user_lines(&self, user: UserId) -> StoreResult<Vec<LedgerLine>>;
}
