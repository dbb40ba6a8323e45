//! Expense ledger.
//!
//! This module implements the money-moving core:
//! - Domain types for expenses, payments and splits
//! - The validation pipeline (amount, lines, title)
//! - The split calculator
//! - The persistence port
//! - The expense service for group and friend expenses

pub mod error;
pub mod friend;
pub mod service;
pub mod split;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod split_props;
#[cfg(test)]
mod validation_props;

pub use error::LedgerError;
pub use service::ExpenseService;
pub use split::SplitCalculator;
pub use store::ExpenseStore;
pub use types::{
    CreateExpenseInput, CreateFriendExpenseInput, Expense, ExpenseChanges, ExpenseQuery,
    ExpenseSearch, ExpenseWithLines, FriendPair, LedgerKind, LedgerLine, LedgerScope, LineSide,
    NewExpense, NewPayment, NewSplit, Payment, PaymentInput, Split, SplitInput, SplitType,
    UpdateExpenseInput,
};
