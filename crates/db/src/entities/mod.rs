//! `SeaORM` entity definitions, one module per table.

pub mod expense_categories;
pub mod expense_payments;
pub mod expense_splits;
pub mod expenses;
pub mod friendships;
pub mod group_activities;
pub mod group_invitations;
pub mod group_members;
pub mod groups;
pub mod pending_users;
pub mod recurring_expense_payments;
pub mod recurring_expense_splits;
pub mod recurring_expenses;
pub mod settlements;
pub mod users;
