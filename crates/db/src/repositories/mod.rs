//! Repository implementations of the core storage ports.
//!
//! Each repository owns a `DatabaseConnection` and maps `DbErr` into
//! `StoreError` before anything leaves this crate. Multi-row writes run in a
//! single database transaction.

mod convert;

pub mod account;
pub mod activity;
pub mod directory;
pub mod expense;
pub mod identity;
pub mod recurring;
pub mod settlement;

pub use account::AccountRepository;
pub use activity::ActivityRepository;
pub use directory::DirectoryRepository;
pub use expense::ExpenseRepository;
pub use identity::IdentityRepository;
pub use recurring::RecurringRepository;
pub use settlement::SettlementRepository;
