//! Core business logic for Splitledger.
//!
//! This crate contains the ledger and settlement engine with ZERO web or
//! database dependencies. Storage and the social graph are reached through
//! the port traits in each module.
//!
//! # Modules
//!
//! - `ledger` - Expenses with payment and split lines, friend expenses, search
//! - `settlement` - Out-of-band debt payments
//! - `identity` - Invitations and placeholder-participant merge
//! - `balance` - Balance aggregation and debt simplification
//! - `recurring` - Recurring templates and batch generation

mod access;
pub mod activity;
pub mod balance;
pub mod directory;
pub mod identity;
pub mod ledger;
pub mod recurring;
pub mod settlement;
pub mod store;

#[cfg(test)]
mod testing;

pub use store::{StoreError, StoreResult};
