//! Balance aggregation and debt simplification.
//!
//! Balances are `total paid - total owed` per participant, computed from
//! payment and split lines only. Pending participants are reported under
//! their placeholder reference.

pub mod aggregate;
pub mod service;
pub mod simplify;

#[cfg(test)]
mod simplify_props;

pub use aggregate::{GroupBalance, ParticipantBalance, aggregate_balances};
pub use service::BalanceService;
pub use simplify::{Transfer, simplify_debts};
