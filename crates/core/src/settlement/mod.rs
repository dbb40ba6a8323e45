//! Settlements: out-of-band debt payments between two participants.

pub mod service;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use service::SettlementService;
pub use store::SettlementStore;
pub use types::{
    CreateFriendSettlementInput, CreateSettlementInput, NewSettlement, Settlement,
    SettlementChanges, SettlementStatus, UpdateSettlementInput,
};
