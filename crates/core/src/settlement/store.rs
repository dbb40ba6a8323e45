//! Persistence port for settlements.

use async_trait::async_trait;
use splitledger_shared::types::{GroupId, SettlementId, UserId};

use super::types::{NewSettlement, Settlement, SettlementChanges, SettlementStatus};
use crate::ledger::FriendPair;
use crate::store::StoreResult;

/// Storage for settlements.
#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Inserts a settlement.
    async fn insert_settlement(&self, settlement: NewSettlement) -> StoreResult<Settlement>;

    /// Loads a settlement.
    async fn find_settlement(&self, id: SettlementId) -> StoreResult<Option<Settlement>>;

    /// Lists a group's settlements, newest first.
    async fn list_group_settlements(&self, group: GroupId) -> StoreResult<Vec<Settlement>>;

    /// Lists settlements between two friends, newest first.
    async fn list_friend_settlements(&self, pair: FriendPair) -> StoreResult<Vec<Settlement>>;

    /// Lists settlements where `user` is payer or payee, newest first.
    async fn list_user_settlements(&self, user: UserId) -> StoreResult<Vec<Settlement>>;

    /// Replaces a settlement's values. Returns `None` if it no longer exists.
    async fn update_settlement(
        &self,
        id: SettlementId,
        changes: SettlementChanges,
    ) -> StoreResult<Option<Settlement>>;

    /// Moves a settlement to a new status. Returns `None` if it no longer exists.
    async fn set_settlement_status(
        &self,
        id: SettlementId,
        status: SettlementStatus,
        updated_by: UserId,
    ) -> StoreResult<Option<Settlement>>;

    /// Deletes a settlement. Returns `false` if it did not exist.
    async fn delete_settlement(&self, id: SettlementId) -> StoreResult<bool>;
}
