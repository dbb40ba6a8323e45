//! Settlement repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Select, Set,
};
use splitledger_core::StoreResult;
use splitledger_core::ledger::{FriendPair, LedgerKind};
use splitledger_core::settlement::{
    NewSettlement, Settlement, SettlementChanges, SettlementStatus, SettlementStore,
};
use splitledger_shared::types::{GroupId, SettlementId, UserId};
use uuid::Uuid;

use super::convert::{
    db_error, now, parse_column, participant, scope_columns, scope_from_columns, utc,
};
use crate::entities::settlements;

/// Settlement repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    db: DatabaseConnection,
}

impl SettlementRepository {
    /// Creates a new settlement repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn list(&self, query: Select<settlements::Entity>) -> StoreResult<Vec<Settlement>> {
        query
            .order_by_desc(settlements::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(settlement_from_model)
            .collect()
    }
}

fn settlement_from_model(model: settlements::Model) -> StoreResult<Settlement> {
    Ok(Settlement {
        id: SettlementId::from_uuid(model.id),
        scope: scope_from_columns(
            &model.kind,
            model.group_id,
            model.friend_low_id,
            model.friend_high_id,
        )?,
        payer: participant(model.payer_user_id, model.payer_pending_id, "settlement payer")?,
        payee: participant(model.payee_user_id, model.payee_pending_id, "settlement payee")?,
        amount: model.amount,
        currency: model.currency.trim().to_string(),
        status: parse_column(&model.status, "settlements.status")?,
        payment_method: model.payment_method,
        transaction_reference: model.transaction_reference,
        notes: model.notes,
        created_by: UserId::from_uuid(model.created_by),
        updated_by: model.updated_by.map(UserId::from_uuid),
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

#[async_trait]
impl SettlementStore for SettlementRepository {
    async fn insert_settlement(&self, settlement: NewSettlement) -> StoreResult<Settlement> {
        let timestamp = now();
        let (kind, group_id, friend_low_id, friend_high_id) = scope_columns(&settlement.scope);
        let (payer_user_id, payer_pending_id) = settlement.payer.into_columns();
        let (payee_user_id, payee_pending_id) = settlement.payee.into_columns();

        let model = settlements::ActiveModel {
            id: Set(Uuid::now_v7()),
            group_id: Set(group_id),
            kind: Set(kind.to_string()),
            friend_low_id: Set(friend_low_id),
            friend_high_id: Set(friend_high_id),
            payer_user_id: Set(payer_user_id),
            payer_pending_id: Set(payer_pending_id),
            payee_user_id: Set(payee_user_id),
            payee_pending_id: Set(payee_pending_id),
            amount: Set(settlement.amount),
            currency: Set(settlement.currency),
            status: Set(settlement.status.as_str().to_string()),
            payment_method: Set(settlement.payment_method),
            transaction_reference: Set(settlement.transaction_reference),
            notes: Set(settlement.notes),
            created_by: Set(settlement.created_by.into_inner()),
            updated_by: Set(None),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await
        .map_err(db_error)?;

        settlement_from_model(model)
    }

    async fn find_settlement(&self, id: SettlementId) -> StoreResult<Option<Settlement>> {
        settlements::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map(settlement_from_model)
            .transpose()
    }

    async fn list_group_settlements(&self, group: GroupId) -> StoreResult<Vec<Settlement>> {
        self.list(
            settlements::Entity::find()
                .filter(settlements::Column::GroupId.eq(group.into_inner())),
        )
        .await
    }

    async fn list_friend_settlements(&self, pair: FriendPair) -> StoreResult<Vec<Settlement>> {
        self.list(
            settlements::Entity::find()
                .filter(settlements::Column::Kind.eq(LedgerKind::Friend.as_str()))
                .filter(settlements::Column::FriendLowId.eq(pair.low().into_inner()))
                .filter(settlements::Column::FriendHighId.eq(pair.high().into_inner())),
        )
        .await
    }

    async fn list_user_settlements(&self, user: UserId) -> StoreResult<Vec<Settlement>> {
        self.list(
            settlements::Entity::find().filter(
                Condition::any()
                    .add(settlements::Column::PayerUserId.eq(user.into_inner()))
                    .add(settlements::Column::PayeeUserId.eq(user.into_inner())),
            ),
        )
        .await
    }

    async fn update_settlement(
        &self,
        id: SettlementId,
        changes: SettlementChanges,
    ) -> StoreResult<Option<Settlement>> {
        let Some(existing) = settlements::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        let (payer_user_id, payer_pending_id) = changes.payer.into_columns();
        let (payee_user_id, payee_pending_id) = changes.payee.into_columns();

        let mut model: settlements::ActiveModel = existing.into();
        model.payer_user_id = Set(payer_user_id);
        model.payer_pending_id = Set(payer_pending_id);
        model.payee_user_id = Set(payee_user_id);
        model.payee_pending_id = Set(payee_pending_id);
        model.amount = Set(changes.amount);
        model.currency = Set(changes.currency);
        model.status = Set(changes.status.as_str().to_string());
        model.payment_method = Set(changes.payment_method);
        model.transaction_reference = Set(changes.transaction_reference);
        model.notes = Set(changes.notes);
        model.updated_by = Set(Some(changes.updated_by.into_inner()));
        model.updated_at = Set(now());

        let updated = model.update(&self.db).await.map_err(db_error)?;
        settlement_from_model(updated).map(Some)
    }

    async fn set_settlement_status(
        &self,
        id: SettlementId,
        status: SettlementStatus,
        updated_by: UserId,
    ) -> StoreResult<Option<Settlement>> {
        let Some(existing) = settlements::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        let mut model: settlements::ActiveModel = existing.into();
        model.status = Set(status.as_str().to_string());
        model.updated_by = Set(Some(updated_by.into_inner()));
        model.updated_at = Set(now());

        let updated = model.update(&self.db).await.map_err(db_error)?;
        settlement_from_model(updated).map(Some)
    }

    async fn delete_settlement(&self, id: SettlementId) -> StoreResult<bool> {
        let result = settlements::Entity::delete_by_id(id.into_inner())
            .exec(&self.db)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected > 0)
    }
}
