//! Settlement service.

use std::sync::Arc;

use serde_json::json;
use splitledger_shared::config::LedgerConfig;
use splitledger_shared::types::money::format_amount;
use splitledger_shared::types::{GroupId, ParticipantRef, SettlementId, UserId};
use tracing::info;

use super::store::SettlementStore;
use super::types::{
    CreateFriendSettlementInput, CreateSettlementInput, NewSettlement, Settlement,
    SettlementChanges, SettlementStatus, UpdateSettlementInput,
};
use crate::access::Access;
use crate::activity::{ActivityAction, ActivityLog, ActivitySink};
use crate::directory::Directory;
use crate::ledger::service::resolve_currency;
use crate::ledger::validation::{normalize_optional, validate_total};
use crate::ledger::{FriendPair, LedgerError, LedgerScope};

/// Records and manages settlements.
pub struct SettlementService {
    store: Arc<dyn SettlementStore>,
    access: Access,
    activity: ActivityLog,
    settings: LedgerConfig,
}

impl SettlementService {
    /// Creates a new settlement service.
    #[must_use]
    pub fn new(
        store: Arc<dyn SettlementStore>,
        directory: Arc<dyn Directory>,
        activity: Arc<dyn ActivitySink>,
        settings: LedgerConfig,
    ) -> Self {
        Self {
            store,
            access: Access::new(directory),
            activity: ActivityLog::new(activity),
            settings,
        }
    }

    /// Records a settlement inside a group.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound`, `NotGroupMember`, `InvalidAmount`,
    /// `SamePayerAndPayee`, `ParticipantNotMember`, `InvalidCurrency` or
    /// `InvalidSettlementStatus`.
    pub async fn create_settlement(
        &self,
        input: CreateSettlementInput,
    ) -> Result<Settlement, LedgerError> {
        let group = self
            .access
            .require_group_member(input.group_id, input.created_by)
            .await?;

        let amount = validate_total(&input.amount)?;
        self.check_group_endpoints(group.id, input.payer, input.payee)
            .await?;
        let currency = resolve_currency(input.currency.as_deref(), &group.currency)?;
        let status = SettlementStatus::parse_or_default(input.status.as_deref())
            .map_err(LedgerError::InvalidSettlementStatus)?;

        let created = self
            .store
            .insert_settlement(NewSettlement {
                scope: LedgerScope::Group { group_id: group.id },
                payer: input.payer,
                payee: input.payee,
                amount,
                currency,
                status,
                payment_method: normalize_optional(input.payment_method.as_deref()),
                transaction_reference: normalize_optional(input.transaction_reference.as_deref()),
                notes: normalize_optional(input.notes.as_deref()),
                created_by: input.created_by,
            })
            .await?;

        info!(settlement_id = %created.id, group_id = %group.id, "settlement created");
        self.activity
            .log(
                group.id,
                input.created_by,
                ActivityAction::SettlementCreated,
                created.id,
                settlement_metadata(&created),
            )
            .await;

        Ok(created)
    }

    /// Records a settlement between two friends.
    ///
    /// # Errors
    ///
    /// Returns `NotFriends`, `InvalidAmount`, `SamePayerAndPayee`,
    /// `ParticipantOutsideFriendship`, `InvalidCurrency` or
    /// `InvalidSettlementStatus`.
    pub async fn create_friend_settlement(
        &self,
        input: CreateFriendSettlementInput,
    ) -> Result<Settlement, LedgerError> {
        let pair = FriendPair::new(input.created_by, input.friend_id);
        self.access.require_friendship(pair).await?;

        let amount = validate_total(&input.amount)?;
        let payer = ParticipantRef::User(input.payer);
        let payee = ParticipantRef::User(input.payee);
        check_pair_endpoints(pair, payer, payee)?;
        let currency = resolve_currency(input.currency.as_deref(), &self.settings.friend_currency)?;
        let status = SettlementStatus::parse_or_default(input.status.as_deref())
            .map_err(LedgerError::InvalidSettlementStatus)?;

        let created = self
            .store
            .insert_settlement(NewSettlement {
                scope: LedgerScope::Friend { pair },
                payer,
                payee,
                amount,
                currency,
                status,
                payment_method: normalize_optional(input.payment_method.as_deref()),
                transaction_reference: normalize_optional(input.transaction_reference.as_deref()),
                notes: normalize_optional(input.notes.as_deref()),
                created_by: input.created_by,
            })
            .await?;

        info!(settlement_id = %created.id, "friend settlement created");
        Ok(created)
    }

    /// Loads one settlement.
    ///
    /// # Errors
    ///
    /// Returns `SettlementNotFound` or an access error.
    pub async fn get_settlement(
        &self,
        id: SettlementId,
        requester: UserId,
    ) -> Result<Settlement, LedgerError> {
        self.load_authorized(id, requester).await
    }

    /// Lists a group's settlements.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` or `NotGroupMember`.
    pub async fn list_by_group(
        &self,
        group_id: GroupId,
        requester: UserId,
    ) -> Result<Vec<Settlement>, LedgerError> {
        self.access.require_group_member(group_id, requester).await?;
        Ok(self.store.list_group_settlements(group_id).await?)
    }

    /// Lists settlements between `user` and `friend`.
    ///
    /// # Errors
    ///
    /// Returns `NotFriends`.
    pub async fn list_friend_settlements(
        &self,
        user: UserId,
        friend: UserId,
    ) -> Result<Vec<Settlement>, LedgerError> {
        let pair = FriendPair::new(user, friend);
        self.access.require_friendship(pair).await?;
        Ok(self.store.list_friend_settlements(pair).await?)
    }

    /// Lists every settlement the user pays or receives.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn list_by_user(&self, user: UserId) -> Result<Vec<Settlement>, LedgerError> {
        Ok(self.store.list_user_settlements(user).await?)
    }

    /// Edits a settlement, re-running creation validation on the new values.
    ///
    /// # Errors
    ///
    /// Returns `SettlementNotFound`, an access error, or a validation error.
    pub async fn update_settlement(
        &self,
        input: UpdateSettlementInput,
    ) -> Result<Settlement, LedgerError> {
        let before = self
            .load_authorized(input.settlement_id, input.updated_by)
            .await?;

        let amount = validate_total(&input.amount)?;
        match before.scope {
            LedgerScope::Group { group_id } => {
                self.check_group_endpoints(group_id, input.payer, input.payee)
                    .await?;
            }
            LedgerScope::Friend { pair } => check_pair_endpoints(pair, input.payer, input.payee)?,
        }
        let currency = resolve_currency(input.currency.as_deref(), &before.currency)?;
        let status = match input.status.as_deref().map(str::trim) {
            None | Some("") => before.status,
            Some(raw) => raw.parse().map_err(LedgerError::InvalidSettlementStatus)?,
        };

        let after = self
            .store
            .update_settlement(
                input.settlement_id,
                SettlementChanges {
                    payer: input.payer,
                    payee: input.payee,
                    amount,
                    currency,
                    status,
                    payment_method: normalize_optional(input.payment_method.as_deref()),
                    transaction_reference: normalize_optional(
                        input.transaction_reference.as_deref(),
                    ),
                    notes: normalize_optional(input.notes.as_deref()),
                    updated_by: input.updated_by,
                },
            )
            .await?
            .ok_or(LedgerError::SettlementNotFound(input.settlement_id))?;

        info!(settlement_id = %after.id, "settlement updated");
        if let Some(group_id) = after.scope.group_id() {
            let metadata = json!({
                "summary": settlement_metadata(&after)["summary"].clone(),
                "before": settlement_metadata(&before),
                "after": settlement_metadata(&after),
            });
            self.activity
                .log(
                    group_id,
                    input.updated_by,
                    ActivityAction::SettlementUpdated,
                    after.id,
                    metadata,
                )
                .await;
        }

        Ok(after)
    }

    /// Moves a settlement to a new status.
    ///
    /// # Errors
    ///
    /// Returns `SettlementNotFound`, an access error, or
    /// `InvalidSettlementStatus`.
    pub async fn update_status(
        &self,
        id: SettlementId,
        status: &str,
        requester: UserId,
    ) -> Result<Settlement, LedgerError> {
        let before = self.load_authorized(id, requester).await?;
        let status: SettlementStatus = status.parse().map_err(LedgerError::InvalidSettlementStatus)?;

        let after = self
            .store
            .set_settlement_status(id, status, requester)
            .await?
            .ok_or(LedgerError::SettlementNotFound(id))?;

        info!(settlement_id = %id, from = before.status.as_str(), to = status.as_str(), "settlement status changed");
        if let Some(group_id) = after.scope.group_id() {
            let action = if status == SettlementStatus::Completed {
                ActivityAction::SettlementCompleted
            } else {
                ActivityAction::SettlementStatusUpdated
            };
            let mut metadata = settlement_metadata(&after);
            metadata["previous_status"] = json!(before.status.as_str());
            self.activity
                .log(group_id, requester, action, id, metadata)
                .await;
        }

        Ok(after)
    }

    /// Deletes a settlement.
    ///
    /// # Errors
    ///
    /// Returns `SettlementNotFound` or an access error.
    pub async fn delete_settlement(
        &self,
        id: SettlementId,
        requester: UserId,
    ) -> Result<(), LedgerError> {
        let existing = self.load_authorized(id, requester).await?;

        if !self.store.delete_settlement(id).await? {
            return Err(LedgerError::SettlementNotFound(id));
        }

        info!(settlement_id = %id, "settlement deleted");
        if let Some(group_id) = existing.scope.group_id() {
            self.activity
                .log(
                    group_id,
                    requester,
                    ActivityAction::SettlementDeleted,
                    id,
                    settlement_metadata(&existing),
                )
                .await;
        }

        Ok(())
    }

    async fn load_authorized(
        &self,
        id: SettlementId,
        requester: UserId,
    ) -> Result<Settlement, LedgerError> {
        let settlement = self
            .store
            .find_settlement(id)
            .await?
            .ok_or(LedgerError::SettlementNotFound(id))?;
        self.access
            .authorize_scope(&settlement.scope, requester)
            .await?;
        Ok(settlement)
    }

    /// Payer and payee must differ, and registered endpoints must be members.
    async fn check_group_endpoints(
        &self,
        group_id: GroupId,
        payer: ParticipantRef,
        payee: ParticipantRef,
    ) -> Result<(), LedgerError> {
        if payer == payee {
            return Err(LedgerError::SamePayerAndPayee);
        }
        for endpoint in [payer, payee] {
            if let Some(user) = endpoint.user_id() {
                if !self.access.is_member(group_id, user).await? {
                    return Err(LedgerError::ParticipantNotMember(endpoint));
                }
            }
        }
        Ok(())
    }
}

fn check_pair_endpoints(
    pair: FriendPair,
    payer: ParticipantRef,
    payee: ParticipantRef,
) -> Result<(), LedgerError> {
    if payer == payee {
        return Err(LedgerError::SamePayerAndPayee);
    }
    for endpoint in [payer, payee] {
        if !pair.admits(&endpoint) {
            return Err(LedgerError::ParticipantOutsideFriendship(endpoint));
        }
    }
    Ok(())
}

fn settlement_metadata(settlement: &Settlement) -> serde_json::Value {
    json!({
        "summary": {
            "amount": format_amount(settlement.amount),
            "currency_code": settlement.currency,
            "status": settlement.status.as_str(),
        },
        "payer": settlement.payer.to_string(),
        "payee": settlement.payee.to_string(),
    })
}
