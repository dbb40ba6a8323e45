//! Balance queries over the expense ledger.

use std::sync::Arc;

use splitledger_shared::types::{GroupId, ParticipantRef, UserId};
use tracing::debug;

use super::aggregate::{GroupBalance, ParticipantBalance, aggregate_balances, totals_by_group};
use super::simplify::{Transfer, simplify_debts};
use crate::access::Access;
use crate::directory::Directory;
use crate::ledger::{ExpenseStore, LedgerError};

/// Read-only balance and settlement-plan queries.
pub struct BalanceService {
    expenses: Arc<dyn ExpenseStore>,
    access: Access,
}

impl BalanceService {
    /// Creates a new balance service.
    #[must_use]
    pub fn new(expenses: Arc<dyn ExpenseStore>, directory: Arc<dyn Directory>) -> Self {
        Self {
            expenses,
            access: Access::new(directory),
        }
    }

    /// Balances of every participant with lines in the group.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` or `NotGroupMember`.
    pub async fn group_balances(
        &self,
        group_id: GroupId,
        requester: UserId,
    ) -> Result<Vec<ParticipantBalance>, LedgerError> {
        self.access.require_group_member(group_id, requester).await?;
        let lines = self.expenses.group_lines(group_id).await?;
        Ok(aggregate_balances(&lines))
    }

    /// One user's balance inside a group. Zero if they have no lines.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` or `NotGroupMember`.
    pub async fn user_group_balance(
        &self,
        group_id: GroupId,
        user: UserId,
        requester: UserId,
    ) -> Result<ParticipantBalance, LedgerError> {
        let participant = ParticipantRef::User(user);
        let balances = self.group_balances(group_id, requester).await?;

        Ok(balances
            .into_iter()
            .find(|b| b.participant == participant)
            .unwrap_or(ParticipantBalance {
                participant,
                total_paid: rust_decimal::Decimal::ZERO,
                total_owed: rust_decimal::Decimal::ZERO,
                balance: rust_decimal::Decimal::ZERO,
            }))
    }

    /// The user's balance in every group they have lines in.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn user_balances(&self, user: UserId) -> Result<Vec<GroupBalance>, LedgerError> {
        let lines = self.expenses.user_lines(user).await?;
        let mut result = Vec::new();

        for (group_id, (total_paid, total_owed)) in totals_by_group(&lines) {
            let Some(group) = self.access.directory().group(group_id).await? else {
                continue;
            };
            result.push(GroupBalance {
                group_id,
                group_name: group.name,
                currency: group.currency,
                total_paid,
                total_owed,
                balance: total_paid - total_owed,
            });
        }

        Ok(result)
    }

    /// Greedy settlement plan for the group.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` or `NotGroupMember`.
    pub async fn simplified_debts(
        &self,
        group_id: GroupId,
        requester: UserId,
    ) -> Result<Vec<Transfer>, LedgerError> {
        let balances: Vec<_> = self
            .group_balances(group_id, requester)
            .await?
            .into_iter()
            .filter(|b| !b.balance.is_zero())
            .map(|b| (b.participant, b.balance))
            .collect();

        let transfers = simplify_debts(&balances);
        debug!(group_id = %group_id, transfers = transfers.len(), "simplified debts");
        Ok(transfers)
    }
}
