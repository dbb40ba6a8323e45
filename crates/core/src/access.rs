//! Membership and friendship gates shared by the ledger services.

use std::sync::Arc;

use splitledger_shared::types::{CategoryId, GroupId, UserId};

use crate::directory::{Directory, FriendshipStatus, GroupInfo};
use crate::ledger::{FriendPair, LedgerError, LedgerScope};

#[derive(Clone)]
pub(crate) struct Access {
    directory: Arc<dyn Directory>,
}

impl Access {
    pub(crate) fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    pub(crate) fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    pub(crate) async fn require_group(&self, id: GroupId) -> Result<GroupInfo, LedgerError> {
        self.directory
            .group(id)
            .await?
            .ok_or(LedgerError::GroupNotFound(id))
    }

    pub(crate) async fn is_member(&self, group_id: GroupId, user: UserId) -> Result<bool, LedgerError> {
        Ok(self.directory.membership(group_id, user).await?.is_some())
    }

    pub(crate) async fn require_member(
        &self,
        group_id: GroupId,
        user: UserId,
    ) -> Result<(), LedgerError> {
        if self.is_member(group_id, user).await? {
            Ok(())
        } else {
            Err(LedgerError::NotGroupMember(group_id))
        }
    }

    /// Group must exist and `user` must belong to it.
    pub(crate) async fn require_group_member(
        &self,
        group_id: GroupId,
        user: UserId,
    ) -> Result<GroupInfo, LedgerError> {
        let group = self.require_group(group_id).await?;
        self.require_member(group.id, user).await?;
        Ok(group)
    }

    pub(crate) async fn require_friendship(&self, pair: FriendPair) -> Result<(), LedgerError> {
        if pair.is_degenerate() {
            return Err(LedgerError::NotFriends);
        }
        match self.directory.friendship(pair).await? {
            Some(FriendshipStatus::Accepted) => Ok(()),
            _ => Err(LedgerError::NotFriends),
        }
    }

    /// Checks that `requester` may see or change a record in `scope`.
    pub(crate) async fn authorize_scope(
        &self,
        scope: &LedgerScope,
        requester: UserId,
    ) -> Result<(), LedgerError> {
        match scope {
            LedgerScope::Group { group_id } => self.require_member(*group_id, requester).await,
            LedgerScope::Friend { pair } => {
                if !pair.contains(requester) {
                    return Err(LedgerError::NotFriends);
                }
                self.require_friendship(*pair).await
            }
        }
    }

    pub(crate) async fn check_category(
        &self,
        group_id: GroupId,
        category_id: Option<CategoryId>,
    ) -> Result<(), LedgerError> {
        let Some(category_id) = category_id else {
            return Ok(());
        };
        match self.directory.category(category_id).await? {
            Some(category) if category.group_id == group_id => Ok(()),
            _ => Err(LedgerError::CategoryNotFound(category_id)),
        }
    }
}
