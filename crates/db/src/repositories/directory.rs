//! Read-only lookups into groups, memberships, friendships and categories.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use splitledger_core::StoreResult;
use splitledger_core::directory::{
    CategoryInfo, Directory, FriendshipStatus, GroupInfo, Membership,
};
use splitledger_core::ledger::FriendPair;
use splitledger_shared::types::{CategoryId, GroupId, UserId};

use super::convert::{db_error, parse_column};
use crate::entities::{expense_categories, friendships, group_members, groups};

/// Directory repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    db: DatabaseConnection,
}

impl DirectoryRepository {
    /// Creates a new directory repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Directory for DirectoryRepository {
    async fn group(&self, id: GroupId) -> StoreResult<Option<GroupInfo>> {
        let group = groups::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(group.map(|g| GroupInfo {
            id: GroupId::from_uuid(g.id),
            name: g.name,
            currency: g.currency.trim().to_string(),
        }))
    }

    async fn membership(&self, group: GroupId, user: UserId) -> StoreResult<Option<Membership>> {
        let Some(row) = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group.into_inner()))
            .filter(group_members::Column::UserId.eq(user.into_inner()))
            .filter(group_members::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        Ok(Some(Membership {
            group_id: group,
            user_id: user,
            role: parse_column(&row.role, "group_members.role")?,
        }))
    }

    async fn friendship(&self, pair: FriendPair) -> StoreResult<Option<FriendshipStatus>> {
        let Some(row) = friendships::Entity::find()
            .filter(friendships::Column::UserLowId.eq(pair.low().into_inner()))
            .filter(friendships::Column::UserHighId.eq(pair.high().into_inner()))
            .one(&self.db)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        parse_column(&row.status, "friendships.status").map(Some)
    }

    async fn category(&self, id: CategoryId) -> StoreResult<Option<CategoryInfo>> {
        let category = expense_categories::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(category.map(|c| CategoryInfo {
            id: CategoryId::from_uuid(c.id),
            group_id: GroupId::from_uuid(c.group_id),
            name: c.name,
        }))
    }
}
