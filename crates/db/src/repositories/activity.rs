//! Activity feed writer.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use splitledger_core::StoreResult;
use splitledger_core::activity::{ActivityEntry, ActivitySink};
use uuid::Uuid;

use super::convert::db_error;
use crate::entities::group_activities;

/// Activity repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    db: DatabaseConnection,
}

impl ActivityRepository {
    /// Creates a new activity repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivitySink for ActivityRepository {
    async fn record(&self, entry: ActivityEntry) -> StoreResult<()> {
        group_activities::ActiveModel {
            id: Set(Uuid::now_v7()),
            group_id: Set(entry.group_id.into_inner()),
            user_id: Set(entry.actor.into_inner()),
            action: Set(entry.action.as_str().to_string()),
            entity_type: Set(entry.action.entity_type().to_string()),
            entity_id: Set(entry.entity_id),
            metadata: Set(entry.metadata),
            created_at: Set(entry.occurred_at.into()),
        }
        .insert(&self.db)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}
