//! Activity log sink.
//!
//! Mutations record what happened for the group feed. Recording is a side
//! effect: a failing sink is logged and otherwise ignored.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use splitledger_shared::types::{GroupId, UserId};
use uuid::Uuid;

use crate::store::StoreResult;

/// Kind of activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// An expense was recorded.
    ExpenseCreated,
    /// An expense was edited.
    ExpenseUpdated,
    /// An expense was removed.
    ExpenseDeleted,
    /// A settlement was recorded.
    SettlementCreated,
    /// A settlement was edited.
    SettlementUpdated,
    /// A settlement moved to a new status.
    SettlementStatusUpdated,
    /// A settlement was marked completed.
    SettlementCompleted,
    /// A settlement was removed.
    SettlementDeleted,
}

impl ActivityAction {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExpenseCreated => "expense_created",
            Self::ExpenseUpdated => "expense_updated",
            Self::ExpenseDeleted => "expense_deleted",
            Self::SettlementCreated => "settlement_created",
            Self::SettlementUpdated => "settlement_updated",
            Self::SettlementStatusUpdated => "settlement_status_updated",
            Self::SettlementCompleted => "settlement_completed",
            Self::SettlementDeleted => "settlement_deleted",
        }
    }

    /// Returns the kind of entity the action refers to.
    #[must_use]
    pub const fn entity_type(self) -> &'static str {
        match self {
            Self::ExpenseCreated | Self::ExpenseUpdated | Self::ExpenseDeleted => "expense",
            _ => "settlement",
        }
    }
}

/// One activity entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Group the activity belongs to.
    pub group_id: GroupId,
    /// Acting user.
    pub actor: UserId,
    /// What happened.
    pub action: ActivityAction,
    /// ID of the expense or settlement.
    pub entity_id: Uuid,
    /// Free-form details.
    pub metadata: serde_json::Value,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

/// Destination for activity entries.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    /// Persists one entry.
    async fn record(&self, entry: ActivityEntry) -> StoreResult<()>;
}

/// Fire-and-forget front for an [`ActivitySink`].
#[derive(Clone)]
pub(crate) struct ActivityLog {
    sink: Arc<dyn ActivitySink>,
}

impl ActivityLog {
    pub(crate) fn new(sink: Arc<dyn ActivitySink>) -> Self {
        Self { sink }
    }

    /// Records an entry, logging and discarding any failure.
    pub(crate) async fn log(
        &self,
        group_id: GroupId,
        actor: UserId,
        action: ActivityAction,
        entity_id: impl Into<Uuid>,
        metadata: serde_json::Value,
    ) {
        let entity_id = entity_id.into();
        let entry = ActivityEntry {
            group_id,
            actor,
            action,
            entity_id,
            metadata,
            occurred_at: Utc::now(),
        };
        if let Err(err) = self.sink.record(entry).await {
            tracing::warn!(
                action = action.as_str(),
                %entity_id,
                error = %err,
                "failed to record activity"
            );
        }
    }
}
