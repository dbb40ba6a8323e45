//! Row <-> domain conversions shared by the repositories.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ColumnTrait, DbErr, SqlErr};
use splitledger_core::StoreError;
use splitledger_core::ledger::{FriendPair, LedgerKind, LedgerScope};
use splitledger_shared::types::{GroupId, ParticipantRef, UserId};
use uuid::Uuid;

/// Maps a driver error into the opaque store error.
pub(crate) fn db_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => StoreError::Conflict(msg),
        _ => {
            tracing::error!(error = %err, "database error");
            StoreError::Backend(err.to_string())
        }
    }
}

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

pub(crate) fn utc(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

/// Parses a string column into its domain enum.
pub(crate) fn parse_column<T>(value: &str, column: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|err| StoreError::Corrupt(format!("{column}: {err}")))
}

pub(crate) fn participant(
    user_id: Option<Uuid>,
    pending_id: Option<Uuid>,
    what: &str,
) -> Result<ParticipantRef, StoreError> {
    ParticipantRef::from_columns(user_id, pending_id)
        .ok_or_else(|| StoreError::Corrupt(format!("{what} must reference exactly one participant")))
}

/// Equality on whichever of the two participant columns the reference uses.
pub(crate) fn participant_eq<C: ColumnTrait>(
    user_col: C,
    pending_col: C,
    participant: ParticipantRef,
) -> SimpleExpr {
    match participant {
        ParticipantRef::User(id) => user_col.eq(id.into_inner()),
        ParticipantRef::Pending(id) => pending_col.eq(id.into_inner()),
    }
}

/// Column values for a ledger scope: `(kind, group_id, friend_low_id, friend_high_id)`.
pub(crate) fn scope_columns(
    scope: &LedgerScope,
) -> (&'static str, Option<Uuid>, Option<Uuid>, Option<Uuid>) {
    match scope {
        LedgerScope::Group { group_id } => {
            (LedgerKind::Group.as_str(), Some(group_id.into_inner()), None, None)
        }
        LedgerScope::Friend { pair } => (
            LedgerKind::Friend.as_str(),
            None,
            Some(pair.low().into_inner()),
            Some(pair.high().into_inner()),
        ),
    }
}

pub(crate) fn scope_from_columns(
    kind: &str,
    group_id: Option<Uuid>,
    friend_low_id: Option<Uuid>,
    friend_high_id: Option<Uuid>,
) -> Result<LedgerScope, StoreError> {
    match (kind, group_id, friend_low_id, friend_high_id) {
        ("group", Some(group), None, None) => Ok(LedgerScope::Group {
            group_id: GroupId::from_uuid(group),
        }),
        ("friend", None, Some(low), Some(high)) => Ok(LedgerScope::Friend {
            pair: FriendPair::new(UserId::from_uuid(low), UserId::from_uuid(high)),
        }),
        _ => Err(StoreError::Corrupt(format!(
            "scope columns do not match kind '{kind}'"
        ))),
    }
}

pub(crate) fn tags_to_json(tags: &[String]) -> serde_json::Value {
    serde_json::Value::from(tags.to_vec())
}

pub(crate) fn tags_from_json(value: serde_json::Value) -> Result<Vec<String>, StoreError> {
    serde_json::from_value(value).map_err(|err| StoreError::Corrupt(format!("tags: {err}")))
}

/// Position column value for the `index`-th line.
pub(crate) fn position(index: usize) -> Result<i32, StoreError> {
    i32::try_from(index).map_err(|_| StoreError::Corrupt(format!("too many lines ({index})")))
}
