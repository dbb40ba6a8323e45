//! Per-participant aggregation of ledger lines.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use splitledger_shared::types::{GroupId, ParticipantRef};

use crate::ledger::{LedgerLine, LineSide};

/// Net position of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantBalance {
    /// The participant (registered or pending).
    pub participant: ParticipantRef,
    /// Sum of payments.
    pub total_paid: Decimal,
    /// Sum of splits.
    pub total_owed: Decimal,
    /// `total_paid - total_owed`. Negative means net debtor.
    pub balance: Decimal,
}

/// A user's net position inside one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBalance {
    /// Group ID.
    pub group_id: GroupId,
    /// Group display name.
    pub group_name: String,
    /// Group currency.
    pub currency: String,
    /// Sum of payments.
    pub total_paid: Decimal,
    /// Sum of splits.
    pub total_owed: Decimal,
    /// `total_paid - total_owed`.
    pub balance: Decimal,
}

/// Folds lines into one balance per participant, ordered by participant.
#[must_use]
pub fn aggregate_balances(lines: &[LedgerLine]) -> Vec<ParticipantBalance> {
    let mut totals: BTreeMap<ParticipantRef, (Decimal, Decimal)> = BTreeMap::new();

    for line in lines {
        let entry = totals.entry(line.participant).or_default();
        match line.side {
            LineSide::Paid => entry.0 += line.amount,
            LineSide::Owed => entry.1 += line.amount,
        }
    }

    totals
        .into_iter()
        .map(|(participant, (total_paid, total_owed))| ParticipantBalance {
            participant,
            total_paid,
            total_owed,
            balance: total_paid - total_owed,
        })
        .collect()
}

/// Folds lines into per-group totals, ordered by group.
pub(crate) fn totals_by_group(lines: &[LedgerLine]) -> BTreeMap<GroupId, (Decimal, Decimal)> {
    let mut totals: BTreeMap<GroupId, (Decimal, Decimal)> = BTreeMap::new();

    for line in lines {
        let Some(group_id) = line.group_id else {
            continue;
        };
        let entry = totals.entry(group_id).or_default();
        match line.side {
            LineSide::Paid => entry.0 += line.amount,
            LineSide::Owed => entry.1 += line.amount,
        }
    }

    totals
}
