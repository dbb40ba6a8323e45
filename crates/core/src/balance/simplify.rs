//! Greedy debt simplification.
//!
//! Debtors are sorted ascending (most negative first) and creditors
//! descending (most positive first); ties keep their input order. The current
//! debtor pays the current creditor `min(|debt|, credit)` and whichever side
//! reaches zero is advanced past.
//!
//! This is a heuristic. It is stable and deterministic for a fixed input but
//! does not always find the globally smallest number of transfers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use splitledger_shared::types::ParticipantRef;

/// One payment in a settlement plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Who pays.
    pub from: ParticipantRef,
    /// Who receives.
    pub to: ParticipantRef,
    /// Always > 0.
    pub amount: Decimal,
}

/// Computes a transfer plan that zeroes the given net balances.
#[must_use]
pub fn simplify_debts(balances: &[(ParticipantRef, Decimal)]) -> Vec<Transfer> {
    let mut debtors: Vec<(ParticipantRef, Decimal)> = balances
        .iter()
        .filter(|(_, b)| *b < Decimal::ZERO)
        .copied()
        .collect();
    let mut creditors: Vec<(ParticipantRef, Decimal)> = balances
        .iter()
        .filter(|(_, b)| *b > Decimal::ZERO)
        .copied()
        .collect();

    debtors.sort_by(|a, b| a.1.cmp(&b.1));
    creditors.sort_by(|a, b| b.1.cmp(&a.1));

    let mut transfers = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < debtors.len() && j < creditors.len() {
        let owed = -debtors[i].1;
        let due = creditors[j].1;
        let amount = owed.min(due);

        if debtors[i].0 != creditors[j].0 {
            transfers.push(Transfer {
                from: debtors[i].0,
                to: creditors[j].0,
                amount,
            });
        }

        debtors[i].1 += amount;
        creditors[j].1 -= amount;

        if debtors[i].1.is_zero() {
            i += 1;
        }
        if creditors[j].1.is_zero() {
            j += 1;
        }
    }

    transfers
}
