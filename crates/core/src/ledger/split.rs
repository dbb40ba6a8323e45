//! Split calculator.
//!
//! Produces split lines whose amounts always add up exactly to the total.
//! Each line is truncated to cents and the last participant absorbs whatever
//! truncation left over, so no line goes negative. The ledger does not
//! require callers to use this; it only checks sums.

use rust_decimal::{Decimal, RoundingStrategy};
use splitledger_shared::types::ParticipantRef;

use super::error::LedgerError;
use super::types::{NewSplit, SplitType};

const CENT_PLACES: u32 = 2;

/// Split calculation helpers.
pub struct SplitCalculator;

impl SplitCalculator {
    /// Divides `total` evenly.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidBreakdown` when there are no participants.
    pub fn equal(total: Decimal, participants: &[ParticipantRef]) -> Result<Vec<NewSplit>, LedgerError> {
        if participants.is_empty() {
            return Err(LedgerError::InvalidBreakdown("no participants".into()));
        }

        let count = Decimal::from(participants.len());
        let each = truncate_cents(total / count);
        let weighted: Vec<_> = participants.iter().map(|p| (*p, each, None)).collect();

        Ok(absorb_remainder(total, weighted, SplitType::Equal))
    }

    /// Splits `total` by percentages that must add up to exactly 100.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidBreakdown` for empty input, negative
    /// percentages, or percentages not summing to 100.
    pub fn percentage(
        total: Decimal,
        percentages: &[(ParticipantRef, Decimal)],
    ) -> Result<Vec<NewSplit>, LedgerError> {
        if percentages.is_empty() {
            return Err(LedgerError::InvalidBreakdown("no participants".into()));
        }
        if percentages.iter().any(|(_, pct)| pct.is_sign_negative()) {
            return Err(LedgerError::InvalidBreakdown("negative percentage".into()));
        }
        let sum: Decimal = percentages.iter().map(|(_, pct)| *pct).sum();
        if sum != Decimal::ONE_HUNDRED {
            return Err(LedgerError::InvalidBreakdown(format!(
                "percentages add up to {sum}, expected 100"
            )));
        }

        let weighted = percentages
            .iter()
            .map(|(p, pct)| (*p, truncate_cents(total * *pct / Decimal::ONE_HUNDRED), Some(*pct)))
            .collect();

        Ok(absorb_remainder(total, weighted, SplitType::Percentage))
    }

    /// Splits `total` proportionally to share counts.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidBreakdown` for empty input or non-positive shares.
    pub fn shares(
        total: Decimal,
        shares: &[(ParticipantRef, Decimal)],
    ) -> Result<Vec<NewSplit>, LedgerError> {
        if shares.is_empty() {
            return Err(LedgerError::InvalidBreakdown("no participants".into()));
        }
        if shares.iter().any(|(_, s)| *s <= Decimal::ZERO) {
            return Err(LedgerError::InvalidBreakdown("shares must be positive".into()));
        }

        let total_shares: Decimal = shares.iter().map(|(_, s)| *s).sum();
        let weighted = shares
            .iter()
            .map(|(p, s)| (*p, truncate_cents(total * *s / total_shares), Some(*s)))
            .collect();

        Ok(absorb_remainder(total, weighted, SplitType::Shares))
    }
}

fn truncate_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CENT_PLACES, RoundingStrategy::ToZero)
}

/// Replaces the last amount so the lines sum to `total` exactly.
fn absorb_remainder(
    total: Decimal,
    mut lines: Vec<(ParticipantRef, Decimal, Option<Decimal>)>,
    split_type: SplitType,
) -> Vec<NewSplit> {
    if let Some((last, head)) = lines.split_last_mut() {
        let allocated: Decimal = head.iter().map(|(_, amount, _)| *amount).sum();
        last.1 = total - allocated;
    }

    lines
        .into_iter()
        .map(|(participant, amount, share_value)| NewSplit {
            participant,
            amount,
            split_type,
            share_value,
        })
        .collect()
}
