//! Validation pipeline shared by expense creation, update and recurring templates.
//!
//! Steps run in a fixed order and stop at the first failure:
//! amount, payments, splits, title. Callers perform membership checks before
//! and category checks after.

use rust_decimal::Decimal;
use splitledger_shared::types::money::{
    parse_non_negative_amount, parse_positive_amount,
};

use super::error::LedgerError;
use super::types::{NewPayment, NewSplit, PaymentInput, SplitInput};

/// Parsed amount plus validated lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLines {
    /// Total.
    pub amount: Decimal,
    /// Payment lines, summing to `amount`.
    pub payments: Vec<NewPayment>,
    /// Split lines, summing to `amount`.
    pub splits: Vec<NewSplit>,
}

/// Parses an expense or settlement total; must be > 0.
pub fn validate_total(raw: &str) -> Result<Decimal, LedgerError> {
    parse_positive_amount(raw).map_err(LedgerError::InvalidAmount)
}

/// Validates payment lines against the total.
pub fn validate_payments(
    total: Decimal,
    payments: &[PaymentInput],
) -> Result<Vec<NewPayment>, LedgerError> {
    if payments.is_empty() {
        return Err(LedgerError::NoPayments);
    }

    let validated = payments
        .iter()
        .map(|p| {
            Ok(NewPayment {
                participant: p.participant,
                amount: parse_positive_amount(&p.amount).map_err(LedgerError::InvalidPaymentAmount)?,
                method: normalize_optional(p.method.as_deref()),
            })
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;

    let actual: Decimal = validated.iter().map(|p| p.amount).sum();
    if actual != total {
        return Err(LedgerError::PaymentTotalMismatch {
            expected: total,
            actual,
        });
    }

    Ok(validated)
}

/// Validates split lines against the total.
///
/// The split type and share value are carried through untouched; only the
/// amounts are checked.
pub fn validate_splits(total: Decimal, splits: &[SplitInput]) -> Result<Vec<NewSplit>, LedgerError> {
    if splits.is_empty() {
        return Err(LedgerError::NoSplits);
    }

    let validated = splits
        .iter()
        .map(|s| {
            Ok(NewSplit {
                participant: s.participant,
                amount: parse_non_negative_amount(&s.amount).map_err(LedgerError::InvalidSplitAmount)?,
                split_type: s.split_type,
                share_value: s.share_value,
            })
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;

    let actual: Decimal = validated.iter().map(|s| s.amount).sum();
    if actual != total {
        return Err(LedgerError::SplitTotalMismatch {
            expected: total,
            actual,
        });
    }

    Ok(validated)
}

/// Trims the title and rejects blanks.
pub fn validate_title(raw: &str) -> Result<String, LedgerError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(LedgerError::EmptyTitle);
    }
    Ok(title.to_string())
}

/// Runs amount, payments, splits and title validation in order.
pub fn validate_expense_body(
    amount: &str,
    payments: &[PaymentInput],
    splits: &[SplitInput],
    title: &str,
) -> Result<(ValidatedLines, String), LedgerError> {
    let amount = validate_total(amount)?;
    let payments = validate_payments(amount, payments)?;
    let splits = validate_splits(amount, splits)?;
    let title = validate_title(title)?;

    Ok((
        ValidatedLines {
            amount,
            payments,
            splits,
        },
        title,
    ))
}

/// Trims an optional string and drops it when blank.
pub(crate) fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Trims tags and drops blanks.
pub(crate) fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::SplitType;
    use rust_decimal_macros::dec;
    use splitledger_shared::types::{ParticipantRef, UserId};

    fn pay(p: ParticipantRef, amount: &str) -> PaymentInput {
        PaymentInput {
            participant: p,
            amount: amount.to_string(),
            method: None,
        }
    }

    fn split(p: ParticipantRef, amount: &str, split_type: SplitType) -> SplitInput {
        SplitInput {
            participant: p,
            amount: amount.to_string(),
            split_type,
            share_value: None,
        }
    }

    #[test]
    fn test_percentage_tags_are_not_checked_against_amounts() {
        let a = ParticipantRef::User(UserId::new());
        let b = ParticipantRef::User(UserId::new());
        let mut splits = vec![
            split(a, "50.00", SplitType::Percentage),
            split(b, "50.00", SplitType::Percentage),
        ];
        splits[0].share_value = Some(dec!(60));
        splits[1].share_value = Some(dec!(40));

        let (lines, title) = validate_expense_body(
            "100.00",
            &[pay(a, "60.00"), pay(b, "40.00")],
            &splits,
            "Dinner",
        )
        .unwrap();

        assert_eq!(lines.amount, dec!(100));
        assert_eq!(lines.splits[0].amount, dec!(50));
        assert_eq!(lines.splits[0].share_value, Some(dec!(60)));
        assert_eq!(title, "Dinner");
    }

    #[test]
    fn test_payment_sum_mismatch() {
        let a = ParticipantRef::User(UserId::new());
        let err = validate_payments(dec!(100), &[pay(a, "60"), pay(a, "30")]).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::PaymentTotalMismatch { expected, actual }
                if expected == dec!(100) && actual == dec!(90)
        ));

        let err = validate_payments(dec!(100), &[pay(a, "60"), pay(a, "50")]).unwrap_err();
        assert!(matches!(err, LedgerError::PaymentTotalMismatch { .. }));
    }

    #[test]
    fn test_zero_payment_rejected_but_zero_split_allowed() {
        let a = ParticipantRef::User(UserId::new());
        let b = ParticipantRef::User(UserId::new());
        assert!(matches!(
            validate_payments(dec!(10), &[pay(a, "10"), pay(b, "0")]),
            Err(LedgerError::InvalidPaymentAmount(_))
        ));

        let splits = validate_splits(
            dec!(10),
            &[split(a, "10", SplitType::Fixed), split(b, "0", SplitType::Fixed)],
        )
        .unwrap();
        assert_eq!(splits.len(), 2);
    }

    #[test]
    fn test_negative_split_rejected() {
        let a = ParticipantRef::User(UserId::new());
        assert!(matches!(
            validate_splits(dec!(10), &[split(a, "-1", SplitType::Fixed)]),
            Err(LedgerError::InvalidSplitAmount(_))
        ));
    }

    #[test]
    fn test_order_amount_before_lines_before_title() {
        assert!(matches!(
            validate_expense_body("0", &[], &[], ""),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_expense_body("10", &[], &[], ""),
            Err(LedgerError::NoPayments)
        ));
        let a = ParticipantRef::User(UserId::new());
        assert!(matches!(
            validate_expense_body("10", &[pay(a, "10")], &[], ""),
            Err(LedgerError::NoSplits)
        ));
        assert!(matches!(
            validate_expense_body("10", &[pay(a, "10")], &[split(a, "10", SplitType::Equal)], "   "),
            Err(LedgerError::EmptyTitle)
        ));
    }

    #[test]
    fn test_normalizers() {
        assert_eq!(normalize_optional(Some("  cash ")), Some("cash".to_string()));
        assert_eq!(normalize_optional(Some("   ")), None);
        assert_eq!(
            normalize_tags(&[" food ".into(), String::new(), "trip".into()]),
            vec!["food".to_string(), "trip".to_string()]
        );
    }
}
