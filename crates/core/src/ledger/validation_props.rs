//! Property-based tests for the expense validation pipeline.
//!
//! - Accepted expenses always satisfy sum(payments) == sum(splits) == amount
//! - Any payment total off by at least one cent is rejected

use proptest::prelude::*;
use rust_decimal::Decimal;
use splitledger_shared::types::{ParticipantRef, UserId};

use super::error::LedgerError;
use super::types::{PaymentInput, SplitInput, SplitType};
use super::validation::validate_expense_body;

/// Strategy to generate positive cent amounts (0.01 to 10,000.00).
fn cents() -> impl Strategy<Value = i64> {
    1i64..1_000_000i64
}

fn payments_for(parts: &[i64]) -> Vec<PaymentInput> {
    parts
        .iter()
        .map(|c| PaymentInput {
            participant: ParticipantRef::User(UserId::new()),
            amount: Decimal::new(*c, 2).to_string(),
            method: None,
        })
        .collect()
}

fn splits_for(parts: &[i64]) -> Vec<SplitInput> {
    parts
        .iter()
        .map(|c| SplitInput {
            participant: ParticipantRef::User(UserId::new()),
            amount: Decimal::new(*c, 2).to_string(),
            split_type: SplitType::Fixed,
            share_value: None,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_accepted_expense_is_balanced(
        payment_parts in prop::collection::vec(cents(), 1..6),
        split_weights in prop::collection::vec(0i64..100, 1..6),
    ) {
        let total_cents: i64 = payment_parts.iter().sum();

        // Spread the total over the splits; last one takes the remainder.
        let weight_sum: i64 = split_weights.iter().sum::<i64>().max(1);
        let mut split_parts: Vec<i64> = split_weights
            .iter()
            .map(|w| total_cents * w / weight_sum)
            .collect();
        let assigned: i64 = split_parts[..split_parts.len() - 1].iter().sum();
        if let Some(last) = split_parts.last_mut() {
            *last = total_cents - assigned;
        }

        let amount = Decimal::new(total_cents, 2).to_string();
        let (lines, _) = validate_expense_body(
            &amount,
            &payments_for(&payment_parts),
            &splits_for(&split_parts),
            "Groceries",
        ).unwrap();

        let paid: Decimal = lines.payments.iter().map(|p| p.amount).sum();
        let owed: Decimal = lines.splits.iter().map(|s| s.amount).sum();
        prop_assert_eq!(paid, lines.amount);
        prop_assert_eq!(owed, lines.amount);
    }

    #[test]
    fn prop_off_by_cents_payment_total_rejected(
        payment_parts in prop::collection::vec(cents(), 1..6),
        delta in prop_oneof![-500i64..-1, 1i64..500],
    ) {
        let total_cents: i64 = payment_parts.iter().sum::<i64>() + delta;
        prop_assume!(total_cents > 0);

        let amount = Decimal::new(total_cents, 2).to_string();
        let result = validate_expense_body(
            &amount,
            &payments_for(&payment_parts),
            &splits_for(&[total_cents]),
            "Groceries",
        );
        let is_mismatch = matches!(result, Err(LedgerError::PaymentTotalMismatch { .. }));
        prop_assert!(is_mismatch);
    }
}
