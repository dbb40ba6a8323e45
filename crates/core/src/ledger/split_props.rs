//! Property-based tests for the split calculator.

use proptest::prelude::*;
use rust_decimal::Decimal;
use splitledger_shared::types::{ParticipantRef, UserId};

use super::split::SplitCalculator;

/// Strategy to generate positive totals (0.01 to 100,000.00).
fn positive_total() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn participants(n: usize) -> Vec<ParticipantRef> {
    (0..n).map(|_| ParticipantRef::User(UserId::new())).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_equal_split_sums_to_total(total in positive_total(), n in 1usize..12) {
        let splits = SplitCalculator::equal(total, &participants(n)).unwrap();
        let sum: Decimal = splits.iter().map(|s| s.amount).sum();
        prop_assert_eq!(sum, total);
        prop_assert!(splits.iter().all(|s| s.amount >= Decimal::ZERO));
        prop_assert_eq!(splits.len(), n);
    }

    #[test]
    fn prop_share_split_sums_to_total(
        total in positive_total(),
        weights in prop::collection::vec(1i64..20, 1..8),
    ) {
        let people = participants(weights.len());
        let shares: Vec<_> = people
            .iter()
            .zip(&weights)
            .map(|(p, w)| (*p, Decimal::from(*w)))
            .collect();
        let splits = SplitCalculator::shares(total, &shares).unwrap();
        let sum: Decimal = splits.iter().map(|s| s.amount).sum();
        prop_assert_eq!(sum, total);
        prop_assert!(splits.iter().all(|s| s.amount >= Decimal::ZERO));
    }

    #[test]
    fn prop_percentage_split_sums_to_total(total in positive_total(), first in 0i64..=100) {
        let people = participants(2);
        let pcts = [
            (people[0], Decimal::from(first)),
            (people[1], Decimal::from(100 - first)),
        ];
        let splits = SplitCalculator::percentage(total, &pcts).unwrap();
        let sum: Decimal = splits.iter().map(|s| s.amount).sum();
        prop_assert_eq!(sum, total);
    }
}
