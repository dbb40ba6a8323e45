//! Property-based tests for debt simplification.
//!
//! - Transfers are positive and never self-directed
//! - Applying the plan zeroes every balance that sums to zero overall
//! - Each creditor receives exactly its original credit
//! - At most `n - 1` transfers for `n` non-zero participants

use std::collections::HashMap;

use proptest::prelude::*;
use rust_decimal::Decimal;
use splitledger_shared::types::{ParticipantRef, PendingParticipantId, UserId};

use super::simplify::simplify_debts;

/// Strategy producing balances that sum to exactly zero.
fn zero_sum_balances() -> impl Strategy<Value = Vec<(ParticipantRef, Decimal)>> {
    prop::collection::vec((-50_000i64..50_000i64, any::<bool>()), 1..10).prop_map(|cents| {
        let mut balances: Vec<(ParticipantRef, Decimal)> = cents
            .iter()
            .map(|(c, pending)| {
                let participant = if *pending {
                    ParticipantRef::Pending(PendingParticipantId::new())
                } else {
                    ParticipantRef::User(UserId::new())
                };
                (participant, Decimal::new(*c, 2))
            })
            .collect();
        let net: Decimal = balances.iter().map(|(_, b)| *b).sum();
        balances.push((ParticipantRef::User(UserId::new()), -net));
        balances
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_plan_zeroes_every_balance(balances in zero_sum_balances()) {
        let transfers = simplify_debts(&balances);

        let mut remaining: HashMap<ParticipantRef, Decimal> = balances.iter().copied().collect();
        for t in &transfers {
            prop_assert!(t.amount > Decimal::ZERO);
            prop_assert_ne!(t.from, t.to);

            let from_left = remaining[&t.from];
            let to_left = remaining[&t.to];
            prop_assert!(t.amount <= -from_left);
            prop_assert!(t.amount <= to_left);

            *remaining.get_mut(&t.from).unwrap() += t.amount;
            *remaining.get_mut(&t.to).unwrap() -= t.amount;
        }

        prop_assert!(remaining.values().all(Decimal::is_zero));
    }

    #[test]
    fn prop_creditors_receive_original_credit(balances in zero_sum_balances()) {
        let transfers = simplify_debts(&balances);

        for (participant, balance) in balances.iter().filter(|(_, b)| *b > Decimal::ZERO) {
            let received: Decimal = transfers
                .iter()
                .filter(|t| t.to == *participant)
                .map(|t| t.amount)
                .sum();
            prop_assert_eq!(received, *balance);
        }
    }

    #[test]
    fn prop_transfer_count_bounded(balances in zero_sum_balances()) {
        let non_zero = balances.iter().filter(|(_, b)| !b.is_zero()).count();
        let transfers = simplify_debts(&balances);
        prop_assert!(transfers.len() <= non_zero.saturating_sub(1));
    }

    #[test]
    fn prop_deterministic(balances in zero_sum_balances()) {
        prop_assert_eq!(simplify_debts(&balances), simplify_debts(&balances));
    }
}
