//! Service tests for settlements.

use rust_decimal_macros::dec;
use splitledger_shared::types::{ParticipantRef, PendingParticipantId, SettlementId, UserId};

use super::types::{
    CreateFriendSettlementInput, CreateSettlementInput, SettlementStatus, UpdateSettlementInput,
};
use crate::activity::ActivityAction;
use crate::directory::FriendshipStatus;
use crate::ledger::LedgerError;
use crate::testing::Fixture;

fn group_input(fx: &Fixture, payer: ParticipantRef, payee: ParticipantRef, amount: &str) -> CreateSettlementInput {
    CreateSettlementInput {
        group_id: fx.group,
        payer,
        payee,
        amount: amount.to_string(),
        currency: None,
        status: None,
        payment_method: Some("bank_transfer".to_string()),
        transaction_reference: None,
        notes: None,
        created_by: fx.alice,
    }
}

#[tokio::test]
async fn test_create_settlement_defaults() {
    let fx = Fixture::new();
    let created = fx
        .settlements
        .create_settlement(group_input(&fx, fx.bob.into(), fx.alice.into(), "25.00"))
        .await
        .unwrap();

    assert_eq!(created.amount, dec!(25.00));
    assert_eq!(created.currency, "EUR");
    assert_eq!(created.status, SettlementStatus::Pending);
    assert_eq!(created.scope.group_id(), Some(fx.group));
    assert_eq!(
        fx.mem.activity().last().unwrap().action,
        ActivityAction::SettlementCreated
    );
}

#[tokio::test]
async fn test_create_settlement_rejections() {
    let fx = Fixture::new();

    let err = fx
        .settlements
        .create_settlement(group_input(&fx, fx.bob.into(), fx.alice.into(), "0"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    let err = fx
        .settlements
        .create_settlement(group_input(&fx, fx.bob.into(), fx.bob.into(), "5"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SamePayerAndPayee));

    let outsider = UserId::new();
    let err = fx
        .settlements
        .create_settlement(group_input(&fx, outsider.into(), fx.alice.into(), "5"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ParticipantNotMember(p) if p == ParticipantRef::User(outsider)));

    let mut input = group_input(&fx, fx.bob.into(), fx.alice.into(), "5");
    input.status = Some("refunded".to_string());
    let err = fx.settlements.create_settlement(input).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidSettlementStatus(_)));

    let mut input = group_input(&fx, fx.bob.into(), fx.alice.into(), "5");
    input.created_by = outsider;
    let err = fx.settlements.create_settlement(input).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotGroupMember(_)));
}

#[tokio::test]
async fn test_pending_participant_may_settle() {
    let fx = Fixture::new();
    let carol = ParticipantRef::Pending(PendingParticipantId::new());
    let created = fx
        .settlements
        .create_settlement(group_input(&fx, carol, fx.alice.into(), "10"))
        .await
        .unwrap();
    assert!(created.involves(&carol));
}

#[tokio::test]
async fn test_update_and_status_flow() {
    let fx = Fixture::new();
    let created = fx
        .settlements
        .create_settlement(group_input(&fx, fx.bob.into(), fx.alice.into(), "25.00"))
        .await
        .unwrap();

    let updated = fx
        .settlements
        .update_settlement(UpdateSettlementInput {
            settlement_id: created.id,
            payer: fx.bob.into(),
            payee: fx.alice.into(),
            amount: "30.00".to_string(),
            currency: None,
            status: None,
            payment_method: None,
            transaction_reference: Some("TX-81".to_string()),
            notes: None,
            updated_by: fx.bob,
        })
        .await
        .unwrap();
    assert_eq!(updated.amount, dec!(30.00));
    assert_eq!(updated.status, SettlementStatus::Pending);
    assert_eq!(updated.updated_by, Some(fx.bob));

    let completed = fx
        .settlements
        .update_status(created.id, "completed", fx.alice)
        .await
        .unwrap();
    assert_eq!(completed.status, SettlementStatus::Completed);
    let last = fx.mem.activity().last().cloned().unwrap();
    assert_eq!(last.action, ActivityAction::SettlementCompleted);
    assert_eq!(last.metadata["previous_status"], "pending");

    fx.settlements
        .update_status(created.id, "cancelled", fx.alice)
        .await
        .unwrap();
    assert_eq!(
        fx.mem.activity().last().unwrap().action,
        ActivityAction::SettlementStatusUpdated
    );

    let err = fx
        .settlements
        .update_status(created.id, "lost", fx.alice)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidSettlementStatus(_)));
}

#[tokio::test]
async fn test_delete_and_listing() {
    let fx = Fixture::new();
    let first = fx
        .settlements
        .create_settlement(group_input(&fx, fx.bob.into(), fx.alice.into(), "5"))
        .await
        .unwrap();
    fx.settlements
        .create_settlement(group_input(&fx, fx.alice.into(), fx.bob.into(), "7"))
        .await
        .unwrap();

    assert_eq!(fx.settlements.list_by_group(fx.group, fx.bob).await.unwrap().len(), 2);
    assert_eq!(fx.settlements.list_by_user(fx.alice).await.unwrap().len(), 2);

    fx.settlements.delete_settlement(first.id, fx.alice).await.unwrap();
    let err = fx.settlements.get_settlement(first.id, fx.alice).await.unwrap_err();
    assert!(matches!(err, LedgerError::SettlementNotFound(_)));

    let err = fx
        .settlements
        .delete_settlement(SettlementId::new(), fx.alice)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SettlementNotFound(_)));
}

#[tokio::test]
async fn test_friend_settlement() {
    let fx = Fixture::new();
    let input = CreateFriendSettlementInput {
        friend_id: fx.bob,
        payer: fx.bob,
        payee: fx.alice,
        amount: "12.00".to_string(),
        currency: None,
        status: Some("completed".to_string()),
        payment_method: None,
        transaction_reference: None,
        notes: None,
        created_by: fx.alice,
    };

    let err = fx
        .settlements
        .create_friend_settlement(input.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFriends));

    fx.mem.add_friendship(fx.alice, fx.bob, FriendshipStatus::Accepted);

    let mut outside = input.clone();
    outside.payee = UserId::new();
    let err = fx.settlements.create_friend_settlement(outside).await.unwrap_err();
    assert!(matches!(err, LedgerError::ParticipantOutsideFriendship(_)));

    let created = fx.settlements.create_friend_settlement(input).await.unwrap();
    assert_eq!(created.currency, "USD");
    assert_eq!(created.status, SettlementStatus::Completed);
    assert_eq!(created.scope.group_id(), None);

    let listed = fx.settlements.list_friend_settlements(fx.alice, fx.bob).await.unwrap();
    assert_eq!(listed.len(), 1);
}
