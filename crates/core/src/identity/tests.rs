//! Service tests for invitations, merge and join.

use chrono::{Duration, NaiveDate, Utc};
use splitledger_shared::types::{GroupId, ParticipantRef, UserId};

use super::error::IdentityError;
use super::service::normalize_email;
use super::types::{AcceptOutcome, CreateInvitationInput, InvitationStatus, JoinGroupInput};
use crate::directory::MemberRole;
use crate::ledger::{CreateExpenseInput, LedgerError, PaymentInput, SplitInput, SplitType};
use crate::settlement::CreateSettlementInput;
use crate::testing::Fixture;

fn invite(fx: &Fixture, email: &str) -> CreateInvitationInput {
    CreateInvitationInput {
        group_id: fx.group,
        invited_by: fx.alice,
        email: email.to_string(),
        role: None,
        name: Some("Carol".to_string()),
    }
}

fn expense_with(group: GroupId, creator: UserId, ower: ParticipantRef) -> CreateExpenseInput {
    CreateExpenseInput {
        group_id: group,
        title: "Groceries".to_string(),
        notes: None,
        amount: "40".to_string(),
        currency: None,
        date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        category_id: None,
        tags: vec![],
        created_by: creator,
        payments: vec![PaymentInput {
            participant: ParticipantRef::User(creator),
            amount: "40".to_string(),
            method: None,
        }],
        splits: vec![
            SplitInput {
                participant: ParticipantRef::User(creator),
                amount: "20".to_string(),
                split_type: SplitType::Equal,
                share_value: None,
            },
            SplitInput {
                participant: ower,
                amount: "20".to_string(),
                split_type: SplitType::Equal,
                share_value: None,
            },
        ],
    }
}

#[test]
fn test_normalize_email() {
    assert_eq!(normalize_email("  X@Example.COM ").unwrap(), "x@example.com");
    for bad in ["", "nobody", "@example.com", "x@", "a@b@c"] {
        assert!(matches!(normalize_email(bad), Err(IdentityError::InvalidEmail(_))));
    }
}

#[tokio::test]
async fn test_create_invitation() {
    let fx = Fixture::new();
    let now = Utc::now();

    let invitation = fx
        .invitations
        .create_invitation(invite(&fx, " Carol@Example.com"), now)
        .await
        .unwrap();

    assert_eq!(invitation.email, "carol@example.com");
    assert_eq!(invitation.token.len(), 64);
    assert!(invitation.token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(invitation.role, MemberRole::Member);
    assert_eq!(invitation.status, InvitationStatus::Pending);
    assert_eq!(invitation.expires_at, now + Duration::days(7));
    assert_eq!(fx.mem.pending_count(), 1);

    // Same email again reuses the placeholder.
    fx.invitations
        .create_invitation(invite(&fx, "carol@example.com"), now)
        .await
        .unwrap();
    assert_eq!(fx.mem.pending_count(), 1);
    assert_eq!(
        fx.invitations
            .pending_invitations("CAROL@example.com")
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_create_invitation_requires_member() {
    let fx = Fixture::new();
    let mut input = invite(&fx, "carol@example.com");
    input.invited_by = UserId::new();

    let err = fx.invitations.create_invitation(input, Utc::now()).await.unwrap_err();
    assert!(matches!(err, IdentityError::NotGroupMember(_)));
    assert_eq!(fx.mem.pending_count(), 0);
}

#[tokio::test]
async fn test_get_invitation_expiry() {
    let fx = Fixture::new();
    let now = Utc::now();
    let invitation = fx
        .invitations
        .create_invitation(invite(&fx, "carol@example.com"), now)
        .await
        .unwrap();

    fx.invitations.get_invitation(&invitation.token, now).await.unwrap();

    let err = fx
        .invitations
        .get_invitation(&invitation.token, now + Duration::days(8))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvitationExpired));
    assert_eq!(err.http_status_code(), 410);

    let err = fx.invitations.get_invitation("missing", now).await.unwrap_err();
    assert!(matches!(err, IdentityError::InvitationNotFound));
}

#[tokio::test]
async fn test_accept_merges_across_groups() {
    let fx = Fixture::new();
    let now = Utc::now();
    let trip = fx.mem.add_group("Road trip", "USD");
    fx.mem.add_member(trip, fx.bob);

    let first = fx
        .invitations
        .create_invitation(invite(&fx, "x@example.com"), now)
        .await
        .unwrap();
    let mut second_input = invite(&fx, "x@example.com");
    second_input.group_id = trip;
    second_input.invited_by = fx.bob;
    let second = fx
        .invitations
        .create_invitation(second_input, now)
        .await
        .unwrap();

    let placeholder = fx
        .invitations
        .ensure_pending_participant("x@example.com", None)
        .await
        .unwrap();
    let pending = ParticipantRef::Pending(placeholder.id);

    let e1 = fx
        .expenses
        .create_expense(expense_with(fx.group, fx.alice, pending))
        .await
        .unwrap();
    let e2 = fx
        .expenses
        .create_expense(expense_with(trip, fx.bob, pending))
        .await
        .unwrap();
    let s = fx
        .settlements
        .create_settlement(CreateSettlementInput {
            group_id: fx.group,
            payer: pending,
            payee: ParticipantRef::User(fx.alice),
            amount: "5".to_string(),
            currency: None,
            status: None,
            payment_method: None,
            transaction_reference: None,
            notes: None,
            created_by: fx.alice,
        })
        .await
        .unwrap();

    let xavier = fx.mem.add_account("Xavier", "x@example.com", "pw").id;
    let outcome = fx
        .invitations
        .accept_invitation(&first.token, xavier, now)
        .await
        .unwrap();

    let AcceptOutcome::Joined { membership, merge } = outcome else {
        panic!("expected a fresh join");
    };
    assert_eq!(membership.group_id, fx.group);
    assert_eq!(merge.splits, 2);
    assert_eq!(merge.settlement_payers, 1);
    assert_eq!(merge.total(), 3);
    assert!(merge.placeholder_removed);
    assert_eq!(fx.mem.pending_count(), 0);

    let me = ParticipantRef::User(xavier);
    let reloaded = fx.expenses.get_expense(e1.expense.id, fx.alice).await.unwrap();
    assert!(reloaded.splits.iter().any(|sp| sp.participant == me));
    let reloaded = fx.expenses.get_expense(e2.expense.id, fx.bob).await.unwrap();
    assert!(reloaded.splits.iter().any(|sp| sp.participant == me));
    let reloaded = fx.settlements.get_settlement(s.id, fx.alice).await.unwrap();
    assert_eq!(reloaded.payer, me);

    // Joining the second group finds nothing left to rebind.
    let outcome = fx
        .invitations
        .accept_invitation(&second.token, xavier, now)
        .await
        .unwrap();
    assert!(matches!(outcome, AcceptOutcome::Joined { merge, .. } if merge.total() == 0));

    // A repeated acceptance is not an error and does not rebind twice.
    let outcome = fx
        .invitations
        .accept_invitation(&first.token, xavier, now)
        .await
        .unwrap();
    assert!(matches!(outcome, AcceptOutcome::AlreadyMember { .. }));
}

fn settle(group: GroupId, payer: ParticipantRef, payee: UserId, by: UserId) -> CreateSettlementInput {
    CreateSettlementInput {
        group_id: group,
        payer,
        payee: ParticipantRef::User(payee),
        amount: "12.50".to_string(),
        currency: None,
        status: None,
        payment_method: None,
        transaction_reference: None,
        notes: None,
        created_by: by,
    }
}

#[tokio::test]
async fn test_merge_removes_settlements_with_self() {
    let fx = Fixture::new();
    let now = Utc::now();
    let xavier = fx.mem.add_account("Xavier", "x@example.com", "pw").id;
    let trip = fx.mem.add_group("Road trip", "USD");
    fx.mem.add_member(trip, fx.bob);
    fx.mem.add_member(trip, xavier);

    let invitation = fx
        .invitations
        .create_invitation(invite(&fx, "x@example.com"), now)
        .await
        .unwrap();
    let placeholder = fx
        .invitations
        .ensure_pending_participant("x@example.com", None)
        .await
        .unwrap();
    let pending = ParticipantRef::Pending(placeholder.id);

    let with_self = fx
        .settlements
        .create_settlement(settle(trip, pending, xavier, fx.bob))
        .await
        .unwrap();
    let with_bob = fx
        .settlements
        .create_settlement(settle(trip, pending, fx.bob, fx.bob))
        .await
        .unwrap();

    let outcome = fx
        .invitations
        .accept_invitation(&invitation.token, xavier, now)
        .await
        .unwrap();
    let AcceptOutcome::Joined { merge, .. } = outcome else {
        panic!("expected a fresh join");
    };
    assert_eq!(merge.self_settlements_removed, 1);
    assert_eq!(merge.settlement_payers, 1);

    let remaining = fx.settlements.list_by_group(trip, fx.bob).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, with_bob.id);
    assert_eq!(remaining[0].payer, ParticipantRef::User(xavier));
    assert!(remaining.iter().all(|st| st.payer != st.payee));

    let err = fx
        .settlements
        .get_settlement(with_self.id, fx.bob)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SettlementNotFound(_)));
}

#[tokio::test]
async fn test_failed_placeholder_delete_keeps_merge() {
    let fx = Fixture::new();
    let now = Utc::now();
    fx.mem.keep_placeholders(true);
    let invitation = fx
        .invitations
        .create_invitation(invite(&fx, "carol@example.com"), now)
        .await
        .unwrap();
    let carol = fx.mem.add_account("Carol", "carol@example.com", "pw").id;

    let outcome = fx
        .invitations
        .accept_invitation(&invitation.token, carol, now)
        .await
        .unwrap();
    assert!(matches!(outcome, AcceptOutcome::Joined { merge, .. } if !merge.placeholder_removed));
    assert_eq!(outcome.membership().user_id, carol);
}

#[tokio::test]
async fn test_accept_expired_invitation() {
    let fx = Fixture::new();
    let now = Utc::now();
    let invitation = fx
        .invitations
        .create_invitation(invite(&fx, "carol@example.com"), now)
        .await
        .unwrap();

    let err = fx
        .invitations
        .accept_invitation(&invitation.token, UserId::new(), now + Duration::days(30))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvitationExpired));
}

#[tokio::test]
async fn test_join_registers_new_account() {
    let fx = Fixture::new();
    let now = Utc::now();
    let invitation = fx
        .invitations
        .create_invitation(invite(&fx, "dana@example.com"), now)
        .await
        .unwrap();

    let err = fx
        .invitations
        .join_group(
            JoinGroupInput {
                token: invitation.token.clone(),
                ..JoinGroupInput::default()
            },
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::PasswordRequiredForRegistration));

    let joined = fx
        .invitations
        .join_group(
            JoinGroupInput {
                token: invitation.token.clone(),
                password: Some("s3cret".to_string()),
                ..JoinGroupInput::default()
            },
            now,
        )
        .await
        .unwrap();
    assert!(joined.registered);
    assert_eq!(joined.account.name, "dana");
    assert_eq!(joined.account.email, "dana@example.com");
    assert!(matches!(joined.accept, AcceptOutcome::Joined { .. }));
}

#[tokio::test]
async fn test_join_existing_account_needs_valid_password() {
    let fx = Fixture::new();
    let now = Utc::now();
    let erin = fx.mem.add_account("Erin", "erin@example.com", "right").id;
    let invitation = fx
        .invitations
        .create_invitation(invite(&fx, "erin@example.com"), now)
        .await
        .unwrap();
    let join = |password: Option<&str>| JoinGroupInput {
        token: invitation.token.clone(),
        password: password.map(ToString::to_string),
        ..JoinGroupInput::default()
    };

    let err = fx.invitations.join_group(join(None), now).await.unwrap_err();
    assert!(matches!(err, IdentityError::PasswordRequiredForLogin));

    let err = fx.invitations.join_group(join(Some("wrong")), now).await.unwrap_err();
    assert!(matches!(err, IdentityError::InvalidCredentials));

    let joined = fx.invitations.join_group(join(Some("right")), now).await.unwrap();
    assert!(!joined.registered);
    assert_eq!(joined.account.id, erin);
}

#[tokio::test]
async fn test_join_authenticated_user() {
    let fx = Fixture::new();
    let now = Utc::now();
    let invitation = fx
        .invitations
        .create_invitation(invite(&fx, "alice@example.com"), now)
        .await
        .unwrap();

    let err = fx
        .invitations
        .join_group(
            JoinGroupInput {
                token: invitation.token.clone(),
                authenticated_user: Some(fx.bob),
                ..JoinGroupInput::default()
            },
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::EmailMismatch));

    // Alice is already in the group: joining still succeeds.
    let joined = fx
        .invitations
        .join_group(
            JoinGroupInput {
                token: invitation.token,
                authenticated_user: Some(fx.alice),
                ..JoinGroupInput::default()
            },
            now,
        )
        .await
        .unwrap();
    assert!(matches!(joined.accept, AcceptOutcome::AlreadyMember { .. }));
}
