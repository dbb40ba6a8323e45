//! Placeholders, invitations and the placeholder-to-account merge.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use splitledger_core::directory::Membership;
use splitledger_core::identity::{
    IdentityStore, Invitation, InvitationStatus, MergeReport, NewInvitation, PendingParticipant,
};
use splitledger_core::{StoreError, StoreResult};
use splitledger_shared::types::{GroupId, InvitationId, PendingParticipantId, UserId};
use tracing::{debug, warn};
use uuid::Uuid;

use super::convert::{db_error, now, parse_column, utc};
use crate::entities::{
    expense_payments, expense_splits, group_invitations, group_members, pending_users,
    settlements,
};

/// Identity repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct IdentityRepository {
    db: DatabaseConnection,
}

impl IdentityRepository {
    /// Creates a new identity repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn pending_from_model(model: pending_users::Model) -> PendingParticipant {
    PendingParticipant {
        id: PendingParticipantId::from_uuid(model.id),
        email: model.email,
        name: model.name,
        created_at: utc(model.created_at),
    }
}

fn invitation_from_model(model: group_invitations::Model) -> StoreResult<Invitation> {
    Ok(Invitation {
        id: InvitationId::from_uuid(model.id),
        group_id: GroupId::from_uuid(model.group_id),
        email: model.email,
        token: model.token,
        role: parse_column(&model.role, "group_invitations.role")?,
        status: parse_column(&model.status, "group_invitations.status")?,
        invited_by: UserId::from_uuid(model.invited_by),
        expires_at: utc(model.expires_at),
        created_at: utc(model.created_at),
    })
}

async fn find_pending<C: ConnectionTrait>(
    conn: &C,
    email: &str,
) -> StoreResult<Option<pending_users::Model>> {
    pending_users::Entity::find()
        .filter(pending_users::Column::Email.eq(email))
        .one(conn)
        .await
        .map_err(db_error)
}

async fn mark_accepted<C: ConnectionTrait>(conn: &C, id: Uuid) -> StoreResult<()> {
    group_invitations::Entity::update_many()
        .col_expr(
            group_invitations::Column::Status,
            Expr::value(InvitationStatus::Accepted.as_str()),
        )
        .col_expr(group_invitations::Column::AcceptedAt, Expr::value(now()))
        .filter(group_invitations::Column::Id.eq(id))
        .exec(conn)
        .await
        .map_err(db_error)?;
    Ok(())
}

/// Rewrites every reference to `pending` so it points at `user`.
async fn rebind_references<C: ConnectionTrait>(
    conn: &C,
    pending: Uuid,
    user: Uuid,
) -> StoreResult<MergeReport> {
    let none = Option::<Uuid>::None;

    // Rebinding these would leave the user settling with themselves.
    let to_self = settlements::Entity::delete_many()
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(settlements::Column::PayerPendingId.eq(pending))
                        .add(settlements::Column::PayeeUserId.eq(user)),
                )
                .add(
                    Condition::all()
                        .add(settlements::Column::PayeePendingId.eq(pending))
                        .add(settlements::Column::PayerUserId.eq(user)),
                ),
        )
        .exec(conn)
        .await
        .map_err(db_error)?;

    let payments = expense_payments::Entity::update_many()
        .col_expr(expense_payments::Column::UserId, Expr::value(user))
        .col_expr(expense_payments::Column::PendingUserId, Expr::value(none))
        .filter(expense_payments::Column::PendingUserId.eq(pending))
        .exec(conn)
        .await
        .map_err(db_error)?;

    let splits = expense_splits::Entity::update_many()
        .col_expr(expense_splits::Column::UserId, Expr::value(user))
        .col_expr(expense_splits::Column::PendingUserId, Expr::value(none))
        .filter(expense_splits::Column::PendingUserId.eq(pending))
        .exec(conn)
        .await
        .map_err(db_error)?;

    let payers = settlements::Entity::update_many()
        .col_expr(settlements::Column::PayerUserId, Expr::value(user))
        .col_expr(settlements::Column::PayerPendingId, Expr::value(none))
        .filter(settlements::Column::PayerPendingId.eq(pending))
        .exec(conn)
        .await
        .map_err(db_error)?;

    let payees = settlements::Entity::update_many()
        .col_expr(settlements::Column::PayeeUserId, Expr::value(user))
        .col_expr(settlements::Column::PayeePendingId, Expr::value(none))
        .filter(settlements::Column::PayeePendingId.eq(pending))
        .exec(conn)
        .await
        .map_err(db_error)?;

    Ok(MergeReport {
        payments: payments.rows_affected,
        splits: splits.rows_affected,
        settlement_payers: payers.rows_affected,
        settlement_payees: payees.rows_affected,
        self_settlements_removed: to_self.rows_affected,
        placeholder_removed: false,
    })
}

#[async_trait]
impl IdentityStore for IdentityRepository {
    async fn upsert_pending_participant(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> StoreResult<PendingParticipant> {
        let model = pending_users::ActiveModel {
            id: Set(Uuid::now_v7()),
            email: Set(email.to_string()),
            name: Set(name.map(str::to_string)),
            created_at: Set(now()),
        };

        pending_users::Entity::insert(model)
            .on_conflict(
                OnConflict::column(pending_users::Column::Email)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_error)?;

        find_pending(&self.db, email)
            .await?
            .map(pending_from_model)
            .ok_or_else(|| StoreError::Missing(format!("pending participant {email}")))
    }

    async fn find_pending_by_email(&self, email: &str) -> StoreResult<Option<PendingParticipant>> {
        Ok(find_pending(&self.db, email).await?.map(pending_from_model))
    }

    async fn insert_invitation(&self, invitation: NewInvitation) -> StoreResult<Invitation> {
        let model = group_invitations::ActiveModel {
            id: Set(Uuid::now_v7()),
            group_id: Set(invitation.group_id.into_inner()),
            email: Set(invitation.email),
            token: Set(invitation.token),
            role: Set(invitation.role.as_str().to_string()),
            status: Set(InvitationStatus::Pending.as_str().to_string()),
            invited_by: Set(invitation.invited_by.into_inner()),
            expires_at: Set(invitation.expires_at.into()),
            accepted_at: Set(None),
            created_at: Set(now()),
        }
        .insert(&self.db)
        .await
        .map_err(db_error)?;

        invitation_from_model(model)
    }

    async fn find_invitation_by_token(&self, token: &str) -> StoreResult<Option<Invitation>> {
        group_invitations::Entity::find()
            .filter(group_invitations::Column::Token.eq(token))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map(invitation_from_model)
            .transpose()
    }

    async fn pending_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>> {
        group_invitations::Entity::find()
            .filter(group_invitations::Column::Email.eq(email))
            .filter(group_invitations::Column::Status.eq(InvitationStatus::Pending.as_str()))
            .order_by_desc(group_invitations::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(invitation_from_model)
            .collect()
    }

    async fn mark_invitation_accepted(&self, id: InvitationId) -> StoreResult<()> {
        mark_accepted(&self.db, id.into_inner()).await
    }

    async fn accept_and_merge(
        &self,
        invitation: &Invitation,
        user: UserId,
    ) -> StoreResult<(Membership, MergeReport)> {
        let txn = self.db.begin().await.map_err(db_error)?;

        // 1. Membership (re-activates a previously removed member).
        let member = group_members::ActiveModel {
            id: Set(Uuid::now_v7()),
            group_id: Set(invitation.group_id.into_inner()),
            user_id: Set(user.into_inner()),
            role: Set(invitation.role.as_str().to_string()),
            is_active: Set(true),
            joined_at: Set(now()),
        };
        group_members::Entity::insert(member)
            .on_conflict(
                OnConflict::columns([group_members::Column::GroupId, group_members::Column::UserId])
                    .update_columns([group_members::Column::Role, group_members::Column::IsActive])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(db_error)?;

        // 2. Invitation.
        mark_accepted(&txn, invitation.id.into_inner()).await?;

        // 3. References, across every group.
        let mut report = MergeReport::default();
        if let Some(placeholder) = find_pending(&txn, &invitation.email).await? {
            report = rebind_references(&txn, placeholder.id, user.into_inner()).await?;

            // 4. Placeholder, best effort inside a savepoint.
            let savepoint = txn.begin().await.map_err(db_error)?;
            match pending_users::Entity::delete_by_id(placeholder.id)
                .exec(&savepoint)
                .await
            {
                Ok(result) => {
                    savepoint.commit().await.map_err(db_error)?;
                    report.placeholder_removed = result.rows_affected > 0;
                }
                Err(err) => {
                    warn!(
                        pending_user_id = %placeholder.id,
                        error = %err,
                        "could not delete merged placeholder"
                    );
                    savepoint.rollback().await.map_err(db_error)?;
                }
            }
        }

        txn.commit().await.map_err(db_error)?;

        debug!(
            invitation_id = %invitation.id,
            user_id = %user,
            rebound = report.total(),
            self_settlements_removed = report.self_settlements_removed,
            "invitation merged"
        );

        Ok((
            Membership {
                group_id: invitation.group_id,
                user_id: user,
                role: invitation.role,
            },
            report,
        ))
    }
}
