//! Persistence ports for identity resolution.

use async_trait::async_trait;
use splitledger_shared::types::{InvitationId, UserId};

use super::types::{Account, Invitation, MergeReport, NewInvitation, PendingParticipant};
use crate::directory::Membership;
use crate::store::StoreResult;

/// Storage for placeholders, invitations and the merge transaction.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Returns the placeholder for `email`, creating it if needed. Idempotent.
    async fn upsert_pending_participant(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> StoreResult<PendingParticipant>;

    /// Looks up a placeholder by normalized email.
    async fn find_pending_by_email(&self, email: &str) -> StoreResult<Option<PendingParticipant>>;

    /// Inserts an invitation.
    async fn insert_invitation(&self, invitation: NewInvitation) -> StoreResult<Invitation>;

    /// Looks up an invitation by token.
    async fn find_invitation_by_token(&self, token: &str) -> StoreResult<Option<Invitation>>;

    /// Lists pending invitations addressed to `email`.
    async fn pending_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>>;

    /// Marks an invitation accepted without touching anything else.
    async fn mark_invitation_accepted(&self, id: InvitationId) -> StoreResult<()>;

    /// In one transaction:
    /// 1. creates the membership with the invitation's role,
    /// 2. marks the invitation accepted,
    /// 3. rewrites every payment, split, settlement payer and settlement
    ///    payee that references the placeholder for the invitation's email,
    ///    across all groups; settlements whose other side is already `user`
    ///    are deleted instead, so no settlement ends up paying itself,
    /// 4. tries to delete the placeholder; a failed delete is reported in the
    ///    `MergeReport` and does not roll anything back.
    async fn accept_and_merge(
        &self,
        invitation: &Invitation,
        user: UserId,
    ) -> StoreResult<(Membership, MergeReport)>;
}

/// Account lookup and credential handling owned by the auth subsystem.
#[async_trait]
pub trait AccountGateway: Send + Sync {
    /// Loads an account by ID.
    async fn find_account(&self, id: UserId) -> StoreResult<Option<Account>>;

    /// Loads an account by normalized email.
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Returns the account if the password matches, `None` otherwise.
    async fn verify_credentials(&self, email: &str, password: &str)
    -> StoreResult<Option<Account>>;

    /// Creates an account with the given credentials.
    async fn register_account(&self, name: &str, email: &str, password: &str)
    -> StoreResult<Account>;
}
