//! Invitation, merge and join operations.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use splitledger_shared::config::LedgerConfig;
use splitledger_shared::types::UserId;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::IdentityError;
use super::store::{AccountGateway, IdentityStore};
use super::types::{
    AcceptOutcome, Account, CreateInvitationInput, Invitation, InvitationStatus, JoinGroupInput,
    JoinOutcome, NewInvitation, PendingParticipant,
};
use crate::directory::{Directory, MemberRole};

/// Trims and lower-cases an email, rejecting anything without a local part
/// and a domain.
///
/// # Errors
///
/// Returns `IdentityError::InvalidEmail`.
pub fn normalize_email(raw: &str) -> Result<String, IdentityError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(email)
        }
        _ => Err(IdentityError::InvalidEmail(raw.trim().to_string())),
    }
}

/// 64 hex characters from two random v4 UUIDs.
fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Manages invitations and folds placeholder participants into real accounts.
pub struct InvitationService {
    store: Arc<dyn IdentityStore>,
    accounts: Arc<dyn AccountGateway>,
    directory: Arc<dyn Directory>,
    settings: LedgerConfig,
}

impl InvitationService {
    /// Creates a new invitation service.
    #[must_use]
    pub fn new(
        store: Arc<dyn IdentityStore>,
        accounts: Arc<dyn AccountGateway>,
        directory: Arc<dyn Directory>,
        settings: LedgerConfig,
    ) -> Self {
        Self {
            store,
            accounts,
            directory,
            settings,
        }
    }

    /// Returns the placeholder for `email`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEmail` or a store error.
    pub async fn ensure_pending_participant(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<PendingParticipant, IdentityError> {
        let email = normalize_email(email)?;
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        Ok(self.store.upsert_pending_participant(&email, name).await?)
    }

    /// Invites an email address into a group.
    ///
    /// A placeholder participant for the email is created (or reused) so
    /// expenses can reference the invitee before they register.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound`, `NotGroupMember`, `InvalidEmail` or a store error.
    pub async fn create_invitation(
        &self,
        input: CreateInvitationInput,
        now: DateTime<Utc>,
    ) -> Result<Invitation, IdentityError> {
        if self.directory.group(input.group_id).await?.is_none() {
            return Err(IdentityError::GroupNotFound(input.group_id));
        }
        if self
            .directory
            .membership(input.group_id, input.invited_by)
            .await?
            .is_none()
        {
            return Err(IdentityError::NotGroupMember(input.group_id));
        }

        let placeholder = self
            .ensure_pending_participant(&input.email, input.name.as_deref())
            .await?;

        let invitation = self
            .store
            .insert_invitation(NewInvitation {
                group_id: input.group_id,
                email: placeholder.email,
                token: generate_token(),
                role: input.role.unwrap_or(MemberRole::Member),
                invited_by: input.invited_by,
                expires_at: now + Duration::days(self.settings.invitation_ttl_days),
            })
            .await?;

        info!(
            invitation_id = %invitation.id,
            group_id = %invitation.group_id,
            pending_participant_id = %placeholder.id,
            "invitation created"
        );
        Ok(invitation)
    }

    /// Loads an open invitation by token.
    ///
    /// # Errors
    ///
    /// Returns `InvitationNotFound` for unknown or closed tokens and
    /// `InvitationExpired` once past expiry.
    pub async fn get_invitation(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Invitation, IdentityError> {
        let invitation = self.find_invitation(token).await?;
        Self::ensure_open(&invitation, now)?;
        Ok(invitation)
    }

    /// Lists open invitations addressed to `email`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEmail` or a store error.
    pub async fn pending_invitations(&self, email: &str) -> Result<Vec<Invitation>, IdentityError> {
        let email = normalize_email(email)?;
        Ok(self.store.pending_invitations_for_email(&email).await?)
    }

    /// Accepts an invitation on behalf of a registered user.
    ///
    /// Creates the membership and, in the same transaction, rebinds every
    /// ledger reference to the email's placeholder onto `user`. When the user
    /// already belongs to the group the invitation is closed and nothing is
    /// rebound.
    ///
    /// # Errors
    ///
    /// Returns `InvitationNotFound`, `InvitationExpired` or a store error.
    pub async fn accept_invitation(
        &self,
        token: &str,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<AcceptOutcome, IdentityError> {
        let invitation = self.find_invitation(token).await?;

        if let Some(membership) = self.directory.membership(invitation.group_id, user).await? {
            if invitation.status == InvitationStatus::Pending {
                self.store.mark_invitation_accepted(invitation.id).await?;
            }
            info!(group_id = %invitation.group_id, user_id = %user, "invitee already a member");
            return Ok(AcceptOutcome::AlreadyMember { membership });
        }

        Self::ensure_open(&invitation, now)?;

        let (membership, merge) = self.store.accept_and_merge(&invitation, user).await?;
        if !merge.placeholder_removed {
            warn!(email = %invitation.email, "placeholder participant left in place after merge");
        }
        info!(
            invitation_id = %invitation.id,
            user_id = %user,
            rebound = merge.total(),
            "invitation accepted"
        );

        Ok(AcceptOutcome::Joined { membership, merge })
    }

    /// Joins a group from an invitation link.
    ///
    /// Resolves the account first: an authenticated caller must match the
    /// invitation email, an existing account must log in, and anyone else
    /// registers. Then accepts the invitation; being a member already counts
    /// as success.
    ///
    /// # Errors
    ///
    /// Returns `InvitationNotFound`, `InvitationExpired`, `EmailMismatch`,
    /// `UserNotFound`, `PasswordRequiredForLogin`,
    /// `PasswordRequiredForRegistration`, `InvalidCredentials` or a store error.
    pub async fn join_group(
        &self,
        input: JoinGroupInput,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome, IdentityError> {
        let invitation = self.find_invitation(&input.token).await?;
        Self::ensure_open(&invitation, now)?;

        let (account, registered) = self.resolve_account(&invitation, &input).await?;
        let accept = self.accept_invitation(&input.token, account.id, now).await?;

        Ok(JoinOutcome {
            account,
            registered,
            accept,
        })
    }

    async fn resolve_account(
        &self,
        invitation: &Invitation,
        input: &JoinGroupInput,
    ) -> Result<(Account, bool), IdentityError> {
        if let Some(user_id) = input.authenticated_user {
            let account = self
                .accounts
                .find_account(user_id)
                .await?
                .ok_or(IdentityError::UserNotFound(user_id))?;
            if !account.email.eq_ignore_ascii_case(&invitation.email) {
                return Err(IdentityError::EmailMismatch);
            }
            return Ok((account, false));
        }

        let password = input
            .password
            .as_deref()
            .filter(|p| !p.is_empty());

        if let Some(existing) = self.accounts.find_account_by_email(&invitation.email).await? {
            let password = password.ok_or(IdentityError::PasswordRequiredForLogin)?;
            let account = self
                .accounts
                .verify_credentials(&existing.email, password)
                .await?
                .ok_or(IdentityError::InvalidCredentials)?;
            return Ok((account, false));
        }

        let password = password.ok_or(IdentityError::PasswordRequiredForRegistration)?;
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| default_display_name(&invitation.email), ToString::to_string);

        let account = self
            .accounts
            .register_account(&name, &invitation.email, password)
            .await?;
        info!(user_id = %account.id, "account registered from invitation");

        Ok((account, true))
    }

    async fn find_invitation(&self, token: &str) -> Result<Invitation, IdentityError> {
        self.store
            .find_invitation_by_token(token.trim())
            .await?
            .ok_or(IdentityError::InvitationNotFound)
    }

    fn ensure_open(invitation: &Invitation, now: DateTime<Utc>) -> Result<(), IdentityError> {
        if invitation.status != InvitationStatus::Pending {
            return Err(IdentityError::InvitationNotFound);
        }
        if invitation.is_expired(now) {
            return Err(IdentityError::InvitationExpired);
        }
        Ok(())
    }
}

fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
