//! Identity error types.

use splitledger_shared::AppError;
use splitledger_shared::types::{GroupId, UserId};
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during invitation, merge and join operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    // ========== Validation Errors ==========
    /// Email is blank or malformed.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Existing account requires a password to log in.
    #[error("Password is required to log in to the existing account")]
    PasswordRequiredForLogin,

    /// New account requires a password to register.
    #[error("Password is required to create an account")]
    PasswordRequiredForRegistration,

    // ========== Authorization Errors ==========
    /// Inviter is not a member of the group.
    #[error("User is not a member of group {0}")]
    NotGroupMember(GroupId),

    /// Authenticated caller's email differs from the invitation's.
    #[error("Invitation was sent to a different email address")]
    EmailMismatch,

    /// Login failed.
    #[error("Invalid email or password")]
    InvalidCredentials,

    // ========== Not Found Errors ==========
    /// Token unknown or no longer open.
    #[error("Invitation not found")]
    InvitationNotFound,

    /// Group does not exist.
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// Authenticated account does not exist.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    // ========== State Errors ==========
    /// Invitation expired before acceptance.
    #[error("Invitation has expired")]
    InvitationExpired,

    // ========== Storage Errors ==========
    /// Storage failure; the merge was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IdentityError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "INVALID_EMAIL",
            Self::PasswordRequiredForLogin => "PASSWORD_REQUIRED_FOR_LOGIN",
            Self::PasswordRequiredForRegistration => "PASSWORD_REQUIRED_FOR_REGISTRATION",
            Self::NotGroupMember(_) => "NOT_GROUP_MEMBER",
            Self::EmailMismatch => "EMAIL_MISMATCH",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvitationNotFound => "INVITATION_NOT_FOUND",
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::InvitationExpired => "INVITATION_EXPIRED",
            Self::Store(err) => err.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidEmail(_)
            | Self::PasswordRequiredForLogin
            | Self::PasswordRequiredForRegistration => 400,
            Self::InvalidCredentials => 401,
            Self::NotGroupMember(_) | Self::EmailMismatch => 403,
            Self::InvitationNotFound | Self::GroupNotFound(_) | Self::UserNotFound(_) => 404,
            Self::InvitationExpired => 410,
            Self::Store(err) => err.http_status_code(),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        let message = err.to_string();
        match err {
            IdentityError::InvalidEmail(_)
            | IdentityError::PasswordRequiredForLogin
            | IdentityError::PasswordRequiredForRegistration => Self::Validation(message),
            IdentityError::InvalidCredentials => Self::Unauthorized(message),
            IdentityError::NotGroupMember(_) | IdentityError::EmailMismatch => {
                Self::Forbidden(message)
            }
            IdentityError::InvitationNotFound
            | IdentityError::GroupNotFound(_)
            | IdentityError::UserNotFound(_) => Self::NotFound(message),
            IdentityError::InvitationExpired => Self::Conflict(message),
            IdentityError::Store(store) => store.into(),
        }
    }
}
