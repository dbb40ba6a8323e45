//! Identity resolution.
//!
//! Money can be attributed to someone who has only been invited by email.
//! Such a person is represented by a pending participant. When they accept
//! an invitation, every payment, split and settlement that points at the
//! placeholder is rebound to their account in one transaction, across all
//! groups, and the placeholder is reclaimed on a best-effort basis.

pub mod error;
pub mod password;
pub mod service;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::IdentityError;
pub use password::{PasswordError, hash_password, verify_password};
pub use service::{InvitationService, normalize_email};
pub use store::{AccountGateway, IdentityStore};
pub use types::{
    AcceptOutcome, Account, CreateInvitationInput, Invitation, InvitationStatus, JoinGroupInput,
    JoinOutcome, MergeReport, NewInvitation, PendingParticipant,
};
