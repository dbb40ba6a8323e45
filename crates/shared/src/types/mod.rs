//! Common types used across the application.

pub mod id;
pub mod money;
pub mod pagination;
pub mod participant;

pub use id::*;
pub use money::{AmountError, CurrencyCode, MAX_AMOUNT_INTEGER_DIGITS, MAX_AMOUNT_SCALE};
pub use pagination::{PageMeta, PageRequest, PageResponse};
pub use participant::ParticipantRef;
