//! Recurring expense scheduler.
//!
//! A template is active until its next occurrence reaches the end date.
//! Each firing materializes one group expense through the ledger pipeline and
//! advances the template in the same transaction. The batch entry point fires
//! every due template once and reports a per-template outcome.

pub mod error;
pub mod schedule;
pub mod service;
pub mod store;
pub mod types;

#[cfg(test)]
mod schedule_props;

pub use error::RecurringError;
pub use schedule::{RepeatInterval, Schedule};
pub use service::RecurringService;
pub use store::RecurringStore;
pub use types::{
    BatchReport, CreateRecurringInput, GeneratedOccurrence, NewRecurringTemplate,
    OccurrenceCommit, RecurringChanges, RecurringPaymentInput, RecurringSplitInput,
    RecurringTemplate, TemplateOutcome, TemplatePayment, TemplateSplit, UpdateRecurringInput,
};
