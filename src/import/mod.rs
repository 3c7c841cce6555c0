//! Invoice Import Orchestration
//!
//! The asynchronous import dialogue, end to end:
//!
//! ```text
//! client ──getUrl──▶ coordinator ──▶ transaction GENERATED + presigned slot
//! client ──PUT──▶ staging store ──created──▶ coordinator ──▶ RECEIVED
//!                                     └─▶ validator ──▶ PROCESSED | NON_VALID
//! client ──cancelImport──▶ coordinator ──▶ CANCELLED (GENERATED only)
//! sweeper ──remove──▶ reaper ──▶ TIMEOUT audit + push + close
//! ```
//!
//! Triggers are stateless and may race; the transaction store's
//! conditional write is the only serialization point.

pub mod coordinator;
pub mod error;
pub mod reaper;
pub mod validator;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{
    CancelOutcome, FileArrivalOutcome, ImportCoordinator, UploadSlotIssued,
    run_object_created_pump,
};
pub use error::ImportError;
pub use reaper::ExpiryReaper;
pub use validator::{MIN_INVOICE_NUMBER_LEN, ValidationError};
