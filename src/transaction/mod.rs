//! Import Transaction FSM
//!
//! One record per import attempt, keyed by a UUID token that is also
//! the staged object key. The record carries the connection to notify
//! and expires on a TTL.
//!
//! # State Machine
//!
//! ```text
//! GENERATED → RECEIVED → PROCESSED
//!     ↓           ↓
//! CANCELLED   NON_VALID_INVOICE_NUMBER
//!
//! (TTL expiry from any non-terminal status → TIMEOUT, assigned by the
//!  reaper after the record is swept; never stored)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **CAS-Only Writes**: Every status change is a conditional write
//!    on the expected current status; losers observe `false` and stand
//!    down.
//! 2. **One Terminal Push**: At most one trigger handler wins the write
//!    to a terminal status, so clients see one authoritative outcome.
//! 3. **Monotonic Lifetime**: `expires_at` is fixed at creation; no
//!    operation extends a record's life.

pub mod repository;
pub mod status;
pub mod types;

pub use repository::TransactionRepository;
pub use status::TransactionStatus;
pub use types::{TransactionRecord, TransactionToken};
