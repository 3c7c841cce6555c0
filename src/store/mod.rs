//! In-Memory Table Engine
//!
//! DashMap-backed key/value tables with per-record TTL and a broadcast
//! change feed. Single-record updates go through atomic CAS operations;
//! there are no multi-record transactions.
//!
//! Expired records are invisible to reads immediately and physically
//! removed by a background sweeper, which publishes a `Remove` event
//! carrying the last record image. Consumers subscribe to the feed the
//! same way they would tail a storage-level change stream.

mod memory;

pub use memory::MemoryTable;

use thiserror::Error;

/// Storage-level errors surfaced by table operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    AlreadyExists(String),

    #[error("precondition failed for record: {0}")]
    PreconditionFailed(String),
}

/// Change feed event with record images
///
/// `Remove` is published for swept (expired) records as well as explicit
/// deletes, so feed consumers observe TTL expiry the same way they
/// observe any other removal.
#[derive(Debug, Clone)]
pub enum ChangeEvent<T> {
    Insert { after: T },
    Modify { before: T, after: T },
    Remove { before: T },
}

impl<T> ChangeEvent<T> {
    /// Short tag for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Insert { .. } => "INSERT",
            ChangeEvent::Modify { .. } => "MODIFY",
            ChangeEvent::Remove { .. } => "REMOVE",
        }
    }
}
