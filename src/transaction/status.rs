//! Import Transaction FSM Status Definitions
//!
//! Status names on the wire match what clients receive in push
//! payloads; the same strings are used for storage and logging.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Import transaction statuses
///
/// Terminal statuses: PROCESSED, CANCELLED, NON_VALID_INVOICE_NUMBER,
/// TIMEOUT. TIMEOUT is never written back to the store: it is assigned
/// by the expiry reaper after the record is already gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Upload slot issued, waiting for the file
    #[serde(rename = "URL_GENERATED")]
    Generated,

    /// File arrived, validation in progress
    #[serde(rename = "INVOICE_RECEIVED")]
    Received,

    /// Terminal: invoice extracted and persisted
    #[serde(rename = "INVOICE_PROCESSED")]
    Processed,

    /// Terminal: client cancelled before the file arrived
    #[serde(rename = "INVOICE_CANCELLED")]
    Cancelled,

    /// Terminal: file content failed validation
    #[serde(rename = "NON_VALID_INVOICE_NUMBER")]
    NonValidInvoiceNumber,

    /// Terminal: record expired before completion
    #[serde(rename = "TIMEOUT")]
    TimedOut,
}

impl TransactionStatus {
    /// Check if this is a terminal status (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            TransactionStatus::Generated | TransactionStatus::Received
        )
    }

    /// Transition table lookup
    ///
    /// The store does not enforce legality; trigger handlers consult
    /// this table before attempting a CAS write.
    #[inline]
    pub fn allows(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Generated, Received) | (Generated, Cancelled) | (Received, Processed) | (Received, NonValidInvoiceNumber)
        )
    }

    /// Wire name, as pushed to clients
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Generated => "URL_GENERATED",
            TransactionStatus::Received => "INVOICE_RECEIVED",
            TransactionStatus::Processed => "INVOICE_PROCESSED",
            TransactionStatus::Cancelled => "INVOICE_CANCELLED",
            TransactionStatus::NonValidInvoiceNumber => "NON_VALID_INVOICE_NUMBER",
            TransactionStatus::TimedOut => "TIMEOUT",
        }
    }

    /// Parse a wire name back into a status
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "URL_GENERATED" => Some(TransactionStatus::Generated),
            "INVOICE_RECEIVED" => Some(TransactionStatus::Received),
            "INVOICE_PROCESSED" => Some(TransactionStatus::Processed),
            "INVOICE_CANCELLED" => Some(TransactionStatus::Cancelled),
            "NON_VALID_INVOICE_NUMBER" => Some(TransactionStatus::NonValidInvoiceNumber),
            "TIMEOUT" => Some(TransactionStatus::TimedOut),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
