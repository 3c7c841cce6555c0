//! Invoice Domain
//!
//! Persisted invoices extracted from validated uploads, plus the
//! short-lived INVOICE_CREATED event trail fed by the invoice change
//! feed.

pub mod events;
pub mod repository;
pub mod types;

pub use events::{InvoiceEventLog, InvoiceEventsRecorder};
pub use repository::InvoiceRepository;
pub use types::{Invoice, InvoiceFile};
