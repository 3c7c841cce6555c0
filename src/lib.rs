//! Invoice Relay - invoice import backend
//!
//! Customers open a duplex connection, request an upload slot, and PUT
//! an invoice file against the presigned URL they get back. Every later
//! step is asynchronous: object-created notifications drive validation,
//! a change-feed reaper times out abandoned slots, and each status move
//! is pushed back over the originating connection.
//!
//! # Modules
//!
//! - [`store`] - In-memory tables with TTL and per-table change feeds
//! - [`transaction`] - Import transaction records and their status FSM
//! - [`invoice`] - Parsed invoices and the created-event trail
//! - [`objectstore`] - Presigned upload staging
//! - [`websocket`] - Live connection registry and socket handling
//! - [`audit`] - Fire-and-forget audit event bus
//! - [`import`] - Orchestration: slots, arrivals, cancels, reaping
//! - [`gateway`] - HTTP surface and service wiring

pub mod audit;
pub mod config;
pub mod gateway;
pub mod import;
pub mod invoice;
pub mod logging;
pub mod objectstore;
pub mod store;
pub mod transaction;
pub mod websocket;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use import::{CancelOutcome, FileArrivalOutcome, ImportCoordinator, UploadSlotIssued};
pub use invoice::{Invoice, InvoiceFile};
pub use transaction::{TransactionRecord, TransactionStatus, TransactionToken};
pub use websocket::{ConnectionId, ConnectionRegistry};
