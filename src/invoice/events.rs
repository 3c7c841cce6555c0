//! Invoice Created-Event Trail
//!
//! Tails the invoice change feed and records a short-lived
//! INVOICE_CREATED row per insert. The trail is a debugging aid, not a
//! system of record, so rows expire after an hour.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{ChangeEvent, MemoryTable};
use crate::transaction::TransactionToken;

use super::types::Invoice;

pub const INVOICE_CREATED: &str = "INVOICE_CREATED";

/// How long a recorded event stays queryable
const EVENT_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceEvent {
    pub event_type: &'static str,
    pub invoice_number: String,
    pub customer_key: String,
    pub product_id: String,
    pub quantity: u32,
    pub transaction_token: TransactionToken,
    pub recorded_at: DateTime<Utc>,
}

/// TTL-bounded table of invoice lifecycle events
pub struct InvoiceEventLog {
    table: Arc<MemoryTable<InvoiceEvent>>,
}

impl InvoiceEventLog {
    pub fn new() -> Self {
        Self {
            table: Arc::new(MemoryTable::new("invoice_events_tb")),
        }
    }

    /// Underlying table, for sweeper wiring
    pub fn table(&self) -> Arc<MemoryTable<InvoiceEvent>> {
        Arc::clone(&self.table)
    }

    pub fn record_created(&self, invoice: &Invoice, now: DateTime<Utc>) {
        let event = InvoiceEvent {
            event_type: INVOICE_CREATED,
            invoice_number: invoice.invoice_number.clone(),
            customer_key: invoice.customer_key.clone(),
            product_id: invoice.product_id.clone(),
            quantity: invoice.quantity,
            transaction_token: invoice.transaction_token.clone(),
            recorded_at: now,
        };
        let key = format!(
            "{}#{INVOICE_CREATED}#{}",
            invoice.invoice_number,
            Uuid::new_v4()
        );
        let expires_at = now + Duration::seconds(EVENT_TTL_SECS);
        if let Err(e) = self.table.put_if_absent(&key, event, Some(expires_at)) {
            warn!(error = %e, key = %key, "Failed to record invoice event");
        }
    }

    /// Events recorded for one invoice number
    pub fn events_for(&self, invoice_number: &str) -> Vec<InvoiceEvent> {
        self.table.scan_prefix(&format!("{invoice_number}#"))
    }
}

impl Default for InvoiceEventLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker that turns invoice inserts into trail rows
pub struct InvoiceEventsRecorder {
    log: Arc<InvoiceEventLog>,
    feed: broadcast::Receiver<ChangeEvent<Invoice>>,
}

impl InvoiceEventsRecorder {
    pub fn new(log: Arc<InvoiceEventLog>, feed: broadcast::Receiver<ChangeEvent<Invoice>>) -> Self {
        Self { log, feed }
    }

    /// Consume the feed until the publishing table is dropped
    pub async fn run(mut self) {
        loop {
            match self.feed.recv().await {
                Ok(event) => self.handle(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Invoice feed lagged; events lost");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Invoice feed closed; recorder stopping");
                    break;
                }
            }
        }
    }

    /// Handle one feed event; public for direct-drive tests
    pub fn handle(&self, event: ChangeEvent<Invoice>) {
        match event {
            ChangeEvent::Insert { after } => {
                self.log.record_created(&after, Utc::now());
                debug!(
                    invoice_number = %after.invoice_number,
                    customer_key = %after.customer_key,
                    "Recorded INVOICE_CREATED event"
                );
            }
            // invoices are append-only; nothing else to record
            other => debug!(kind = other.kind(), "Ignoring invoice feed event"),
        }
    }
}
