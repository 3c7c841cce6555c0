//! Expiry Reaper
//!
//! Consumes the transaction store's change feed and reacts to record
//! removals. Removal of a PROCESSED record is routine cleanup; any
//! other removal means the import died mid-flight, so the reaper
//! publishes a TIMEOUT audit event, makes a best-effort TIMEOUT push
//! and force-closes the stale connection.
//!
//! Delivery is at-least-once with no ordering guarantee; every action
//! taken here is idempotent or tolerated when repeated.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditBus, AuditEvent, AuditReason};
use crate::store::ChangeEvent;
use crate::transaction::{TransactionRecord, TransactionStatus};
use crate::websocket::{ConnectionGateway, StatusPush};

pub struct ExpiryReaper {
    feed: broadcast::Receiver<ChangeEvent<TransactionRecord>>,
    gateway: Arc<dyn ConnectionGateway>,
    audit: Arc<dyn AuditBus>,
}

impl ExpiryReaper {
    pub fn new(
        feed: broadcast::Receiver<ChangeEvent<TransactionRecord>>,
        gateway: Arc<dyn ConnectionGateway>,
        audit: Arc<dyn AuditBus>,
    ) -> Self {
        Self {
            feed,
            gateway,
            audit,
        }
    }

    /// Consume the feed until the publishing table is dropped
    pub async fn run(mut self) {
        info!("Starting expiry reaper");
        loop {
            match self.feed.recv().await {
                Ok(ChangeEvent::Remove { before }) => self.handle_removed(before).await,
                // inserts and in-place updates are not reaper business
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change feed lagged; some expiries went unobserved");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Change feed closed; reaper stopping");
                    break;
                }
            }
        }
    }

    /// React to one removed record; public for direct-drive tests
    pub async fn handle_removed(&self, before: TransactionRecord) {
        match before.status {
            TransactionStatus::Processed => {
                debug!(token = %before.token, "Expired after completion; cleanup only");
            }
            TransactionStatus::Generated
            | TransactionStatus::Received
            | TransactionStatus::Cancelled
            | TransactionStatus::NonValidInvoiceNumber
            | TransactionStatus::TimedOut => {
                warn!(
                    token = %before.token,
                    status = %before.status,
                    conn_id = before.connection_id,
                    "Transaction timed out before completion"
                );

                self.audit
                    .publish(AuditEvent::invoice_failure(AuditReason::Timeout))
                    .await;

                let push = StatusPush::new(&before.token, TransactionStatus::TimedOut);
                match serde_json::to_value(&push) {
                    Ok(payload) => {
                        if !self.gateway.push(before.connection_id, payload).await {
                            debug!(
                                token = %before.token,
                                conn_id = before.connection_id,
                                "Timeout push undeliverable"
                            );
                        }
                    }
                    Err(e) => error!(error = %e, "Timeout payload serialization failed"),
                }

                self.gateway.close(before.connection_id).await;
            }
        }
    }
}
