//! Import Coordinator
//!
//! Orchestrates the import FSM. Each public method is one trigger
//! (slot request, file arrival, cancel); triggers for the same token
//! may run concurrently, so every status change goes through the
//! store's conditional write and losers report the authoritative
//! status instead of mutating.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::{AuditBus, AuditEvent, AuditReason};
use crate::invoice::{Invoice, InvoiceRepository};
use crate::objectstore::{ObjectCreated, ObjectStore};
use crate::store::StoreError;
use crate::transaction::{TransactionRecord, TransactionRepository, TransactionStatus, TransactionToken};
use crate::websocket::{ConnectionGateway, ConnectionId, StatusPush, UploadSlotPush};

use super::error::ImportError;
use super::validator;

/// Result of a slot request, as returned to the trigger boundary
///
/// The slot payload is pushed to the connection as well; this value
/// exists for callers that want the token without re-parsing pushes.
#[derive(Debug, Clone)]
pub struct UploadSlotIssued {
    pub token: TransactionToken,
    pub url: String,
    pub expires_in_secs: u64,
}

/// Outcome of one file-arrival delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileArrivalOutcome {
    /// Invoice persisted, record PROCESSED, connection closed
    Processed,
    /// Validation failed, record NON_VALID_INVOICE_NUMBER, audit published
    Rejected,
    /// Record was not in GENERATED; current status pushed back unchanged
    OutOfOrder(TransactionStatus),
    /// No live record behind the key
    UnknownTransaction,
    /// Staged bytes unreadable; record left in RECEIVED for the reaper
    ObjectUnavailable,
}

/// Outcome of one cancel request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// Not cancellable; current status pushed back unchanged
    Rejected(TransactionStatus),
    UnknownTransaction,
}

/// Import Coordinator - drives the transaction FSM
pub struct ImportCoordinator {
    transactions: Arc<TransactionRepository>,
    invoices: Arc<InvoiceRepository>,
    objects: Arc<dyn ObjectStore>,
    gateway: Arc<dyn ConnectionGateway>,
    audit: Arc<dyn AuditBus>,
    slot_ttl_secs: u64,
}

impl ImportCoordinator {
    pub fn new(
        transactions: Arc<TransactionRepository>,
        invoices: Arc<InvoiceRepository>,
        objects: Arc<dyn ObjectStore>,
        gateway: Arc<dyn ConnectionGateway>,
        audit: Arc<dyn AuditBus>,
        slot_ttl_secs: u64,
    ) -> Self {
        Self {
            transactions,
            invoices,
            objects,
            gateway,
            audit,
            slot_ttl_secs,
        }
    }

    /// Trigger: client asked for an upload slot
    ///
    /// Opens a GENERATED record and pushes the presigned slot payload.
    /// Record and slot share one expiry window.
    pub async fn request_slot(
        &self,
        connection_id: ConnectionId,
    ) -> Result<UploadSlotIssued, ImportError> {
        let request_context_id = Uuid::new_v4().to_string();
        let token = TransactionToken::mint();

        let slot = self
            .objects
            .presign_put(token.as_str(), self.slot_ttl_secs)
            .await?;

        let record = TransactionRecord::open(
            token.clone(),
            connection_id,
            request_context_id.clone(),
            Utc::now(),
            self.slot_ttl_secs,
        );
        self.transactions.create(record)?;

        info!(
            token = %token,
            conn_id = connection_id,
            request_context_id = %request_context_id,
            ttl_secs = self.slot_ttl_secs,
            "Upload slot issued"
        );

        let push = UploadSlotPush {
            url: slot.url.clone(),
            expires: slot.ttl_secs,
            transaction_id: token.to_string(),
        };
        if !self.push_json(connection_id, &push).await {
            warn!(token = %token, conn_id = connection_id, "Slot push undeliverable");
        }

        Ok(UploadSlotIssued {
            token,
            url: slot.url,
            expires_in_secs: slot.ttl_secs,
        })
    }

    /// Trigger: the staging store reported an uploaded object
    ///
    /// Claims GENERATED -> RECEIVED, then validates. Duplicate or late
    /// deliveries are answered with the current authoritative status
    /// and never reprocessed.
    pub async fn file_arrived(&self, key: &str) -> Result<FileArrivalOutcome, ImportError> {
        let token = TransactionToken::from(key);

        let record = match self.transactions.get(&token) {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                // A forged event, a duplicate past cleanup, or a slot
                // that expired before the upload landed. Reject toward
                // the recorded connection when one is still known.
                match self.transactions.peek(&token) {
                    Some(stale) => {
                        warn!(token = %token, "File arrived for expired transaction");
                        self.push_status(
                            stale.connection_id,
                            &token,
                            TransactionStatus::NonValidInvoiceNumber,
                        )
                        .await;
                    }
                    None => warn!(token = %token, "File arrived for unknown transaction"),
                }
                return Ok(FileArrivalOutcome::UnknownTransaction);
            }
            Err(e) => return Err(e.into()),
        };

        if !record.status.allows(TransactionStatus::Received) {
            warn!(
                token = %token,
                status = %record.status,
                "Out-of-order file arrival; reporting current status"
            );
            self.push_status(record.connection_id, &token, record.status).await;
            return Ok(FileArrivalOutcome::OutOfOrder(record.status));
        }

        match self.transactions.update_status_if(
            &token,
            TransactionStatus::Generated,
            TransactionStatus::Received,
        ) {
            Ok(true) => {
                self.push_status(record.connection_id, &token, TransactionStatus::Received)
                    .await;
            }
            Ok(false) => {
                // a concurrent delivery claimed the record first
                return match self.transactions.get(&token) {
                    Ok(current) => {
                        self.push_status(record.connection_id, &token, current.status).await;
                        Ok(FileArrivalOutcome::OutOfOrder(current.status))
                    }
                    Err(_) => Ok(FileArrivalOutcome::UnknownTransaction),
                };
            }
            Err(StoreError::PreconditionFailed(_)) => {
                warn!(token = %token, "Record expired between read and claim");
                return Ok(FileArrivalOutcome::UnknownTransaction);
            }
            Err(e) => return Err(e.into()),
        }

        self.validate_and_finish(record).await
    }

    /// Trigger: client asked to cancel a pending import
    ///
    /// Pushes the outcome to the requesting connection, which the
    /// record's own connection id need not match after a reconnect.
    pub async fn cancel(
        &self,
        token: &TransactionToken,
        requester: ConnectionId,
    ) -> Result<CancelOutcome, ImportError> {
        let record = match self.transactions.get(token) {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                warn!(token = %token, conn_id = requester, "Cancel for unknown transaction");
                self.push_status(requester, token, TransactionStatus::NonValidInvoiceNumber)
                    .await;
                return Ok(CancelOutcome::UnknownTransaction);
            }
            Err(e) => return Err(e.into()),
        };

        if !record.status.allows(TransactionStatus::Cancelled) {
            warn!(
                token = %token,
                status = %record.status,
                "Cannot cancel an ongoing import"
            );
            self.push_status(requester, token, record.status).await;
            return Ok(CancelOutcome::Rejected(record.status));
        }

        match self.transactions.update_status_if(
            token,
            TransactionStatus::Generated,
            TransactionStatus::Cancelled,
        ) {
            Ok(true) => {
                info!(token = %token, "Import cancelled");
                self.push_status(requester, token, TransactionStatus::Cancelled).await;
                Ok(CancelOutcome::Cancelled)
            }
            Ok(false) => match self.transactions.get(token) {
                Ok(current) => {
                    self.push_status(requester, token, current.status).await;
                    Ok(CancelOutcome::Rejected(current.status))
                }
                Err(_) => {
                    self.push_status(requester, token, TransactionStatus::NonValidInvoiceNumber)
                        .await;
                    Ok(CancelOutcome::UnknownTransaction)
                }
            },
            Err(StoreError::PreconditionFailed(_)) => {
                self.push_status(requester, token, TransactionStatus::NonValidInvoiceNumber)
                    .await;
                Ok(CancelOutcome::UnknownTransaction)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validation stage, entered only by the delivery that won the
    /// GENERATED -> RECEIVED claim
    async fn validate_and_finish(
        &self,
        record: TransactionRecord,
    ) -> Result<FileArrivalOutcome, ImportError> {
        let token = record.token.clone();

        let bytes = match self.objects.get(token.as_str()).await {
            Ok(bytes) => bytes,
            Err(e) => {
                // leave the record in RECEIVED; the reaper will time it out
                error!(token = %token, error = %e, "Staged object unreadable");
                return Ok(FileArrivalOutcome::ObjectUnavailable);
            }
        };

        match validator::parse_and_validate(&bytes) {
            Ok(file) => {
                let invoice = Invoice::from_file(&file, &token, Utc::now());
                match self.invoices.create(invoice) {
                    Ok(()) => info!(
                        token = %token,
                        invoice_number = %file.invoice_number,
                        "Invoice persisted"
                    ),
                    // another token already claimed this number; keep the first
                    Err(StoreError::AlreadyExists(key)) => {
                        warn!(token = %token, key = %key, "Invoice already exists; not overwritten")
                    }
                    Err(e) => return Err(e.into()),
                }

                if let Err(e) = self.objects.delete(token.as_str()).await {
                    warn!(token = %token, error = %e, "Failed to delete staged object");
                }

                if self.claim_terminal(&token, TransactionStatus::Processed).await? {
                    self.push_status(record.connection_id, &token, TransactionStatus::Processed)
                        .await;
                }
                self.gateway.close(record.connection_id).await;
                Ok(FileArrivalOutcome::Processed)
            }
            Err(reason) => {
                warn!(token = %token, error = %reason, "Invoice validation failed");

                let won = self
                    .claim_terminal(&token, TransactionStatus::NonValidInvoiceNumber)
                    .await?;
                // validation ran exactly once for this token, so the
                // audit trail gets exactly one failure event
                self.audit
                    .publish(AuditEvent::invoice_failure(AuditReason::FailNoInvoiceNumber))
                    .await;
                if won {
                    self.push_status(
                        record.connection_id,
                        &token,
                        TransactionStatus::NonValidInvoiceNumber,
                    )
                    .await;
                }
                self.gateway.close(record.connection_id).await;
                Ok(FileArrivalOutcome::Rejected)
            }
        }
    }

    /// CAS RECEIVED -> terminal; losing means the reaper swept the
    /// record mid-validation and owns the client notification
    async fn claim_terminal(
        &self,
        token: &TransactionToken,
        terminal: TransactionStatus,
    ) -> Result<bool, ImportError> {
        match self
            .transactions
            .update_status_if(token, TransactionStatus::Received, terminal)
        {
            Ok(won) => {
                if !won {
                    warn!(token = %token, terminal = %terminal, "Lost terminal claim");
                }
                Ok(won)
            }
            Err(StoreError::PreconditionFailed(_)) => {
                warn!(token = %token, terminal = %terminal, "Record swept before terminal claim");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn push_status(
        &self,
        connection_id: ConnectionId,
        token: &TransactionToken,
        status: TransactionStatus,
    ) -> bool {
        let delivered = self
            .push_json(connection_id, &StatusPush::new(token, status))
            .await;
        if !delivered {
            debug!(
                token = %token,
                conn_id = connection_id,
                status = %status,
                "Status push undeliverable"
            );
        }
        delivered
    }

    async fn push_json<T: Serialize>(&self, connection_id: ConnectionId, payload: &T) -> bool {
        match serde_json::to_value(payload) {
            Ok(value) => self.gateway.push(connection_id, value).await,
            Err(e) => {
                error!(conn_id = connection_id, error = %e, "Push payload serialization failed");
                false
            }
        }
    }
}

/// Feed staged-object notifications into the coordinator
///
/// Runs until the staging store (and with it the sending half) drops.
pub async fn run_object_created_pump(
    mut created_rx: mpsc::UnboundedReceiver<ObjectCreated>,
    coordinator: Arc<ImportCoordinator>,
) {
    while let Some(ObjectCreated { key }) = created_rx.recv().await {
        if let Err(e) = coordinator.file_arrived(&key).await {
            error!(key = %key, error = %e, "File arrival handling failed");
        }
    }
    debug!("Object-created feed closed; pump stopping");
}
