//! Integration Tests for the Import FSM
//!
//! Drive the coordinator end to end against the in-memory stores, a
//! recording gateway and a recording audit bus. No sockets involved;
//! the HTTP/WebSocket surface is covered by the QA suite.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::mpsc;

use crate::audit::{AuditBus, AuditReason};
use crate::import::coordinator::{
    CancelOutcome, FileArrivalOutcome, ImportCoordinator, UploadSlotIssued, run_object_created_pump,
};
use crate::import::testing::{MockGateway, RecordingAuditBus};
use crate::invoice::InvoiceRepository;
use crate::objectstore::{MemoryObjectStore, ObjectCreated, ObjectStore};
use crate::transaction::{
    TransactionRecord, TransactionRepository, TransactionStatus, TransactionToken,
};
use crate::websocket::{ConnectionGateway, ConnectionId};

const SLOT_TTL_SECS: u64 = 120;

/// Coordinator wired to in-memory collaborators and recording doubles
struct TestHarness {
    coordinator: Arc<ImportCoordinator>,
    transactions: Arc<TransactionRepository>,
    invoices: Arc<InvoiceRepository>,
    objects: Arc<MemoryObjectStore>,
    created_rx: mpsc::UnboundedReceiver<ObjectCreated>,
    gateway: Arc<MockGateway>,
    audit: Arc<RecordingAuditBus>,
}

impl TestHarness {
    fn new() -> Self {
        let transactions = Arc::new(TransactionRepository::new());
        let invoices = Arc::new(InvoiceRepository::new());
        let (objects, created_rx) = MemoryObjectStore::new("http://localhost:9300", "test-secret");
        let gateway = MockGateway::new();
        let audit = RecordingAuditBus::new();

        let coordinator = Arc::new(ImportCoordinator::new(
            transactions.clone(),
            invoices.clone(),
            objects.clone() as Arc<dyn ObjectStore>,
            gateway.clone() as Arc<dyn ConnectionGateway>,
            audit.clone() as Arc<dyn AuditBus>,
            SLOT_TTL_SECS,
        ));

        Self {
            coordinator,
            transactions,
            invoices,
            objects,
            created_rx,
            gateway,
            audit,
        }
    }

    /// PUT a body through the slot's presigned URL parameters
    fn upload(&self, slot: &UploadSlotIssued, body: &str) {
        let query = slot.url.split_once('?').unwrap().1;
        let mut expires = 0i64;
        let mut signature = String::new();
        for pair in query.split('&') {
            let (k, v) = pair.split_once('=').unwrap();
            match k {
                "expires" => expires = v.parse().unwrap(),
                "signature" => signature = v.to_string(),
                _ => {}
            }
        }
        self.objects
            .store_upload(slot.token.as_str(), expires, &signature, body.as_bytes().to_vec())
            .unwrap();
    }

    fn valid_invoice_json(invoice_number: &str) -> String {
        format!(
            r#"{{"customerEmail":"buyer@shop.io","invoiceNumber":"{invoice_number}","totalValue":149.90,"productId":"sku-42","quantity":3}}"#
        )
    }
}

const CONN: ConnectionId = 7;

// ========================================================================
// Happy Path
// ========================================================================

/// Slot, upload, delivery: invoice persisted, pushes [RECEIVED, PROCESSED],
/// staged object deleted, connection closed once
#[tokio::test]
async fn test_import_happy_path() {
    let harness = TestHarness::new();

    let slot = harness.coordinator.request_slot(CONN).await.unwrap();
    assert_eq!(slot.expires_in_secs, SLOT_TTL_SECS);

    // record opens in GENERATED with the slot's expiry window
    let record = harness.transactions.get(&slot.token).unwrap();
    assert_eq!(record.status, TransactionStatus::Generated);
    assert_eq!(record.connection_id, CONN);
    assert_eq!(
        record.expires_at - record.created_at,
        Duration::seconds(SLOT_TTL_SECS as i64)
    );

    harness.upload(&slot, &TestHarness::valid_invoice_json("INV-20240101"));
    let outcome = harness.coordinator.file_arrived(slot.token.as_str()).await.unwrap();
    assert_eq!(outcome, FileArrivalOutcome::Processed);

    // invoice retrievable under the uploaded number
    let invoice = harness.invoices.get("buyer@shop.io", "INV-20240101").unwrap();
    assert_eq!(invoice.transaction_token, slot.token);
    assert_eq!(invoice.quantity, 3);

    // staged object cleaned up
    assert!(harness.objects.get(slot.token.as_str()).await.is_err());

    // slot payload first, then the two status pushes, then close
    let pushes = harness.gateway.pushes_for(CONN);
    assert_eq!(pushes[0]["transactionId"], slot.token.as_str());
    assert!(pushes[0]["url"].as_str().unwrap().contains(slot.token.as_str()));
    assert_eq!(
        harness.gateway.statuses_for(CONN),
        vec!["INVOICE_RECEIVED", "INVOICE_PROCESSED"]
    );
    assert_eq!(harness.gateway.closed(), vec![CONN]);

    assert_eq!(
        harness.transactions.get(&slot.token).unwrap().status,
        TransactionStatus::Processed
    );
    assert!(harness.audit.reasons().is_empty());
}

/// The pump drives file_arrived from the staging store's notifications
#[tokio::test]
async fn test_object_created_pump_processes_uploads() {
    let mut harness = TestHarness::new();
    let slot = harness.coordinator.request_slot(CONN).await.unwrap();

    let created_rx = std::mem::replace(&mut harness.created_rx, mpsc::unbounded_channel().1);
    let pump = tokio::spawn(run_object_created_pump(created_rx, harness.coordinator.clone()));

    harness.upload(&slot, &TestHarness::valid_invoice_json("INV-PUMPED"));

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while harness.invoices.get("buyer@shop.io", "INV-PUMPED").is_err() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "pump never processed the upload"
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    pump.abort();
}

// ========================================================================
// Idempotency / Out-of-Order Triggers
// ========================================================================

/// Duplicate delivery never re-imports; it reports the current status
#[tokio::test]
async fn test_duplicate_file_arrival_is_rejected() {
    let harness = TestHarness::new();
    let slot = harness.coordinator.request_slot(CONN).await.unwrap();
    harness.upload(&slot, &TestHarness::valid_invoice_json("INV-20240101"));

    let first = harness.coordinator.file_arrived(slot.token.as_str()).await.unwrap();
    assert_eq!(first, FileArrivalOutcome::Processed);

    let second = harness.coordinator.file_arrived(slot.token.as_str()).await.unwrap();
    assert_eq!(
        second,
        FileArrivalOutcome::OutOfOrder(TransactionStatus::Processed)
    );

    // exactly one invoice; the duplicate answered with the current status
    assert_eq!(harness.invoices.count(), 1);
    assert_eq!(
        harness.gateway.statuses_for(CONN),
        vec!["INVOICE_RECEIVED", "INVOICE_PROCESSED", "INVOICE_PROCESSED"]
    );
}

/// File arrival for a token nobody issued: no record, no pushes
#[tokio::test]
async fn test_file_arrival_for_unknown_token() {
    let harness = TestHarness::new();

    let outcome = harness.coordinator.file_arrived("no-such-token").await.unwrap();
    assert_eq!(outcome, FileArrivalOutcome::UnknownTransaction);
    assert!(harness.gateway.pushes_for(CONN).is_empty());
}

/// Upload landing after expiry: rejection pushed to the stale record's
/// connection while it is still awaiting sweep
#[tokio::test]
async fn test_file_arrival_for_expired_unswept_record() {
    let harness = TestHarness::new();

    let mut record = TransactionRecord::open(
        TransactionToken::mint(),
        CONN,
        "req-expired".to_string(),
        Utc::now() - Duration::seconds(300),
        SLOT_TTL_SECS,
    );
    record.expires_at = Utc::now() - Duration::seconds(1);
    let token = record.token.clone();
    harness.transactions.create(record).unwrap();

    let outcome = harness.coordinator.file_arrived(token.as_str()).await.unwrap();
    assert_eq!(outcome, FileArrivalOutcome::UnknownTransaction);
    assert_eq!(
        harness.gateway.statuses_for(CONN),
        vec!["NON_VALID_INVOICE_NUMBER"]
    );
    // the rejection is about the event; the stale record is untouched
    assert_eq!(
        harness.transactions.peek(&token).unwrap().status,
        TransactionStatus::Generated
    );
}

// ========================================================================
// Validation Failures
// ========================================================================

/// Short invoice number: one audit event, failure push, close, no invoice
#[tokio::test]
async fn test_short_invoice_number_is_rejected() {
    let harness = TestHarness::new();
    let slot = harness.coordinator.request_slot(CONN).await.unwrap();
    harness.upload(&slot, &TestHarness::valid_invoice_json("INV9"));

    let outcome = harness.coordinator.file_arrived(slot.token.as_str()).await.unwrap();
    assert_eq!(outcome, FileArrivalOutcome::Rejected);

    assert_eq!(harness.audit.reasons(), vec![AuditReason::FailNoInvoiceNumber]);
    assert_eq!(harness.invoices.count(), 0);
    assert_eq!(
        harness.gateway.statuses_for(CONN),
        vec!["INVOICE_RECEIVED", "NON_VALID_INVOICE_NUMBER"]
    );
    assert_eq!(harness.gateway.closed(), vec![CONN]);
    assert_eq!(
        harness.transactions.get(&slot.token).unwrap().status,
        TransactionStatus::NonValidInvoiceNumber
    );
}

/// Unparseable bytes take the same rejection path as a short number
#[tokio::test]
async fn test_malformed_upload_is_rejected() {
    let harness = TestHarness::new();
    let slot = harness.coordinator.request_slot(CONN).await.unwrap();
    harness.upload(&slot, "these bytes are not an invoice");

    let outcome = harness.coordinator.file_arrived(slot.token.as_str()).await.unwrap();
    assert_eq!(outcome, FileArrivalOutcome::Rejected);

    assert_eq!(harness.audit.reasons(), vec![AuditReason::FailNoInvoiceNumber]);
    assert_eq!(harness.invoices.count(), 0);
    assert_eq!(
        harness.gateway.statuses_for(CONN),
        vec!["INVOICE_RECEIVED", "NON_VALID_INVOICE_NUMBER"]
    );
}

// ========================================================================
// Cancellation
// ========================================================================

/// Cancel before the file arrives: CANCELLED pushed, record terminal
#[tokio::test]
async fn test_cancel_pending_import() {
    let harness = TestHarness::new();
    let slot = harness.coordinator.request_slot(CONN).await.unwrap();

    let outcome = harness.coordinator.cancel(&slot.token, CONN).await.unwrap();
    assert_eq!(outcome, CancelOutcome::Cancelled);
    assert_eq!(harness.gateway.statuses_for(CONN), vec!["INVOICE_CANCELLED"]);
    assert_eq!(
        harness.transactions.get(&slot.token).unwrap().status,
        TransactionStatus::Cancelled
    );

    // a file landing afterwards is answered with CANCELLED, not imported
    harness.upload(&slot, &TestHarness::valid_invoice_json("INV-20240101"));
    let late = harness.coordinator.file_arrived(slot.token.as_str()).await.unwrap();
    assert_eq!(late, FileArrivalOutcome::OutOfOrder(TransactionStatus::Cancelled));
    assert_eq!(harness.invoices.count(), 0);
}

/// Cancel after completion: no mutation, no CANCELLED push
#[tokio::test]
async fn test_cancel_completed_import_is_rejected() {
    let harness = TestHarness::new();
    let slot = harness.coordinator.request_slot(CONN).await.unwrap();
    harness.upload(&slot, &TestHarness::valid_invoice_json("INV-20240101"));
    harness.coordinator.file_arrived(slot.token.as_str()).await.unwrap();

    let outcome = harness.coordinator.cancel(&slot.token, CONN).await.unwrap();
    assert_eq!(outcome, CancelOutcome::Rejected(TransactionStatus::Processed));

    let statuses = harness.gateway.statuses_for(CONN);
    assert!(!statuses.contains(&"INVOICE_CANCELLED".to_string()));
    assert_eq!(statuses.last().unwrap(), "INVOICE_PROCESSED");
    assert_eq!(
        harness.transactions.get(&slot.token).unwrap().status,
        TransactionStatus::Processed
    );
}

/// Cancel for a token that was never issued
#[tokio::test]
async fn test_cancel_unknown_token() {
    let harness = TestHarness::new();
    let token = TransactionToken::from("never-issued");

    let outcome = harness.coordinator.cancel(&token, CONN).await.unwrap();
    assert_eq!(outcome, CancelOutcome::UnknownTransaction);
    assert_eq!(
        harness.gateway.statuses_for(CONN),
        vec!["NON_VALID_INVOICE_NUMBER"]
    );
}

// ========================================================================
// Degraded Transport
// ========================================================================

/// A vanished client changes nothing about the import itself
#[tokio::test]
async fn test_import_completes_with_dead_connection() {
    let harness = TestHarness::new();
    let slot = harness.coordinator.request_slot(CONN).await.unwrap();
    harness.gateway.set_fail_push(true);

    harness.upload(&slot, &TestHarness::valid_invoice_json("INV-20240101"));
    let outcome = harness.coordinator.file_arrived(slot.token.as_str()).await.unwrap();

    assert_eq!(outcome, FileArrivalOutcome::Processed);
    assert_eq!(harness.invoices.count(), 1);
    assert_eq!(
        harness.transactions.get(&slot.token).unwrap().status,
        TransactionStatus::Processed
    );
    // teardown still runs
    assert_eq!(harness.gateway.closed(), vec![CONN]);
}
