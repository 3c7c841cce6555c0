//! Audit Event Publication
//!
//! Import failures are published as structured events on an internal
//! bus. Publication is fire-and-forget: the import flow never waits on
//! or fails because of audit delivery. The default consumer just turns
//! events into log lines; the trait seam exists so a deployment can
//! forward them to a real event bus instead.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Event source tag
pub const AUDIT_SOURCE: &str = "app.invoice";

/// Detail type for invoice lifecycle events
pub const AUDIT_DETAIL_TYPE: &str = "invoice";

/// Why an import attempt was recorded as failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditReason {
    #[serde(rename = "FAIL_NO_INVOICE_NUMBER")]
    FailNoInvoiceNumber,

    #[serde(rename = "TIMEOUT")]
    Timeout,
}

impl AuditReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditReason::FailNoInvoiceNumber => "FAIL_NO_INVOICE_NUMBER",
            AuditReason::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for AuditReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditDetail {
    pub reason: AuditReason,
}

/// Structured audit event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub source: String,
    pub detail_type: String,
    pub detail: AuditDetail,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Failure event for one import attempt
    pub fn invoice_failure(reason: AuditReason) -> Self {
        Self {
            source: AUDIT_SOURCE.to_string(),
            detail_type: AUDIT_DETAIL_TYPE.to_string(),
            detail: AuditDetail { reason },
            timestamp: Utc::now(),
        }
    }

    pub fn reason(&self) -> AuditReason {
        self.detail.reason
    }
}

/// Fire-and-forget audit publication
#[async_trait]
pub trait AuditBus: Send + Sync {
    async fn publish(&self, event: AuditEvent);
}

/// Bus backed by a bounded channel
///
/// When the queue is full the event is dropped with a warning; audit
/// pressure must never stall an import trigger.
pub struct ChannelAuditBus {
    tx: mpsc::Sender<AuditEvent>,
}

impl ChannelAuditBus {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AuditEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AuditBus for ChannelAuditBus {
    async fn publish(&self, event: AuditEvent) {
        let reason = event.reason();
        if let Err(e) = self.tx.try_send(event) {
            warn!(reason = %reason, error = %e, "Audit event dropped");
        }
    }
}

/// Default audit consumer: one structured log line per event
pub struct AuditLogWorker {
    rx: mpsc::Receiver<AuditEvent>,
}

impl AuditLogWorker {
    pub fn new(rx: mpsc::Receiver<AuditEvent>) -> Self {
        Self { rx }
    }

    /// Drain the bus until every publisher is dropped
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            warn!(
                source = %event.source,
                detail_type = %event.detail_type,
                reason = %event.reason(),
                timestamp = %event.timestamp,
                "Audit event"
            );
        }
        debug!("Audit bus closed; worker stopping");
    }
}
