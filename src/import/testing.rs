//! Shared test doubles for the import flow

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::audit::{AuditBus, AuditEvent, AuditReason};
use crate::websocket::{ConnectionGateway, ConnectionId};

/// Recording gateway double
///
/// Captures every push and close. `set_fail_push` simulates a peer
/// that is gone.
pub struct MockGateway {
    fail_push: AtomicBool,
    pushes: Mutex<Vec<(ConnectionId, Value)>>,
    closed: Mutex<Vec<ConnectionId>>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_push: AtomicBool::new(false),
            pushes: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
        })
    }

    pub fn set_fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    /// Every delivered payload for one connection, in push order
    pub fn pushes_for(&self, id: ConnectionId) -> Vec<Value> {
        self.pushes
            .lock()
            .unwrap()
            .iter()
            .filter(|(conn, _)| *conn == id)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Status strings pushed to one connection, skipping non-status payloads
    pub fn statuses_for(&self, id: ConnectionId) -> Vec<String> {
        self.pushes_for(id)
            .iter()
            .filter_map(|payload| payload.get("status"))
            .filter_map(|status| status.as_str())
            .map(|status| status.to_string())
            .collect()
    }

    pub fn closed(&self) -> Vec<ConnectionId> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConnectionGateway for MockGateway {
    async fn is_alive(&self, _id: ConnectionId) -> bool {
        !self.fail_push.load(Ordering::SeqCst)
    }

    async fn push(&self, id: ConnectionId, payload: Value) -> bool {
        if self.fail_push.load(Ordering::SeqCst) {
            return false;
        }
        self.pushes.lock().unwrap().push((id, payload));
        true
    }

    async fn close(&self, id: ConnectionId) {
        self.closed.lock().unwrap().push(id);
    }
}

/// Audit bus double that records every published event
pub struct RecordingAuditBus {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn reasons(&self) -> Vec<AuditReason> {
        self.events().iter().map(|e| e.reason()).collect()
    }
}

#[async_trait]
impl AuditBus for RecordingAuditBus {
    async fn publish(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}
