pub mod handlers;
pub mod state;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, put},
};
use tokio::net::TcpListener;

use crate::audit::{AuditBus, AuditLogWorker, ChannelAuditBus};
use crate::config::AppConfig;
use crate::import::{ExpiryReaper, ImportCoordinator, run_object_created_pump};
use crate::invoice::{InvoiceEventLog, InvoiceEventsRecorder, InvoiceRepository};
use crate::objectstore::MemoryObjectStore;
use crate::transaction::TransactionRepository;
use crate::websocket::{ConnectionRegistry, ws_handler};

use state::AppState;

/// Wire every service and spawn the background workers
///
/// Must be called inside a tokio runtime: the expiry reaper, the TTL
/// sweepers, the audit worker and the object-created pump are all
/// spawned here. Feed subscriptions happen before the first possible
/// write so no change event can slip past a worker.
pub fn bootstrap(config: &AppConfig) -> Arc<AppState> {
    let transactions = Arc::new(TransactionRepository::new());
    let invoices = Arc::new(InvoiceRepository::new());
    let event_log = Arc::new(InvoiceEventLog::new());

    let (objects, created_rx) = MemoryObjectStore::new(
        config.gateway.public_base_url.clone(),
        config.object_store.presign_secret.clone(),
    );

    let registry = Arc::new(ConnectionRegistry::new());
    let (audit_bus, audit_rx) = ChannelAuditBus::new(config.audit.queue_size);
    let audit: Arc<dyn AuditBus> = Arc::new(audit_bus);

    let reaper = ExpiryReaper::new(transactions.subscribe(), registry.clone(), audit.clone());
    let recorder = InvoiceEventsRecorder::new(event_log.clone(), invoices.subscribe());

    let coordinator = Arc::new(ImportCoordinator::new(
        transactions.clone(),
        invoices.clone(),
        objects.clone(),
        registry.clone(),
        audit.clone(),
        config.import.slot_ttl_secs,
    ));

    let sweep_interval = Duration::from_millis(config.import.sweep_interval_ms);
    tokio::spawn(transactions.table().run_sweeper(sweep_interval));
    tokio::spawn(event_log.table().run_sweeper(sweep_interval));
    tokio::spawn(reaper.run());
    tokio::spawn(recorder.run());
    tokio::spawn(AuditLogWorker::new(audit_rx).run());
    tokio::spawn(run_object_created_pump(created_rx, coordinator.clone()));

    Arc::new(AppState::new(coordinator, registry, objects))
}

/// Assemble the HTTP surface over an already-bootstrapped state
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/upload/{key}", put(handlers::upload_invoice))
        .route("/api/v1/health", get(handlers::health_check))
        .with_state(state)
}

/// Start the HTTP gateway server
pub async fn run_server(config: &AppConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("🚀 Invoice relay listening on http://{}", addr);
    println!("📡 WebSocket endpoint: ws://{}/ws", addr);
    println!(
        "📦 Upload endpoint:   PUT {}/upload/{{key}}",
        config.gateway.public_base_url
    );

    axum::serve(listener, app)
        .await
        .context("Gateway server error")?;
    Ok(())
}
