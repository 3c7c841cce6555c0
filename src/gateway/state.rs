use std::sync::Arc;

use crate::import::ImportCoordinator;
use crate::objectstore::MemoryObjectStore;
use crate::websocket::ConnectionRegistry;

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    /// Import orchestration (slot issuance, uploads, cancels)
    pub coordinator: Arc<ImportCoordinator>,
    /// Live duplex connections; doubles as the push gateway
    pub registry: Arc<ConnectionRegistry>,
    /// Upload target. Concrete type because the PUT handler needs
    /// signature verification, not just the `ObjectStore` trait surface.
    pub objects: Arc<MemoryObjectStore>,
}

impl AppState {
    pub fn new(
        coordinator: Arc<ImportCoordinator>,
        registry: Arc<ConnectionRegistry>,
        objects: Arc<MemoryObjectStore>,
    ) -> Self {
        Self {
            coordinator,
            registry,
            objects,
        }
    }
}
