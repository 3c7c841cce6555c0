//! In-memory staging store
//!
//! Accepts verified uploads into a DashMap and reports each accepted
//! object on a channel, the way a bucket notification would fan out to
//! a processing trigger.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::presign::Presigner;
use super::{ObjectStore, ObjectStoreError, PresignedUpload};

/// Notification that a staged object finished uploading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCreated {
    pub key: String,
}

pub struct MemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
    presigner: Presigner,
    public_base_url: String,
    created_tx: mpsc::UnboundedSender<ObjectCreated>,
}

impl MemoryObjectStore {
    /// Build the store plus the receiving end of its created-object feed
    pub fn new(
        public_base_url: impl Into<String>,
        presign_secret: impl Into<String>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ObjectCreated>) {
        let (created_tx, created_rx) = mpsc::unbounded_channel();
        let store = Arc::new(Self {
            objects: DashMap::new(),
            presigner: Presigner::new(presign_secret),
            public_base_url: public_base_url.into(),
            created_tx,
        });
        (store, created_rx)
    }

    /// Accept an upload PUT after verifying its presigned parameters
    ///
    /// Re-uploading under a still-valid slot overwrites the object and
    /// notifies again; downstream consumers must tolerate duplicate
    /// delivery.
    pub fn store_upload(
        &self,
        key: &str,
        expires_unix: i64,
        signature_hex: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ObjectStoreError> {
        self.presigner
            .verify(key, expires_unix, signature_hex, Utc::now())?;

        let size = bytes.len();
        self.objects.insert(key.to_string(), bytes);
        debug!(key, size, "Staged uploaded object");

        if self
            .created_tx
            .send(ObjectCreated {
                key: key.to_string(),
            })
            .is_err()
        {
            warn!(key, "Object-created feed has no consumer; upload will not be processed");
        }
        Ok(())
    }

    /// Number of staged objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn presign_put(&self, key: &str, ttl_secs: u64) -> Result<PresignedUpload, ObjectStoreError> {
        let expires_unix = Utc::now().timestamp() + ttl_secs as i64;
        let signature = self.presigner.sign(key, expires_unix)?;
        Ok(PresignedUpload {
            url: format!(
                "{}/upload/{key}?expires={expires_unix}&signature={signature}",
                self.public_base_url
            ),
            key: key.to_string(),
            ttl_secs,
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.objects
            .get(key)
            .map(|bytes| bytes.clone())
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.objects.remove(key);
        Ok(())
    }
}
