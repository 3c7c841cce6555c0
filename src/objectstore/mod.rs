//! Staging Object Store
//!
//! Uploaded invoice files are staged as raw objects, keyed by the
//! transaction token. Writers never talk to the store directly: they
//! get a presigned, TTL-bounded upload URL and PUT through the
//! gateway, which verifies the signature before accepting bytes.

pub mod memory;
pub mod presign;

pub use memory::{MemoryObjectStore, ObjectCreated};
pub use presign::Presigner;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectStoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("upload signature does not match")]
    SignatureMismatch,

    #[error("upload signature is not valid hex")]
    InvalidSignatureFormat,

    #[error("upload slot expired")]
    SlotExpired,

    #[error("presign secret rejected by HMAC")]
    InvalidSecret,
}

/// A slot a client may PUT one object into before it expires
#[derive(Debug, Clone)]
pub struct PresignedUpload {
    pub url: String,
    pub key: String,
    pub ttl_secs: u64,
}

/// Object staging operations used by the import flow
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Issue a presigned PUT URL for `key`, valid for `ttl_secs`
    async fn presign_put(&self, key: &str, ttl_secs: u64) -> Result<PresignedUpload, ObjectStoreError>;

    /// Fetch a staged object's bytes
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    /// Remove a staged object; removing a missing key is a no-op
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
}
