//! Import Error Types

use thiserror::Error;

use crate::objectstore::ObjectStoreError;
use crate::store::StoreError;

/// Infrastructure failures surfaced by trigger handlers
///
/// Business outcomes (rejection, out-of-order delivery, unknown token)
/// are not errors; they are reported as trigger outcomes. Only faults
/// the handler cannot convert into a business status end up here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("transaction store: {0}")]
    Store(#[from] StoreError),

    #[error("object store: {0}")]
    ObjectStore(#[from] ObjectStoreError),
}
