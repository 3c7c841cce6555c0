//! Transaction Store Access
//!
//! Thin repository over the in-memory table. All status updates go
//! through the conditional write; there is no unconditional set-status
//! operation.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::store::{ChangeEvent, MemoryTable, StoreError};

use super::status::TransactionStatus;
use super::types::{TransactionRecord, TransactionToken};

/// Repository for import transaction records
pub struct TransactionRepository {
    table: Arc<MemoryTable<TransactionRecord>>,
}

impl TransactionRepository {
    pub fn new() -> Self {
        Self {
            table: Arc::new(MemoryTable::new("transactions_tb")),
        }
    }

    /// Underlying table, for sweeper wiring
    pub fn table(&self) -> Arc<MemoryTable<TransactionRecord>> {
        Arc::clone(&self.table)
    }

    /// Subscribe to the record change feed
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent<TransactionRecord>> {
        self.table.subscribe()
    }

    /// Persist a freshly opened record
    ///
    /// Fails with `AlreadyExists` on token collision, which with UUID v4
    /// tokens indicates a caller bug rather than bad luck.
    pub fn create(&self, record: TransactionRecord) -> Result<(), StoreError> {
        let key = record.token.as_str().to_string();
        let expires_at = record.expires_at;
        self.table.put_if_absent(&key, record, Some(expires_at))
    }

    /// Fetch a live record; expired records read as absent
    pub fn get(&self, token: &TransactionToken) -> Result<TransactionRecord, StoreError> {
        self.table.get(token.as_str())
    }

    /// Last known image, even when the record has expired but is still
    /// awaiting sweep; used to address rejection pushes
    pub fn peek(&self, token: &TransactionToken) -> Option<TransactionRecord> {
        self.table.peek(token.as_str())
    }

    /// Conditional status write (CAS)
    ///
    /// Returns `Ok(true)` when the record was in `expected` and is now
    /// `new`, `Ok(false)` when another writer got there first, and
    /// `Err(PreconditionFailed)` when the record is missing or expired.
    pub fn update_status_if(
        &self,
        token: &TransactionToken,
        expected: TransactionStatus,
        new: TransactionStatus,
    ) -> Result<bool, StoreError> {
        self.table
            .update_if(
                token.as_str(),
                |rec| rec.status == expected,
                |rec| rec.status = new,
            )
            .map_err(|e| match e {
                StoreError::NotFound(key) => StoreError::PreconditionFailed(key),
                other => other,
            })
    }
}

impl Default for TransactionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn open_record(ttl_secs: u64) -> TransactionRecord {
        TransactionRecord::open(
            TransactionToken::mint(),
            1,
            "req-test".to_string(),
            Utc::now(),
            ttl_secs,
        )
    }

    #[test]
    fn test_create_then_get() {
        let repo = TransactionRepository::new();
        let rec = open_record(120);
        let token = rec.token.clone();

        repo.create(rec.clone()).unwrap();
        assert_eq!(repo.get(&token).unwrap(), rec);
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let repo = TransactionRepository::new();
        let rec = open_record(120);
        repo.create(rec.clone()).unwrap();

        let err = repo.create(rec).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn test_cas_success_and_loss() {
        let repo = TransactionRepository::new();
        let rec = open_record(120);
        let token = rec.token.clone();
        repo.create(rec).unwrap();

        let won = repo
            .update_status_if(&token, TransactionStatus::Generated, TransactionStatus::Received)
            .unwrap();
        assert!(won);
        assert_eq!(repo.get(&token).unwrap().status, TransactionStatus::Received);

        // second writer expecting GENERATED loses cleanly
        let won = repo
            .update_status_if(&token, TransactionStatus::Generated, TransactionStatus::Cancelled)
            .unwrap();
        assert!(!won);
        assert_eq!(repo.get(&token).unwrap().status, TransactionStatus::Received);
    }

    #[test]
    fn test_cas_on_missing_record_is_precondition_failure() {
        let repo = TransactionRepository::new();
        let token = TransactionToken::mint();

        let err = repo
            .update_status_if(&token, TransactionStatus::Generated, TransactionStatus::Received)
            .unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed(_)));
    }

    #[test]
    fn test_expired_record_is_gone_for_reads_and_cas() {
        let repo = TransactionRepository::new();
        let mut rec = open_record(120);
        rec.expires_at = Utc::now() - Duration::seconds(1);
        let token = rec.token.clone();
        repo.create(rec).unwrap();

        assert!(matches!(repo.get(&token), Err(StoreError::NotFound(_))));
        let err = repo
            .update_status_if(&token, TransactionStatus::Generated, TransactionStatus::Received)
            .unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed(_)));

        // peek still sees the stale image until the sweeper runs
        assert_eq!(repo.peek(&token).map(|r| r.connection_id), Some(1));
    }
}
