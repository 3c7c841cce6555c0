//! Invoice Store Access
//!
//! Append-only: invoices are created once and never mutated or
//! removed. The change feed therefore only ever carries inserts.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::store::{ChangeEvent, MemoryTable, StoreError};

use super::types::Invoice;

pub struct InvoiceRepository {
    table: Arc<MemoryTable<Invoice>>,
}

impl InvoiceRepository {
    pub fn new() -> Self {
        Self {
            table: Arc::new(MemoryTable::new("invoices_tb")),
        }
    }

    /// Subscribe to the invoice change feed
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent<Invoice>> {
        self.table.subscribe()
    }

    /// Persist an extracted invoice
    ///
    /// Fails with `AlreadyExists` when the customer partition already
    /// holds an invoice under the same number.
    pub fn create(&self, invoice: Invoice) -> Result<(), StoreError> {
        let key = invoice.storage_key();
        self.table.put_if_absent(&key, invoice, None)
    }

    /// Point lookup by customer partition and invoice number
    pub fn get(&self, customer_key: &str, invoice_number: &str) -> Result<Invoice, StoreError> {
        self.table.get(&Invoice::key_for(customer_key, invoice_number))
    }

    /// Number of stored invoices
    pub fn count(&self) -> usize {
        self.table.len()
    }
}

impl Default for InvoiceRepository {
    fn default() -> Self {
        Self::new()
    }
}
