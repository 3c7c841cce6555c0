//! Invoice Core Types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::transaction::TransactionToken;

/// Uploaded file payload, as clients stage it
///
/// Field names follow the upload contract; unknown extra fields are
/// tolerated.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFile {
    pub customer_email: String,
    pub invoice_number: String,
    pub total_value: Decimal,
    pub product_id: String,
    pub quantity: u32,
}

/// Persisted invoice, extracted from a validated upload
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    /// Partition identifier derived from the customer email
    pub customer_key: String,
    /// Uniqueness key within the customer partition
    pub invoice_number: String,
    pub total_value: Decimal,
    pub product_id: String,
    pub quantity: u32,
    /// Import attempt that produced this invoice
    pub transaction_token: TransactionToken,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Normalize a customer email into a partition key
    pub fn customer_key_for(email: &str) -> String {
        email.trim().to_ascii_lowercase()
    }

    /// Storage key: customer partition plus invoice number
    pub fn key_for(customer_key: &str, invoice_number: &str) -> String {
        format!("{customer_key}#{invoice_number}")
    }

    pub fn storage_key(&self) -> String {
        Self::key_for(&self.customer_key, &self.invoice_number)
    }

    /// Build the persisted form from a validated upload
    pub fn from_file(file: &InvoiceFile, token: &TransactionToken, now: DateTime<Utc>) -> Self {
        Self {
            customer_key: Self::customer_key_for(&file.customer_email),
            invoice_number: file.invoice_number.clone(),
            total_value: file.total_value,
            product_id: file.product_id.clone(),
            quantity: file.quantity,
            transaction_token: token.clone(),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_key_normalization() {
        assert_eq!(Invoice::customer_key_for("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn test_from_file_mapping() {
        let file: InvoiceFile = serde_json::from_str(
            r#"{
                "customerEmail": "Buyer@shop.io",
                "invoiceNumber": "INV-20240101",
                "totalValue": "149.90",
                "productId": "sku-42",
                "quantity": 3
            }"#,
        )
        .unwrap();

        let token = TransactionToken::from("tok-1");
        let now = Utc::now();
        let invoice = Invoice::from_file(&file, &token, now);

        assert_eq!(invoice.customer_key, "buyer@shop.io");
        assert_eq!(invoice.invoice_number, "INV-20240101");
        assert_eq!(invoice.total_value.to_string(), "149.90");
        assert_eq!(invoice.quantity, 3);
        assert_eq!(invoice.transaction_token, token);
        assert_eq!(invoice.storage_key(), "buyer@shop.io#INV-20240101");
    }

    #[test]
    fn test_file_parsing_tolerates_extra_fields() {
        let file: InvoiceFile = serde_json::from_str(
            r#"{"customerEmail":"a@b.c","invoiceNumber":"12345","totalValue":10.5,"productId":"p","quantity":1,"note":"ignored"}"#,
        )
        .unwrap();
        assert_eq!(file.invoice_number, "12345");
        // bare JSON numbers accepted as well
        assert_eq!(file.total_value.to_string(), "10.5");
    }
}
