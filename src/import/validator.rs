//! Invoice File Validation
//!
//! Structural checks on uploaded bytes. Every failure here lands the
//! transaction in NON_VALID_INVOICE_NUMBER; the distinction between a
//! short number and an unparseable file exists only for logs.

use thiserror::Error;

use crate::invoice::InvoiceFile;

/// Shortest invoice number accepted
pub const MIN_INVOICE_NUMBER_LEN: usize = 5;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("file is not a structurally valid invoice: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invoice number too short: {len} chars, minimum is {MIN_INVOICE_NUMBER_LEN}")]
    InvoiceNumberTooShort { len: usize },
}

/// Parse uploaded bytes and enforce structural invariants
pub fn parse_and_validate(bytes: &[u8]) -> Result<InvoiceFile, ValidationError> {
    let file: InvoiceFile = serde_json::from_slice(bytes)?;

    let len = file.invoice_number.chars().count();
    if len < MIN_INVOICE_NUMBER_LEN {
        return Err(ValidationError::InvoiceNumberTooShort { len });
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_json(invoice_number: &str) -> String {
        format!(
            r#"{{"customerEmail":"a@b.c","invoiceNumber":"{invoice_number}","totalValue":10.5,"productId":"p1","quantity":2}}"#
        )
    }

    #[test]
    fn test_valid_file_passes() {
        let file = parse_and_validate(file_json("INV-1").as_bytes()).unwrap();
        assert_eq!(file.invoice_number, "INV-1");
        assert_eq!(file.quantity, 2);
    }

    #[test]
    fn test_minimum_length_is_inclusive() {
        assert!(parse_and_validate(file_json("12345").as_bytes()).is_ok());

        let err = parse_and_validate(file_json("INV9").as_bytes()).unwrap_err();
        assert!(matches!(err, ValidationError::InvoiceNumberTooShort { len: 4 }));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // five two-byte characters pass the length check
        assert!(parse_and_validate(file_json("ñññññ").as_bytes()).is_ok());
    }

    #[test]
    fn test_non_json_bytes_are_malformed() {
        let err = parse_and_validate(b"not json at all").unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let err = parse_and_validate(br#"{"invoiceNumber":"INV-1"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn test_wrong_field_types_are_malformed() {
        let json = r#"{"customerEmail":"a@b.c","invoiceNumber":"INV-1","totalValue":"abc","productId":"p1","quantity":2}"#;
        let err = parse_and_validate(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }
}
