//! Upload URL signing
//!
//! HMAC-SHA256 over `"{key}\n{expires_unix}"`, hex-encoded. The same
//! signer verifies incoming PUTs, so a URL is exactly as trustworthy
//! as the secret it was minted with.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::ObjectStoreError;

type HmacSha256 = Hmac<Sha256>;

pub struct Presigner {
    secret: String,
}

impl Presigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac_for(&self, key: &str, expires_unix: i64) -> Result<HmacSha256, ObjectStoreError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| ObjectStoreError::InvalidSecret)?;
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires_unix.to_string().as_bytes());
        Ok(mac)
    }

    /// Hex signature binding `key` to its expiry instant
    pub fn sign(&self, key: &str, expires_unix: i64) -> Result<String, ObjectStoreError> {
        let mac = self.mac_for(key, expires_unix)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify an incoming upload against its claimed signature
    ///
    /// Signature validity is checked before expiry, so a forged URL
    /// learns nothing about slot lifetimes.
    pub fn verify(
        &self,
        key: &str,
        expires_unix: i64,
        signature_hex: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ObjectStoreError> {
        let claimed =
            hex::decode(signature_hex).map_err(|_| ObjectStoreError::InvalidSignatureFormat)?;

        // Constant-time comparison
        let mac = self.mac_for(key, expires_unix)?;
        mac.verify_slice(&claimed)
            .map_err(|_| ObjectStoreError::SignatureMismatch)?;

        if expires_unix < now.timestamp() {
            return Err(ObjectStoreError::SlotExpired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_sign_verify_roundtrip() {
        let signer = Presigner::new("test-secret");
        let now = Utc::now();
        let expires = (now + Duration::seconds(120)).timestamp();

        let sig = signer.sign("tok-1", expires).unwrap();
        signer.verify("tok-1", expires, &sig, now).unwrap();
    }

    #[test]
    fn test_tampered_key_or_expiry_rejected() {
        let signer = Presigner::new("test-secret");
        let now = Utc::now();
        let expires = (now + Duration::seconds(120)).timestamp();
        let sig = signer.sign("tok-1", expires).unwrap();

        assert_eq!(
            signer.verify("tok-2", expires, &sig, now).unwrap_err(),
            ObjectStoreError::SignatureMismatch
        );
        assert_eq!(
            signer.verify("tok-1", expires + 1, &sig, now).unwrap_err(),
            ObjectStoreError::SignatureMismatch
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = Utc::now();
        let expires = (now + Duration::seconds(120)).timestamp();
        let sig = Presigner::new("secret-a").sign("tok-1", expires).unwrap();

        assert_eq!(
            Presigner::new("secret-b").verify("tok-1", expires, &sig, now).unwrap_err(),
            ObjectStoreError::SignatureMismatch
        );
    }

    #[test]
    fn test_expired_slot_rejected_even_with_valid_signature() {
        let signer = Presigner::new("test-secret");
        let now = Utc::now();
        let expires = (now - Duration::seconds(1)).timestamp();
        let sig = signer.sign("tok-1", expires).unwrap();

        assert_eq!(
            signer.verify("tok-1", expires, &sig, now).unwrap_err(),
            ObjectStoreError::SlotExpired
        );
    }

    #[test]
    fn test_garbage_signature_is_a_format_error() {
        let signer = Presigner::new("test-secret");
        let now = Utc::now();
        assert_eq!(
            signer.verify("tok-1", now.timestamp(), "not-hex!", now).unwrap_err(),
            ObjectStoreError::InvalidSignatureFormat
        );
    }
}
