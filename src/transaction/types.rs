//! Import Transaction Core Types

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::websocket::ConnectionId;

use super::status::TransactionStatus;

/// Import transaction token - UUID v4 identifier
///
/// The token doubles as the object key for the staged upload, so one
/// string correlates the record, the presigned URL and the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionToken(String);

impl TransactionToken {
    /// Mint a fresh token
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TransactionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TransactionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One import attempt, from slot issuance to a terminal status
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub token: TransactionToken,
    pub status: TransactionStatus,
    /// Live duplex connection to notify on status changes
    pub connection_id: ConnectionId,
    /// Correlates log lines of the trigger that opened the attempt
    pub request_context_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Open a new attempt in GENERATED with a TTL-bounded lifetime
    pub fn open(
        token: TransactionToken,
        connection_id: ConnectionId,
        request_context_id: String,
        now: DateTime<Utc>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            token,
            status: TransactionStatus::Generated,
            connection_id,
            request_context_id,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_secs as i64),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
