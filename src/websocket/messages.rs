//! WebSocket wire types
//!
//! Client actions arrive as `{"action": "..."}` tagged JSON. Push
//! payloads are flat objects; status pushes in particular are always
//! `{"transactionId": ..., "status": ...}` regardless of which
//! component emits them.

use serde::{Deserialize, Serialize};

use crate::transaction::{TransactionStatus, TransactionToken};

use super::registry::ConnectionId;

/// Actions a client may send over the duplex connection
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action")]
pub enum ClientAction {
    /// Request a fresh upload slot
    #[serde(rename = "getUrl")]
    GetUrl,

    /// Cancel a pending import
    #[serde(rename = "cancelImport", rename_all = "camelCase")]
    CancelImport { transaction_id: String },
}

/// Status notification push
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPush {
    pub transaction_id: String,
    pub status: TransactionStatus,
}

impl StatusPush {
    pub fn new(token: &TransactionToken, status: TransactionStatus) -> Self {
        Self {
            transaction_id: token.to_string(),
            status,
        }
    }
}

/// Upload slot push, answered to a getUrl action
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlotPush {
    pub url: String,
    /// Slot lifetime in seconds
    pub expires: u64,
    pub transaction_id: String,
}

/// Greeting sent once after the upgrade completes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPush {
    pub connection_id: ConnectionId,
}

/// Pushed when a client action cannot be understood or served
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPush {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_url_action() {
        let action: ClientAction = serde_json::from_str(r#"{"action":"getUrl"}"#).unwrap();
        assert_eq!(action, ClientAction::GetUrl);
    }

    #[test]
    fn test_parse_cancel_action() {
        let action: ClientAction =
            serde_json::from_str(r#"{"action":"cancelImport","transactionId":"tok-9"}"#).unwrap();
        assert_eq!(
            action,
            ClientAction::CancelImport {
                transaction_id: "tok-9".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(serde_json::from_str::<ClientAction>(r#"{"action":"selfDestruct"}"#).is_err());
        assert!(serde_json::from_str::<ClientAction>(r#"{"verb":"getUrl"}"#).is_err());
    }

    #[test]
    fn test_status_push_wire_shape() {
        let push = StatusPush::new(&TransactionToken::from("tok-1"), TransactionStatus::TimedOut);
        let json = serde_json::to_string(&push).unwrap();
        assert_eq!(json, r#"{"transactionId":"tok-1","status":"TIMEOUT"}"#);
    }

    #[test]
    fn test_upload_slot_push_wire_shape() {
        let push = UploadSlotPush {
            url: "http://localhost:9000/upload/tok-1?expires=1&signature=ab".to_string(),
            expires: 120,
            transaction_id: "tok-1".to_string(),
        };
        let json = serde_json::to_value(&push).unwrap();
        assert_eq!(json["expires"], 120);
        assert_eq!(json["transactionId"], "tok-1");
        assert!(json["url"].as_str().unwrap().contains("/upload/tok-1"));
    }
}
