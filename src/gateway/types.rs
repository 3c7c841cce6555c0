use serde::{Deserialize, Serialize};

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All HTTP responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    pub code: i32,
    /// Response message
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;

    // Auth errors (2xxx)
    pub const SIGNATURE_REJECTED: i32 = 2002;

    // Resource errors (4xxx)
    pub const SLOT_EXPIRED: i32 = 4101;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let resp = ApiResponse::success(serde_json::json!({"n": 1}));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["msg"], "ok");
        assert_eq!(json["data"]["n"], 1);
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let resp = ApiResponse::<()>::error(error_codes::SLOT_EXPIRED, "slot expired");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], 4101);
        assert!(json.get("data").is_none());
    }
}
