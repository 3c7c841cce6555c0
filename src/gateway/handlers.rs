use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::objectstore::ObjectStoreError;

use super::state::AppState;
use super::types::{ApiResponse, error_codes};

/// Presigned query parameters carried on the upload URL
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub expires: i64,
    pub signature: String,
}

/// Upload acknowledgement data
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadAccepted {
    pub key: String,
    pub size: usize,
}

/// PUT /upload/{key}
///
/// Target of the presigned URLs handed out with each upload slot. The
/// signature covers key and expiry; nothing else identifies the caller.
pub async fn upload_invoice(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(params): Query<UploadQuery>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse<UploadAccepted>>) {
    let size = body.len();
    match state
        .objects
        .store_upload(&key, params.expires, &params.signature, body.to_vec())
    {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(UploadAccepted { key, size })),
        ),
        Err(e) => {
            warn!(key = %key, error = %e, "Rejected upload");
            let (status, code) = match e {
                ObjectStoreError::SlotExpired => (StatusCode::GONE, error_codes::SLOT_EXPIRED),
                ObjectStoreError::SignatureMismatch | ObjectStoreError::InvalidSignatureFormat => {
                    (StatusCode::FORBIDDEN, error_codes::SIGNATURE_REJECTED)
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL_ERROR,
                ),
            };
            (
                status,
                Json(ApiResponse {
                    code,
                    msg: e.to_string(),
                    data: None,
                }),
            )
        }
    }
}

/// Health check response data
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub version: String,
    pub git_hash: String,
    /// Server timestamp in milliseconds
    pub timestamp_ms: u64,
    /// Live duplex connections
    pub connections: usize,
}

/// GET /api/v1/health
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    (
        StatusCode::OK,
        Json(ApiResponse::success(HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            git_hash: env!("GIT_HASH").to_string(),
            timestamp_ms: now_ms,
            connections: state.registry.connection_count(),
        })),
    )
}
