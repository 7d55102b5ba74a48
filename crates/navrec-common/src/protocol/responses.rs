//! RPC response types.

use super::RequestId;
use serde::{Deserialize, Serialize};

/// RPC operation result (JSON value).
pub type RpcResult = serde_json::Value;

/// Error class reported by a service alongside a failed response.
///
/// Lets the client map failures to typed errors instead of parsing
/// message strings. Unknown classes deserialize as `Service`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthenticated,
    PermissionDenied,
    LeaseUse,
    InvalidRequest,
    #[serde(other)]
    Service,
}

/// An RPC response returned from a robot service to the client.
///
/// # Fields
///
/// - `id`: the request ID this response corresponds to
/// - `result`: the result value (present on success)
/// - `error`: error message (present on failure)
/// - `error_code`: error class (present on failure)
/// - `success`: whether the request succeeded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    /// Request identifier this response corresponds to
    pub id: RequestId,
    /// Result value (present on success)
    pub result: Option<RpcResult>,
    /// Error message (present on failure)
    pub error: Option<String>,
    /// Error class (present on failure)
    #[serde(default)]
    pub error_code: Option<ErrorCode>,
    /// Whether the request succeeded
    pub success: bool,
}

impl Response {
    /// Creates a successful response.
    pub fn success(id: RequestId, result: RpcResult) -> Self {
        Response {
            id,
            result: Some(result),
            error: None,
            error_code: None,
            success: true,
        }
    }

    /// Creates an error response carrying a service error class.
    pub fn error(id: RequestId, code: ErrorCode, error: impl Into<String>) -> Self {
        Response {
            id,
            result: None,
            error: Some(error.into()),
            error_code: Some(code),
            success: false,
        }
    }
}
