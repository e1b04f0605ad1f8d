//! Errors of chordkv-rpc, and the mapping of node errors onto JSON-RPC error objects.

use chordkv_core::dht::Did;
use chordkv_core::error::Error as CoreError;
use jsonrpc_core::ErrorCode;
use serde_json::json;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors enum mapping global custom errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid method.")]
    InvalidMethod,
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    #[error("Rpc error: {0}")]
    RpcError(crate::jsonrpc::RpcError),
    #[error("Encode error: {0}")]
    EncodeError(#[source] serde_json::Error),
    #[error("Decode error: {0}")]
    DecodeError(#[source] serde_json::Error),
}

/// Server error codes, one per kind of the error taxonomy.
pub mod codes {
    pub const UNREACHABLE: i64 = -32001;
    pub const ROUTING_EXHAUSTED: i64 = -32002;
    pub const KEY_UNAVAILABLE: i64 = -32003;
    pub const INVALID_ARGUMENT: i64 = -32004;
    pub const INTERNAL: i64 = -32000;
}

/// Encode a node error as a JSON-RPC error object.
pub fn to_jsonrpc_error(e: &CoreError) -> jsonrpc_core::Error {
    let (code, data) = match e {
        CoreError::Unreachable(endpoint) => (codes::UNREACHABLE, Some(json!(endpoint))),
        CoreError::RoutingExhausted { did, hops } => (
            codes::ROUTING_EXHAUSTED,
            Some(json!({ "did": did, "hops": hops })),
        ),
        CoreError::KeyUnavailable(key) => (codes::KEY_UNAVAILABLE, Some(json!(key))),
        CoreError::InvalidArgument(_) => (codes::INVALID_ARGUMENT, None),
        _ => (codes::INTERNAL, None),
    };
    jsonrpc_core::Error {
        code: ErrorCode::ServerError(code),
        message: e.to_string(),
        data,
    }
}

/// Decode a JSON-RPC error object returned by a node.
pub fn from_jsonrpc_error(e: jsonrpc_core::Error) -> CoreError {
    let data_str = || {
        e.data
            .as_ref()
            .and_then(|d| d.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| e.message.clone())
    };
    match e.code.code() {
        codes::UNREACHABLE => CoreError::RemoteFailure(e.message.clone()),
        codes::ROUTING_EXHAUSTED => {
            let data = e.data.clone().unwrap_or_default();
            let did: Option<Did> = serde_json::from_value(data["did"].clone()).ok();
            let hops = data["hops"].as_u64().unwrap_or_default() as u32;
            match did {
                Some(did) => CoreError::RoutingExhausted { did, hops },
                None => CoreError::RemoteFailure(e.message.clone()),
            }
        }
        codes::KEY_UNAVAILABLE => CoreError::KeyUnavailable(data_str()),
        codes::INVALID_ARGUMENT => CoreError::InvalidArgument(e.message.clone()),
        -32602 => CoreError::InvalidArgument(e.message.clone()),
        _ => CoreError::RemoteFailure(e.message.clone()),
    }
}
