//! JSON-RPC envelope types, method registry, and dispatch engine (§4.8).

pub mod engine;
pub mod envelope;

pub use engine::RpcEngine;
pub use envelope::{ErrorObject, Request, Response};

/// Error-code vocabulary (§6).
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_ERROR: i64 = -32000;
}
