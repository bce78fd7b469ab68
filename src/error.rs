//! Error types for ccmcp.

/// Crate-wide error type. Each variant carries enough context to render
/// both a human message and an RPC error code (see [`Error::rpc_code`]).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or empty relational query, unsupported verb, etc.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("relational store error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// A drained REST pool client was used again (§4.2 "Closure").
    #[error("client is closed: {0}")]
    Closed(String),

    #[error("unknown {kind}: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map to the JSON-RPC error code vocabulary (§6 of the design).
    pub const fn rpc_code(&self) -> i64 {
        match self {
            Self::BadRequest(_) | Self::InvalidParams(_) => -32602,
            Self::NotFound { .. } => -32601,
            Self::Closed(_) => -32000,
            Self::Database(_) | Self::Io(_) | Self::Upstream(_) | Self::Internal(_) => -32603,
        }
    }
}

/// Result type alias for ccmcp operations.
pub type Result<T> = std::result::Result<T, Error>;
