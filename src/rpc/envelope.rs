//! Wire-format types for the three envelope shapes (§3 Data Model).

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

fn protocol_version() -> String {
    "2.0".to_string()
}

/// A decoded incoming envelope. `id` absent ⇒ notification.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default = "protocol_version", rename = "jsonrpc")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Json>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Json>,
}

impl Request {
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// An outgoing envelope: exactly one of `result`/`error` is populated.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    jsonrpc: String,
    pub id: Json,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Json>,
}

impl Response {
    pub fn success(id: Json, result: Json) -> Self {
        Self { jsonrpc: protocol_version(), id, result: Some(result), error: None }
    }

    pub fn failure(id: Json, code: i64, message: impl Into<String>, data: Option<Json>) -> Self {
        Self {
            jsonrpc: protocol_version(),
            id,
            result: None,
            error: Some(ErrorObject { code, message: message.into(), data }),
        }
    }
}
