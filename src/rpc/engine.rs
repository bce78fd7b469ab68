//! Method dispatch (§4.8): one envelope in, zero-or-one envelope out.

use serde_json::Value as Json;

use crate::app::{AppContext, SharedApp};
use crate::error::Error;
use crate::tools::ToolRegistry;

use super::codes;
use super::envelope::{Request, Response};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "ccmcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct RpcEngine {
    tools: ToolRegistry,
}

impl RpcEngine {
    pub fn new() -> Self {
        Self { tools: ToolRegistry::build() }
    }

    /// Parse and dispatch one raw line/frame. Returns `None` for a
    /// successfully-parsed notification (no response is ever emitted for
    /// one) and `Some` otherwise, including for a parse failure.
    pub async fn handle_raw(&self, app: &SharedApp, raw: &str) -> Option<Response> {
        let request: Request = match serde_json::from_str(raw) {
            Ok(request) => request,
            Err(e) => {
                return Some(Response::failure(
                    Json::Null,
                    codes::PARSE_ERROR,
                    format!("parse error: {e}"),
                    None,
                ));
            }
        };

        self.handle(app, request).await
    }

    pub async fn handle(&self, app: &SharedApp, request: Request) -> Option<Response> {
        let is_notification = request.is_notification();
        let id = request.id.clone().unwrap_or(Json::Null);

        let result = self.dispatch(app, &request).await;
        audit_dispatch(app, &request, &result);

        if is_notification {
            if let Err(e) = result {
                tracing::debug!(method = %request.method, error = %e, "notification handling failed");
            }
            return None;
        }

        Some(match result {
            Ok(value) => Response::success(id, value),
            Err(e) => {
                let data = (e.rpc_code() == codes::INTERNAL_ERROR)
                    .then(|| serde_json::json!({"trace": format!("{e:?}")}));
                Response::failure(id, e.rpc_code(), e.to_string(), data)
            }
        })
    }

    async fn dispatch(&self, app: &SharedApp, request: &Request) -> crate::error::Result<Json> {
        match request.method.as_str() {
            "initialize" => Ok(serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}, "resources": {}, "prompts": {}},
                "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
            })),
            "tools/list" => Ok(serde_json::json!({"tools": self.tools.descriptors()})),
            "tools/call" => {
                let params = request.params.clone().unwrap_or(Json::Null);
                let name = params
                    .get("name")
                    .and_then(Json::as_str)
                    .ok_or_else(|| Error::InvalidParams("tools/call requires name".to_string()))?;
                let arguments = params.get("arguments").cloned().unwrap_or(Json::Object(Default::default()));
                self.tools.call(app.clone(), name, arguments).await
            }
            "resources/list" => Ok(serde_json::json!({"resources": resource_catalogue()})),
            "resources/read" => {
                let params = request.params.clone().unwrap_or(Json::Null);
                let uri = params
                    .get("uri")
                    .and_then(Json::as_str)
                    .ok_or_else(|| Error::InvalidParams("resources/read requires uri".to_string()))?;
                self.read_resource(app, uri).await
            }
            "prompts/list" => Ok(serde_json::json!({"prompts": [prompt_descriptor()]})),
            "prompts/get" => Ok(serde_json::json!({
                "description": "How to use the data-integration tools exposed by this server.",
                "messages": [{
                    "role": "user",
                    "content": {"type": "text", "text": query_help_text()},
                }],
            })),
            "notifications/initialized" | "notifications/progress" => {
                tracing::debug!(method = %request.method, "notification received");
                Ok(Json::Null)
            }
            other => {
                if self.tools.contains(other) {
                    let arguments = request.params.clone().unwrap_or(Json::Object(Default::default()));
                    self.tools.call(app.clone(), other, arguments).await
                } else {
                    Err(Error::NotFound { kind: "method", name: other.to_string() })
                }
            }
        }
    }

    async fn read_resource(&self, app: &SharedApp, uri: &str) -> crate::error::Result<Json> {
        let text = match uri {
            "sources://all" => self.tools.call(app.clone(), "list_sources", Json::Object(Default::default())).await?,
            "tables://all" => {
                let app_for_tables = app.clone();
                let tables = tokio::task::spawn_blocking(move || app_for_tables.store.list_tables())
                    .await
                    .map_err(|e| Error::Internal(e.to_string()))??;
                serde_json::json!({"tables": tables})
            }
            other => return Err(Error::NotFound { kind: "resource", name: other.to_string() }),
        };

        Ok(serde_json::json!({
            "contents": [{
                "uri": uri,
                "mimeType": "application/json",
                "text": text.to_string(),
            }]
        }))
    }
}

impl Default for RpcEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Record one line per dispatched envelope, §6 "Persisted state": no
/// per-request identity exists beyond the shared-secret credential (§1
/// Non-goals), so `user` is always the anonymous placeholder the log
/// format reserves for that case.
fn audit_dispatch(app: &SharedApp, request: &Request, result: &crate::error::Result<Json>) {
    let detail = match result {
        Ok(_) => "ok".to_string(),
        Err(e) => format!("error={e}"),
    };
    app.audit.record_async(request.method.clone(), None, detail);
}

fn resource_catalogue() -> Json {
    serde_json::json!([
        {"uri": "sources://all", "name": "Configured sources", "mimeType": "application/json"},
        {"uri": "tables://all", "name": "Relational table names", "mimeType": "application/json"},
    ])
}

fn prompt_descriptor() -> Json {
    serde_json::json!({
        "name": "query_help",
        "description": "Usage guide for the data-integration tool catalogue.",
    })
}

fn query_help_text() -> &'static str {
    "Call tools/list to see the available tools. query_data accepts a natural-language \
     question and runs it against the relational store via the oracle boundary. \
     search_users fans a free-form query out across the relational store, the REST API, \
     and any configured files, merging and deduplicating the results. transform_data, \
     export_data, and integrate_data operate on rows produced by the other tools."
}
