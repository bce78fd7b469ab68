//! Name-keyed tool registry with static input schemas and dispatch (§4.7).

pub mod analyze_schema;
pub mod check_data_quality;
pub mod export_data;
pub mod file_tools;
pub mod integrate_data;
pub mod list_sources;
pub mod query_api;
pub mod query_data;
pub mod search_users;
pub mod suggest_queries;
pub(crate) mod transform;
pub mod transform_data;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::app::AppContext;
use crate::error::Result;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Json>> + Send>>;
pub type Handler = Arc<dyn Fn(Arc<AppContext>, Json) -> HandlerFuture + Send + Sync>;

/// Static descriptor exposed via `tools/list`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Json,
}

struct ToolEntry {
    descriptor: ToolDescriptor,
    handler: Handler,
}

/// One-shot-registered, name-keyed map of tools. No dynamic add/remove
/// after [`ToolRegistry::build`] returns.
pub struct ToolRegistry {
    entries: HashMap<String, ToolEntry>,
}

fn schema(properties: Json, required: &[&str]) -> Json {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

macro_rules! register {
    ($map:expr, $name:expr, $description:expr, $schema:expr, $handler:expr) => {
        $map.insert(
            $name.to_string(),
            ToolEntry {
                descriptor: ToolDescriptor {
                    name: $name.to_string(),
                    description: $description.to_string(),
                    input_schema: $schema,
                },
                handler: Arc::new(|app, args| Box::pin($handler(app, args))),
            },
        );
    };
}

impl ToolRegistry {
    pub fn build() -> Self {
        let mut entries = HashMap::new();

        register!(
            entries,
            "list_sources",
            "Return the configured source enumeration (relational store, REST API, files).",
            schema(serde_json::json!({}), &[]),
            list_sources::run
        );
        register!(
            entries,
            "query_data",
            "Translate a natural-language question to SQL via the oracle boundary and execute it.",
            schema(serde_json::json!({"question": {"type": "string"}}), &["question"]),
            query_data::run
        );
        register!(
            entries,
            "query_api",
            "Proxy a REST call through the pooled client.",
            schema(
                serde_json::json!({
                    "method": {"type": "string"},
                    "path": {"type": "string"},
                    "params": {"type": "object"},
                    "body": {"type": "object"},
                    "invalidate_cache": {"type": "boolean"},
                    "bearer_token": {"type": "string"},
                }),
                &["method", "path"]
            ),
            query_api::run
        );
        register!(
            entries,
            "transform_data",
            "Apply a transform pipeline (select/rename/filter/sort/groupby/offset/limit) to rows or a query.",
            schema(
                serde_json::json!({
                    "sql": {"type": "string"},
                    "rows": {"type": "array"},
                    "transform_spec": {"type": "object"},
                }),
                &[]
            ),
            transform_data::run
        );
        register!(
            entries,
            "integrate_data",
            "Union-align columns across named row sets, optionally deduplicate, resolve conflicts.",
            schema(
                serde_json::json!({
                    "sources": {"type": "object"},
                    "dedupe_key": {"type": "string"},
                    "conflict_strategy": {"type": "string"},
                }),
                &["sources"]
            ),
            integrate_data::run
        );
        register!(
            entries,
            "export_data",
            "Serialise rows or a query result to json/csv/xlsx/report.",
            schema(
                serde_json::json!({
                    "sql": {"type": "string"},
                    "rows": {"type": "array"},
                    "transform_spec": {"type": "object"},
                    "format": {"type": "string"},
                    "filename": {"type": "string"},
                    "include_summary": {"type": "boolean"},
                    "include_visualization": {"type": "boolean"},
                }),
                &[]
            ),
            export_data::run
        );
        register!(
            entries,
            "analyze_schema",
            "Introspect the relational schema and attach an oracle-boundary analysis stub.",
            schema(
                serde_json::json!({"table_name": {"type": "string"}, "question": {"type": "string"}}),
                &[]
            ),
            analyze_schema::analyze
        );
        register!(
            entries,
            "suggest_queries",
            "Suggest candidate SQL queries derived from the schema.",
            schema(serde_json::json!({"use_case": {"type": "string"}}), &[]),
            suggest_queries::run
        );
        register!(
            entries,
            "check_data_quality",
            "Report null counts, duplicate rows, and type-consistency for a row set.",
            schema(
                serde_json::json!({"sql": {"type": "string"}, "rows": {"type": "array"}}),
                &[]
            ),
            check_data_quality::run
        );
        register!(
            entries,
            "list_files",
            "Enumerate configured file-backed sources.",
            schema(serde_json::json!({}), &[]),
            file_tools::list_files
        );
        register!(
            entries,
            "parse_file",
            "Parse one configured file source and return its rows.",
            schema(serde_json::json!({"name": {"type": "string"}}), &["name"]),
            file_tools::parse_file
        );
        register!(
            entries,
            "search_users",
            "Multi-source user search: fan out to relational/REST/file backends, merge and deduplicate.",
            schema(serde_json::json!({"query": {"type": "string"}}), &["query"]),
            search_users::run
        );

        Self { entries }
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut list: Vec<_> = self.entries.values().map(|e| e.descriptor.clone()).collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub async fn call(&self, app: Arc<AppContext>, name: &str, args: Json) -> Result<Json> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| crate::error::Error::NotFound { kind: "tool", name: name.to_string() })?;
        (entry.handler)(app, args).await
    }
}

/// Helper tool handlers use to render `{success, ...}` / `{success:false, error}`.
pub fn ok(mut fields: serde_json::Map<String, Json>) -> Json {
    fields.insert("success".to_string(), Json::from(true));
    Json::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_twelve_tools() {
        let registry = ToolRegistry::build();
        assert_eq!(registry.descriptors().len(), 12);
    }

    #[test]
    fn unknown_tool_name_is_absent() {
        let registry = ToolRegistry::build();
        assert!(!registry.contains("does_not_exist"));
    }
}
