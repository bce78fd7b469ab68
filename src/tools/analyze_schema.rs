//! `analyze_schema` tool: relational schema introspection plus an
//! oracle-boundary analysis stub (never an LLM call in this crate).

use std::sync::Arc;

use serde_json::Value as Json;

use crate::app::AppContext;
use crate::error::{Error, Result};

use super::ok;

pub async fn analyze(app: Arc<AppContext>, args: Json) -> Result<Json> {
    let table_name = args.get("table_name").and_then(Json::as_str).map(str::to_string);

    let app_for_tables = Arc::clone(&app);
    let tables = tokio::task::spawn_blocking(move || app_for_tables.store.list_tables())
        .await
        .map_err(|e| Error::Internal(e.to_string()))??;

    if let Some(name) = &table_name {
        if !tables.contains(name) {
            return Err(Error::NotFound { kind: "table", name: name.clone() });
        }
    }

    let question = args.get("question").and_then(Json::as_str).unwrap_or_default();
    let analysis = if question.is_empty() {
        serde_json::json!({
            "overview": format!("{} table(s) available", tables.len()),
            "recommended_queries": ["SELECT * FROM users LIMIT 20"],
        })
    } else {
        serde_json::json!({
            "relevant_tables": tables,
            "suggested_query": crate::oracle::ask(question),
        })
    };

    let mut fields = serde_json::Map::new();
    fields.insert("tables_analyzed".to_string(), Json::from(table_name.map_or_else(|| tables.clone(), |n| vec![n])));
    fields.insert("analysis".to_string(), analysis);
    Ok(ok(fields))
}
