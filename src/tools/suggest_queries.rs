//! `suggest_queries` tool: schema-derived candidate SQL queries.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::app::AppContext;
use crate::error::{Error, Result};

use super::ok;

pub async fn run(app: Arc<AppContext>, args: Json) -> Result<Json> {
    let use_case = args.get("use_case").and_then(Json::as_str);

    let app_for_tables = Arc::clone(&app);
    let tables = tokio::task::spawn_blocking(move || app_for_tables.store.list_tables())
        .await
        .map_err(|e| Error::Internal(e.to_string()))??;

    let first_table = tables.first().cloned().unwrap_or_else(|| "users".to_string());

    let suggestions: Vec<Json> = if let Some(case) = use_case {
        vec![serde_json::json!({
            "query": crate::oracle::ask(case),
            "description": format!("Generated for use case: {case}"),
            "use_case": case,
        })]
    } else {
        vec![
            serde_json::json!({
                "query": format!("SELECT * FROM {first_table} LIMIT 10"),
                "description": "Basic row preview",
                "use_case": "Explore the table's shape",
            }),
            serde_json::json!({
                "query": format!("SELECT COUNT(*) FROM {first_table}"),
                "description": "Row count",
                "use_case": "Sanity-check table size",
            }),
        ]
    };

    let mut fields = serde_json::Map::new();
    fields.insert("suggestions".to_string(), Json::Array(suggestions));
    fields.insert("tables".to_string(), Json::from(tables));
    Ok(ok(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn returns_at_least_one_suggestion() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let result = run(app, serde_json::json!({})).await.unwrap();
        assert!(!result["suggestions"].as_array().unwrap().is_empty());
    }
}
