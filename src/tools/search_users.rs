//! `search_users` tool: multi-source fan-out search over a free-form query.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::app::AppContext;
use crate::error::{Error, Result};
use crate::model::row_to_json;
use crate::search::orchestrator::search_everywhere;

use super::ok;

pub async fn run(app: Arc<AppContext>, args: Json) -> Result<Json> {
    let query = args
        .get("query")
        .and_then(Json::as_str)
        .ok_or_else(|| Error::InvalidParams("query is required".to_string()))?;

    let rows = search_everywhere(&app, query).await;

    let mut fields = serde_json::Map::new();
    fields.insert("query".to_string(), Json::from(query));
    fields.insert("row_count".to_string(), Json::from(rows.len()));
    fields.insert("rows".to_string(), Json::Array(rows.iter().map(row_to_json).collect()));
    Ok(ok(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn requires_query() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let err = run(app, serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[tokio::test]
    async fn searches_seeded_relational_store() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        config.mock_api_url = String::new();
        let app = AppContext::build(config).unwrap();
        let result = run(app, serde_json::json!({"query": "region NA"})).await.unwrap();
        assert!(result["row_count"].as_u64().unwrap() > 0);
    }
}
