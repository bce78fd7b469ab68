//! `query_data` tool: NL→SQL via the oracle boundary, then execute.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::app::AppContext;
use crate::error::{Error, Result};
use crate::model::row_to_json;
use crate::oracle;

use super::ok;

pub async fn run(app: Arc<AppContext>, args: Json) -> Result<Json> {
    let question = args
        .get("question")
        .and_then(Json::as_str)
        .ok_or_else(|| Error::InvalidParams("question is required".to_string()))?
        .to_string();

    let generated_sql = oracle::ask(&question);
    let app_for_exec = Arc::clone(&app);
    let generated_sql_for_exec = generated_sql.clone();
    let result = tokio::task::spawn_blocking(move || app_for_exec.store.execute(&generated_sql_for_exec, &[]))
        .await
        .map_err(|e| Error::Internal(e.to_string()))??;

    let mut fields = serde_json::Map::new();
    fields.insert("columns".to_string(), Json::from(result.columns));
    fields.insert("rows".to_string(), Json::Array(result.rows.iter().map(row_to_json).collect()));
    fields.insert("generated_sql".to_string(), Json::from(generated_sql));
    Ok(ok(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn missing_question_is_invalid_params() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let err = run(app, serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[tokio::test]
    async fn count_question_executes_and_returns_rows() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let result = run(app, serde_json::json!({"question": "how many users"})).await.unwrap();
        assert_eq!(result["rows"].as_array().unwrap().len(), 1);
    }
}
