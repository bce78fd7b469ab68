//! `transform_data` tool: apply a transform pipeline to rows or a query result.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::app::AppContext;
use crate::error::{Error, Result};
use crate::model::{row_to_json, Row};

use super::ok;
use super::transform::{apply, rows_from_json, TransformSpec};

pub async fn run(app: Arc<AppContext>, args: Json) -> Result<Json> {
    let rows = load_rows(&app, &args).await?;

    let spec: TransformSpec = args
        .get("transform_spec")
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()
        .map_err(|e| Error::InvalidParams(e.to_string()))?
        .unwrap_or_default();

    let transformed = apply(rows, &spec)?;

    let mut fields = serde_json::Map::new();
    fields.insert(
        "columns".to_string(),
        Json::from(transformed.first().map(|r: &Row| r.keys().cloned().collect::<Vec<_>>()).unwrap_or_default()),
    );
    fields.insert("rows".to_string(), Json::Array(transformed.iter().map(row_to_json).collect()));
    Ok(ok(fields))
}

pub(crate) async fn load_rows(app: &Arc<AppContext>, args: &Json) -> Result<Vec<Row>> {
    if let Some(sql) = args.get("sql").and_then(Json::as_str) {
        let app = Arc::clone(app);
        let sql = sql.to_string();
        let result = tokio::task::spawn_blocking(move || app.store.execute(&sql, &[]))
            .await
            .map_err(|e| Error::Internal(e.to_string()))??;
        return Ok(result.rows);
    }
    if let Some(rows) = args.get("rows") {
        return Ok(rows_from_json(rows));
    }
    Err(Error::InvalidParams("either `sql` or `rows` must be provided".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn requires_sql_or_rows() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let err = run(app, serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[tokio::test]
    async fn applies_select_and_limit_to_provided_rows() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let args = serde_json::json!({
            "rows": [{"id": 1, "name": "a"}, {"id": 2, "name": "b"}],
            "transform_spec": {"select": ["id"], "limit": 1},
        });
        let result = run(app, args).await.unwrap();
        assert_eq!(result["rows"].as_array().unwrap().len(), 1);
    }
}
