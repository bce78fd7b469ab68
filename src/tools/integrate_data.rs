//! `integrate_data` tool: union-align columns across named row sets,
//! optionally deduplicate, resolve field conflicts.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::app::AppContext;
use crate::error::{Error, Result};
use crate::model::{row_to_json, Row, Scalar};

use super::ok;
use super::transform::rows_from_json;

pub async fn run(_app: Arc<AppContext>, args: Json) -> Result<Json> {
    let sources = args
        .get("sources")
        .and_then(Json::as_object)
        .ok_or_else(|| Error::InvalidParams("sources is required".to_string()))?;

    if sources.len() < 2 {
        return Err(Error::InvalidParams("integrate_data requires at least two sources".to_string()));
    }

    let dedupe_key = args.get("dedupe_key").and_then(Json::as_str);
    let last_wins = args.get("conflict_strategy").and_then(Json::as_str) == Some("last_wins");

    let mut all_rows: Vec<Row> = Vec::new();
    for rows_value in sources.values() {
        all_rows.extend(rows_from_json(rows_value));
    }

    let merged = if let Some(key) = dedupe_key {
        dedupe_by_key(all_rows, key, last_wins)
    } else {
        all_rows
    };

    let mut fields = serde_json::Map::new();
    fields.insert(
        "columns".to_string(),
        Json::from(merged.first().map(|r| r.keys().cloned().collect::<Vec<_>>()).unwrap_or_default()),
    );
    fields.insert("rows".to_string(), Json::Array(merged.iter().map(row_to_json).collect()));
    Ok(ok(fields))
}

fn dedupe_by_key(rows: Vec<Row>, key: &str, last_wins: bool) -> Vec<Row> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: std::collections::HashMap<String, Row> = std::collections::HashMap::new();

    for row in rows {
        let key_value = row.get(key).map(Scalar::to_string).unwrap_or_default();
        match merged.get_mut(&key_value) {
            None => {
                order.push(key_value.clone());
                merged.insert(key_value, row);
            }
            Some(existing) => {
                if last_wins {
                    *existing = row;
                } else {
                    for (field, value) in row {
                        if existing.get(&field).is_none_or(Scalar::is_missing) {
                            existing.insert(field, value);
                        }
                    }
                }
            }
        }
    }

    order.into_iter().map(|key| merged.remove(&key).unwrap()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn requires_at_least_two_sources() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let args = serde_json::json!({"sources": {"a": []}});
        let err = run(app, args).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[tokio::test]
    async fn dedupe_by_key_keeps_first_by_default() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let args = serde_json::json!({
            "sources": {
                "a": [{"id": 1, "name": "first"}],
                "b": [{"id": 1, "name": "second"}],
            },
            "dedupe_key": "id",
        });
        let result = run(app, args).await.unwrap();
        let rows = result["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "first");
    }
}
