//! `check_data_quality` tool: null counts, duplicate rows, type consistency.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::app::AppContext;
use crate::error::Result;
use crate::model::{Row, Scalar};

use super::ok;
use super::transform_data::load_rows;

pub async fn run(app: Arc<AppContext>, args: Json) -> Result<Json> {
    let rows = load_rows(&app, &args).await?;

    let columns: Vec<String> = rows.first().map(|r| r.keys().cloned().collect()).unwrap_or_default();

    let mut null_counts: BTreeMap<String, usize> = columns.iter().map(|c| (c.clone(), 0)).collect();
    let mut type_tags: BTreeMap<String, std::collections::HashSet<&'static str>> =
        columns.iter().map(|c| (c.clone(), std::collections::HashSet::new())).collect();

    for row in &rows {
        for column in &columns {
            match row.get(column) {
                None => {
                    *null_counts.get_mut(column).unwrap() += 1;
                }
                Some(value) => {
                    if value.is_missing() {
                        *null_counts.get_mut(column).unwrap() += 1;
                    }
                    type_tags.get_mut(column).unwrap().insert(scalar_type_tag(value));
                }
            }
        }
    }

    let inconsistent_columns: Vec<&String> =
        type_tags.iter().filter(|(_, tags)| tags.len() > 1).map(|(c, _)| c).collect();

    let duplicate_count = count_duplicates(&rows);

    let mut fields = serde_json::Map::new();
    fields.insert("total_rows".to_string(), Json::from(rows.len()));
    fields.insert("null_counts".to_string(), serde_json::to_value(null_counts).unwrap());
    fields.insert("duplicate_rows".to_string(), Json::from(duplicate_count));
    fields.insert("inconsistent_type_columns".to_string(), Json::from(inconsistent_columns));
    Ok(ok(fields))
}

fn scalar_type_tag(scalar: &Scalar) -> &'static str {
    match scalar {
        Scalar::Int(_) => "int",
        Scalar::Float(_) => "float",
        Scalar::Str(_) => "string",
        Scalar::Bool(_) => "bool",
        Scalar::Null => "null",
    }
}

fn count_duplicates(rows: &[Row]) -> usize {
    let mut seen = std::collections::HashSet::new();
    let mut duplicates = 0;
    for row in rows {
        let fingerprint: Vec<(String, String)> =
            row.iter().map(|(k, v)| (k.clone(), v.to_string())).collect();
        if !seen.insert(fingerprint) {
            duplicates += 1;
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn counts_duplicate_rows() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let args = serde_json::json!({"rows": [{"id": 1}, {"id": 1}, {"id": 2}]});
        let result = run(app, args).await.unwrap();
        assert_eq!(result["duplicate_rows"], Json::from(1));
    }

    #[tokio::test]
    async fn flags_mixed_type_columns() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let args = serde_json::json!({"rows": [{"v": 1}, {"v": "two"}]});
        let result = run(app, args).await.unwrap();
        let flagged = result["inconsistent_type_columns"].as_array().unwrap();
        assert!(flagged.iter().any(|c| c == "v"));
    }
}
