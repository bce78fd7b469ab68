//! `export_data` tool: serialise rows/query results to json/csv/xlsx/report.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::app::AppContext;
use crate::error::{Error, Result};
use crate::model::{Row, Scalar};

use super::ok;
use super::transform::{apply, TransformSpec};
use super::transform_data::load_rows;

pub async fn run(app: Arc<AppContext>, args: Json) -> Result<Json> {
    let rows = load_rows(&app, &args).await?;

    let spec: TransformSpec = args
        .get("transform_spec")
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()
        .map_err(|e| Error::InvalidParams(e.to_string()))?
        .unwrap_or_default();
    let rows = apply(rows, &spec)?;

    let format = args.get("format").and_then(Json::as_str).unwrap_or("csv").to_lowercase();
    let include_summary = args.get("include_summary").and_then(Json::as_bool).unwrap_or(false);
    let include_visualization = args.get("include_visualization").and_then(Json::as_bool).unwrap_or(false);

    match format.as_str() {
        "json" => {
            let mut fields = serde_json::Map::new();
            fields.insert("rows".to_string(), super::transform::rows_to_json(&rows));
            if include_summary {
                fields.insert("summary".to_string(), summary_report(&rows));
            }
            if include_visualization {
                fields.insert("visualization".to_string(), visualization_data(&rows));
            }
            Ok(ok(fields))
        }
        "csv" => {
            let mut fields = serde_json::Map::new();
            fields.insert("content_type".to_string(), Json::from("text/csv"));
            fields.insert("filename".to_string(), Json::from(args.get("filename").and_then(Json::as_str).unwrap_or("export.csv")));
            fields.insert("csv".to_string(), Json::from(to_csv(&rows)));
            Ok(ok(fields))
        }
        "report" => {
            let mut fields = serde_json::Map::new();
            fields.insert("rows".to_string(), super::transform::rows_to_json(&rows));
            fields.insert("summary".to_string(), summary_report(&rows));
            fields.insert("visualization".to_string(), visualization_data(&rows));
            Ok(ok(fields))
        }
        "xlsx" => Ok(serde_json::json!({
            "success": false,
            "error": {"message": "xlsx export requires a spreadsheet-writing dependency not wired into this deployment"}
        })),
        other => Err(Error::InvalidParams(format!("unsupported format: {other}"))),
    }
}

fn to_csv(rows: &[Row]) -> String {
    let Some(first) = rows.first() else { return String::new() };
    let headers: Vec<&String> = first.keys().collect();
    let mut lines = vec![headers.iter().map(|h| h.as_str()).collect::<Vec<_>>().join(",")];
    for row in rows {
        let line = headers
            .iter()
            .map(|h| row.get(*h).map(Scalar::to_string).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }
    lines.join("\n")
}

fn summary_report(rows: &[Row]) -> Json {
    let total_rows = rows.len();
    let columns: Vec<String> = rows.first().map(|r| r.keys().cloned().collect()).unwrap_or_default();

    let mut missing: BTreeMap<String, usize> = columns.iter().map(|c| (c.clone(), 0)).collect();
    for row in rows {
        for column in &columns {
            if row.get(column).is_none_or(Scalar::is_missing) {
                *missing.get_mut(column).unwrap() += 1;
            }
        }
    }

    serde_json::json!({
        "total_rows": total_rows,
        "total_columns": columns.len(),
        "columns": columns,
        "missing_values": missing,
    })
}

fn visualization_data(rows: &[Row]) -> Json {
    let Some(first) = rows.first() else {
        return serde_json::json!({"charts": []});
    };

    let mut charts = Vec::new();
    for column in first.keys().take(3) {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for row in rows {
            if let Some(value) = row.get(column) {
                *counts.entry(value.to_string()).or_default() += 1;
            }
        }
        let mut entries: Vec<_> = counts.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(10);
        charts.push(serde_json::json!({
            "type": "bar",
            "title": format!("Distribution of {column}"),
            "data": {
                "labels": entries.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>(),
                "values": entries.iter().map(|(_, v)| *v).collect::<Vec<_>>(),
            }
        }));
    }
    serde_json::json!({"charts": charts})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn xlsx_degrades_gracefully_instead_of_panicking() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let args = serde_json::json!({"rows": [{"id": 1}], "format": "xlsx"});
        let result = run(app, args).await.unwrap();
        assert_eq!(result["success"], Json::from(false));
    }

    #[tokio::test]
    async fn csv_format_renders_header_and_rows() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let args = serde_json::json!({"rows": [{"id": 1, "name": "a"}], "format": "csv"});
        let result = run(app, args).await.unwrap();
        let csv = result["csv"].as_str().unwrap();
        assert!(csv.contains("id,name"));
    }

    #[tokio::test]
    async fn report_bundles_rows_summary_and_visualization() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let args = serde_json::json!({"rows": [{"id": 1}], "format": "report"});
        let result = run(app, args).await.unwrap();
        assert!(result.get("summary").is_some());
        assert!(result.get("visualization").is_some());
    }
}
