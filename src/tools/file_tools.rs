//! `list_files` and `parse_file` tools: expose the configured file-backed
//! sources and read them on demand.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::app::AppContext;
use crate::error::{Error, Result};
use crate::model::row_to_json;

use super::ok;

pub async fn list_files(app: Arc<AppContext>, _args: Json) -> Result<Json> {
    let files: Vec<Json> = app
        .file_sources
        .iter()
        .map(|source| {
            let size = std::fs::metadata(&source.path).map(|m| m.len()).unwrap_or(0);
            serde_json::json!({
                "name": source.basename(),
                "extension": source.extension(),
                "size_bytes": size,
            })
        })
        .collect();

    let mut fields = serde_json::Map::new();
    fields.insert("files".to_string(), Json::Array(files));
    Ok(ok(fields))
}

pub async fn parse_file(app: Arc<AppContext>, args: Json) -> Result<Json> {
    let name = args
        .get("name")
        .and_then(Json::as_str)
        .ok_or_else(|| Error::InvalidParams("name is required".to_string()))?;

    let source = app
        .file_sources
        .iter()
        .find(|s| s.basename() == name)
        .ok_or_else(|| Error::NotFound { kind: "file", name: name.to_string() })?;

    let path = source.path.clone();
    let rows = tokio::task::spawn_blocking(move || crate::sources::file_reader::read_rows(&path))
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;

    let mut fields = serde_json::Map::new();
    fields.insert("name".to_string(), Json::from(name));
    fields.insert("row_count".to_string(), Json::from(rows.len()));
    fields.insert("rows".to_string(), Json::Array(rows.iter().map(row_to_json).collect()));
    Ok(ok(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn list_files_reports_discovered_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("people.csv"), "id,name\n1,Ann\n").unwrap();

        let mut config = Config::default();
        config.db_path = ":memory:".into();
        config.file_sources_dir = dir.path().to_path_buf();
        let app = AppContext::build(config).unwrap();

        let result = list_files(app, serde_json::json!({})).await.unwrap();
        let files = result["files"].as_array().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["name"], "people.csv");
    }

    #[tokio::test]
    async fn parse_file_rejects_unknown_name() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let err = parse_file(app, serde_json::json!({"name": "nope.csv"})).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn parse_file_reads_matched_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("people.csv"), "id,name\n1,Ann\n").unwrap();

        let mut config = Config::default();
        config.db_path = ":memory:".into();
        config.file_sources_dir = dir.path().to_path_buf();
        let app = AppContext::build(config).unwrap();

        let result = parse_file(app, serde_json::json!({"name": "people.csv"})).await.unwrap();
        assert_eq!(result["row_count"], Json::from(1));
    }
}
