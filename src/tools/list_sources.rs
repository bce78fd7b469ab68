//! `list_sources` tool: the configured source enumeration.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::app::AppContext;
use crate::error::Result;

use super::ok;

pub async fn run(app: Arc<AppContext>, _args: Json) -> Result<Json> {
    let mut sources = vec![serde_json::json!({
        "name": "relational_store",
        "type": "sql",
        "path": app.config.db_path.display().to_string(),
    })];

    if !app.config.mock_api_url.is_empty() {
        sources.push(serde_json::json!({
            "name": "mock_api",
            "type": "api",
            "mock_url": app.config.mock_api_url,
        }));
    }

    for source in &app.file_sources {
        sources.push(serde_json::json!({
            "name": source.basename(),
            "type": "file",
            "path": source.path.display().to_string(),
        }));
    }

    let mut fields = serde_json::Map::new();
    fields.insert("sources".to_string(), Json::Array(sources));
    Ok(ok(fields))
}
