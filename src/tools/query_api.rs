//! `query_api` tool: proxy a REST call through the pooled client (§4.2).

use std::sync::Arc;

use serde_json::Value as Json;

use crate::app::AppContext;
use crate::error::{Error, Result};
use crate::sources::rest::Credential;

use super::ok;

pub async fn run(app: Arc<AppContext>, args: Json) -> Result<Json> {
    let method = args
        .get("method")
        .and_then(Json::as_str)
        .ok_or_else(|| Error::InvalidParams("method is required".to_string()))?;
    let path = args
        .get("path")
        .and_then(Json::as_str)
        .ok_or_else(|| Error::InvalidParams("path is required".to_string()))?;

    let client = app
        .rest_pool
        .client(&app.config.mock_api_url, Credential::ApiKey(app.config.mock_api_key.clone()));

    let verb = method.to_uppercase();
    let body_result = match verb.as_str() {
        "GET" => {
            let params = args
                .get("params")
                .and_then(Json::as_object)
                .map(|m| {
                    m.iter()
                        .map(|(k, v)| (k.clone(), v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            client.get(path, &params).await
        }
        "POST" | "PUT" | "DELETE" => {
            let http_method = match verb.as_str() {
                "POST" => reqwest::Method::POST,
                "PUT" => reqwest::Method::PUT,
                _ => reqwest::Method::DELETE,
            };
            let invalidate = args.get("invalidate_cache").and_then(Json::as_bool).unwrap_or(false);
            let bearer_override = args.get("bearer_token").and_then(Json::as_str);
            client
                .mutate(http_method, path, args.get("body").cloned(), invalidate, bearer_override)
                .await
        }
        other => return Err(Error::InvalidParams(format!("unsupported method: {other}"))),
    };

    let mut fields = serde_json::Map::new();
    match body_result {
        Ok(body) => {
            fields.insert("data".to_string(), body);
            Ok(ok(fields))
        }
        Err(err) => Ok(serde_json::json!({"success": false, "error": {"message": err.to_string()}})),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn missing_required_args_is_invalid_params() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        let app = AppContext::build(config).unwrap();
        let err = run(app, serde_json::json!({"method": "GET"})).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[tokio::test]
    async fn unreachable_upstream_reports_failure_not_panic() {
        let mut config = Config::default();
        config.db_path = ":memory:".into();
        config.mock_api_url = "http://127.0.0.1:9".to_string();
        let app = AppContext::build(config).unwrap();
        let result = run(app, serde_json::json!({"method": "GET", "path": "/users"})).await.unwrap();
        assert_eq!(result["success"], Json::from(false));
    }
}
