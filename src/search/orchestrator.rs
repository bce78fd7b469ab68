//! Multi-source searcher: fan out a parsed predicate to three backends,
//! sequentially, then merge and deduplicate (§4.6).

use std::sync::Arc;

use crate::app::AppContext;
use crate::model::{row_from_json_object, source_file_tag, Row, Scalar, SOURCE_API, SOURCE_SQL};
use crate::sources::rest::Credential;

use super::compiler::compile;
use super::evaluator;
use super::parser::parse;

const SQL_SOURCE_CAP: usize = 200;

/// Run the full multi-source search for a raw user query: parse once,
/// then query relational, REST, and file backends **sequentially** — not
/// in parallel, to bound local concurrency in small deployments — tagging
/// and finally deduplicating the union of rows.
pub async fn search_everywhere(app: &Arc<AppContext>, query: &str) -> Vec<Row> {
    let dnf = parse(query);

    let mut tagged_rows: Vec<(Row, String)> = Vec::new();

    tagged_rows.extend(search_sql(app, &dnf).await.into_iter().map(|r| (r, SOURCE_SQL.to_string())));
    tagged_rows.extend(search_api(app, &dnf).await.into_iter().map(|r| (r, SOURCE_API.to_string())));
    tagged_rows.extend(search_files(app, &dnf).await);

    dedupe(tagged_rows)
}

/// Run on a blocking-pool thread: `DuckDB` execution is synchronous (§5).
async fn search_sql(app: &Arc<AppContext>, dnf: &super::Dnf) -> Vec<Row> {
    let compiled = compile(dnf);
    let sql = format!(
        "SELECT id, name, email, region, signup_date FROM users WHERE {} LIMIT {SQL_SOURCE_CAP}",
        compiled.sql
    );
    let app = Arc::clone(app);
    tokio::task::spawn_blocking(move || app.store.execute(&sql, &compiled.params).map(|r| r.rows).unwrap_or_default())
        .await
        .unwrap_or_default()
}

async fn search_api(app: &AppContext, dnf: &super::Dnf) -> Vec<Row> {
    if app.config.mock_api_url.is_empty() {
        return Vec::new();
    }
    let client = app
        .rest_pool
        .client(&app.config.mock_api_url, Credential::ApiKey(app.config.mock_api_key.clone()));

    let Ok(body) = client.get("/users", &[]).await else {
        return Vec::new();
    };

    let items = match &body {
        serde_json::Value::Array(items) => items.clone(),
        serde_json::Value::Object(obj) => obj
            .get("users")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    items
        .iter()
        .filter_map(serde_json::Value::as_object)
        .map(row_from_json_object)
        .filter(|row| evaluator::matches(dnf, row))
        .collect()
}

/// Run on a blocking-pool thread: file parsing is synchronous I/O (§5).
async fn search_files(app: &Arc<AppContext>, dnf: &super::Dnf) -> Vec<(Row, String)> {
    let app = Arc::clone(app);
    let dnf = dnf.clone();
    tokio::task::spawn_blocking(move || {
        let mut out = Vec::new();
        for source in &app.file_sources {
            let tag = source_file_tag(&source.basename());
            for row in crate::sources::file_reader::read_rows(&source.path) {
                if evaluator::matches(&dnf, &row) {
                    out.push((row, tag.clone()));
                }
            }
        }
        out
    })
    .await
    .unwrap_or_default()
}

/// Key rows by lowercased email when present, else `name::id`.
fn dedup_key(row: &Row) -> String {
    if let Some(email) = row.get("email") {
        let lowered = email.to_lower_string();
        if !lowered.is_empty() {
            return lowered;
        }
    }
    let name = row.get("name").map(Scalar::to_string).unwrap_or_default();
    let id = row.get("id").map(Scalar::to_string).unwrap_or_default();
    format!("{name}::{id}")
}

/// First row under a key wins for scalars; later rows fill in
/// null/empty/"nan" fields. `sources` accumulates origin tags in
/// insertion order as a comma-joined string.
fn dedupe(tagged_rows: Vec<(Row, String)>) -> Vec<Row> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: std::collections::HashMap<String, Row> = std::collections::HashMap::new();
    let mut sources: std::collections::HashMap<String, Vec<String>> = std::collections::HashMap::new();

    for (row, tag) in tagged_rows {
        let key = dedup_key(&row);
        if !merged.contains_key(&key) {
            order.push(key.clone());
            merged.insert(key.clone(), row.clone());
            sources.insert(key.clone(), Vec::new());
        } else {
            let existing = merged.get_mut(&key).unwrap();
            for (field, value) in &row {
                let should_fill = existing.get(field).is_none_or(Scalar::is_missing);
                if should_fill && !value.is_missing() {
                    existing.insert(field.clone(), value.clone());
                }
            }
        }
        let tags = sources.get_mut(&key).unwrap();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    order
        .into_iter()
        .map(|key| {
            let mut row = merged.remove(&key).unwrap();
            let tags = sources.remove(&key).unwrap();
            row.insert("sources".to_string(), Scalar::Str(tags.join(",")));
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(pairs: &[(&str, Scalar)]) -> Row {
        let mut r: BTreeMap<String, Scalar> = BTreeMap::new();
        for (k, v) in pairs {
            r.insert((*k).to_string(), v.clone());
        }
        r
    }

    #[test]
    fn dedup_merges_by_email_and_fills_missing_fields() {
        let a = row(&[("email", Scalar::Str("x@example.com".to_string())), ("region", Scalar::Null)]);
        let b = row(&[("email", Scalar::Str("x@example.com".to_string())), ("region", Scalar::Str("EU".to_string()))]);

        let result = dedupe(vec![(a, SOURCE_SQL.to_string()), (b, SOURCE_API.to_string())]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].get("region"), Some(&Scalar::Str("EU".to_string())));
        assert_eq!(result[0].get("sources"), Some(&Scalar::Str("sql,api".to_string())));
    }

    #[test]
    fn dedup_is_idempotent_up_to_source_ordering() {
        let a = row(&[("email", Scalar::Str("y@example.com".to_string()))]);
        let once = dedupe(vec![(a.clone(), SOURCE_SQL.to_string())]);
        let twice = dedupe(vec![(a.clone(), SOURCE_SQL.to_string()), (a, SOURCE_SQL.to_string())]);
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn dedup_falls_back_to_name_and_id_without_email() {
        let a = row(&[("name", Scalar::Str("Bob".to_string())), ("id", Scalar::Int(7))]);
        let result = dedupe(vec![(a, SOURCE_SQL.to_string())]);
        assert_eq!(result.len(), 1);
    }
}
