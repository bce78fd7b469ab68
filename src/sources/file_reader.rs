//! File reader: dispatches by extension to a row-producing parser (§4.3).

use std::path::Path;

use serde_json::Value as Json;

use crate::model::{row_from_json_object, Row};

/// Read rows from `path`, dispatching on its lowercased extension. Missing
/// files and unsupported/unavailable extensions both produce an empty
/// sequence — this component never fails the caller over file content.
pub fn read_rows(path: &Path) -> Vec<Row> {
    let Some(ext) = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase) else {
        return Vec::new();
    };

    if !path.exists() {
        return Vec::new();
    }

    match ext.as_str() {
        "csv" => read_csv(path),
        "json" => read_json(path),
        "xlsx" | "xls" => read_spreadsheet(path),
        "xml" => read_xml(path),
        _ => Vec::new(),
    }
}

fn read_csv(path: &Path) -> Vec<Row> {
    let Ok(mut reader) = csv::Reader::from_path(path) else {
        return Vec::new();
    };
    let Ok(headers) = reader.headers().cloned() else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for record in reader.records().flatten() {
        let mut obj = serde_json::Map::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            obj.insert(header.to_string(), Json::String(value.to_string()));
        }
        rows.push(row_from_json_object(&obj));
    }
    rows
}

fn read_json(path: &Path) -> Vec<Row> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let Ok(Json::Array(items)) = serde_json::from_str::<Json>(&contents) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Json::as_object)
        .map(row_from_json_object)
        .collect()
}

/// Spreadsheet parsing has no grounded crate dependency in this workspace;
/// recognised but unavailable, matching the graceful-degradation contract
/// the rest of this component follows for unsupported/missing input.
fn read_spreadsheet(path: &Path) -> Vec<Row> {
    tracing::warn!(path = %path.display(), "spreadsheet parsing is not wired up; returning no rows");
    Vec::new()
}

fn read_xml(path: &Path) -> Vec<Row> {
    use quick_xml::events::Event;
    use quick_xml::reader::Reader;

    let Ok(contents) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut reader = Reader::from_str(&contents);
    reader.config_mut().trim_text(true);

    let mut rows = Vec::new();
    let mut current: Option<serde_json::Map<String, Json>> = None;
    let mut current_field: Option<String> = None;
    let mut depth = 0_u32;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if depth == 2 {
                    current = Some(serde_json::Map::new());
                } else if depth == 3 {
                    current_field = Some(name);
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(obj), Some(field)) = (current.as_mut(), current_field.as_ref()) {
                    let text = t.unescape().unwrap_or_default().into_owned();
                    obj.insert(field.clone(), Json::String(text));
                }
            }
            Ok(Event::End(_)) => {
                if depth == 2 {
                    if let Some(obj) = current.take() {
                        rows.push(row_from_json_object(&obj));
                    }
                } else if depth == 3 {
                    current_field = None;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    rows
}
