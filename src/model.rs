//! Shared row representation used across relational, REST, and file sources.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A scalar cell value. Rows are duck-typed at the boundary; this is the
/// tagged union they get coerced into once inside the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Scalar {
    /// True for null, empty string, or the literal string "nan" — the
    /// "treat as missing" rule the merge step uses to decide fill-in.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Str(s) => s.is_empty() || s.eq_ignore_ascii_case("nan"),
            _ => false,
        }
    }

    /// Lowercased string form for case-insensitive comparison.
    pub fn to_lower_string(&self) -> String {
        match self {
            Self::Str(s) => s.to_lowercase(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Null => String::new(),
        }
    }

    pub fn from_json(v: &Json) -> Self {
        match v {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Json::String(s) => Self::Str(s.clone()),
            other => Self::Str(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Self::Int(n) => Json::from(*n),
            Self::Float(f) => Json::from(*f),
            Self::Str(s) => Json::from(s.clone()),
            Self::Bool(b) => Json::from(*b),
            Self::Null => Json::Null,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => write!(f, ""),
        }
    }
}

/// An ordered, string-keyed row. `BTreeMap` gives deterministic key
/// iteration, which matters for the column lists derived from "first row".
pub type Row = BTreeMap<String, Scalar>;

/// Canonical field set the file reader and searcher normalise rows onto.
pub const CANONICAL_FIELDS: [&str; 5] = ["id", "name", "email", "region", "signup_date"];

/// Origin tag recorded on a row produced by the multi-source searcher.
pub const SOURCE_SQL: &str = "sql";
pub const SOURCE_API: &str = "api";

pub fn source_file_tag(basename: &str) -> String {
    format!("file:{basename}")
}

/// Build a row restricted to the canonical fields, coercing `id` to an
/// integer when parseable and dropping anything else.
pub fn normalize_row(raw: &Row) -> Row {
    let mut out = Row::new();
    for field in CANONICAL_FIELDS {
        let Some(value) = raw.get(field) else { continue };
        if field == "id" {
            let coerced = match value {
                Scalar::Int(_) => value.clone(),
                Scalar::Str(s) => s
                    .trim()
                    .parse::<i64>()
                    .map_or_else(|_| value.clone(), Scalar::Int),
                Scalar::Float(f) => Scalar::Int(*f as i64),
                other => other.clone(),
            };
            out.insert(field.to_string(), coerced);
        } else {
            out.insert(field.to_string(), value.clone());
        }
    }
    out
}

/// Convert a `serde_json::Map` (as returned by a REST body or a JSON file
/// row) into a normalized canonical row.
pub fn row_from_json_object(obj: &serde_json::Map<String, Json>) -> Row {
    let mut raw = Row::new();
    for (k, v) in obj {
        raw.insert(k.clone(), Scalar::from_json(v));
    }
    normalize_row(&raw)
}

pub fn row_to_json(row: &Row) -> Json {
    let map: serde_json::Map<String, Json> =
        row.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
    Json::Object(map)
}
