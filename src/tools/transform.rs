//! Shared transform pipeline used by `transform_data` and `export_data`:
//! select → rename → filter → sort → groupby+aggregate → offset → limit.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as Json;

use crate::error::{Error, Result};
use crate::model::{row_from_json_object, row_to_json, Row, Scalar};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TransformSpec {
    pub filter: Option<FilterSpec>,
    pub sort: Option<Vec<String>>,
    pub select: Option<Vec<String>>,
    pub rename: Option<BTreeMap<String, String>>,
    pub groupby: Option<Vec<String>>,
    pub aggregations: Option<BTreeMap<String, String>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// A single equality filter `{field, equals}`. The upstream system this
/// was distilled from accepted an arbitrary pandas boolean expression
/// string; this crate exposes the equality subset of that as a structured
/// field instead of evaluating an expression language.
#[derive(Debug, Deserialize)]
pub struct FilterSpec {
    pub field: String,
    pub equals: Json,
}

pub fn rows_from_json(value: &Json) -> Vec<Row> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Json::as_object)
        .map(row_from_json_object)
        .collect()
}

pub fn rows_to_json(rows: &[Row]) -> Json {
    Json::Array(rows.iter().map(row_to_json).collect())
}

pub fn apply(rows: Vec<Row>, spec: &TransformSpec) -> Result<Vec<Row>> {
    let mut rows = rows;

    if let Some(select) = &spec.select {
        rows = rows
            .into_iter()
            .map(|row| select.iter().filter_map(|k| row.get(k).map(|v| (k.clone(), v.clone()))).collect())
            .collect();
    }

    if let Some(rename) = &spec.rename {
        rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(k, v)| (rename.get(&k).cloned().unwrap_or(k), v))
                    .collect()
            })
            .collect();
    }

    if let Some(filter) = &spec.filter {
        let target = Scalar::from_json(&filter.equals);
        rows.retain(|row| row.get(&filter.field) == Some(&target));
    }

    if let Some(sort_keys) = &spec.sort {
        rows.sort_by(|a, b| {
            for key in sort_keys {
                let ord = a
                    .get(key)
                    .map(Scalar::to_lower_string)
                    .cmp(&b.get(key).map(Scalar::to_lower_string));
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
    }

    if let (Some(groupby), Some(aggregations)) = (&spec.groupby, &spec.aggregations) {
        rows = group_and_aggregate(rows, groupby, aggregations)?;
    }

    if let Some(offset) = spec.offset {
        rows = rows.into_iter().skip(offset).collect();
    }
    if let Some(limit) = spec.limit {
        rows.truncate(limit);
    }

    Ok(rows)
}

fn group_and_aggregate(
    rows: Vec<Row>,
    groupby: &[String],
    aggregations: &BTreeMap<String, String>,
) -> Result<Vec<Row>> {
    let mut groups: BTreeMap<Vec<String>, Vec<Row>> = BTreeMap::new();
    for row in rows {
        let key: Vec<String> = groupby.iter().map(|k| row.get(k).map(Scalar::to_string).unwrap_or_default()).collect();
        groups.entry(key).or_default().push(row);
    }

    let mut out = Vec::with_capacity(groups.len());
    for (key_values, members) in groups {
        let mut row = Row::new();
        for (field, value) in groupby.iter().zip(key_values) {
            row.insert(field.clone(), Scalar::Str(value));
        }
        for (column, agg) in aggregations {
            let values: Vec<f64> = members
                .iter()
                .filter_map(|m| m.get(column))
                .filter_map(scalar_as_f64)
                .collect();
            let result = match agg.as_str() {
                "sum" => values.iter().sum(),
                "mean" | "avg" => {
                    if values.is_empty() {
                        0.0
                    } else {
                        values.iter().sum::<f64>() / values.len() as f64
                    }
                }
                "min" => values.iter().cloned().fold(f64::INFINITY, f64::min),
                "max" => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                "count" => members.len() as f64,
                other => return Err(Error::InvalidParams(format!("unsupported aggregation: {other}"))),
            };
            row.insert(format!("{column}_{agg}"), Scalar::Float(result));
        }
        out.push(row);
    }
    Ok(out)
}

fn scalar_as_f64(scalar: &Scalar) -> Option<f64> {
    match scalar {
        Scalar::Int(n) => Some(*n as f64),
        Scalar::Float(f) => Some(*f),
        Scalar::Str(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Scalar)]) -> Row {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn select_keeps_only_named_fields() {
        let rows = vec![row(&[("a", Scalar::Int(1)), ("b", Scalar::Int(2))])];
        let spec = TransformSpec { select: Some(vec!["a".to_string()]), ..Default::default() };
        let out = apply(rows, &spec).unwrap();
        assert_eq!(out[0].len(), 1);
        assert!(out[0].contains_key("a"));
    }

    #[test]
    fn rename_applies_after_select() {
        let rows = vec![row(&[("a", Scalar::Int(1))])];
        let mut rename = BTreeMap::new();
        rename.insert("a".to_string(), "z".to_string());
        let spec = TransformSpec { rename: Some(rename), ..Default::default() };
        let out = apply(rows, &spec).unwrap();
        assert!(out[0].contains_key("z"));
    }

    #[test]
    fn offset_and_limit_apply_last() {
        let rows: Vec<Row> = (0..5).map(|i| row(&[("id", Scalar::Int(i))])).collect();
        let spec = TransformSpec { offset: Some(1), limit: Some(2), ..Default::default() };
        let out = apply(rows, &spec).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("id"), Some(&Scalar::Int(1)));
    }

    #[test]
    fn groupby_sum_aggregates_per_group() {
        let rows = vec![
            row(&[("region", Scalar::Str("NA".to_string())), ("qty", Scalar::Int(2))]),
            row(&[("region", Scalar::Str("NA".to_string())), ("qty", Scalar::Int(3))]),
        ];
        let mut aggregations = BTreeMap::new();
        aggregations.insert("qty".to_string(), "sum".to_string());
        let spec = TransformSpec {
            groupby: Some(vec!["region".to_string()]),
            aggregations: Some(aggregations),
            ..Default::default()
        };
        let out = apply(rows, &spec).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("qty_sum"), Some(&Scalar::Float(5.0)));
    }
}
