//! Free-form query string to DNF predicate parsing (§4.4).

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

use super::{Clause, Condition, Dnf};
use crate::model::Scalar;

static OR_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bor\b").unwrap());
static AND_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\band\b").unwrap());
// Unanchored, matching the original's `re.search` — an embedded email
// (e.g. preceded by the keyword "email ") is extracted, not required to
// span the whole conjunct.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").unwrap());
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:user )?id\s*(?:=|is)?\s*(\d+)$").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:signup_date|signup|signed up|date)\s*(?:=|is|on)?\s*(\d{4}-\d{2}-\d{2})$")
        .unwrap()
});
static REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:region\s*(?:=|is)?\s*)?(na|eu|apac|latam)$").unwrap());
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:name\s*(?:=|is)?|user(?:\s+with\s+name)?)\s+([a-z0-9._-]+)$").unwrap());

/// Normalise raw user input: lowercase, collapse whitespace, strip
/// punctuation except `@ . - _`.
fn normalize(input: &str) -> String {
    let lowered = input.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || matches!(c, '@' | '.' | '-' | '_') {
                c
            } else {
                ' '
            }
        })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a free-form query into a DNF predicate. Total: every input
/// produces a non-empty DNF, never an error.
pub fn parse(input: &str) -> Dnf {
    let normalized = normalize(input);
    if normalized.is_empty() {
        return Dnf::single_any_like(&normalized);
    }

    let mut clauses = Vec::new();
    for disjunct in OR_SPLIT.split(&normalized) {
        let disjunct = disjunct.trim();
        if disjunct.is_empty() {
            continue;
        }
        let mut conditions = Vec::new();
        for conjunct in AND_SPLIT.split(disjunct) {
            let conjunct = conjunct.trim();
            if conjunct.is_empty() {
                continue;
            }
            conditions.push(classify(conjunct));
        }
        if !conditions.is_empty() {
            clauses.push(conditions);
        }
    }

    if clauses.is_empty() {
        Dnf::single_any_like(&normalized)
    } else {
        Dnf(clauses)
    }
}

fn classify(conjunct: &str) -> Condition {
    if conjunct.contains("last month") || conjunct.contains("previous month") {
        let (start, end) = previous_month_range();
        return Condition::Range { start, end };
    }

    if let Some(m) = EMAIL_RE.find(conjunct) {
        return Condition::Eq {
            field: "email".to_string(),
            value: Scalar::Str(m.as_str().to_string()),
        };
    }

    if let Some(caps) = ID_RE.captures(conjunct) {
        let id: i64 = caps[1].parse().unwrap_or_default();
        return Condition::Eq {
            field: "id".to_string(),
            value: Scalar::Int(id),
        };
    }

    if let Some(caps) = DATE_RE.captures(conjunct) {
        return Condition::Eq {
            field: "signup_date".to_string(),
            value: Scalar::Str(caps[1].to_string()),
        };
    }
    if let Some(caps) = REGION_RE.captures(conjunct) {
        return Condition::Eq {
            field: "region".to_string(),
            value: Scalar::Str(caps[1].to_uppercase()),
        };
    }

    if let Some(caps) = NAME_RE.captures(conjunct) {
        return Condition::Eq {
            field: "name".to_string(),
            value: Scalar::Str(caps[1].to_string()),
        };
    }

    Condition::Like {
        field: "any".to_string(),
        value: conjunct.to_string(),
    }
}

fn previous_month_range() -> (String, String) {
    let today = Utc::now().date_naive();
    let first_of_this_month = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap();
    let first_of_prev_month = if today.month() == 1 {
        NaiveDate::from_ymd_opt(today.year() - 1, 12, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() - 1, 1).unwrap()
    };
    (
        first_of_prev_month.format("%Y-%m-%d").to_string(),
        first_of_this_month.format("%Y-%m-%d").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_input_yields_nonempty_dnf() {
        for input in ["", "   ", "!!!", "region EU and signup_date 2025-01-22"] {
            assert!(!parse(input).is_empty(), "input: {input:?}");
        }
    }

    #[test]
    fn and_across_fields_is_one_clause_two_conditions() {
        let dnf = parse("region EU and signup_date 2025-01-22");
        assert_eq!(dnf.0.len(), 1);
        assert_eq!(dnf.0[0].len(), 2);
    }

    #[test]
    fn or_across_fields_is_two_clauses() {
        let dnf = parse("region EU or region NA");
        assert_eq!(dnf.0.len(), 2);
    }

    #[test]
    fn email_shaped_token_recognised() {
        let dnf = parse("email apiuser21@example.com");
        match &dnf.0[0][0] {
            Condition::Eq { field, value } => {
                assert_eq!(field, "email");
                assert_eq!(*value, Scalar::Str("apiuser21@example.com".to_string()));
            }
            other => panic!("unexpected condition: {other:?}"),
        }
    }

    #[test]
    fn id_recognised() {
        let dnf = parse("user id 42");
        assert_eq!(
            dnf.0[0][0],
            Condition::Eq { field: "id".to_string(), value: Scalar::Int(42) }
        );
    }

    #[test]
    fn bare_region_code_recognised() {
        let dnf = parse("eu");
        assert_eq!(
            dnf.0[0][0],
            Condition::Eq { field: "region".to_string(), value: Scalar::Str("EU".to_string()) }
        );
    }

    #[test]
    fn fallback_any_like() {
        let dnf = parse("xyzzy plugh");
        match &dnf.0[0][0] {
            Condition::Like { field, .. } => assert_eq!(field, "any"),
            other => panic!("unexpected condition: {other:?}"),
        }
    }

    #[test]
    fn last_month_literal_is_range() {
        let dnf = parse("signed up last month and region na");
        assert!(matches!(dnf.0[0][0], Condition::Range { .. }));
    }
}
