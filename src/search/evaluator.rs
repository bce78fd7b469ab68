//! Local (in-memory) predicate evaluation, mirroring the compiler's
//! semantics so parser→compiler→evaluator agreement holds (§8 invariant).

use crate::model::{Row, Scalar, CANONICAL_FIELDS};

use super::{Condition, Dnf};

/// True if `row` satisfies the predicate: any clause matches, where a
/// clause matches when all its conditions match.
pub fn matches(dnf: &Dnf, row: &Row) -> bool {
    dnf.0.iter().any(|clause| clause.iter().all(|cond| condition_matches(cond, row)))
}

fn condition_matches(condition: &Condition, row: &Row) -> bool {
    match condition {
        Condition::Range { start, end } => {
            row.get("signup_date").is_some_and(|v| {
                let s = v.to_lower_string();
                s.as_str() >= start.as_str() && s.as_str() < end.as_str()
            })
        }
        Condition::Like { field, value } if field == "any" => {
            let needle = value.to_lowercase();
            CANONICAL_FIELDS
                .iter()
                .any(|col| row.get(*col).is_some_and(|v| v.to_lower_string().contains(&needle)))
        }
        Condition::Like { field, value } => {
            let needle = value.to_lowercase();
            row.get(field.as_str()).is_some_and(|v| v.to_lower_string().contains(&needle))
        }
        Condition::Eq { field, value } if field == "id" => {
            let target = match value {
                Scalar::Int(n) => *n,
                Scalar::Str(s) => s.trim().parse().unwrap_or_default(),
                _ => return false,
            };
            row.get("id").is_some_and(|v| match v {
                Scalar::Int(n) => *n == target,
                Scalar::Str(s) => s.trim().parse::<i64>() == Ok(target),
                _ => false,
            })
        }
        Condition::Eq { field, value } => {
            let target = value.to_lower_string();
            row.get(field.as_str()).is_some_and(|v| v.to_lower_string() == target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::parser::parse;
    use std::collections::BTreeMap;

    fn row(pairs: &[(&str, &str)]) -> Row {
        let mut r: BTreeMap<String, Scalar> = BTreeMap::new();
        for (k, v) in pairs {
            r.insert((*k).to_string(), Scalar::Str((*v).to_string()));
        }
        r
    }

    #[test]
    fn and_requires_both_conditions() {
        let dnf = parse("region EU and signup_date 2025-01-22");
        let matching = row(&[("region", "EU"), ("signup_date", "2025-01-22")]);
        let non_matching = row(&[("region", "EU"), ("signup_date", "2025-01-23")]);
        assert!(matches(&dnf, &matching));
        assert!(!matches(&dnf, &non_matching));
    }

    #[test]
    fn or_excludes_unlisted_region() {
        let dnf = parse("region EU or region NA");
        let apac = row(&[("region", "APAC")]);
        let eu = row(&[("region", "EU")]);
        assert!(!matches(&dnf, &apac));
        assert!(matches(&dnf, &eu));
    }

    #[test]
    fn any_like_searches_canonical_fields_case_insensitively() {
        let dnf = parse("apiuser21");
        let matching = row(&[("email", "apiuser21@example.com")]);
        assert!(matches(&dnf, &matching));
    }

    #[test]
    fn range_is_half_open() {
        let dnf = super::super::Dnf(vec![vec![Condition::Range {
            start: "2026-01-01".to_string(),
            end: "2026-02-01".to_string(),
        }]]);
        assert!(matches(&dnf, &row(&[("signup_date", "2026-01-31")])));
        assert!(!matches(&dnf, &row(&[("signup_date", "2026-02-01")])));
    }
}
