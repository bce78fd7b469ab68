//! Lower a DNF predicate into a parameterised relational WHERE clause (§4.5).

use crate::model::{Scalar, CANONICAL_FIELDS};

use super::{Condition, Dnf};

/// A compiled WHERE clause plus its positional bind parameters, in
/// traversal order. Consumers must bind `params` — never inline them.
pub struct CompiledWhere {
    pub sql: String,
    pub params: Vec<Scalar>,
}

pub fn compile(dnf: &Dnf) -> CompiledWhere {
    if dnf.0.is_empty() {
        return CompiledWhere { sql: "1=1".to_string(), params: Vec::new() };
    }

    let mut params = Vec::new();
    let mut clause_fragments = Vec::with_capacity(dnf.0.len());

    for clause in &dnf.0 {
        let mut condition_fragments = Vec::with_capacity(clause.len());
        for condition in clause {
            condition_fragments.push(compile_condition(condition, &mut params));
        }
        clause_fragments.push(format!("({})", condition_fragments.join(" AND ")));
    }

    CompiledWhere { sql: clause_fragments.join(" OR "), params }
}

fn compile_condition(condition: &Condition, params: &mut Vec<Scalar>) -> String {
    match condition {
        Condition::Range { start, end } => {
            params.push(Scalar::Str(start.clone()));
            params.push(Scalar::Str(end.clone()));
            "(signup_date >= ? AND signup_date < ?)".to_string()
        }
        Condition::Like { field, value } if field == "any" => {
            let needle = format!("%{value}%");
            let mut fragments = Vec::new();
            for col in CANONICAL_FIELDS {
                params.push(Scalar::Str(needle.clone()));
                if col == "id" {
                    fragments.push("(cast(id as text) LIKE ?)".to_string());
                } else if col == "signup_date" {
                    fragments.push("(signup_date LIKE ?)".to_string());
                } else {
                    fragments.push(format!("(lower({col}) LIKE ?)"));
                }
            }
            format!("({})", fragments.join(" OR "))
        }
        Condition::Like { field, value } => {
            params.push(Scalar::Str(format!("%{value}%")));
            format!("(lower({field}) LIKE lower(?))")
        }
        Condition::Eq { field, value } if field == "id" => {
            let coerced = match value {
                Scalar::Int(n) => Scalar::Int(*n),
                Scalar::Str(s) => s.trim().parse::<i64>().map_or(Scalar::Int(0), Scalar::Int),
                other => other.clone(),
            };
            params.push(coerced);
            "(id = ?)".to_string()
        }
        Condition::Eq { field, value } => {
            params.push(value.clone());
            format!("(lower({field}) = lower(?))")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::parser::parse;

    #[test]
    fn no_clauses_compiles_to_tautology() {
        let compiled = compile(&Dnf(Vec::new()));
        assert_eq!(compiled.sql, "1=1");
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn and_across_fields_produces_one_anded_fragment() {
        let dnf = parse("region EU and signup_date 2025-01-22");
        let compiled = compile(&dnf);
        assert_eq!(compiled.params.len(), 2);
        assert!(compiled.sql.starts_with('('));
        assert!(compiled.sql.contains("AND"));
        assert!(!compiled.sql.contains("OR"));
    }

    #[test]
    fn or_across_fields_produces_two_ored_fragments() {
        let dnf = parse("region EU or region NA");
        let compiled = compile(&dnf);
        assert_eq!(compiled.sql.matches(" OR ").count(), 1);
        assert_eq!(compiled.params.len(), 2);
    }

    #[test]
    fn last_month_shortcut_compiles_to_half_open_range() {
        let dnf = parse("signed up last month and region na");
        let compiled = compile(&dnf);
        assert!(compiled.sql.contains("signup_date >= ?"));
        assert!(compiled.sql.contains("signup_date < ?"));
        assert_eq!(compiled.params.len(), 3);
    }

    #[test]
    fn id_eq_coerces_to_integer_param() {
        let dnf = parse("user id 42");
        let compiled = compile(&dnf);
        assert_eq!(compiled.params[0], Scalar::Int(42));
    }
}
