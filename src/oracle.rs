//! Natural-language-to-SQL oracle boundary.
//!
//! The real oracle is an opaque function of one string returning one
//! string; a production wiring to a model is orthogonal to this crate.
//! This is the deterministic test double the design notes call for.

/// Translate a free-form question into a `SELECT` statement against the
/// seeded schema. Matches a small set of fixed prompt prefixes; anything
/// else falls back to a generic bounded scan of `users`.
pub fn ask(question: &str) -> String {
    let q = question.trim().to_lowercase();

    if q.contains("how many users") || q.contains("count") && q.contains("user") {
        return "SELECT COUNT(*) AS count FROM users".to_string();
    }

    if let Some(region) = extract_region(&q) {
        return format!(
            "SELECT id, name, email, region, signup_date FROM users WHERE lower(region) = lower('{region}')"
        );
    }

    if q.contains("order") && q.contains("product") {
        return "SELECT o.id, u.name, p.name AS product, o.quantity, o.order_date \
                 FROM orders o JOIN users u ON o.user_id = u.id JOIN products p ON o.product = p.name"
            .to_string();
    }

    "SELECT * FROM users LIMIT 20".to_string()
}

fn extract_region(q: &str) -> Option<&'static str> {
    for code in ["na", "eu", "apac", "latam"] {
        if q.split(|c: char| !c.is_alphanumeric()).any(|tok| tok == code) {
            return Some(match code {
                "na" => "NA",
                "eu" => "EU",
                "apac" => "APAC",
                _ => "LATAM",
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_question_maps_to_count_query() {
        assert_eq!(ask("How many users do we have?"), "SELECT COUNT(*) AS count FROM users");
    }

    #[test]
    fn region_question_maps_to_filtered_query() {
        assert!(ask("show users in EU").contains("lower(region) = lower('EU')"));
    }

    #[test]
    fn unrecognised_question_falls_back_to_bounded_scan() {
        assert_eq!(ask("what is the meaning of life"), "SELECT * FROM users LIMIT 20");
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(ask("users in NA"), ask("users in NA"));
    }
}
