//! Safe, read-only relational execution with a forced row cap, plus the
//! idempotent seed routine (§4.1).

use std::sync::Mutex;

use chrono::{Duration, NaiveDate};
use duckdb::Connection;
use duckdb::types::Value as DuckValue;

use crate::error::{Error, Result};
use crate::model::{Row, Scalar};

const IMPLICIT_ROW_CAP: u32 = 1000;

/// Wraps a single `DuckDB` connection behind a mutex. `DuckDB`'s connection
/// is `!Sync`; callers reach it only through [`spawn_blocking`] so the
/// mutex is held only for the duration of one synchronous query.
///
/// [`spawn_blocking`]: tokio::task::spawn_blocking
pub struct RelationalStore {
    conn: Mutex<Connection>,
}

/// Result of a relational execution: column names plus row data.
pub struct ExecResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RelationalStore {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn: Mutex::new(conn) };
        store.seed_if_empty()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.seed_if_empty()?;
        Ok(store)
    }

    /// Execute a `SELECT` statement with bound parameters. Fails with
    /// [`Error::BadRequest`] on empty input or a non-`SELECT` statement.
    pub fn execute(&self, sql: &str, params: &[Scalar]) -> Result<ExecResult> {
        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return Err(Error::BadRequest("empty SQL".to_string()));
        }
        let lowered = trimmed.to_lowercase();
        if !lowered.starts_with("select") {
            return Err(Error::BadRequest(
                "only SELECT queries are allowed".to_string(),
            ));
        }

        let without_semicolon = trimmed.trim_end_matches(';');
        let final_sql = if lowered.contains("limit") {
            without_semicolon.to_string()
        } else {
            format!("{without_semicolon} LIMIT {IMPLICIT_ROW_CAP}")
        };

        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn.prepare(&final_sql)?;
        let duck_params: Vec<DuckValue> = params.iter().map(to_duck_value).collect();
        let param_refs: Vec<&dyn duckdb::ToSql> =
            duck_params.iter().map(|v| v as &dyn duckdb::ToSql).collect();

        let mut rows_iter = stmt.query(param_refs.as_slice())?;
        let column_count = rows_iter.as_ref().map_or(0, duckdb::Statement::column_count);
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                rows_iter
                    .as_ref()
                    .and_then(|s| s.column_name(i).ok())
                    .map_or_else(|| "?".to_string(), String::clone)
            })
            .collect();

        let mut rows = Vec::new();
        while let Some(row) = rows_iter.next()? {
            let mut out = Row::new();
            for (i, name) in columns.iter().enumerate() {
                out.insert(name.clone(), from_duck_value_ref(&row.get_ref(i)?));
            }
            rows.push(out);
        }

        Ok(ExecResult { columns, rows })
    }

    pub fn list_tables(&self) -> Result<Vec<String>> {
        let result = self.execute(
            "SELECT name FROM sqlite_master WHERE type = 'table'",
            &[],
        )?;
        Ok(result
            .rows
            .into_iter()
            .filter_map(|r| r.get("name").map(ToString::to_string))
            .collect())
    }

    fn seed_if_empty(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let has_users: bool = conn
            .query_row(
                "SELECT count(*) FROM information_schema.tables WHERE table_name = 'users'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .unwrap_or(0)
            > 0;
        if has_users {
            return Ok(());
        }

        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT UNIQUE, region TEXT, signup_date TEXT);
             CREATE TABLE products (id INTEGER PRIMARY KEY, name TEXT NOT NULL, price DOUBLE);
             CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER, product TEXT, quantity INTEGER, order_date TEXT);",
        )?;

        let regions = ["NA", "EU", "APAC", "LATAM"];
        let today = chrono::Utc::now().date_naive();
        for i in 1..=200_i64 {
            let region = regions[(i as usize - 1) % regions.len()];
            let signup = signup_date_for(today, i);
            conn.execute(
                "INSERT INTO users (id, name, email, region, signup_date) VALUES (?, ?, ?, ?, ?)",
                duckdb::params![
                    i,
                    format!("User {i}"),
                    format!("user{i}@example.com"),
                    region,
                    signup.format("%Y-%m-%d").to_string(),
                ],
            )?;
        }

        let products = [(1, "Widget", 9.99), (2, "Gadget", 19.99), (3, "Gizmo", 29.99)];
        for (id, name, price) in products {
            conn.execute(
                "INSERT INTO products (id, name, price) VALUES (?, ?, ?)",
                duckdb::params![id, name, price],
            )?;
        }

        for i in 1..=150_i64 {
            let user_id = (i % 200) + 1;
            let product = products[(i as usize - 1) % products.len()].1;
            let order_date = signup_date_for(today, i);
            conn.execute(
                "INSERT INTO orders (id, user_id, product, quantity, order_date) VALUES (?, ?, ?, ?, ?)",
                duckdb::params![
                    i,
                    user_id,
                    product,
                    (i % 5) + 1,
                    order_date.format("%Y-%m-%d").to_string(),
                ],
            )?;
        }

        Ok(())
    }
}

fn signup_date_for(today: NaiveDate, ordinal: i64) -> NaiveDate {
    today - Duration::days((ordinal % 365).max(0))
}

fn to_duck_value(scalar: &Scalar) -> DuckValue {
    match scalar {
        Scalar::Int(n) => DuckValue::BigInt(*n),
        Scalar::Float(f) => DuckValue::Double(*f),
        Scalar::Str(s) => DuckValue::Text(s.clone()),
        Scalar::Bool(b) => DuckValue::Boolean(*b),
        Scalar::Null => DuckValue::Null,
    }
}

fn from_duck_value_ref(value: &duckdb::types::ValueRef<'_>) -> Scalar {
    use duckdb::types::ValueRef;
    match value {
        ValueRef::Null => Scalar::Null,
        ValueRef::Boolean(b) => Scalar::Bool(*b),
        ValueRef::TinyInt(n) => Scalar::Int(i64::from(*n)),
        ValueRef::SmallInt(n) => Scalar::Int(i64::from(*n)),
        ValueRef::Int(n) => Scalar::Int(i64::from(*n)),
        ValueRef::BigInt(n) => Scalar::Int(*n),
        ValueRef::Float(n) => Scalar::Float(f64::from(*n)),
        ValueRef::Double(n) => Scalar::Float(*n),
        ValueRef::Text(bytes) => {
            Scalar::Str(String::from_utf8_lossy(bytes).into_owned())
        }
        other => Scalar::Str(format!("{other:?}")),
    }
}
