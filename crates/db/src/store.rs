//! SQL execution against the read-only pool.
//!
//! Statements pass a lexical gate before reaching the engine: exactly one
//! statement whose effective head is `SELECT` or `VALUES` is accepted. The head
//! is read past `EXPLAIN [QUERY PLAN]` and past a `WITH` clause, so
//! `EXPLAIN PRAGMA ...` and `WITH ... DELETE` are classified by what they run.
//! Anything that could mutate data or connection state, `PRAGMA` included, is
//! refused without touching the database. The engine-level `query_only` pragma
//! remains the authority for anything the gate lets through, and it is read
//! back after every statement: a connection that lost it closes the store.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::TryStreamExt;
use serde::Serialize;
use serde_json::Value;
use shelfsense_core::config::DatabaseConfig;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::connection::{is_read_only_error, open_read_only, query_only_enabled, DbPool};

pub const MAX_TEXT_CHARS: usize = 300;
pub const SAMPLE_ROWS: usize = 3;

const READ_HEADS: &[&str] = &["SELECT", "VALUES"];
/// Keywords that can follow a `WITH` clause as the statement proper.
const WITH_BODIES: &[&str] = &["SELECT", "VALUES", "INSERT", "UPDATE", "DELETE", "REPLACE"];
const MUTATION_CLASS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "REPLACE", "DROP", "ALTER", "CREATE", "TRUNCATE", "ATTACH",
    "DETACH", "VACUUM", "REINDEX", "PRAGMA", "ANALYZE", "BEGIN", "COMMIT", "ROLLBACK", "SAVEPOINT",
    "RELEASE", "UPSERT", "MERGE", "GRANT", "REVOKE",
];

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("read-only violation: {0}")]
    ReadOnlyViolation(String),
    /// A pooled connection stopped reporting `query_only`; the store is closed.
    #[error("read-only guarantee lost: {0}")]
    ReadOnlyLost(String),
    #[error("invalid statement: {0}")]
    InvalidStatement(String),
    #[error("unknown table(s): {0}")]
    UnknownTable(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl QueryError {
    /// Permission-class failure, from the gate or from the engine.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::ReadOnlyViolation(_) | Self::ReadOnlyLost(_))
    }

    pub fn is_store_closed(&self) -> bool {
        matches!(self, Self::Database(sqlx::Error::PoolClosed))
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(error: sqlx::Error) -> Self {
        if is_read_only_error(&error) {
            Self::ReadOnlyViolation(error.to_string())
        } else {
            Self::Database(error)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub truncated: bool,
}

impl QueryOutput {
    /// Tuple-per-row text, the shape the planner is prompted to read.
    pub fn render(&self) -> String {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let cells = row.iter().map(render_cell).collect::<Vec<_>>();
                if cells.len() == 1 {
                    format!("({},)", cells[0])
                } else {
                    format!("({})", cells.join(", "))
                }
            })
            .collect::<Vec<_>>();

        let mut rendered = format!("[{}]", rows.join(", "));
        if self.truncated {
            rendered.push_str(&format!(" (showing first {} rows)", self.rows.len()));
        }
        rendered
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::String(text) => format!("'{}'", truncate_text(text)),
        other => other.to_string(),
    }
}

fn truncate_text(text: &str) -> String {
    if text.chars().count() <= MAX_TEXT_CHARS {
        return text.to_string();
    }
    let mut truncated = text.chars().take(MAX_TEXT_CHARS).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// The only handle through which the assistant reaches the database.
pub struct ReadOnlyStore {
    pool: DbPool,
    max_rows: usize,
    queries_executed: AtomicU64,
}

impl ReadOnlyStore {
    pub async fn open(config: &DatabaseConfig, max_rows: usize) -> Result<Self, sqlx::Error> {
        let pool = open_read_only(config).await?;
        Ok(Self { pool, max_rows: max_rows.max(1), queries_executed: AtomicU64::new(0) })
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Statements actually sent to the engine since the store was opened.
    pub fn queries_executed(&self) -> u64 {
        self.queries_executed.load(Ordering::SeqCst)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Whether a pooled connection still reports `query_only`. Not counted as a
    /// query.
    pub async fn probe_read_only(&self) -> Result<bool, QueryError> {
        Ok(query_only_enabled(&self.pool).await?)
    }

    /// Runs one gated statement, reading at most `max_rows + 1` rows from the
    /// engine. The connection's `query_only` flag is verified before it goes
    /// back to the pool.
    pub async fn execute(&self, sql: &str) -> Result<QueryOutput, QueryError> {
        let statement = match gate_statement(sql) {
            Ok(statement) => statement,
            Err(error) => {
                warn!(event_name = "db.query.rejected", error = %error, "statement refused by read-only gate");
                return Err(error);
            }
        };

        let mut conn = self.pool.acquire().await?;
        self.queries_executed.fetch_add(1, Ordering::SeqCst);
        let fetched = stream_rows(&mut conn, statement, self.max_rows).await;
        self.release_verified(conn).await?;
        let output = fetched?;

        debug!(
            event_name = "db.query.executed",
            rows = output.rows.len(),
            truncated = output.truncated,
            "query executed"
        );
        Ok(output)
    }

    /// Returns the connection to the pool only if it still reports `query_only`.
    /// Otherwise the connection is discarded and the whole store is closed.
    async fn release_verified(&self, mut conn: PoolConnection<Sqlite>) -> Result<(), QueryError> {
        let enabled: i64 = sqlx::query_scalar("PRAGMA query_only").fetch_one(&mut *conn).await?;
        if enabled == 1 {
            return Ok(());
        }

        error!(
            event_name = "db.query_only.lost",
            "connection no longer reports query_only; closing the read-only store"
        );
        drop(conn.detach());
        self.pool.close().await;
        Err(QueryError::ReadOnlyLost(
            "connection no longer reports query_only; the store has been closed".to_string(),
        ))
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, QueryError> {
        let rows = self
            .fetch_rows(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .await?;
        rows.iter().map(|row| row.try_get::<String, _>("name").map_err(QueryError::from)).collect()
    }

    /// CREATE statement plus a few sample rows for each requested table.
    pub async fn table_info(&self, names: &[&str]) -> Result<String, QueryError> {
        let known = self.list_tables().await?;
        let mut resolved = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();
        for name in names {
            match known.iter().find(|table| table.eq_ignore_ascii_case(name.trim())) {
                Some(table) => resolved.push(table.clone()),
                None => unknown.push(name.trim().to_string()),
            }
        }
        if !unknown.is_empty() {
            return Err(QueryError::UnknownTable(unknown.join(", ")));
        }

        let mut sections = Vec::with_capacity(resolved.len());
        for table in resolved {
            let ddl_rows = self
                .fetch_rows_bound(
                    "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?",
                    &table,
                )
                .await?;
            let ddl = match ddl_rows.first() {
                Some(row) => row.try_get::<Option<String>, _>("sql")?.unwrap_or_default(),
                None => String::new(),
            };

            let samples = self
                .fetch_rows(&format!(
                    "SELECT * FROM \"{}\" LIMIT {SAMPLE_ROWS}",
                    table.replace('"', "\"\"")
                ))
                .await?;
            let header = samples
                .first()
                .map(|row| {
                    row.columns().iter().map(|column| column.name().to_string()).collect::<Vec<_>>()
                })
                .unwrap_or_default();
            let mut body = Vec::with_capacity(samples.len());
            for row in &samples {
                let cells = decode_row(row)?
                    .iter()
                    .map(|value| match value {
                        Value::String(text) => truncate_text(text),
                        Value::Null => "None".to_string(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>();
                body.push(cells.join("\t"));
            }

            sections.push(format!(
                "{}\n\n/*\n{} rows from {} table:\n{}\n{}\n*/",
                ddl.trim(),
                samples.len(),
                table,
                header.join("\t"),
                body.join("\n")
            ));
        }

        Ok(sections.join("\n\n"))
    }

    pub(crate) async fn fetch_rows(&self, sql: &str) -> Result<Vec<SqliteRow>, QueryError> {
        self.queries_executed.fetch_add(1, Ordering::SeqCst);
        sqlx::query(sql).fetch_all(&self.pool).await.map_err(QueryError::from)
    }

    async fn fetch_rows_bound(&self, sql: &str, bind: &str) -> Result<Vec<SqliteRow>, QueryError> {
        self.queries_executed.fetch_add(1, Ordering::SeqCst);
        sqlx::query(sql).bind(bind).fetch_all(&self.pool).await.map_err(QueryError::from)
    }
}

async fn stream_rows(
    conn: &mut SqliteConnection,
    statement: &str,
    max_rows: usize,
) -> Result<QueryOutput, QueryError> {
    let mut stream = sqlx::query(statement).fetch(conn);
    let mut columns = Vec::new();
    let mut rows = Vec::new();
    let mut truncated = false;

    while let Some(row) = stream.try_next().await? {
        if rows.len() == max_rows {
            truncated = true;
            break;
        }
        if rows.is_empty() {
            columns = row.columns().iter().map(|column| column.name().to_string()).collect();
        }
        rows.push(decode_row(&row)?);
    }

    Ok(QueryOutput { columns, rows, truncated })
}

pub(crate) fn decode_row(row: &SqliteRow) -> Result<Vec<Value>, QueryError> {
    let mut values = Vec::with_capacity(row.len());
    for index in 0..row.len() {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            values.push(Value::Null);
            continue;
        }
        let type_name = raw.type_info().name().to_ascii_uppercase();
        let value = match type_name.as_str() {
            "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
                Value::from(row.try_get_unchecked::<i64, _>(index)?)
            }
            "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
                Value::from(row.try_get_unchecked::<f64, _>(index)?)
            }
            "BLOB" => {
                let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
                Value::String(format!("<{} bytes>", bytes.len()))
            }
            _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
        };
        values.push(value);
    }
    Ok(values)
}

/// Returns the statement with leading comments and trailing terminators removed,
/// or the reason it may not run.
pub fn gate_statement(sql: &str) -> Result<&str, QueryError> {
    let statements = split_statements(sql);
    if statements.is_empty() {
        return Err(QueryError::InvalidStatement("empty statement".to_string()));
    }

    for statement in &statements {
        let keyword = effective_keyword(statement);
        if MUTATION_CLASS.contains(&keyword.as_str()) {
            return Err(QueryError::ReadOnlyViolation(format!(
                "{keyword} statements are not permitted on the read-only store"
            )));
        }
    }

    if statements.len() > 1 {
        return Err(QueryError::InvalidStatement(
            "only a single statement may be executed at a time".to_string(),
        ));
    }

    let statement = statements[0];
    let keyword = effective_keyword(statement);
    if !READ_HEADS.contains(&keyword.as_str()) {
        return Err(QueryError::InvalidStatement(format!(
            "unsupported statement starting with `{keyword}`; only SELECT queries are allowed"
        )));
    }

    Ok(statement)
}

/// The keyword naming what the statement actually runs.
fn effective_keyword(statement: &str) -> String {
    let words = top_level_words(statement);
    let mut rest = words.as_slice();
    if rest.first().is_some_and(|word| word == "EXPLAIN") {
        rest = &rest[1..];
        if rest.len() >= 2 && rest[0] == "QUERY" && rest[1] == "PLAN" {
            rest = &rest[2..];
        }
    }

    match rest.first().map(String::as_str) {
        Some("WITH") => rest
            .iter()
            .find(|word| WITH_BODIES.contains(&word.as_str()))
            .cloned()
            .unwrap_or_else(|| "WITH".to_string()),
        Some(word) => word.to_string(),
        None => String::new(),
    }
}

/// Uppercased words outside parentheses, literals, quoted identifiers and
/// comments.
fn top_level_words(statement: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut previous: Option<usize> = None;

    scan_code(statement, |index, byte| {
        let contiguous = previous.is_some_and(|last| last + 1 == index);
        previous = Some(index);
        if !contiguous && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        match byte {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 && (byte.is_ascii_alphanumeric() || byte == b'_') {
            current.push(char::from(byte.to_ascii_uppercase()));
        } else if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
    });
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    SingleQuote,
    DoubleQuote,
    Backtick,
    Bracket,
    LineComment,
    BlockComment,
}

/// Calls `visit` with the offset of every byte of `sql` that sits outside
/// literals, quoted identifiers and comments.
fn scan_code(sql: &str, mut visit: impl FnMut(usize, u8)) {
    let bytes = sql.as_bytes();
    let mut state = ScanState::Code;
    let mut index = 0;

    while index < bytes.len() {
        let byte = bytes[index];
        let next = bytes.get(index + 1).copied();
        match state {
            ScanState::Code => match byte {
                b'\'' => state = ScanState::SingleQuote,
                b'"' => state = ScanState::DoubleQuote,
                b'`' => state = ScanState::Backtick,
                b'[' => state = ScanState::Bracket,
                b'-' if next == Some(b'-') => {
                    state = ScanState::LineComment;
                    index += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = ScanState::BlockComment;
                    index += 1;
                }
                _ => visit(index, byte),
            },
            ScanState::SingleQuote if byte == b'\'' => state = ScanState::Code,
            ScanState::DoubleQuote if byte == b'"' => state = ScanState::Code,
            ScanState::Backtick if byte == b'`' => state = ScanState::Code,
            ScanState::Bracket if byte == b']' => state = ScanState::Code,
            ScanState::LineComment if byte == b'\n' => state = ScanState::Code,
            ScanState::BlockComment if byte == b'*' && next == Some(b'/') => {
                state = ScanState::Code;
                index += 1;
            }
            _ => {}
        }
        index += 1;
    }
}

/// Splits on top-level `;`. Each piece is returned without leading comments or
/// surrounding whitespace; pieces holding only comments are dropped.
fn split_statements(sql: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    scan_code(sql, |index, byte| {
        if byte == b';' {
            pieces.push(&sql[start..index]);
            start = index + 1;
        }
    });
    pieces.push(&sql[start..]);

    pieces.into_iter().map(strip_leading_comments).filter(|piece| !piece.is_empty()).collect()
}

fn strip_leading_comments(mut sql: &str) -> &str {
    loop {
        sql = sql.trim();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.split_once('\n').map(|(_, tail)| tail).unwrap_or("");
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.split_once("*/").map(|(_, tail)| tail).unwrap_or("");
        } else {
            return sql;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use shelfsense_core::config::DatabaseConfig;
    use tempfile::TempDir;

    use super::{gate_statement, QueryError, QueryOutput, ReadOnlyStore};
    use crate::fixtures::seed_demo_store;

    async fn seeded_store_with(dir: &TempDir, max_rows: usize, max_connections: u32) -> ReadOnlyStore {
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("inventory.db").display()),
            max_connections,
            timeout_secs: 5,
        };
        seed_demo_store(&config.url).await.expect("seed");
        ReadOnlyStore::open(&config, max_rows).await.expect("open store")
    }

    async fn seeded_store(dir: &TempDir, max_rows: usize) -> ReadOnlyStore {
        seeded_store_with(dir, max_rows, 2).await
    }

    #[test]
    fn gate_accepts_select_class_statements() {
        assert_eq!(gate_statement("SELECT 1;").ok(), Some("SELECT 1"));
        assert!(gate_statement("  -- revenue\n with t as (select 1) select * from t").is_ok());
        assert!(gate_statement("/* note */ VALUES (1)").is_ok());
        assert!(gate_statement("EXPLAIN QUERY PLAN SELECT * FROM products").is_ok());
        assert!(gate_statement("explain with t as (select 1) select * from t").is_ok());
        assert!(gate_statement("SELECT 'a;b' AS x").is_ok());
        assert!(gate_statement("SELECT replace(Description, 'A', 'B') FROM products").is_ok());
        assert!(gate_statement(
            "WITH ranked AS (SELECT StockCode FROM products WHERE Description <> 'DELETE') \
             SELECT * FROM ranked WHERE StockCode IN (SELECT StockCode FROM transactions)"
        )
        .is_ok());
    }

    #[test]
    fn gate_refuses_mutations_and_pragma() {
        for sql in [
            "PRAGMA query_only = OFF",
            "insert into products values ('a', 'b', 1)",
            "TRUNCATE TABLE transactions",
            "SELECT 1; DROP TABLE transactions",
            "/* hidden */ DELETE FROM transactions",
            "ATTACH DATABASE 'other.db' AS other",
            "EXPLAIN PRAGMA query_only = OFF",
            "explain query plan pragma writable_schema = ON",
            "WITH d AS (SELECT 1) DELETE FROM transactions",
            "with recursive d(x) as (select 1) update products set Price = 0",
            "WITH \"select\" AS (SELECT 1) INSERT INTO products SELECT * FROM products",
        ] {
            let error = gate_statement(sql).expect_err(sql);
            assert!(error.is_permission_denied(), "{sql} -> {error}");
        }
    }

    #[test]
    fn gate_refuses_multiple_reads_and_empty_input() {
        assert!(matches!(gate_statement("SELECT 1; SELECT 2"), Err(QueryError::InvalidStatement(_))));
        assert!(matches!(gate_statement("  ;  -- nothing"), Err(QueryError::InvalidStatement(_))));
        assert!(matches!(gate_statement("SHOW TABLES"), Err(QueryError::InvalidStatement(_))));
        assert!(matches!(gate_statement("EXPLAIN"), Err(QueryError::InvalidStatement(_))));
        assert!(matches!(
            gate_statement("WITH t AS (SELECT 1)"),
            Err(QueryError::InvalidStatement(_))
        ));
    }

    #[test]
    fn render_uses_tuple_rows_and_truncates_long_text() {
        let output = QueryOutput {
            columns: vec!["Description".to_string(), "Revenue".to_string()],
            rows: vec![vec![json!("x".repeat(310)), json!(12.5)], vec![json!(null), json!(3)]],
            truncated: false,
        };
        let rendered = output.render();
        assert!(rendered.starts_with(&format!("[('{}...', 12.5)", "x".repeat(300))));
        assert!(rendered.ends_with("(None, 3)]"));

        let single = QueryOutput { columns: vec!["n".into()], rows: vec![vec![json!(7)]], truncated: false };
        assert_eq!(single.render(), "[(7,)]");
    }

    #[tokio::test]
    async fn writes_through_the_store_fail_with_permission_errors() {
        let dir = TempDir::new().expect("temp dir");
        let store = seeded_store(&dir, 50).await;
        let count_sql = "SELECT COUNT(*) AS n FROM transactions";
        let before = store.execute(count_sql).await.expect("count").rows;

        for sql in [
            "INSERT INTO transactions (Invoice, StockCode, Quantity, Price, InvoiceDate, CustomerID) VALUES ('1', '2', 3, 4.0, '2011-01-01 00:00:00', 1)",
            "UPDATE products SET Price = 0",
            "DELETE FROM transactions",
            "DROP TABLE products",
            "ALTER TABLE products RENAME TO items",
            "TRUNCATE TABLE transactions",
            "WITH doomed AS (SELECT 1) DELETE FROM transactions",
            "EXPLAIN PRAGMA query_only = OFF",
        ] {
            let error = store.execute(sql).await.expect_err(sql);
            assert!(error.is_permission_denied(), "{sql} -> {error}");
        }

        assert_eq!(store.execute(count_sql).await.expect("count").rows, before);
        assert!(store.probe_read_only().await.expect("probe"));
        store.close().await;
    }

    #[tokio::test]
    async fn store_closes_when_a_connection_loses_query_only() {
        let dir = TempDir::new().expect("temp dir");
        let store = seeded_store_with(&dir, 50, 1).await;

        {
            let mut conn = store.pool.acquire().await.expect("connection");
            sqlx::query("PRAGMA query_only = OFF").execute(&mut *conn).await.expect("pragma");
        }

        let error = store.execute("SELECT 1").await.expect_err("store must fail closed");
        assert!(matches!(error, QueryError::ReadOnlyLost(_)), "{error}");
        assert!(error.is_permission_denied());
        assert!(store.pool.is_closed());

        let closed = store.execute("SELECT 1").await.expect_err("closed store");
        assert!(closed.is_store_closed(), "{closed}");
    }

    #[tokio::test]
    async fn gate_rejections_never_reach_the_engine() {
        let dir = TempDir::new().expect("temp dir");
        let store = seeded_store(&dir, 50).await;

        assert!(store.execute("PRAGMA query_only = OFF").await.is_err());
        assert!(store.execute("DROP TABLE transactions").await.is_err());
        assert_eq!(store.queries_executed(), 0);

        store.execute("SELECT 1").await.expect("select");
        assert_eq!(store.queries_executed(), 1);
        store.close().await;
    }

    #[tokio::test]
    async fn results_are_capped_at_max_rows() {
        let dir = TempDir::new().expect("temp dir");
        let store = seeded_store(&dir, 2).await;

        let output = store.execute("SELECT StockCode FROM products ORDER BY StockCode").await.expect("query");
        assert_eq!(output.rows.len(), 2);
        assert!(output.truncated);
        assert_eq!(output.columns, vec!["StockCode".to_string()]);
        store.close().await;
    }

    #[tokio::test]
    async fn row_cap_stops_reading_an_unbounded_result() {
        let dir = TempDir::new().expect("temp dir");
        let store = seeded_store(&dir, 5).await;

        let endless = "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n) SELECT x FROM n";
        let output = tokio::time::timeout(Duration::from_secs(10), store.execute(endless))
            .await
            .expect("reading must stop at the row cap")
            .expect("query");

        assert_eq!(output.rows.len(), 5);
        assert!(output.truncated);
        assert_eq!(output.rows[4], vec![json!(5)]);
        assert!(store.probe_read_only().await.expect("probe"));
        store.close().await;
    }

    #[tokio::test]
    async fn schema_tools_describe_known_tables_only() {
        let dir = TempDir::new().expect("temp dir");
        let store = seeded_store(&dir, 50).await;

        let tables = store.list_tables().await.expect("tables");
        assert_eq!(tables, vec!["products".to_string(), "transactions".to_string()]);

        let info = store.table_info(&["products"]).await.expect("info");
        assert!(info.contains("CREATE TABLE"));
        assert!(info.contains("3 rows from products table:"));
        assert!(info.contains("StockCode\tDescription\tPrice"));

        assert!(matches!(
            store.table_info(&["customers"]).await,
            Err(QueryError::UnknownTable(name)) if name == "customers"
        ));
        store.close().await;
    }
}
