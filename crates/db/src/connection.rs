use std::str::FromStr;
use std::time::Duration;

use shelfsense_core::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

pub type DbPool = sqlx::SqlitePool;

/// Opens the pool every query path uses.
///
/// Each physical connection gets `PRAGMA query_only = ON` from the pool hook,
/// and the hook reads the pragma back: a connection on which the pragma did not
/// take effect is refused, so the pool can never hand out a writable handle.
/// The database file must already exist.
pub async fn open_read_only(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(false);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA query_only = ON").execute(&mut *conn).await?;
                let enabled: i64 =
                    sqlx::query_scalar("PRAGMA query_only").fetch_one(&mut *conn).await?;
                if enabled != 1 {
                    return Err(sqlx::Error::Configuration(
                        "query_only pragma did not take effect on new connection".into(),
                    ));
                }
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect_with(options)
        .await?;

    info!(event_name = "db.pool.read_only_opened", url = %config.url, "opened read-only pool");
    Ok(pool)
}

/// Writable pool for loading data. Only the fixture loader uses it.
pub async fn open_ingest(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect_with(options)
        .await
}

/// Reads `PRAGMA query_only` back from a pooled connection.
pub async fn query_only_enabled(pool: &DbPool) -> Result<bool, sqlx::Error> {
    let enabled: i64 = sqlx::query_scalar("PRAGMA query_only").fetch_one(pool).await?;
    Ok(enabled == 1)
}

/// True when the engine refused a write (SQLITE_READONLY and its extended codes).
pub fn is_read_only_error(error: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_error) = error else {
        return false;
    };

    let code_matches = db_error
        .code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| code & 0xff == 8);

    code_matches || db_error.message().to_ascii_lowercase().contains("readonly")
}
