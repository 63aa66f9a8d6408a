use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use shelfsense_db::ReadOnlyStore;

#[derive(Clone)]
pub struct HealthState {
    store: Arc<ReadOnlyStore>,
    planner_ready: bool,
    forecast_ready: bool,
}

impl HealthState {
    pub fn new(store: Arc<ReadOnlyStore>, planner_ready: bool, forecast_ready: bool) -> Self {
        Self { store, planner_ready, forecast_ready }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub planner: HealthCheck,
    pub forecast: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Only the read-only database gates readiness; a missing planner or forecast
/// model degrades answers but the service still responds.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.store).await;
    let ready = database.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        planner: optional_check(state.planner_ready, "query planner constructed", "planner absent; check API key"),
        forecast: optional_check(state.forecast_ready, "forecast model loaded", "no forecast model loaded"),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(store: &ReadOnlyStore) -> HealthCheck {
    match store.probe_read_only().await {
        Ok(true) => HealthCheck { status: "ready", detail: "read-only connection verified".to_string() },
        Ok(false) => HealthCheck {
            status: "degraded",
            detail: "connection is not in query_only mode".to_string(),
        },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database probe failed: {error}") }
        }
    }
}

fn optional_check(ready: bool, ready_detail: &str, absent_detail: &str) -> HealthCheck {
    if ready {
        HealthCheck { status: "ready", detail: ready_detail.to_string() }
    } else {
        HealthCheck { status: "unavailable", detail: absent_detail.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use shelfsense_core::config::DatabaseConfig;
    use shelfsense_db::{seed_demo_store, ReadOnlyStore};
    use tempfile::TempDir;

    use crate::health::{health, HealthState};

    async fn store(dir: &TempDir) -> Arc<ReadOnlyStore> {
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("inventory.db").display()),
            max_connections: 1,
            timeout_secs: 5,
        };
        seed_demo_store(&config.url).await.expect("seed");
        Arc::new(ReadOnlyStore::open(&config, 50).await.expect("store should open"))
    }

    #[tokio::test]
    async fn health_returns_ready_when_read_only_store_is_reachable() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir).await;

        let (status, Json(payload)) =
            health(State(HealthState::new(store.clone(), false, false))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.database.status, "ready");
        assert_eq!(payload.planner.status, "unavailable");
        assert_eq!(store.queries_executed(), 0);
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_store_is_closed() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir).await;
        store.close().await;

        let (status, Json(payload)) = health(State(HealthState::new(store, true, true))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.database.status, "degraded");
        assert_eq!(payload.planner.status, "ready");
    }
}
