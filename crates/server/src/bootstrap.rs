use std::sync::Arc;

use axum::Router;
use shelfsense_agent::Assistant;
use shelfsense_core::audit::TracingAuditSink;
use shelfsense_core::config::{AppConfig, ConfigError, LoadOptions};
use shelfsense_core::forecast::ForecastService;
use shelfsense_core::schema::SchemaContract;
use shelfsense_db::{ReadOnlyStore, SalesAnalytics};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{self, ApiState};
use crate::health::{self, HealthState};

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<ReadOnlyStore>,
    pub api_state: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("read-only database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
}

impl Application {
    pub fn router(&self) -> Router {
        let health_state = HealthState::new(
            Arc::clone(&self.store),
            self.api_state.assistant.has_planner(),
            self.api_state.forecast.is_available(),
        );
        api::router(self.api_state.clone())
            .merge(health::router(health_state))
            .layer(TraceLayer::new_for_http())
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Opens the read-only store and wires the assistant and forecast service.
/// A missing credential or model degrades the service instead of failing startup.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let store = ReadOnlyStore::open(&config.database, config.agent.max_result_rows)
        .await
        .map(Arc::new)
        .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "read-only database connection established"
    );

    let assistant =
        Assistant::from_config(&config, Arc::clone(&store), Arc::new(TracingAuditSink)).await;
    let forecast = ForecastService::from_config(&config.forecast);
    if !assistant.has_planner() {
        warn!(
            event_name = "system.bootstrap.planner_absent",
            correlation_id = "bootstrap",
            "questions will receive the configuration notice until an API key is provided"
        );
    }
    if !forecast.is_available() {
        warn!(
            event_name = "system.bootstrap.forecast_absent",
            correlation_id = "bootstrap",
            "forecast route will report unavailable"
        );
    }

    let api_state = ApiState {
        assistant: Arc::new(assistant),
        analytics: Arc::new(SalesAnalytics::new(Arc::clone(&store), SchemaContract::inventory())),
        forecast: Arc::new(forecast),
        history_cutoff: config.forecast.history_cutoff,
    };

    Ok(Application { config, store, api_state })
}
