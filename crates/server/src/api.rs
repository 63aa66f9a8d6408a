//! JSON routes over the assistant, sales figures and forecast.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shelfsense_agent::{Assistant, Conversation};
use shelfsense_core::errors::{ApplicationError, InterfaceError};
use shelfsense_core::forecast::{ForecastOutcome, ForecastService};
use shelfsense_db::{
    CustomerSpending, ProductSales, QueryError, SalesAnalytics, SalesKpis, SPENDING_CEILING,
};
use tracing::warn;
use uuid::Uuid;

const TOP_PRODUCTS: usize = 5;

#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<Assistant>,
    pub analytics: Arc<SalesAnalytics>,
    pub forecast: Arc<ForecastService>,
    pub history_cutoff: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub conversation: Option<Conversation>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub conversation: Conversation,
}

#[derive(Debug, Serialize)]
pub struct KpiResponse {
    pub kpis: SalesKpis,
    pub top_products: Vec<ProductSales>,
    /// Spend per customer below the spending ceiling.
    pub customer_spending: Vec<CustomerSpending>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    correlation_id: String,
}

/// Interface error rendered with its user-safe message only.
#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl From<InterfaceError> for ApiError {
    fn from(error: InterfaceError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(
            event_name = "api.request_failed",
            correlation_id = self.0.correlation_id(),
            status = status.as_u16(),
            error = %self.0,
            "request failed"
        );
        let body = ErrorBody {
            error: self.0.user_message(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/ask", post(ask))
        .route("/api/kpis", get(kpis))
        .route("/api/forecast", get(forecast))
        .with_state(state)
}

/// Always answers 200 with a reply: guardrail rejections and planner failures
/// arrive as user-safe text in `answer`.
pub async fn ask(
    State(state): State<ApiState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(InterfaceError::BadRequest {
            message: "question must not be empty".to_string(),
            correlation_id: Uuid::new_v4().to_string(),
        }
        .into());
    }

    let conversation = request.conversation.unwrap_or_default();
    let (conversation, answer) = state.assistant.respond(conversation, question).await;
    Ok(Json(AskResponse { answer, conversation }))
}

pub async fn kpis(State(state): State<ApiState>) -> Result<Json<KpiResponse>, ApiError> {
    let kpis = state.analytics.kpis().await.map_err(persistence_error)?;
    let top_products =
        state.analytics.top_products(TOP_PRODUCTS).await.map_err(persistence_error)?;
    let customer_spending =
        state.analytics.customer_spending(SPENDING_CEILING).await.map_err(persistence_error)?;
    Ok(Json(KpiResponse { kpis, top_products, customer_spending }))
}

/// An unavailable forecast is a normal outcome, reported with status 200.
pub async fn forecast(State(state): State<ApiState>) -> Result<Json<ForecastOutcome>, ApiError> {
    let history =
        state.analytics.monthly_sales(state.history_cutoff).await.map_err(persistence_error)?;
    Ok(Json(state.forecast.predict(&history)))
}

fn persistence_error(error: QueryError) -> ApiError {
    ApplicationError::Persistence(error.to_string()).into_interface(Uuid::new_v4().to_string()).into()
}
