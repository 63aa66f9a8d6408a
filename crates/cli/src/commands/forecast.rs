use shelfsense_core::config::LoadOptions;
use shelfsense_core::forecast::{Forecast, ForecastOutcome, ForecastService};
use shelfsense_core::schema::SchemaContract;
use shelfsense_db::SalesAnalytics;

use crate::commands::{CommandContext, CommandResult, EXIT_DATABASE, EXIT_FORECAST};

pub fn run(options: LoadOptions) -> CommandResult {
    let context = match CommandContext::prepare("forecast", options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    let service = ForecastService::from_config(&context.config.forecast);
    let cutoff = context.config.forecast.history_cutoff;

    context.runtime.block_on(async {
        let store = match context.open_store("forecast").await {
            Ok(store) => store,
            Err(failure) => return failure,
        };
        let history =
            SalesAnalytics::new(store.clone(), SchemaContract::inventory()).monthly_sales(cutoff).await;
        store.close().await;

        let history = match history {
            Ok(history) => history,
            Err(error) => {
                return CommandResult::failure(
                    "forecast",
                    "query_execution",
                    format!("monthly sales history could not be read: {error}"),
                    EXIT_DATABASE,
                );
            }
        };

        match service.predict(&history) {
            ForecastOutcome::Available(forecast) => CommandResult::success_with_data(
                "forecast",
                forecast_message(&forecast),
                serde_json::to_value(&forecast).ok(),
            ),
            ForecastOutcome::Unavailable { reason } => CommandResult::failure(
                "forecast",
                "forecast_unavailable",
                format!("forecast unavailable: {reason}"),
                EXIT_FORECAST,
            ),
        }
    })
}

pub(crate) fn forecast_message(forecast: &Forecast) -> String {
    let growth = forecast
        .growth_pct
        .map(|growth| format!("{growth:+.1}%"))
        .unwrap_or_else(|| "undefined".to_string());
    format!(
        "predicted sales for {}: {:.2} (last month {:.2}, growth {growth}, model {})",
        forecast.target_month.format("%Y-%m"),
        forecast.prediction,
        forecast.last_observed,
        forecast.model_version
    )
}
