use shelfsense_core::config::{AppConfig, LoadOptions};
use shelfsense_core::forecast::ForecastService;
use shelfsense_db::{open_read_only, query_only_enabled};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        });
    }

    render_human(&report)
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let checks = match AppConfig::load(options) {
        Ok(config) => vec![
            DoctorCheck::pass("config_validation", "configuration loaded and validated"),
            check_llm_credentials(&config),
            check_read_only_database(&config),
            check_forecast_model(&config),
        ],
        Err(error) => vec![
            DoctorCheck::fail("config_validation", error.to_string()),
            DoctorCheck::skipped("llm_credentials"),
            DoctorCheck::skipped("database_read_only"),
            DoctorCheck::skipped("forecast_model"),
        ],
    };

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    let provider = config.llm.provider;
    if !provider.requires_api_key() {
        return DoctorCheck::pass(
            "llm_credentials",
            format!("{provider:?} needs no API key ({})", config.llm.effective_base_url()),
        );
    }
    if config.llm.has_api_key() {
        DoctorCheck::pass("llm_credentials", format!("API key present for {provider:?}"))
    } else {
        DoctorCheck::fail(
            "llm_credentials",
            "no API key configured; set SHELFSENSE_LLM_API_KEY or GROQ_API_KEY",
        )
    }
}

/// Opens the store exactly as the assistant does and confirms the engine
/// reports `query_only` on the handed-out connection.
fn check_read_only_database(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::fail(
                "database_read_only",
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = open_read_only(&config.database)
            .await
            .map_err(|error| format!("failed to open database read-only: {error}"))?;

        let query_only = query_only_enabled(&pool)
            .await
            .map_err(|error| format!("could not read query_only pragma: {error}"));
        pool.close().await;
        query_only
    });

    match result {
        Ok(true) => DoctorCheck::pass(
            "database_read_only",
            format!("`{}` opened with query_only enforced", config.database.url),
        ),
        Ok(false) => DoctorCheck::fail(
            "database_read_only",
            "connection opened but query_only is not in effect",
        ),
        Err(error) => DoctorCheck::fail("database_read_only", error),
    }
}

fn check_forecast_model(config: &AppConfig) -> DoctorCheck {
    let service = ForecastService::from_config(&config.forecast);
    match service.model() {
        Some(model) => DoctorCheck::pass(
            "forecast_model",
            format!("model `{}` loaded ({} features)", model.version, model.feature_names.len()),
        ),
        None => DoctorCheck::fail(
            "forecast_model",
            "no forecast model could be loaded; forecasts will be reported unavailable",
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
