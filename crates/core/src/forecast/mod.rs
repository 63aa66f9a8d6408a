//! Next-month sales forecasting on top of an offline-trained model.
//!
//! The service never fails the caller: a missing model, an empty history or a
//! non-finite prediction all surface as [`ForecastOutcome::Unavailable`].

pub mod model;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ForecastConfig;

pub use model::{
    Estimator, ForecastModel, ModelError, ModelMetrics, ModelRegistry, RegressionTree, TreeNode,
    FEATURE_NAMES,
};

/// Total sales of one calendar month; `month` is the first day of that month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlySales {
    pub month: NaiveDate,
    pub total: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub month: u32,
    pub year: i32,
    pub prev_month_sales: f64,
}

impl FeatureRow {
    /// Builds the row for the month following the latest history point.
    pub fn for_next_month(history: &[MonthlySales]) -> Option<Self> {
        let last = history.iter().max_by_key(|row| row.month)?;
        let target = next_month(last.month)?;
        Some(Self { month: target.month(), year: target.year(), prev_month_sales: last.total })
    }

    pub fn target_month(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn to_vector(&self) -> [f64; 3] {
        [f64::from(self.month), f64::from(self.year), self.prev_month_sales]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub target_month: NaiveDate,
    pub prediction: f64,
    pub last_observed: f64,
    /// `None` when the last observed value is zero.
    pub growth_pct: Option<f64>,
    pub model_version: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastOutcome {
    Available(Forecast),
    Unavailable { reason: String },
}

impl ForecastOutcome {
    pub fn forecast(&self) -> Option<&Forecast> {
        match self {
            Self::Available(forecast) => Some(forecast),
            Self::Unavailable { .. } => None,
        }
    }
}

pub fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) =
        if date.month() == 12 { (date.year() + 1, 1) } else { (date.year(), date.month() + 1) };
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub fn growth_pct(prediction: f64, last_observed: f64) -> Option<f64> {
    if last_observed == 0.0 {
        return None;
    }
    Some((prediction - last_observed) / last_observed * 100.0)
}

#[derive(Clone, Debug)]
pub struct ForecastService {
    model: Result<ForecastModel, String>,
}

impl ForecastService {
    /// Models that fail validation leave the service unavailable.
    pub fn new(model: ForecastModel) -> Self {
        match model.validate() {
            Ok(()) => Self { model: Ok(model) },
            Err(error) => {
                warn!(
                    event_name = "forecast.model.rejected",
                    version = %model.version,
                    error = %error,
                    "forecast model failed validation"
                );
                Self::unavailable(error.to_string())
            }
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self { model: Err(reason.into()) }
    }

    /// Prefers the best model of `model_dir` and falls back to `model_path`.
    pub fn from_config(config: &ForecastConfig) -> Self {
        if let Some(dir) = &config.model_dir {
            match ModelRegistry::load_dir(dir) {
                Ok(registry) => {
                    if let Some(best) = registry.best() {
                        info!(
                            event_name = "forecast.model.selected",
                            version = %best.version,
                            candidates = registry.len(),
                            mae = best.mae().unwrap_or(f64::NAN),
                            "selected forecast model"
                        );
                        return Self::new(best.clone());
                    }
                }
                Err(error) => warn!(
                    event_name = "forecast.registry.unavailable",
                    dir = %dir.display(),
                    error = %error,
                    "forecast model directory unusable"
                ),
            }
        }

        let Some(path) = &config.model_path else {
            return Self::unavailable("no forecast model configured");
        };

        match ForecastModel::load(path) {
            Ok(model) => {
                info!(
                    event_name = "forecast.model.loaded",
                    version = %model.version,
                    path = %path.display(),
                    "loaded forecast model"
                );
                Self::new(model)
            }
            Err(error) => {
                warn!(
                    event_name = "forecast.model.unavailable",
                    path = %path.display(),
                    error = %error,
                    "forecast model could not be loaded"
                );
                Self::unavailable(error.to_string())
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_ok()
    }

    pub fn model(&self) -> Option<&ForecastModel> {
        self.model.as_ref().ok()
    }

    pub fn predict(&self, history: &[MonthlySales]) -> ForecastOutcome {
        let model = match &self.model {
            Ok(model) => model,
            Err(reason) => return ForecastOutcome::Unavailable { reason: reason.clone() },
        };

        let Some(row) = FeatureRow::for_next_month(history) else {
            return ForecastOutcome::Unavailable { reason: "no sales history".to_string() };
        };
        let Some(target_month) = row.target_month() else {
            return ForecastOutcome::Unavailable {
                reason: "target month out of range".to_string(),
            };
        };

        let prediction = model.predict(&row);
        if !prediction.is_finite() {
            return ForecastOutcome::Unavailable {
                reason: "model produced a non-finite prediction".to_string(),
            };
        }

        ForecastOutcome::Available(Forecast {
            target_month,
            prediction,
            last_observed: row.prev_month_sales,
            growth_pct: growth_pct(prediction, row.prev_month_sales),
            model_version: model.version.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::{
        growth_pct, next_month, Estimator, FeatureRow, ForecastModel, ForecastOutcome,
        ForecastService, MonthlySales, RegressionTree, TreeNode, FEATURE_NAMES,
    };
    use crate::config::ForecastConfig;

    fn month(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).expect("valid month")
    }

    fn model(intercept: f64, coefficients: Vec<f64>) -> ForecastModel {
        ForecastModel {
            version: "test-linear".to_string(),
            trained_at: None,
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            metrics: None,
            estimator: Estimator::Linear { intercept, coefficients },
        }
    }

    #[test]
    fn feature_row_targets_month_after_last_point() {
        let history = vec![
            MonthlySales { month: month(2011, 10), total: 1_000.0 },
            MonthlySales { month: month(2011, 12), total: 3_000.0 },
            MonthlySales { month: month(2011, 11), total: 2_000.0 },
        ];

        let row = FeatureRow::for_next_month(&history).expect("row");
        assert_eq!(row.month, 1);
        assert_eq!(row.year, 2012);
        assert_eq!(row.prev_month_sales, 3_000.0);
        assert_eq!(next_month(month(2011, 6)), Some(month(2011, 7)));
    }

    #[test]
    fn growth_is_relative_to_last_observed_value() {
        let service = ForecastService::new(model(0.0, vec![0.0, 0.0, 1.1]));
        let history = vec![MonthlySales { month: month(2011, 11), total: 1_000.0 }];

        let outcome = service.predict(&history);
        let forecast = outcome.forecast().expect("forecast available");
        assert_eq!(forecast.target_month, month(2011, 12));
        assert!((forecast.prediction - 1_100.0).abs() < 1e-9);
        let growth = forecast.growth_pct.expect("defined growth");
        assert!((growth - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_last_value_leaves_growth_undefined() {
        assert_eq!(growth_pct(500.0, 0.0), None);

        let service = ForecastService::new(model(500.0, vec![0.0, 0.0, 0.0]));
        let history = vec![MonthlySales { month: month(2011, 3), total: 0.0 }];
        let forecast = service.predict(&history);
        assert_eq!(forecast.forecast().and_then(|f| f.growth_pct), None);
        assert_eq!(forecast.forecast().map(|f| f.prediction), Some(500.0));
    }

    #[test]
    fn empty_history_is_unavailable() {
        let service = ForecastService::new(model(1.0, vec![0.0, 0.0, 0.0]));
        assert_eq!(
            service.predict(&[]),
            ForecastOutcome::Unavailable { reason: "no sales history".to_string() }
        );
    }

    #[test]
    fn hand_built_invalid_models_leave_the_service_unavailable() {
        let history = vec![MonthlySales { month: month(2011, 11), total: 1_000.0 }];

        let mut dangling = model(0.0, vec![0.0, 0.0, 0.0]);
        dangling.estimator = Estimator::RandomForest {
            trees: vec![RegressionTree {
                nodes: vec![
                    TreeNode::Split { feature: 5, threshold: 1.0, left: 1, right: 4 },
                    TreeNode::Leaf { value: 1.0 },
                ],
            }],
        };
        let short_linear = model(10.0, vec![1.0]);

        for invalid in [dangling, short_linear] {
            let service = ForecastService::new(invalid);
            assert!(!service.is_available());
            assert!(service.model().is_none());
            match service.predict(&history) {
                ForecastOutcome::Unavailable { reason } => {
                    assert!(reason.starts_with("invalid model"), "{reason}")
                }
                other => panic!("expected unavailable forecast, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_model_file_is_unavailable_not_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let config = ForecastConfig {
            model_path: Some(dir.path().join("absent.json")),
            model_dir: None,
            history_cutoff: None,
        };

        let service = ForecastService::from_config(&config);
        assert!(!service.is_available());
        let history = vec![MonthlySales { month: month(2011, 3), total: 10.0 }];
        assert!(matches!(service.predict(&history), ForecastOutcome::Unavailable { .. }));
    }

    #[test]
    fn model_directory_takes_precedence_over_single_path() {
        let dir = TempDir::new().expect("temp dir");
        let mut best = model(42.0, vec![0.0, 0.0, 0.0]);
        best.version = "from-dir".to_string();
        best.metrics = Some(super::ModelMetrics { mae: 1.0, mse: None, r2: None });
        fs::write(dir.path().join("best.json"), best.to_json_pretty().expect("json"))
            .expect("write");

        let config = ForecastConfig {
            model_path: Some(dir.path().join("missing.json")),
            model_dir: Some(dir.path().to_path_buf()),
            history_cutoff: None,
        };
        let service = ForecastService::from_config(&config);
        assert_eq!(service.model().map(|model| model.version.as_str()), Some("from-dir"));
    }
}
