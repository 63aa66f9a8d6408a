//! Persisted regression models for monthly sales forecasting.
//!
//! Models are trained offline and exported as JSON. Two estimator kinds are
//! understood:
//! - `random_forest`: regression trees in pre-order node layout (children always
//!   sit at a higher index than their parent), averaged across trees
//! - `linear`: intercept plus one coefficient per feature

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::FeatureRow;

/// Feature order every persisted model must declare.
pub const FEATURE_NAMES: [&str; 3] = ["month", "year", "prev_month_sales"];

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("could not read model file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse model file `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid model: {0}")]
    Invalid(String),
    #[error("no usable models found in `{0}`")]
    EmptyRegistry(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub mae: f64,
    #[serde(default)]
    pub mse: Option<f64>,
    #[serde(default)]
    pub r2: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split { feature: usize, threshold: f64, left: usize, right: usize },
    Leaf { value: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Walks from the root to a leaf. A malformed tree yields NaN instead of
    /// panicking; each step must move to a higher index, so the walk is bounded.
    fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split { feature, threshold, left, right }) => {
                    let Some(value) = features.get(*feature) else {
                        return f64::NAN;
                    };
                    let next = if *value <= *threshold { *left } else { *right };
                    if next <= index {
                        return f64::NAN;
                    }
                    index = next;
                }
                None => return f64::NAN,
            }
        }
    }

    fn validate(&self, tree_index: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Invalid(format!("tree {tree_index} has no nodes")));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { feature, threshold, left, right } = node {
                if *feature >= FEATURE_NAMES.len() {
                    return Err(ModelError::Invalid(format!(
                        "tree {tree_index} node {index} splits on unknown feature {feature}"
                    )));
                }
                if !threshold.is_finite() {
                    return Err(ModelError::Invalid(format!(
                        "tree {tree_index} node {index} has a non-finite threshold"
                    )));
                }
                for child in [left, right] {
                    if *child <= index || *child >= self.nodes.len() {
                        return Err(ModelError::Invalid(format!(
                            "tree {tree_index} node {index} points at invalid child {child}"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Linear { intercept: f64, coefficients: Vec<f64> },
    RandomForest { trees: Vec<RegressionTree> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastModel {
    pub version: String,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub metrics: Option<ModelMetrics>,
    pub estimator: Estimator,
}

impl ForecastModel {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ModelError::Read { path: path.to_path_buf(), source })?;
        let model: Self = serde_json::from_str(&raw)
            .map_err(|source| ModelError::Parse { path: path.to_path_buf(), source })?;
        model.validate()?;
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_str(json).map_err(|source| ModelError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let declared = self.feature_names.iter().map(String::as_str).collect::<Vec<_>>();
        if declared != FEATURE_NAMES {
            return Err(ModelError::Invalid(format!(
                "feature_names must be {FEATURE_NAMES:?}, found {declared:?}"
            )));
        }

        match &self.estimator {
            Estimator::Linear { intercept, coefficients } => {
                if coefficients.len() != FEATURE_NAMES.len() {
                    return Err(ModelError::Invalid(format!(
                        "linear model needs {} coefficients, found {}",
                        FEATURE_NAMES.len(),
                        coefficients.len()
                    )));
                }
                if !intercept.is_finite() || coefficients.iter().any(|value| !value.is_finite()) {
                    return Err(ModelError::Invalid(
                        "linear model parameters must be finite".to_string(),
                    ));
                }
            }
            Estimator::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err(ModelError::Invalid("random forest has no trees".to_string()));
                }
                for (index, tree) in trees.iter().enumerate() {
                    tree.validate(index)?;
                }
            }
        }

        Ok(())
    }

    pub fn mae(&self) -> Option<f64> {
        self.metrics.as_ref().map(|metrics| metrics.mae)
    }

    pub fn predict(&self, row: &FeatureRow) -> f64 {
        let features = row.to_vector();
        match &self.estimator {
            Estimator::Linear { intercept, coefficients } => {
                intercept
                    + coefficients
                        .iter()
                        .zip(features.iter())
                        .map(|(weight, value)| weight * value)
                        .sum::<f64>()
            }
            Estimator::RandomForest { trees } => {
                let total: f64 = trees.iter().map(|tree| tree.predict(&features)).sum();
                total / trees.len() as f64
            }
        }
    }
}

/// Every model exported to a directory; the best one is picked by lowest MAE.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: Vec<ForecastModel>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: ForecastModel) {
        self.models.push(model);
    }

    pub fn load_dir(dir: &Path) -> Result<Self, ModelError> {
        let entries = fs::read_dir(dir)
            .map_err(|source| ModelError::Read { path: dir.to_path_buf(), source })?;

        let mut paths = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect::<Vec<_>>();
        paths.sort();

        let mut registry = Self::new();
        for path in paths {
            match ForecastModel::load(&path) {
                Ok(model) => registry.register(model),
                Err(error) => warn!(
                    event_name = "forecast.model.skipped",
                    path = %path.display(),
                    error = %error,
                    "skipping unusable forecast model"
                ),
            }
        }

        if registry.models.is_empty() {
            return Err(ModelError::EmptyRegistry(dir.to_path_buf()));
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn get(&self, version: &str) -> Option<&ForecastModel> {
        self.models.iter().find(|model| model.version == version)
    }

    /// Lowest MAE wins; models without metrics rank after every scored model.
    pub fn best(&self) -> Option<&ForecastModel> {
        self.models.iter().min_by(|left, right| {
            let left = left.mae().unwrap_or(f64::INFINITY);
            let right = right.mae().unwrap_or(f64::INFINITY);
            left.total_cmp(&right)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{
        Estimator, ForecastModel, ModelError, ModelMetrics, ModelRegistry, RegressionTree,
        TreeNode, FEATURE_NAMES,
    };
    use crate::forecast::FeatureRow;

    fn linear(version: &str, mae: Option<f64>) -> ForecastModel {
        ForecastModel {
            version: version.to_string(),
            trained_at: None,
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            metrics: mae.map(|mae| ModelMetrics { mae, mse: None, r2: None }),
            estimator: Estimator::Linear { intercept: 1_000.0, coefficients: vec![10.0, 0.0, 0.5] },
        }
    }

    fn stump(threshold: f64, low: f64, high: f64) -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode::Split { feature: 2, threshold, left: 1, right: 2 },
                TreeNode::Leaf { value: low },
                TreeNode::Leaf { value: high },
            ],
        }
    }

    #[test]
    fn linear_model_applies_intercept_and_weights() {
        let model = linear("lin-1", None);
        let row = FeatureRow { month: 3, year: 2011, prev_month_sales: 2_000.0 };
        assert_eq!(model.predict(&row), 1_000.0 + 30.0 + 1_000.0);
    }

    #[test]
    fn forest_prediction_is_mean_of_trees() {
        let mut model = linear("rf-1", None);
        model.estimator = Estimator::RandomForest {
            trees: vec![stump(500_000.0, 400_000.0, 600_000.0), stump(700_000.0, 500_000.0, 900_000.0)],
        };
        model.validate().expect("valid forest");

        let row = FeatureRow { month: 11, year: 2011, prev_month_sales: 650_000.0 };
        assert_eq!(model.predict(&row), (600_000.0 + 500_000.0) / 2.0);
    }

    #[test]
    fn forest_with_backward_child_pointer_is_rejected() {
        let mut model = linear("rf-bad", None);
        model.estimator = Estimator::RandomForest {
            trees: vec![RegressionTree {
                nodes: vec![
                    TreeNode::Split { feature: 0, threshold: 6.0, left: 0, right: 1 },
                    TreeNode::Leaf { value: 1.0 },
                ],
            }],
        };

        assert!(matches!(model.validate(), Err(ModelError::Invalid(message)) if message.contains("invalid child")));
    }

    #[test]
    fn malformed_trees_predict_nan_instead_of_panicking() {
        let row = FeatureRow { month: 6, year: 2011, prev_month_sales: 10.0 };
        let malformed = [
            vec![TreeNode::Split { feature: 0, threshold: 6.0, left: 1, right: 9 }],
            vec![
                TreeNode::Split { feature: 7, threshold: 6.0, left: 1, right: 2 },
                TreeNode::Leaf { value: 1.0 },
                TreeNode::Leaf { value: 2.0 },
            ],
            vec![
                TreeNode::Split { feature: 0, threshold: 6.0, left: 1, right: 1 },
                TreeNode::Split { feature: 0, threshold: 6.0, left: 0, right: 0 },
            ],
            Vec::new(),
        ];

        for nodes in malformed {
            let mut model = linear("rf-hand-built", None);
            model.estimator = Estimator::RandomForest { trees: vec![RegressionTree { nodes }] };
            assert!(model.validate().is_err());
            assert!(model.predict(&row).is_nan());
        }
    }

    #[test]
    fn wrong_feature_names_are_rejected() {
        let mut model = linear("lin-bad", None);
        model.feature_names = vec!["year".to_string(), "month".to_string(), "prev".to_string()];
        assert!(matches!(model.validate(), Err(ModelError::Invalid(_))));
    }

    #[test]
    fn json_export_loads_back_with_kind_tags() {
        let json = r#"{
            "version": "rf-2011-12",
            "feature_names": ["month", "year", "prev_month_sales"],
            "metrics": {"mae": 41000.5},
            "estimator": {
                "kind": "random_forest",
                "trees": [{"nodes": [
                    {"type": "split", "feature": 0, "threshold": 10.5, "left": 1, "right": 2},
                    {"type": "leaf", "value": 700000.0},
                    {"type": "leaf", "value": 1100000.0}
                ]}]
            }
        }"#;

        let model = ForecastModel::from_json(json).expect("model should parse");
        assert_eq!(model.mae(), Some(41000.5));
        let row = FeatureRow { month: 12, year: 2011, prev_month_sales: 1.0 };
        assert_eq!(model.predict(&row), 1_100_000.0);
    }

    #[test]
    fn registry_selects_lowest_mae_from_directory() {
        let dir = TempDir::new().expect("temp dir");
        for (file, model) in [
            ("a.json", linear("lin-a", Some(52_000.0))),
            ("b.json", linear("lin-b", Some(38_000.0))),
            ("c.json", linear("lin-c", None)),
        ] {
            let json = model.to_json_pretty().expect("serialize");
            fs::write(dir.path().join(file), json).expect("write model");
        }
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write note");
        fs::write(dir.path().join("broken.json"), "{").expect("write broken");

        let registry = ModelRegistry::load_dir(dir.path()).expect("registry");
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.best().map(|model| model.version.as_str()), Some("lin-b"));
        assert!(registry.get("lin-c").is_some());
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        assert!(matches!(ModelRegistry::load_dir(dir.path()), Err(ModelError::EmptyRegistry(_))));
    }
}
