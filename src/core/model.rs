//! Classifier seam and the JSON logistic model artifact.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::features::FEATURE_NAMES;
use crate::error::ModelError;
use crate::utils::sigmoid;

/// A binary classifier over the nine engineered features.
#[cfg_attr(test, mockall::automock)]
pub trait RiskModel: Send + Sync {
    /// `[p(class 0), p(class 1)]` for one feature row in canonical order.
    fn predict_proba(&self, features: &[f64; 9]) -> [f64; 2];

    /// Raw importance per feature name; need not be normalized.
    fn feature_importance(&self) -> HashMap<String, f64>;
}

/// On-disk artifact layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticArtifact {
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub importance: Option<HashMap<String, f64>>,
}

#[derive(Debug, Clone)]
pub struct LogisticModel {
    weights: [f64; 9],
    intercept: f64,
    importance: HashMap<String, f64>,
}

impl LogisticModel {
    pub fn from_artifact(artifact: LogisticArtifact) -> Result<Self, ModelError> {
        if artifact.feature_names.len() != FEATURE_NAMES.len() {
            return Err(ModelError::Shape {
                expected: FEATURE_NAMES.len(),
                found: artifact.feature_names.len(),
            });
        }
        if artifact.weights.len() != FEATURE_NAMES.len() {
            return Err(ModelError::Shape {
                expected: FEATURE_NAMES.len(),
                found: artifact.weights.len(),
            });
        }

        // Artifacts may list features in any order; remap onto the canonical one.
        let mut weights = [0.0; 9];
        for (name, weight) in artifact.feature_names.iter().zip(&artifact.weights) {
            let slot = FEATURE_NAMES
                .iter()
                .position(|f| f == name)
                .ok_or_else(|| ModelError::UnknownFeature(name.clone()))?;
            weights[slot] = *weight;
        }

        let importance = match artifact.importance {
            Some(map) => map,
            None => FEATURE_NAMES
                .iter()
                .zip(weights.iter())
                .map(|(name, w)| (name.to_string(), w.abs()))
                .collect(),
        };

        Ok(Self {
            weights,
            intercept: artifact.intercept,
            importance,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let artifact: LogisticArtifact = serde_json::from_str(json)?;
        Self::from_artifact(artifact)
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::Missing(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

impl RiskModel for LogisticModel {
    fn predict_proba(&self, features: &[f64; 9]) -> [f64; 2] {
        let z = self.intercept
            + self
                .weights
                .iter()
                .zip(features.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>();
        let p = sigmoid(z);
        [1.0 - p, p]
    }

    fn feature_importance(&self) -> HashMap<String, f64> {
        self.importance.clone()
    }
}

/// Load the classifier once at startup. Any failure leaves the predictor on
/// its heuristic path.
pub fn load_model(path: Option<&Path>) -> Option<Box<dyn RiskModel>> {
    let path = path?;
    match LogisticModel::load(path) {
        Ok(model) => {
            info!(path = %path.display(), "Loaded risk model");
            Some(Box::new(model))
        }
        Err(err) => {
            warn!(error = %err, "Risk model unavailable, using heuristic scoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = r#"{
        "feature_names": ["hr_mean","hr_trend","hr_variability","spo2_mean","spo2_deviation",
                          "rr_mean","rr_rate_of_change","temp_deviation","sbp_mean"],
        "weights": [0.05, 0.4, 0.02, -0.1, -0.6, 0.12, 0.05, 1.1, -0.01],
        "intercept": 2.0
    }"#;

    #[test]
    fn parses_artifact_and_derives_importance() {
        let model = LogisticModel::from_json(ARTIFACT).expect("valid artifact");
        let importance = model.feature_importance();
        assert_eq!(importance.len(), 9);
        assert!((importance["temp_deviation"] - 1.1).abs() < 1e-12);
        assert!((importance["spo2_deviation"] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let model = LogisticModel::from_json(ARTIFACT).expect("valid artifact");
        let [p0, p1] = model.predict_proba(&[110.0, 1.0, 8.0, 90.0, -7.0, 28.0, 4.0, 1.5, 100.0]);
        assert!((p0 + p1 - 1.0).abs() < 1e-12);
        assert!(p1 > 0.5);
    }

    #[test]
    fn rejects_short_weight_vector() {
        let bad = r#"{"feature_names": ["hr_mean"], "weights": [1.0], "intercept": 0.0}"#;
        assert!(matches!(
            LogisticModel::from_json(bad),
            Err(ModelError::Shape { expected: 9, found: 1 })
        ));
    }

    #[test]
    fn corrupt_or_missing_artifact_falls_back() {
        assert!(matches!(LogisticModel::from_json("not json"), Err(ModelError::Parse(_))));
        assert!(load_model(Some(Path::new("/nonexistent/vitalguard/model.json"))).is_none());
        assert!(load_model(None).is_none());
    }
}
