//! Global deterioration risk from engineered features.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ambient::Ambient;
use crate::core::features::{feature_label, FeatureVector, FEATURE_NAMES};
use crate::core::model::RiskModel;
use crate::utils::{bounded, round_to};

/// Static contribution weights used when no classifier is loaded.
const HEURISTIC_WEIGHTS: [(&str, f64); 9] = [
    ("spo2_deviation", 25.0),
    ("hr_mean", 18.0),
    ("temp_deviation", 15.0),
    ("rr_mean", 12.0),
    ("hr_trend", 10.0),
    ("rr_rate_of_change", 8.0),
    ("hr_variability", 6.0),
    ("sbp_mean", 4.0),
    ("spo2_mean", 2.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionPath {
    Model,
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub risk_score: f64,
    pub confidence: f64,
    pub path: PredictionPath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub label: String,
    pub pct: f64,
}

pub struct RiskPredictor {
    model: Option<Box<dyn RiskModel>>,
    ambient: Ambient,
}

impl RiskPredictor {
    pub fn new(model: Option<Box<dyn RiskModel>>, ambient: Ambient) -> Self {
        Self { model, ambient }
    }

    pub fn heuristic(ambient: Ambient) -> Self {
        Self::new(None, ambient)
    }

    pub fn path(&self) -> PredictionPath {
        if self.model.is_some() {
            PredictionPath::Model
        } else {
            PredictionPath::Heuristic
        }
    }

    pub fn predict(&self, features: &FeatureVector) -> Prediction {
        match &self.model {
            Some(model) => self.predict_with_model(model.as_ref(), features),
            None => heuristic_prediction(features),
        }
    }

    fn predict_with_model(&self, model: &dyn RiskModel, features: &FeatureVector) -> Prediction {
        let proba = model.predict_proba(&features.to_array());
        let p = proba[1];

        // Stretch the extremes so confident calls land near the ends of the scale.
        let base = if p >= 0.85 {
            70.0 + (p - 0.85) * 150.0
        } else if p <= 0.15 {
            5.0 + p * 80.0
        } else {
            p * 100.0
        };

        let oscillation = (self.ambient.epoch_seconds() * 0.157).sin() * 6.0;
        let jitter = self.ambient.gauss(0.0, 2.5);
        let risk_score = round_to(bounded(base + oscillation + jitter, 3.0, 97.0), 1);
        let confidence = round_to(proba[0].max(proba[1]), 4);

        debug!(p, risk_score, confidence, "Model prediction");
        Prediction {
            risk_score,
            confidence,
            path: PredictionPath::Model,
        }
    }

    /// Percentage contribution of each feature, largest first.
    pub fn contributions(&self) -> Vec<FeatureContribution> {
        let raw: Vec<(String, f64)> = match &self.model {
            Some(model) => {
                let importance = model.feature_importance();
                FEATURE_NAMES
                    .iter()
                    .map(|name| (name.to_string(), importance.get(*name).copied().unwrap_or(0.0).max(0.0)))
                    .collect()
            }
            None => HEURISTIC_WEIGHTS
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
        };

        let mut contributions = normalize(raw);
        contributions.sort_by(|a, b| b.pct.total_cmp(&a.pct));
        contributions
    }
}

/// Rule-based score in `[0, 100]`.
pub fn heuristic_prediction(features: &FeatureVector) -> Prediction {
    let mut risk = 0.0;

    risk += (-features.spo2_deviation).max(0.0) * 5.0;

    if features.hr_mean > 100.0 {
        risk += (features.hr_mean - 100.0) * 0.5;
    } else if features.hr_mean < 50.0 {
        risk += (50.0 - features.hr_mean) * 1.0;
    }

    if features.rr_mean > 20.0 {
        risk += (features.rr_mean - 20.0) * 1.5;
    }

    risk += features.temp_deviation.max(0.0) * 8.0;
    risk += features.hr_trend.max(0.0) * 2.0;

    let risk_score = round_to(bounded(risk, 0.0, 100.0), 2);
    let confidence = if risk_score > 10.0 { 0.70 } else { 0.85 };

    Prediction {
        risk_score,
        confidence,
        path: PredictionPath::Heuristic,
    }
}

fn normalize(raw: Vec<(String, f64)>) -> Vec<FeatureContribution> {
    let total: f64 = raw.iter().map(|(_, v)| v).sum();
    let count = raw.len().max(1) as f64;

    let mut contributions: Vec<FeatureContribution> = raw
        .into_iter()
        .map(|(feature, value)| {
            let share = if total > 0.0 { value / total * 100.0 } else { 100.0 / count };
            FeatureContribution {
                label: feature_label(&feature).to_string(),
                feature,
                pct: round_to(share, 1),
            }
        })
        .collect();

    // Push rounding residue onto the largest share so the total stays at 100.
    let residue = 100.0 - contributions.iter().map(|c| c.pct).sum::<f64>();
    if let Some(largest) = contributions.iter_mut().max_by(|a, b| a.pct.total_cmp(&b.pct)) {
        largest.pct = round_to(largest.pct + residue, 1);
    }
    contributions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::MockRiskModel;
    use crate::models::patient::PatientBaseline;
    use std::collections::HashMap;

    fn features() -> FeatureVector {
        FeatureVector::neutral(&PatientBaseline::default())
    }

    fn mocked(p1: f64) -> RiskPredictor {
        let mut model = MockRiskModel::new();
        model.expect_predict_proba().returning(move |_| [1.0 - p1, p1]);
        model.expect_feature_importance().returning(HashMap::new);
        RiskPredictor::new(Some(Box::new(model)), Ambient::at_epoch())
    }

    #[test]
    fn healthy_features_score_zero_with_high_confidence() {
        let prediction = heuristic_prediction(&features());
        assert_eq!(prediction.risk_score, 0.0);
        assert_eq!(prediction.confidence, 0.85);
        assert_eq!(prediction.path, PredictionPath::Heuristic);
    }

    #[test]
    fn heuristic_adds_each_term() {
        let f = FeatureVector {
            hr_mean: 110.0,
            hr_trend: 1.5,
            spo2_deviation: -4.0,
            rr_mean: 26.0,
            temp_deviation: 1.0,
            ..features()
        };
        // 20 + 5 + 9 + 8 + 3
        let prediction = heuristic_prediction(&f);
        assert_eq!(prediction.risk_score, 45.0);
        assert_eq!(prediction.confidence, 0.70);
    }

    #[test]
    fn heuristic_caps_at_hundred() {
        let f = FeatureVector {
            spo2_deviation: -30.0,
            ..features()
        };
        assert_eq!(heuristic_prediction(&f).risk_score, 100.0);
    }

    #[test]
    fn model_path_stays_inside_open_scale() {
        for p in [0.0, 0.05, 0.15, 0.5, 0.85, 0.99, 1.0] {
            let prediction = mocked(p).predict(&features());
            assert!(prediction.risk_score >= 3.0 && prediction.risk_score <= 97.0);
            assert!(prediction.confidence >= 0.5 && prediction.confidence <= 1.0);
        }
    }

    #[test]
    fn model_path_calibrates_extremes() {
        assert_eq!(mocked(0.9).predict(&features()).risk_score, 77.5);
        assert_eq!(mocked(0.1).predict(&features()).risk_score, 13.0);
        assert_eq!(mocked(0.5).predict(&features()).risk_score, 50.0);
        assert_eq!(mocked(0.0).predict(&features()).risk_score, 5.0);
        assert_eq!(mocked(0.9).predict(&features()).confidence, 0.9);
    }

    #[test]
    fn heuristic_contributions_sum_to_hundred() {
        let contributions = RiskPredictor::heuristic(Ambient::at_epoch()).contributions();
        let total: f64 = contributions.iter().map(|c| c.pct).sum();
        assert!((total - 100.0).abs() < 1e-6);
        assert_eq!(contributions[0].feature, "spo2_deviation");
        assert_eq!(contributions[0].label, "SpO\u{2082} Deviation");
    }

    #[test]
    fn zero_importance_splits_evenly() {
        let contributions = mocked(0.5).contributions();
        assert_eq!(contributions.len(), 9);
        let total: f64 = contributions.iter().map(|c| c.pct).sum();
        assert!((total - 100.0).abs() < 1e-6);
        assert!(contributions.iter().all(|c| (c.pct - 11.1).abs() < 0.15));
    }
}
