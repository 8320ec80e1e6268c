//! Feature engineering over a patient's reading window.

use serde::{Deserialize, Serialize};

use crate::models::patient::PatientBaseline;
use crate::models::vitals::VitalsReading;
use crate::utils::{linear_slope, mean, round_to, sample_std};

/// Number of most recent readings the features are computed over.
pub const FEATURE_WINDOW: usize = 20;

/// Canonical feature order shared with the classifier artifact.
pub const FEATURE_NAMES: [&str; 9] = [
    "hr_mean",
    "hr_trend",
    "hr_variability",
    "spo2_mean",
    "spo2_deviation",
    "rr_mean",
    "rr_rate_of_change",
    "temp_deviation",
    "sbp_mean",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub hr_mean: f64,
    pub hr_trend: f64,
    pub hr_variability: f64,
    pub spo2_mean: f64,
    pub spo2_deviation: f64,
    pub rr_mean: f64,
    pub rr_rate_of_change: f64,
    pub temp_deviation: f64,
    pub sbp_mean: f64,
}

impl FeatureVector {
    /// Neutral features for a patient with no readings yet.
    pub fn neutral(baseline: &PatientBaseline) -> Self {
        Self {
            hr_mean: baseline.hr,
            hr_trend: 0.0,
            hr_variability: 0.0,
            spo2_mean: baseline.spo2,
            spo2_deviation: 0.0,
            rr_mean: baseline.rr,
            rr_rate_of_change: 0.0,
            temp_deviation: 0.0,
            sbp_mean: baseline.sbp,
        }
    }

    /// Values in [`FEATURE_NAMES`] order.
    pub fn to_array(&self) -> [f64; 9] {
        [
            self.hr_mean,
            self.hr_trend,
            self.hr_variability,
            self.spo2_mean,
            self.spo2_deviation,
            self.rr_mean,
            self.rr_rate_of_change,
            self.temp_deviation,
            self.sbp_mean,
        ]
    }
}

/// Human-readable label for a feature name.
pub fn feature_label(name: &str) -> &str {
    match name {
        "hr_mean" => "Heart Rate (Mean)",
        "hr_trend" => "HR Trend (Slope)",
        "hr_variability" => "HR Variability",
        "spo2_mean" => "SpO\u{2082} (Mean)",
        "spo2_deviation" => "SpO\u{2082} Deviation",
        "rr_mean" => "Respiration Rate",
        "rr_rate_of_change" => "RR Rate of Change",
        "temp_deviation" => "Temperature Deviation",
        "sbp_mean" => "Systolic BP",
        other => other,
    }
}

/// Reduce the last [`FEATURE_WINDOW`] readings to a [`FeatureVector`].
pub fn engineer_features(history: &[VitalsReading], baseline: &PatientBaseline) -> FeatureVector {
    if history.is_empty() {
        return FeatureVector::neutral(baseline);
    }

    let window = &history[history.len().saturating_sub(FEATURE_WINDOW)..];
    let column = |pick: fn(&VitalsReading) -> f64| window.iter().map(pick).collect::<Vec<f64>>();

    let hr = column(|r| r.hr);
    let spo2 = column(|r| r.spo2);
    let rr = column(|r| r.rr);
    let temp = column(|r| r.temp);
    let sbp = column(|r| r.sbp);

    let spo2_mean = mean(&spo2);
    let rr_rate_of_change = if rr.len() >= 2 {
        rr[rr.len() - 1] - rr[0]
    } else {
        0.0
    };

    FeatureVector {
        hr_mean: round_to(mean(&hr), 3),
        hr_trend: round_to(linear_slope(&hr), 4),
        hr_variability: round_to(sample_std(&hr), 3),
        spo2_mean: round_to(spo2_mean, 3),
        spo2_deviation: round_to(spo2_mean - baseline.spo2, 3),
        rr_mean: round_to(mean(&rr), 3),
        rr_rate_of_change: round_to(rr_rate_of_change, 3),
        temp_deviation: round_to(mean(&temp) - baseline.temp, 3),
        sbp_mean: round_to(mean(&sbp), 3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(hr: f64, spo2: f64, rr: f64, temp: f64) -> VitalsReading {
        VitalsReading::new(Utc::now(), hr, spo2, 120.0, 80.0, rr, temp)
    }

    #[test]
    fn empty_history_is_neutral() {
        let baseline = PatientBaseline::default();
        let features = engineer_features(&[], &baseline);
        assert_eq!(features.hr_mean, baseline.hr);
        assert_eq!(features.spo2_mean, baseline.spo2);
        assert_eq!(features.rr_mean, baseline.rr);
        assert_eq!(features.sbp_mean, baseline.sbp);
        assert_eq!(features.hr_trend, 0.0);
        assert_eq!(features.temp_deviation, 0.0);
    }

    #[test]
    fn single_reading_has_no_trend_or_spread() {
        let baseline = PatientBaseline::default();
        let features = engineer_features(&[reading(90.0, 95.0, 20.0, 37.8)], &baseline);
        assert_eq!(features.hr_mean, 90.0);
        assert_eq!(features.hr_trend, 0.0);
        assert_eq!(features.hr_variability, 0.0);
        assert_eq!(features.rr_rate_of_change, 0.0);
        assert_eq!(features.spo2_deviation, -3.0);
        assert_eq!(features.temp_deviation, 1.0);
    }

    #[test]
    fn only_the_last_twenty_readings_count() {
        let baseline = PatientBaseline::default();
        let mut history: Vec<_> = (0..10).map(|_| reading(200.0, 98.0, 16.0, 36.8)).collect();
        history.extend((0..20).map(|i| reading(80.0 + i as f64, 98.0, 16.0 + i as f64 * 0.5, 36.8)));

        let features = engineer_features(&history, &baseline);
        assert_eq!(features.hr_mean, 89.5);
        assert_eq!(features.hr_trend, 1.0);
        assert_eq!(features.rr_rate_of_change, 9.5);
        assert!(features.hr_variability > 5.9 && features.hr_variability < 6.0);
    }

    #[test]
    fn array_follows_canonical_order() {
        let baseline = PatientBaseline::default();
        let values = FeatureVector::neutral(&baseline).to_array();
        assert_eq!(values[0], baseline.hr);
        assert_eq!(values[8], baseline.sbp);
        assert_eq!(feature_label(FEATURE_NAMES[2]), "HR Variability");
    }
}
