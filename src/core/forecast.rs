//! Short-horizon linear extrapolation of the global risk score.

use serde::{Deserialize, Serialize};

use crate::utils::{bounded, round1, round_to};

/// Minimum history length before a trend is estimated.
pub const MIN_TREND_SAMPLES: usize = 10;

pub const HORIZONS_MINUTES: [u32; 6] = [5, 10, 15, 20, 25, 30];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendBaseline {
    /// Risk computed over the older half of the window.
    pub historical_risk: f64,
    pub elapsed_minutes: f64,
}

impl TrendBaseline {
    /// `None` when the history is too short to estimate a trend.
    pub fn from_history(
        sample_count: usize,
        historical_risk: f64,
        poll_interval_secs: f64,
    ) -> Option<Self> {
        if sample_count < MIN_TREND_SAMPLES {
            return None;
        }
        let elapsed_minutes = sample_count as f64 / 2.0 * poll_interval_secs / 60.0;
        Some(Self {
            historical_risk,
            elapsed_minutes,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub minutes_ahead: u32,
    pub predicted_risk: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub uncertainty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskForecast {
    pub current_risk: f64,
    /// Risk points per minute.
    pub trend: f64,
    pub points: Vec<ForecastPoint>,
}

pub fn forecast(current_risk: f64, baseline: Option<TrendBaseline>) -> RiskForecast {
    let trend = baseline
        .map(|b| (current_risk - b.historical_risk) / b.elapsed_minutes.max(1.0))
        .unwrap_or(0.0);

    let points = HORIZONS_MINUTES
        .iter()
        .map(|&minutes| {
            let m = f64::from(minutes);
            let predicted = bounded(current_risk + trend * m, 0.0, 100.0);
            let uncertainty = 5.0 + 2.5 * m.sqrt();
            ForecastPoint {
                minutes_ahead: minutes,
                predicted_risk: round1(predicted),
                lower_bound: round1(bounded(predicted - uncertainty, 0.0, 100.0)),
                upper_bound: round1(bounded(predicted + uncertainty, 0.0, 100.0)),
                uncertainty: round1(uncertainty),
            }
        })
        .collect();

    RiskForecast {
        current_risk: round1(current_risk),
        trend: round_to(trend, 3),
        points,
    }
}
