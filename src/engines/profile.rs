//! Declarative channel configuration consumed by the generic pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::ambient::Ambient;
use crate::models::alert::AlertSeverity;
use crate::models::patient::ClinicalContext;
use crate::models::vitals::{Channel, VitalsReading};

/// A named physiological quantity a channel derives, scores or projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Systolic,
    Diastolic,
    PulsePressure,
    MeanArterialPressure,
    HeartRate,
    RestingHeartRate,
    HeartRateVariability,
    RespiratoryRate,
    RespiratoryAverage24h,
    Spo2,
    Spo2Average24h,
    Spo2Fluctuation,
    Temperature,
    TemperatureAverage24h,
    Sodium,
    Age,
    Bmi,
    NormalRangeLow,
    NormalRangeHigh,
}

impl Signal {
    pub fn label(self) -> &'static str {
        match self {
            Signal::Systolic => "Systolic BP",
            Signal::Diastolic => "Diastolic BP",
            Signal::PulsePressure => "Pulse pressure",
            Signal::MeanArterialPressure => "MAP",
            Signal::HeartRate => "HR",
            Signal::RestingHeartRate => "Resting HR",
            Signal::HeartRateVariability => "HRV",
            Signal::RespiratoryRate => "RR",
            Signal::RespiratoryAverage24h => "24h RR average",
            Signal::Spo2 => "SpO\u{2082}",
            Signal::Spo2Average24h => "24h SpO\u{2082} average",
            Signal::Spo2Fluctuation => "SpO\u{2082} fluctuation",
            Signal::Temperature => "Temp",
            Signal::TemperatureAverage24h => "24h temp average",
            Signal::Sodium => "Sodium",
            Signal::Age => "Age",
            Signal::Bmi => "BMI",
            Signal::NormalRangeLow => "Normal HR floor",
            Signal::NormalRangeHigh => "Normal HR ceiling",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Signal::Systolic | Signal::Diastolic | Signal::PulsePressure | Signal::MeanArterialPressure => " mmHg",
            Signal::HeartRate
            | Signal::RestingHeartRate
            | Signal::NormalRangeLow
            | Signal::NormalRangeHigh => " bpm",
            Signal::HeartRateVariability => " ms",
            Signal::RespiratoryRate | Signal::RespiratoryAverage24h => " /min",
            Signal::Spo2 | Signal::Spo2Average24h | Signal::Spo2Fluctuation => "%",
            Signal::Temperature | Signal::TemperatureAverage24h => "\u{b0}C",
            Signal::Sodium => " mEq/L",
            Signal::Age => " y",
            Signal::Bmi => "",
        }
    }
}

/// Derived values for one reading, keyed by signal.
pub type SignalMap = BTreeMap<Signal, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Strictly greater.
    Above,
    /// Greater or equal.
    AtLeast,
    /// Strictly less.
    Below,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Above => ">",
            Op::AtLeast => "\u{2265}",
            Op::Below => "<",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cutoff {
    pub signal: Signal,
    pub op: Op,
    pub value: f64,
}

impl Cutoff {
    pub const fn above(signal: Signal, value: f64) -> Self {
        Self { signal, op: Op::Above, value }
    }

    pub const fn at_least(signal: Signal, value: f64) -> Self {
        Self { signal, op: Op::AtLeast, value }
    }

    pub const fn below(signal: Signal, value: f64) -> Self {
        Self { signal, op: Op::Below, value }
    }

    pub fn holds(&self, observed: f64) -> bool {
        match self.op {
            Op::Above => observed > self.value,
            Op::AtLeast => observed >= self.value,
            Op::Below => observed < self.value,
        }
    }

    /// `None` when the signal was not derived for this channel.
    pub fn breached(&self, values: &SignalMap) -> Option<f64> {
        values.get(&self.signal).copied().filter(|v| self.holds(*v))
    }
}

/// Boolean condition surfaced with the sub-parameters.
#[derive(Debug, Clone, Copy)]
pub struct FlagRule {
    pub name: &'static str,
    pub cutoff: Cutoff,
}

/// Additive points for a breached cut-off. Rules sharing a `group` are tiers
/// of one condition: only the first breached rule of a group scores.
#[derive(Debug, Clone, Copy)]
pub struct ScoreRule {
    pub cutoff: Cutoff,
    pub points: f64,
    pub factor: &'static str,
    pub group: Option<&'static str>,
}

/// `slope * pct (+ weight * signal) + N(0, noise_sd)`, clamped to `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct EstimateRule {
    pub name: &'static str,
    pub slope: f64,
    pub signal_term: Option<(Signal, f64)>,
    pub noise_sd: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    Medication,
    Therapy,
    OxygenSupport,
}

#[derive(Debug, Clone, Copy)]
pub struct InterventionTemplate {
    pub name: &'static str,
    pub kind: InterventionKind,
    /// Dose, flow rate or device setting.
    pub dosage: &'static str,
    pub frequency: &'static str,
    pub timing: &'static str,
    /// Meal period for medications, monitoring cadence otherwise.
    pub schedule: &'static str,
    pub duration_days: i64,
}

/// One row of the ordered stage table. A stage fires when any trigger is
/// breached or the risk percentage exceeds `risk_gate`. The final row, with
/// no triggers and no gate, is the default.
#[derive(Debug, Clone, Copy)]
pub struct StageRule {
    pub label: &'static str,
    pub triggers: &'static [Cutoff],
    pub risk_gate: Option<f64>,
    pub primary: &'static [InterventionTemplate],
    pub alternative: &'static [InterventionTemplate],
    pub notes: &'static str,
}

impl StageRule {
    pub fn fires(&self, values: &SignalMap, risk_pct: f64) -> bool {
        let is_default = self.triggers.is_empty() && self.risk_gate.is_none();
        is_default
            || self.triggers.iter().any(|t| t.breached(values).is_some())
            || self.risk_gate.map_or(false, |gate| risk_pct > gate)
    }
}

/// Signed physiological effect of one intervention.
#[derive(Debug, Clone, Copy)]
pub struct EffectEntry {
    pub name: &'static str,
    pub class: &'static str,
    pub changes: &'static [(Signal, f64)],
}

#[derive(Debug, Clone, Copy)]
pub struct ProjectionBound {
    pub signal: Signal,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Penalize values above the pivot.
    Excess,
    /// Penalize values below the pivot.
    Deficit,
}

#[derive(Debug, Clone, Copy)]
pub struct LogisticTerm {
    pub signal: Signal,
    pub weight: f64,
    pub pivot: f64,
    pub direction: Direction,
}

impl LogisticTerm {
    pub const fn excess(signal: Signal, weight: f64, pivot: f64) -> Self {
        Self { signal, weight, pivot, direction: Direction::Excess }
    }

    pub const fn deficit(signal: Signal, weight: f64, pivot: f64) -> Self {
        Self { signal, weight, pivot, direction: Direction::Deficit }
    }

    pub fn contribution(&self, values: &SignalMap) -> f64 {
        let Some(value) = values.get(&self.signal) else {
            return 0.0;
        };
        let gap = match self.direction {
            Direction::Excess => value - self.pivot,
            Direction::Deficit => self.pivot - value,
        };
        self.weight * gap.max(0.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlertRule {
    pub label: &'static str,
    pub cutoff: Cutoff,
    pub severity: AlertSeverity,
    pub group: Option<&'static str>,
}

impl AlertRule {
    pub fn message(&self, observed: f64) -> String {
        format!(
            "{}: {} {}{} {}{}",
            self.label,
            self.cutoff.signal.label(),
            observed,
            self.cutoff.signal.unit(),
            self.cutoff.op.symbol(),
            self.cutoff.value,
        )
    }
}

/// Stage-A derivation: raw reading and context to channel signals.
pub type DeriveFn = fn(&VitalsReading, &ClinicalContext, &Ambient) -> SignalMap;

/// Recompute dependent signals after projected values change.
pub type RefreshFn = fn(&mut SignalMap);

/// Narrative reading of a channel risk percentage.
pub type InterpretFn = fn(f64) -> String;

/// Everything that distinguishes one vital channel from another.
#[derive(Clone, Copy)]
pub struct ChannelProfile {
    pub channel: Channel,
    /// Signal written to the variance log.
    pub primary: Signal,
    /// Tier label below the Moderate band.
    pub calm_label: &'static str,
    pub derive: DeriveFn,
    pub refresh: RefreshFn,
    pub flags: &'static [FlagRule],
    pub score_rules: &'static [ScoreRule],
    pub max_score: f64,
    pub estimates: &'static [EstimateRule],
    pub stages: &'static [StageRule],
    pub effects: &'static [EffectEntry],
    pub bounds: &'static [ProjectionBound],
    pub logistic: &'static [LogisticTerm],
    pub alert_rules: &'static [AlertRule],
    pub horizon_hours: u32,
    pub interpret: Option<InterpretFn>,
}

impl ChannelProfile {
    pub fn effect(&self, name: &str) -> Option<&EffectEntry> {
        self.effects.iter().find(|e| e.name == name)
    }
}

pub fn no_refresh(_: &mut SignalMap) {}
