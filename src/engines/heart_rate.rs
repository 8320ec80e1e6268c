//! Heart rate channel: tachy/bradyarrhythmia scoring and rate control.

use crate::core::ambient::Ambient;
use crate::engines::profile::*;
use crate::models::alert::AlertSeverity;
use crate::models::patient::ClinicalContext;
use crate::models::vitals::{Channel, VitalsReading};
use crate::utils::{bounded, round1};

/// Resting rate assumed when the caller does not supply one.
pub fn default_resting_hr(age: f64) -> f64 {
    if age < 60.0 {
        72.0
    } else {
        68.0
    }
}

/// Age-adjusted normal resting band, `(low, high)` in bpm.
pub fn normal_range(age: f64) -> (f64, f64) {
    if age < 40.0 {
        (60.0, 100.0)
    } else if age < 65.0 {
        (58.0, 95.0)
    } else {
        (55.0, 90.0)
    }
}

fn derive(reading: &VitalsReading, context: &ClinicalContext, ambient: &Ambient) -> SignalMap {
    let resting = context.resting_hr.unwrap_or_else(|| default_resting_hr(context.age));
    let hrv = bounded(
        round1((reading.hr - resting).abs() * 1.2 + ambient.gauss(0.0, 3.0)),
        5.0,
        80.0,
    );

    let mut values = SignalMap::new();
    values.insert(Signal::HeartRate, reading.hr);
    values.insert(Signal::RestingHeartRate, resting);
    values.insert(Signal::HeartRateVariability, hrv);
    values.insert(Signal::Age, context.age);
    let (low, high) = normal_range(context.age);
    values.insert(Signal::NormalRangeLow, low);
    values.insert(Signal::NormalRangeHigh, high);
    values
}

pub const PROFILE: ChannelProfile = ChannelProfile {
    channel: Channel::HeartRate,
    primary: Signal::HeartRate,
    calm_label: "Normal",
    derive,
    refresh: no_refresh,
    flags: &[
        FlagRule { name: "tachycardia", cutoff: Cutoff::above(Signal::HeartRate, 100.0) },
        FlagRule { name: "severe_tachycardia", cutoff: Cutoff::above(Signal::HeartRate, 120.0) },
        FlagRule { name: "bradycardia", cutoff: Cutoff::below(Signal::HeartRate, 60.0) },
        FlagRule { name: "severe_bradycardia", cutoff: Cutoff::below(Signal::HeartRate, 50.0) },
    ],
    score_rules: &[
        ScoreRule { cutoff: Cutoff::above(Signal::HeartRate, 120.0), points: 30.0, factor: "Severe tachycardia >120 bpm", group: Some("tachycardia") },
        ScoreRule { cutoff: Cutoff::above(Signal::HeartRate, 100.0), points: 15.0, factor: "Tachycardia >100 bpm", group: Some("tachycardia") },
        ScoreRule { cutoff: Cutoff::below(Signal::HeartRate, 50.0), points: 30.0, factor: "Severe bradycardia <50 bpm", group: Some("bradycardia") },
        ScoreRule { cutoff: Cutoff::below(Signal::HeartRate, 60.0), points: 15.0, factor: "Bradycardia <60 bpm", group: Some("bradycardia") },
        ScoreRule { cutoff: Cutoff::above(Signal::HeartRateVariability, 40.0), points: 10.0, factor: "High HRV >40 ms", group: None },
        ScoreRule { cutoff: Cutoff::below(Signal::HeartRateVariability, 10.0), points: 15.0, factor: "Low HRV <10 ms", group: None },
        ScoreRule { cutoff: Cutoff::above(Signal::Age, 65.0), points: 10.0, factor: "Age >65", group: None },
    ],
    max_score: 75.0,
    estimates: &[
        EstimateRule { name: "cardiac_stress_index", slope: 1.1, signal_term: None, noise_sd: 2.0, min: 0.0, max: 100.0 },
        EstimateRule {
            name: "arrhythmia_probability",
            slope: 0.6,
            signal_term: Some((Signal::HeartRateVariability, 0.2)),
            noise_sd: 3.0,
            min: 2.0,
            max: 95.0,
        },
        EstimateRule { name: "deterioration_12h", slope: 0.8, signal_term: None, noise_sd: 4.0, min: 3.0, max: 95.0 },
    ],
    stages: &[
        StageRule {
            label: "SEVERE TACHYCARDIA",
            triggers: &[Cutoff::above(Signal::HeartRate, 120.0)],
            risk_gate: Some(75.0),
            primary: &[
                InterventionTemplate {
                    name: "Metoprolol",
                    kind: InterventionKind::Medication,
                    dosage: "25\u{2013}50 mg",
                    frequency: "Twice daily",
                    timing: "After food",
                    schedule: "Morning & Evening",
                    duration_days: 30,
                },
                InterventionTemplate {
                    name: "Diltiazem",
                    kind: InterventionKind::Medication,
                    dosage: "30 mg",
                    frequency: "Three times daily",
                    timing: "After food",
                    schedule: "Morning, Afternoon, Night",
                    duration_days: 14,
                },
            ],
            alternative: &[],
            notes: "Urgent HR control needed. Continuous cardiac monitoring. ECG review mandatory.",
        },
        StageRule {
            label: "TACHYCARDIA",
            triggers: &[Cutoff::above(Signal::HeartRate, 100.0)],
            risk_gate: None,
            primary: &[InterventionTemplate {
                name: "Metoprolol",
                kind: InterventionKind::Medication,
                dosage: "12.5\u{2013}25 mg",
                frequency: "Once daily",
                timing: "After food",
                schedule: "Morning",
                duration_days: 30,
            }],
            alternative: &[InterventionTemplate {
                name: "Atenolol",
                kind: InterventionKind::Medication,
                dosage: "25 mg",
                frequency: "Once daily",
                timing: "Before food",
                schedule: "Morning",
                duration_days: 30,
            }],
            notes: "Beta-blocker therapy. Monitor for hypotension. Reassess in 2 weeks.",
        },
        StageRule {
            label: "SEVERE BRADYCARDIA",
            triggers: &[Cutoff::below(Signal::HeartRate, 50.0)],
            risk_gate: None,
            primary: &[InterventionTemplate {
                name: "Atropine",
                kind: InterventionKind::Medication,
                dosage: "0.5\u{2013}1 mg",
                frequency: "As needed (IV)",
                timing: "Emergency",
                schedule: "N/A",
                duration_days: 1,
            }],
            alternative: &[],
            notes: "CRITICAL: Cardiology review STAT. Consider temporary pacing. Stop all HR-lowering medications.",
        },
        StageRule {
            label: "BRADYCARDIA",
            triggers: &[Cutoff::below(Signal::HeartRate, 60.0)],
            risk_gate: None,
            primary: &[],
            alternative: &[],
            notes: "Monitor closely. Avoid HR-lowering BP meds (beta-blockers, diltiazem). Cardiology consult if symptomatic.",
        },
        StageRule {
            label: "NORMAL",
            triggers: &[],
            risk_gate: None,
            primary: &[],
            alternative: &[],
            notes: "Heart rate within normal limits. Continue routine monitoring.",
        },
    ],
    effects: &[
        EffectEntry { name: "Metoprolol", class: "Beta Blocker", changes: &[(Signal::HeartRate, -15.0)] },
        EffectEntry { name: "Atenolol", class: "Beta Blocker", changes: &[(Signal::HeartRate, -12.0)] },
        EffectEntry { name: "Diltiazem", class: "Calcium Channel Blocker", changes: &[(Signal::HeartRate, -10.0)] },
        EffectEntry { name: "Atropine", class: "Anticholinergic", changes: &[(Signal::HeartRate, 20.0)] },
    ],
    bounds: &[ProjectionBound { signal: Signal::HeartRate, min: 45.0, max: 200.0 }],
    logistic: &[
        LogisticTerm::excess(Signal::HeartRate, 0.025, 80.0),
        LogisticTerm::deficit(Signal::HeartRate, 0.020, 60.0),
        LogisticTerm::deficit(Signal::HeartRateVariability, 0.015, 40.0),
        LogisticTerm::excess(Signal::Age, 0.008, 50.0),
    ],
    alert_rules: &[
        AlertRule { label: "Severe Tachycardia", cutoff: Cutoff::above(Signal::HeartRate, 120.0), severity: AlertSeverity::Critical, group: Some("tachycardia") },
        AlertRule { label: "Tachycardia", cutoff: Cutoff::above(Signal::HeartRate, 100.0), severity: AlertSeverity::Warning, group: Some("tachycardia") },
        AlertRule { label: "Severe Bradycardia", cutoff: Cutoff::below(Signal::HeartRate, 50.0), severity: AlertSeverity::Critical, group: Some("bradycardia") },
        AlertRule { label: "Bradycardia", cutoff: Cutoff::below(Signal::HeartRate, 60.0), severity: AlertSeverity::Warning, group: Some("bradycardia") },
    ],
    horizon_hours: 12,
    interpret: None,
};
