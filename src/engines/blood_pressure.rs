//! Blood pressure channel: hypertension staging and antihypertensive plans.

use crate::core::ambient::Ambient;
use crate::engines::profile::*;
use crate::models::alert::AlertSeverity;
use crate::models::patient::ClinicalContext;
use crate::models::vitals::{Channel, VitalsReading};
use crate::utils::round1;

fn derive(reading: &VitalsReading, context: &ClinicalContext, _: &Ambient) -> SignalMap {
    let mut values = SignalMap::new();
    values.insert(Signal::Systolic, reading.sbp);
    values.insert(Signal::Diastolic, reading.dbp);
    values.insert(Signal::HeartRate, reading.hr);
    values.insert(Signal::Sodium, context.sodium);
    values.insert(Signal::Age, context.age);
    values.insert(Signal::Bmi, context.bmi);
    refresh(&mut values);
    values
}

/// Pulse pressure and MAP from the current systolic/diastolic pair.
fn refresh(values: &mut SignalMap) {
    let sbp = values.get(&Signal::Systolic).copied().unwrap_or_default();
    let dbp = values.get(&Signal::Diastolic).copied().unwrap_or_default();
    values.insert(Signal::PulsePressure, round1(sbp - dbp));
    values.insert(Signal::MeanArterialPressure, round1((2.0 * dbp + sbp) / 3.0));
}

fn interpret(pct: f64) -> String {
    if pct >= 75.0 {
        format!(
            "BP risk is CRITICAL ({pct:.1}%). Multiple cardiovascular risk factors are active. \
             Immediate clinical intervention required. Risk of hypertensive emergency or end-organ damage."
        )
    } else if pct >= 50.0 {
        format!(
            "BP risk is HIGH ({pct:.1}%). Several concerning factors identified. \
             Consider escalating treatment and increasing monitoring frequency."
        )
    } else if pct >= 25.0 {
        format!(
            "BP risk is MODERATE ({pct:.1}%). Some risk factors present but manageable. \
             Continue current treatment plan and monitor trend."
        )
    } else {
        format!(
            "BP risk is LOW ({pct:.1}%). Blood pressure within or near normal limits. \
             No immediate concern. Maintain routine monitoring."
        )
    }
}

const fn med(
    name: &'static str,
    dosage: &'static str,
    timing: &'static str,
    meal_period: &'static str,
    duration_days: i64,
) -> InterventionTemplate {
    InterventionTemplate {
        name,
        kind: InterventionKind::Medication,
        dosage,
        frequency: "Once daily",
        timing,
        schedule: meal_period,
        duration_days,
    }
}

const SEVERE_PRIMARY: &[InterventionTemplate] = &[
    med("Valsartan", "80\u{2013}160 mg", "Before food", "Morning", 60),
    med("Amlodipine", "5\u{2013}10 mg", "After food", "Evening", 60),
    med("Hydrochlorothiazide", "25 mg", "After food", "Morning", 60),
];

const STAGE2_PRIMARY: &[InterventionTemplate] = &[
    med("Lisinopril", "10\u{2013}20 mg", "Before food", "Morning", 30),
    med("Amlodipine", "5 mg", "After food", "Evening", 30),
];

const STAGE2_ALTERNATIVE: &[InterventionTemplate] = &[
    med("Losartan", "50 mg", "Before food", "Morning", 30),
    med("Hydrochlorothiazide", "12.5 mg", "After food", "Morning (after breakfast)", 30),
];

const STAGE1_PRIMARY: &[InterventionTemplate] = &[med("Lisinopril", "5\u{2013}10 mg", "Before food", "Morning", 30)];

const STAGE1_ALTERNATIVE: &[InterventionTemplate] = &[med("Amlodipine", "5 mg", "After food", "Evening", 30)];

pub const PROFILE: ChannelProfile = ChannelProfile {
    channel: Channel::BloodPressure,
    primary: Signal::Systolic,
    calm_label: "Low",
    derive,
    refresh,
    flags: &[
        FlagRule { name: "stage2_hypertension", cutoff: Cutoff::at_least(Signal::Systolic, 140.0) },
        FlagRule { name: "severe_hypertension", cutoff: Cutoff::at_least(Signal::Systolic, 160.0) },
        FlagRule { name: "low_perfusion", cutoff: Cutoff::below(Signal::MeanArterialPressure, 65.0) },
    ],
    score_rules: &[
        ScoreRule { cutoff: Cutoff::at_least(Signal::Systolic, 160.0), points: 30.0, factor: "Systolic \u{2265}160 mmHg", group: Some("systolic") },
        ScoreRule { cutoff: Cutoff::at_least(Signal::Systolic, 140.0), points: 20.0, factor: "Systolic \u{2265}140 mmHg", group: Some("systolic") },
        ScoreRule { cutoff: Cutoff::at_least(Signal::Diastolic, 90.0), points: 15.0, factor: "Diastolic \u{2265}90 mmHg", group: None },
        ScoreRule { cutoff: Cutoff::at_least(Signal::MeanArterialPressure, 100.0), points: 10.0, factor: "MAP \u{2265}100 mmHg", group: None },
        ScoreRule { cutoff: Cutoff::above(Signal::HeartRate, 100.0), points: 10.0, factor: "Heart rate >100 bpm", group: None },
        ScoreRule { cutoff: Cutoff::above(Signal::Sodium, 145.0), points: 10.0, factor: "Sodium >145 mEq/L", group: None },
        ScoreRule { cutoff: Cutoff::above(Signal::Age, 60.0), points: 10.0, factor: "Age >60", group: None },
        ScoreRule { cutoff: Cutoff::above(Signal::Bmi, 30.0), points: 10.0, factor: "BMI >30", group: None },
    ],
    max_score: 95.0,
    estimates: &[EstimateRule {
        name: "hypertensive_crisis_probability",
        slope: 0.75,
        signal_term: None,
        noise_sd: 3.0,
        min: 2.0,
        max: 95.0,
    }],
    stages: &[
        StageRule {
            label: "SEVERE",
            triggers: &[Cutoff::at_least(Signal::Systolic, 160.0)],
            risk_gate: Some(75.0),
            primary: SEVERE_PRIMARY,
            alternative: &[],
            notes: "Triple combination therapy. Monitor BP every 4 hours. Renal function check weekly.",
        },
        StageRule {
            label: "STAGE 2",
            triggers: &[Cutoff::at_least(Signal::Systolic, 140.0), Cutoff::at_least(Signal::Diastolic, 90.0)],
            risk_gate: None,
            primary: STAGE2_PRIMARY,
            alternative: STAGE2_ALTERNATIVE,
            notes: "Combination therapy required. Monitor BP twice daily. Reassess in 30 days.",
        },
        StageRule {
            label: "STAGE 1",
            triggers: &[Cutoff::at_least(Signal::Systolic, 130.0), Cutoff::at_least(Signal::Diastolic, 80.0)],
            risk_gate: None,
            primary: STAGE1_PRIMARY,
            alternative: STAGE1_ALTERNATIVE,
            notes: "Monotherapy sufficient. Lifestyle modification recommended. Follow-up in 14\u{2013}30 days.",
        },
        StageRule {
            label: "NORMAL",
            triggers: &[],
            risk_gate: None,
            primary: &[],
            alternative: &[],
            notes: "BP within normal limits. No pharmacological intervention needed. Continue monitoring.",
        },
    ],
    effects: &[
        EffectEntry { name: "Lisinopril", class: "ACE Inhibitor", changes: &[(Signal::Systolic, -12.0), (Signal::Diastolic, -8.0)] },
        EffectEntry { name: "Losartan", class: "ARB", changes: &[(Signal::Systolic, -10.0), (Signal::Diastolic, -7.0)] },
        EffectEntry { name: "Valsartan", class: "ARB", changes: &[(Signal::Systolic, -14.0), (Signal::Diastolic, -9.0)] },
        EffectEntry { name: "Amlodipine", class: "Calcium Channel Blocker", changes: &[(Signal::Systolic, -10.0), (Signal::Diastolic, -6.0)] },
        EffectEntry { name: "Hydrochlorothiazide", class: "Thiazide Diuretic", changes: &[(Signal::Systolic, -8.0), (Signal::Diastolic, -5.0)] },
    ],
    bounds: &[
        ProjectionBound { signal: Signal::Systolic, min: 90.0, max: 220.0 },
        ProjectionBound { signal: Signal::Diastolic, min: 60.0, max: 130.0 },
    ],
    logistic: &[
        LogisticTerm::excess(Signal::Systolic, 0.030, 120.0),
        LogisticTerm::excess(Signal::Diastolic, 0.025, 80.0),
        LogisticTerm::excess(Signal::MeanArterialPressure, 0.020, 90.0),
        LogisticTerm::excess(Signal::HeartRate, 0.015, 80.0),
        LogisticTerm::excess(Signal::Sodium, 0.010, 135.0),
        LogisticTerm::excess(Signal::Age, 0.008, 50.0),
        LogisticTerm::excess(Signal::Bmi, 0.010, 25.0),
    ],
    alert_rules: &[
        AlertRule { label: "Organ perfusion at risk", cutoff: Cutoff::below(Signal::MeanArterialPressure, 65.0), severity: AlertSeverity::Critical, group: None },
        AlertRule { label: "Electrolyte imbalance", cutoff: Cutoff::above(Signal::Sodium, 150.0), severity: AlertSeverity::Critical, group: None },
        AlertRule { label: "Tachycardia", cutoff: Cutoff::above(Signal::HeartRate, 110.0), severity: AlertSeverity::Warning, group: None },
    ],
    horizon_hours: 24,
    interpret: Some(interpret),
};
