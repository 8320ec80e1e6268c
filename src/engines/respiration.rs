//! Respiratory rate channel: tachypnea staging and respiratory support.

use crate::core::ambient::Ambient;
use crate::engines::profile::*;
use crate::models::alert::AlertSeverity;
use crate::models::patient::ClinicalContext;
use crate::models::vitals::{Channel, VitalsReading};
use crate::utils::{bounded, round1};

fn derive(reading: &VitalsReading, _: &ClinicalContext, ambient: &Ambient) -> SignalMap {
    let mut values = SignalMap::new();
    values.insert(Signal::RespiratoryRate, reading.rr);
    values.insert(
        Signal::RespiratoryAverage24h,
        bounded(round1(reading.rr + ambient.gauss(0.0, 1.5)), 6.0, 45.0),
    );
    values.insert(Signal::Spo2, reading.spo2);
    values
}

const fn therapy(
    name: &'static str,
    dosage: &'static str,
    frequency: &'static str,
    monitoring: &'static str,
    duration_days: i64,
) -> InterventionTemplate {
    InterventionTemplate {
        name,
        kind: InterventionKind::Therapy,
        dosage,
        frequency,
        timing: "N/A",
        schedule: monitoring,
        duration_days,
    }
}

pub const PROFILE: ChannelProfile = ChannelProfile {
    channel: Channel::Respiration,
    primary: Signal::RespiratoryRate,
    calm_label: "Normal",
    derive,
    refresh: no_refresh,
    flags: &[
        FlagRule { name: "tachypnea", cutoff: Cutoff::above(Signal::RespiratoryRate, 20.0) },
        FlagRule { name: "severe_tachypnea", cutoff: Cutoff::above(Signal::RespiratoryRate, 30.0) },
        FlagRule { name: "bradypnea", cutoff: Cutoff::below(Signal::RespiratoryRate, 10.0) },
        FlagRule { name: "severe_bradypnea", cutoff: Cutoff::below(Signal::RespiratoryRate, 8.0) },
    ],
    score_rules: &[
        ScoreRule { cutoff: Cutoff::above(Signal::RespiratoryRate, 30.0), points: 30.0, factor: "Severe tachypnea >30 /min", group: Some("tachypnea") },
        ScoreRule { cutoff: Cutoff::above(Signal::RespiratoryRate, 25.0), points: 20.0, factor: "Tachypnea >25 /min", group: Some("tachypnea") },
        ScoreRule { cutoff: Cutoff::above(Signal::RespiratoryRate, 20.0), points: 10.0, factor: "Elevated RR >20 /min", group: Some("tachypnea") },
        ScoreRule { cutoff: Cutoff::below(Signal::RespiratoryRate, 8.0), points: 30.0, factor: "Severe bradypnea <8 /min", group: Some("bradypnea") },
        ScoreRule { cutoff: Cutoff::below(Signal::RespiratoryRate, 10.0), points: 15.0, factor: "Bradypnea <10 /min", group: Some("bradypnea") },
        ScoreRule { cutoff: Cutoff::below(Signal::Spo2, 92.0), points: 15.0, factor: "SpO\u{2082} <92%", group: None },
    ],
    max_score: 75.0,
    estimates: &[
        EstimateRule { name: "respiratory_failure_probability", slope: 0.85, signal_term: None, noise_sd: 3.0, min: 2.0, max: 95.0 },
        EstimateRule { name: "icu_escalation_probability", slope: 0.7, signal_term: None, noise_sd: 3.0, min: 2.0, max: 95.0 },
    ],
    stages: &[
        StageRule {
            label: "SEVERE TACHYPNEA",
            triggers: &[Cutoff::above(Signal::RespiratoryRate, 30.0)],
            risk_gate: Some(75.0),
            primary: &[
                therapy("Salbutamol Nebulization", "2.5\u{2013}5 mg", "Every 4 hours", "Every 30 min", 7),
                therapy("BiPAP Support", "IPAP 12/EPAP 5", "Continuous", "Continuous", 3),
            ],
            alternative: &[],
            notes: "ICU escalation alert. Prepare for intubation if RR remains >30. ABG and chest X-ray STAT.",
        },
        StageRule {
            label: "TACHYPNEA",
            triggers: &[Cutoff::above(Signal::RespiratoryRate, 25.0)],
            risk_gate: None,
            primary: &[therapy("Salbutamol Nebulization", "2.5 mg", "Every 6 hours", "Every 1 hour", 5)],
            alternative: &[therapy("Ipratropium Nebulization", "0.5 mg", "Every 6 hours", "Every 1 hour", 5)],
            notes: "Nebulization therapy initiated. Reassess oxygen if SpO\u{2082} drops. Pulmonology consult if no improvement.",
        },
        StageRule {
            label: "ELEVATED",
            triggers: &[Cutoff::above(Signal::RespiratoryRate, 20.0)],
            risk_gate: None,
            primary: &[therapy("Oxygen Reassessment", "Titrate to SpO\u{2082} >94%", "Every 2 hours", "Every 2 hours", 3)],
            alternative: &[],
            notes: "Mild RR elevation. Monitor trend. Deep breathing exercises. Ensure pain management adequate.",
        },
        StageRule {
            label: "NORMAL",
            triggers: &[],
            risk_gate: None,
            primary: &[],
            alternative: &[],
            notes: "Respiratory rate within normal limits. Continue routine monitoring.",
        },
    ],
    effects: &[
        EffectEntry { name: "Salbutamol Nebulization", class: "Bronchodilator", changes: &[(Signal::RespiratoryRate, -5.0)] },
        EffectEntry { name: "Ipratropium Nebulization", class: "Anticholinergic Bronchodilator", changes: &[(Signal::RespiratoryRate, -4.0)] },
        EffectEntry { name: "Oxygen Reassessment", class: "Oxygen Therapy", changes: &[(Signal::RespiratoryRate, -3.0)] },
        EffectEntry { name: "BiPAP Support", class: "Non-invasive Ventilation", changes: &[(Signal::RespiratoryRate, -8.0)] },
    ],
    bounds: &[ProjectionBound { signal: Signal::RespiratoryRate, min: 8.0, max: 50.0 }],
    logistic: &[
        LogisticTerm::excess(Signal::RespiratoryRate, 0.030, 18.0),
        LogisticTerm::deficit(Signal::RespiratoryRate, 0.025, 10.0),
    ],
    alert_rules: &[
        AlertRule { label: "Severe Tachypnea", cutoff: Cutoff::above(Signal::RespiratoryRate, 30.0), severity: AlertSeverity::Critical, group: Some("tachypnea") },
        AlertRule { label: "Tachypnea", cutoff: Cutoff::above(Signal::RespiratoryRate, 25.0), severity: AlertSeverity::Warning, group: Some("tachypnea") },
        AlertRule { label: "Critical Bradypnea", cutoff: Cutoff::below(Signal::RespiratoryRate, 8.0), severity: AlertSeverity::Critical, group: None },
    ],
    horizon_hours: 24,
    interpret: None,
};
