//! Core temperature channel: fever and hypothermia management.

use crate::core::ambient::Ambient;
use crate::engines::profile::*;
use crate::models::alert::AlertSeverity;
use crate::models::patient::ClinicalContext;
use crate::models::vitals::{Channel, VitalsReading};
use crate::utils::{bounded, round1};

fn derive(reading: &VitalsReading, _: &ClinicalContext, ambient: &Ambient) -> SignalMap {
    let mut values = SignalMap::new();
    values.insert(Signal::Temperature, reading.temp);
    values.insert(
        Signal::TemperatureAverage24h,
        bounded(round1(reading.temp + ambient.gauss(-0.2, 0.3)), 34.0, 42.0),
    );
    values.insert(Signal::HeartRate, reading.hr);
    values
}

pub const PROFILE: ChannelProfile = ChannelProfile {
    channel: Channel::Temperature,
    primary: Signal::Temperature,
    calm_label: "Normal",
    derive,
    refresh: no_refresh,
    flags: &[
        FlagRule { name: "fever", cutoff: Cutoff::above(Signal::Temperature, 38.0) },
        FlagRule { name: "high_fever", cutoff: Cutoff::above(Signal::Temperature, 39.0) },
        FlagRule { name: "hypothermia", cutoff: Cutoff::below(Signal::Temperature, 35.0) },
    ],
    score_rules: &[
        ScoreRule { cutoff: Cutoff::above(Signal::Temperature, 39.5), points: 30.0, factor: "High fever >39.5\u{b0}C", group: Some("fever") },
        ScoreRule { cutoff: Cutoff::above(Signal::Temperature, 38.5), points: 20.0, factor: "Moderate fever >38.5\u{b0}C", group: Some("fever") },
        ScoreRule { cutoff: Cutoff::above(Signal::Temperature, 38.0), points: 10.0, factor: "Mild fever >38\u{b0}C", group: Some("fever") },
        ScoreRule { cutoff: Cutoff::below(Signal::Temperature, 35.0), points: 25.0, factor: "Hypothermia <35\u{b0}C", group: None },
        ScoreRule { cutoff: Cutoff::above(Signal::HeartRate, 100.0), points: 10.0, factor: "Associated tachycardia HR >100", group: None },
    ],
    max_score: 65.0,
    estimates: &[
        EstimateRule { name: "infection_progression_probability", slope: 0.9, signal_term: None, noise_sd: 3.0, min: 2.0, max: 95.0 },
        EstimateRule { name: "sepsis_risk", slope: 0.55, signal_term: None, noise_sd: 3.0, min: 1.0, max: 95.0 },
    ],
    stages: &[
        StageRule {
            label: "HIGH FEVER",
            triggers: &[Cutoff::above(Signal::Temperature, 39.0)],
            risk_gate: Some(75.0),
            primary: &[
                InterventionTemplate {
                    name: "Paracetamol (IV)",
                    kind: InterventionKind::Medication,
                    dosage: "1g",
                    frequency: "Every 6 hours",
                    timing: "N/A (IV)",
                    schedule: "N/A",
                    duration_days: 5,
                },
                InterventionTemplate {
                    name: "Physical Cooling",
                    kind: InterventionKind::Therapy,
                    dosage: "Tepid sponging",
                    frequency: "Every 2 hours",
                    timing: "Continuous",
                    schedule: "N/A",
                    duration_days: 3,
                },
            ],
            alternative: &[InterventionTemplate {
                name: "Ibuprofen",
                kind: InterventionKind::Medication,
                dosage: "400 mg",
                frequency: "Every 8 hours",
                timing: "After food",
                schedule: "Morning, Afternoon, Night",
                duration_days: 5,
            }],
            notes: "IV antipyretic initiated. Blood cultures x2 MANDATORY. Infection workup: CBC, CRP, Procalcitonin. Sepsis screening.",
        },
        StageRule {
            label: "MILD FEVER",
            triggers: &[Cutoff::above(Signal::Temperature, 38.0)],
            risk_gate: None,
            primary: &[InterventionTemplate {
                name: "Paracetamol (Oral)",
                kind: InterventionKind::Medication,
                dosage: "500\u{2013}650 mg",
                frequency: "Every 6 hours",
                timing: "After food",
                schedule: "As needed",
                duration_days: 5,
            }],
            alternative: &[InterventionTemplate {
                name: "Ibuprofen",
                kind: InterventionKind::Medication,
                dosage: "200 mg",
                frequency: "Every 8 hours",
                timing: "After food",
                schedule: "Morning, Afternoon, Night",
                duration_days: 3,
            }],
            notes: "Oral antipyretic. Adequate hydration. Monitor for rising trend. Infection workup if fever persists >48 hours.",
        },
        StageRule {
            label: "HYPOTHERMIA",
            triggers: &[Cutoff::below(Signal::Temperature, 35.0)],
            risk_gate: None,
            primary: &[InterventionTemplate {
                name: "Active Warming",
                kind: InterventionKind::Therapy,
                dosage: "Warming blanket + warm IV fluids",
                frequency: "Continuous",
                timing: "Immediate",
                schedule: "N/A",
                duration_days: 2,
            }],
            alternative: &[],
            notes: "CRITICAL: Hypothermia protocol. Warm IV fluids, forced-air warming blanket. Continuous core temp monitoring. Check thyroid function.",
        },
        StageRule {
            label: "NORMAL",
            triggers: &[],
            risk_gate: None,
            primary: &[],
            alternative: &[],
            notes: "Temperature within normal limits. No intervention needed. Continue monitoring.",
        },
    ],
    effects: &[
        EffectEntry { name: "Paracetamol (Oral)", class: "Antipyretic (Oral)", changes: &[(Signal::Temperature, -1.2)] },
        EffectEntry { name: "Paracetamol (IV)", class: "Antipyretic (IV)", changes: &[(Signal::Temperature, -1.8)] },
        EffectEntry { name: "Ibuprofen", class: "NSAID Antipyretic", changes: &[(Signal::Temperature, -1.0)] },
        EffectEntry { name: "Physical Cooling", class: "Non-pharmacological", changes: &[(Signal::Temperature, -0.5)] },
        EffectEntry { name: "Active Warming", class: "Rewarming", changes: &[(Signal::Temperature, 1.5)] },
    ],
    bounds: &[ProjectionBound { signal: Signal::Temperature, min: 35.0, max: 42.0 }],
    logistic: &[
        LogisticTerm::excess(Signal::Temperature, 0.040, 37.5),
        LogisticTerm::deficit(Signal::Temperature, 0.030, 35.5),
    ],
    alert_rules: &[
        AlertRule { label: "High Fever", cutoff: Cutoff::above(Signal::Temperature, 39.5), severity: AlertSeverity::Critical, group: Some("fever") },
        AlertRule { label: "Fever", cutoff: Cutoff::above(Signal::Temperature, 38.0), severity: AlertSeverity::Warning, group: Some("fever") },
        AlertRule { label: "Hypothermia", cutoff: Cutoff::below(Signal::Temperature, 35.0), severity: AlertSeverity::Critical, group: None },
    ],
    horizon_hours: 24,
    interpret: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::pipeline::*;
    use chrono::Utc;
    use test_case::test_case;

    fn sub(temp: f64, hr: f64) -> SubParameters {
        let reading = VitalsReading::new(Utc::now(), hr, 97.0, 120.0, 80.0, 16.0, temp);
        derive_sub_parameters(&PROFILE, &reading, &ClinicalContext::default(), &Ambient::at_epoch())
    }

    #[test_case(39.8, 80.0 => 30.0)]
    #[test_case(38.9, 80.0 => 20.0)]
    #[test_case(38.2, 110.0 => 20.0)]
    #[test_case(34.5, 80.0 => 25.0)]
    #[test_case(36.8, 80.0 => 0.0)]
    fn fever_tiers_score_once(temp: f64, hr: f64) -> f64 {
        score_risk(&PROFILE, &sub(temp, hr), &Ambient::at_epoch()).raw_score
    }

    #[test]
    fn high_fever_plan_stacks_antipyretic_and_cooling() {
        let sub = sub(39.8, 110.0);
        let risk = score_risk(&PROFILE, &sub, &Ambient::at_epoch());
        assert_eq!(risk.percentage, 61.5);
        assert_eq!(risk.estimate("sepsis_risk"), Some(33.8));

        let plan = select_intervention(&PROFILE, &sub, risk.percentage, Utc::now());
        assert_eq!(plan.stage, "HIGH FEVER");
        assert_eq!(plan.primary.len(), 2);
        assert_eq!(plan.alternative.as_ref().map(Vec::len), Some(1));

        let outcome = project_outcome(&PROFILE, &sub, risk.percentage, &plan, &Ambient::at_epoch());
        assert_eq!(outcome.projected[0].signal, Signal::Temperature);
        assert_eq!(outcome.projected[0].after, 37.5);
    }

    #[test]
    fn hypothermia_rewarming_raises_projection() {
        let sub = sub(34.2, 70.0);
        assert!(sub.flag("hypothermia"));
        let plan = select_intervention(&PROFILE, &sub, 38.5, Utc::now());
        assert_eq!(plan.stage, "HYPOTHERMIA");
        let outcome = project_outcome(&PROFILE, &sub, 38.5, &plan, &Ambient::at_epoch());
        assert_eq!(outcome.projected[0].after, 35.7);

        let alerts = evaluate_alerts(&PROFILE, &sub, 38.5);
        assert_eq!(alerts, vec![(AlertSeverity::Critical, "Hypothermia: Temp 34.2\u{b0}C <35".to_string())]);
    }

    #[test]
    fn average_tracks_below_current() {
        assert_eq!(sub(38.0, 80.0).get(Signal::TemperatureAverage24h), Some(37.8));
    }
}
