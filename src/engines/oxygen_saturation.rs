//! Oxygen saturation channel: hypoxia staging and oxygen support.

use crate::core::ambient::Ambient;
use crate::engines::profile::*;
use crate::models::alert::AlertSeverity;
use crate::models::patient::ClinicalContext;
use crate::models::vitals::{Channel, VitalsReading};
use crate::utils::{bounded, round1};

fn derive(reading: &VitalsReading, _: &ClinicalContext, ambient: &Ambient) -> SignalMap {
    let average = bounded(round1(reading.spo2 + ambient.gauss(0.5, 0.8)), 80.0, 100.0);
    let fluctuation = round1((reading.spo2 - average).abs() + ambient.gauss(0.0, 0.5)).max(0.0);

    let mut values = SignalMap::new();
    values.insert(Signal::Spo2, reading.spo2);
    values.insert(Signal::Spo2Average24h, average);
    values.insert(Signal::Spo2Fluctuation, fluctuation);
    values.insert(Signal::RespiratoryRate, reading.rr);
    values
}

const fn support(
    name: &'static str,
    flow: &'static str,
    frequency: &'static str,
    monitoring: &'static str,
    duration_days: i64,
) -> InterventionTemplate {
    InterventionTemplate {
        name,
        kind: InterventionKind::OxygenSupport,
        dosage: flow,
        frequency,
        timing: "N/A",
        schedule: monitoring,
        duration_days,
    }
}

pub const PROFILE: ChannelProfile = ChannelProfile {
    channel: Channel::OxygenSaturation,
    primary: Signal::Spo2,
    calm_label: "Stable",
    derive,
    refresh: no_refresh,
    flags: &[
        FlagRule { name: "hypoxia", cutoff: Cutoff::below(Signal::Spo2, 94.0) },
        FlagRule { name: "severe_hypoxia", cutoff: Cutoff::below(Signal::Spo2, 88.0) },
    ],
    score_rules: &[
        ScoreRule { cutoff: Cutoff::below(Signal::Spo2, 88.0), points: 35.0, factor: "Severe hypoxia SpO\u{2082} <88%", group: Some("hypoxia") },
        ScoreRule { cutoff: Cutoff::below(Signal::Spo2, 92.0), points: 25.0, factor: "Moderate hypoxia SpO\u{2082} <92%", group: Some("hypoxia") },
        ScoreRule { cutoff: Cutoff::below(Signal::Spo2, 94.0), points: 15.0, factor: "Mild hypoxia SpO\u{2082} <94%", group: Some("hypoxia") },
        ScoreRule { cutoff: Cutoff::above(Signal::Spo2Fluctuation, 3.0), points: 10.0, factor: "SpO\u{2082} fluctuation >3%", group: None },
        ScoreRule { cutoff: Cutoff::above(Signal::RespiratoryRate, 25.0), points: 10.0, factor: "Tachypnea RR >25", group: None },
    ],
    max_score: 55.0,
    estimates: &[
        EstimateRule { name: "respiratory_deterioration_probability", slope: 0.9, signal_term: None, noise_sd: 3.0, min: 2.0, max: 95.0 },
        EstimateRule { name: "oxygen_dependency_risk", slope: 0.7, signal_term: None, noise_sd: 3.0, min: 2.0, max: 95.0 },
    ],
    stages: &[
        StageRule {
            label: "SEVERE HYPOXIA",
            triggers: &[Cutoff::below(Signal::Spo2, 88.0)],
            risk_gate: None,
            primary: &[support("High-Flow Nasal 15\u{2013}60L", "15\u{2013}60 L/min", "Continuous", "Every 30 min", 7)],
            alternative: &[support("Non-Rebreather Mask", "10\u{2013}15 L/min", "Continuous", "Every 30 min", 5)],
            notes: "CRITICAL: ICU review STAT. Prepare for intubation if no improvement in 1 hour. ABG mandatory.",
        },
        StageRule {
            label: "MODERATE HYPOXIA",
            triggers: &[Cutoff::below(Signal::Spo2, 92.0)],
            risk_gate: None,
            primary: &[support("Face Mask 6\u{2013}10L", "6\u{2013}10 L/min", "Continuous", "Every 1 hour", 5)],
            alternative: &[support("Nasal Cannula 4L", "4 L/min", "Continuous", "Every 1 hour", 5)],
            notes: "Oxygen support initiated. Monitor SpO\u{2082} trending. Chest X-ray recommended.",
        },
        StageRule {
            label: "MILD HYPOXIA",
            triggers: &[Cutoff::below(Signal::Spo2, 94.0)],
            risk_gate: None,
            primary: &[support("Nasal Cannula 2L", "2 L/min", "As needed", "Every 2 hours", 3)],
            alternative: &[],
            notes: "Low-flow supplemental oxygen. Monitor for worsening. Deep breathing exercises recommended.",
        },
        StageRule {
            label: "NORMAL",
            triggers: &[],
            risk_gate: None,
            primary: &[],
            alternative: &[],
            notes: "SpO\u{2082} within normal limits. No oxygen support needed. Continue monitoring.",
        },
    ],
    effects: &[
        EffectEntry { name: "Nasal Cannula 2L", class: "Low-flow Oxygen", changes: &[(Signal::Spo2, 3.0)] },
        EffectEntry { name: "Nasal Cannula 4L", class: "Low-flow Oxygen", changes: &[(Signal::Spo2, 5.0)] },
        EffectEntry { name: "Face Mask 6\u{2013}10L", class: "Medium-flow Oxygen", changes: &[(Signal::Spo2, 8.0)] },
        EffectEntry { name: "High-Flow Nasal 15\u{2013}60L", class: "High-flow Oxygen", changes: &[(Signal::Spo2, 12.0)] },
        EffectEntry { name: "Non-Rebreather Mask", class: "High-flow Oxygen", changes: &[(Signal::Spo2, 15.0)] },
    ],
    bounds: &[ProjectionBound { signal: Signal::Spo2, min: 60.0, max: 100.0 }],
    logistic: &[LogisticTerm::deficit(Signal::Spo2, 0.035, 95.0)],
    alert_rules: &[
        AlertRule { label: "Severe Hypoxia", cutoff: Cutoff::below(Signal::Spo2, 88.0), severity: AlertSeverity::Critical, group: Some("hypoxia") },
        AlertRule { label: "Moderate Hypoxia", cutoff: Cutoff::below(Signal::Spo2, 92.0), severity: AlertSeverity::Warning, group: Some("hypoxia") },
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

    fn sub(spo2: f64, rr: f64) -> SubParameters {
        let reading = VitalsReading::new(Utc::now(), 80.0, spo2, 120.0, 80.0, rr, 36.8);
        derive_sub_parameters(&PROFILE, &reading, &ClinicalContext::default(), &Ambient::at_epoch())
    }

    #[test]
    fn average_and_fluctuation_use_noise_means() {
        let sub = sub(91.0, 16.0);
        assert_eq!(sub.get(Signal::Spo2Average24h), Some(91.5));
        assert_eq!(sub.get(Signal::Spo2Fluctuation), Some(0.5));
        assert!(sub.flag("hypoxia"));
        assert!(!sub.flag("severe_hypoxia"));
    }

    #[test_case(85.0 => "SEVERE HYPOXIA")]
    #[test_case(90.0 => "MODERATE HYPOXIA")]
    #[test_case(93.0 => "MILD HYPOXIA")]
    #[test_case(97.0 => "NORMAL")]
    fn stage_by_saturation(spo2: f64) -> String {
        select_intervention(&PROFILE, &sub(spo2, 16.0), 0.0, Utc::now()).stage
    }

    #[test]
    fn severe_hypoxia_with_tachypnea_is_high() {
        let sub = sub(85.0, 28.0);
        let risk = score_risk(&PROFILE, &sub, &Ambient::at_epoch());
        assert_eq!(risk.raw_score, 45.0);
        assert_eq!(risk.percentage, 81.8);
        assert_eq!(risk.tier, "Critical");

        let alerts = evaluate_alerts(&PROFILE, &sub, risk.percentage);
        assert_eq!(alerts.len(), 2);
        assert!(alerts[0].1.starts_with("Severe Hypoxia"));
        assert!(alerts[1].1.starts_with("SPO2 Risk 81.8%"));
    }

    #[test]
    fn calm_tier_reads_stable() {
        let risk = score_risk(&PROFILE, &sub(97.0, 16.0), &Ambient::at_epoch());
        assert_eq!(risk.percentage, 0.0);
        assert_eq!(risk.tier, "Stable");
    }

    #[test]
    fn low_flow_support_projects_saturation_gain() {
        let sub = sub(93.0, 16.0);
        let plan = select_intervention(&PROFILE, &sub, 27.3, Utc::now());
        assert_eq!(plan.primary[0].kind, InterventionKind::OxygenSupport);
        let outcome = project_outcome(&PROFILE, &sub, 27.3, &plan, &Ambient::at_epoch());
        assert_eq!(outcome.projected[0].signal, Signal::Spo2);
        assert_eq!(outcome.projected[0].after, 96.0);
    }
}
