//! End-to-end ward scenarios driven through the public API.

use vitalguard::core::ambient::Ambient;
use vitalguard::core::classifier::RiskTier;
use vitalguard::core::model::LogisticModel;
use vitalguard::core::predictor::PredictionPath;
use vitalguard::models::alert::AlertKind;
use vitalguard::models::patient::SeverityTier;
use vitalguard::models::vitals::Channel;
use vitalguard::{IcuWard, WardError};

/// Only a falling saturation moves this model.
const SPO2_MODEL: &str = r#"{
    "feature_names": ["hr_mean","hr_trend","hr_variability","spo2_mean","spo2_deviation",
                      "rr_mean","rr_rate_of_change","temp_deviation","sbp_mean"],
    "weights": [0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0],
    "intercept": -3.0
}"#;

fn model_ward() -> IcuWard {
    let model = LogisticModel::from_json(SPO2_MODEL).expect("valid artifact");
    IcuWard::demo(Some(Box::new(model)), Ambient::at_epoch())
}

#[test]
fn deterioration_raises_threshold_and_spike_alerts() {
    let ward = model_ward();

    let calm = ward.predict("P004").expect("known patient");
    assert_eq!(calm.path, PredictionPath::Model);
    assert_eq!(calm.risk_score, 8.8);
    assert_eq!(calm.tier, RiskTier::Low);
    assert!(calm.alerts.is_empty());

    ward.simulator().set_severity("P004", SeverityTier::Critical);
    let worse = ward.predict("P004").expect("known patient");

    // SpO2 99 -> 89 halves into a mean deviation of -5
    assert_eq!(worse.features.spo2_deviation, -5.0);
    assert_eq!(worse.risk_score, 74.6);
    assert_eq!(worse.tier, RiskTier::High);
    assert_eq!(worse.alerts.len(), 2);
    assert!(worse.alerts.iter().any(|a| a.kind == AlertKind::Threshold && a.message.starts_with("Hypoxemia")));
    assert!(worse.alerts.iter().any(|a| a.kind == AlertKind::Spike));
}

#[test]
fn suppressed_alerts_leave_active_list_but_stay_logged() {
    let ward = model_ward();
    ward.predict("P004").expect("known patient");
    ward.simulator().set_severity("P004", SeverityTier::Critical);
    let raised = ward.predict("P004").expect("known patient").alerts;

    let spike = raised
        .iter()
        .find(|a| a.kind == AlertKind::Spike)
        .expect("spike alert");
    let suppressed = ward
        .suppress_alert(&spike.id, "post-op desaturation, reviewed")
        .expect("alert in log");
    assert!(suppressed.suppressed);
    assert_eq!(suppressed.suppression_reason.as_deref(), Some("post-op desaturation, reviewed"));

    assert_eq!(ward.alert_log().len(), 2);
    assert_eq!(ward.active_alerts().len(), 1);
    assert!(ward.active_alerts().iter().all(|a| a.id != spike.id));

    let summary = ward.summary();
    assert_eq!(summary.alerts.triggered, 2);
    assert_eq!(summary.alerts.suppressed, 1);
}

#[test]
fn crisis_clears_spike_memory_and_reset_keeps_log() {
    let ward = model_ward();
    ward.predict("P003").expect("known patient");
    let affected = ward.trigger_crisis(&["P003", "P999"]);
    assert_eq!(affected.len(), 1);
    assert_eq!(affected[0].patient.id, "P003");

    // First reading after the drill has nothing to compare against
    let first = ward.predict("P003").expect("known patient");
    assert!(first.alerts.iter().all(|a| a.kind != AlertKind::Spike));
    let logged = ward.alert_log().len();

    ward.reset_simulation();
    assert!(ward.vitals_history("P003").expect("known patient").is_empty());
    assert_eq!(ward.alert_log().len(), logged);
    assert_eq!(ward.alerts().last_score("P003"), None);
}

#[test]
fn analyze_reports_every_channel_and_logs_its_alerts() {
    let ward = IcuWard::demo(None, Ambient::at_epoch());
    ward.trigger_crisis(&["P007"]);
    ward.current_vitals("P007").expect("known patient");

    let report = ward.analyze("P007").expect("known patient");
    assert_eq!(report.patient.id, "P007");
    assert_eq!(report.channels.len(), 5);
    assert_eq!(report.channel_risks.len(), 5);
    assert_eq!(report.status_label, report.status.label());

    // Analysis reuses the latest reading instead of simulating a new one
    assert_eq!(ward.vitals_history("P007").expect("known patient").len(), 1);
    assert!(report
        .alerts
        .iter()
        .all(|a| ward.alert_log().iter().any(|logged| logged.id == a.id)));

    let spo2 = ward
        .analyze_channel("P007", Channel::OxygenSaturation)
        .expect("known patient");
    assert_eq!(spo2.channel, Channel::OxygenSaturation);
}

#[test]
fn forecast_follows_rising_history() {
    let ward = model_ward();
    for _ in 0..5 {
        ward.predict("P002").expect("known patient");
    }
    ward.simulator().set_severity("P002", SeverityTier::Critical);
    for _ in 0..5 {
        ward.predict("P002").expect("known patient");
    }

    let forecast = ward.forecast("P002").expect("known patient").forecast;
    assert!(forecast.trend > 0.0);
    assert!(forecast
        .points
        .windows(2)
        .all(|w| w[1].predicted_risk >= w[0].predicted_risk));
}

#[test]
fn census_ranks_crisis_patients_first() {
    let ward = IcuWard::demo(None, Ambient::at_epoch());
    ward.trigger_crisis(&["P001", "P003", "P007"]);
    for patient in ward.patients() {
        ward.predict(&patient.id).expect("known patient");
    }

    let census = ward.census();
    assert_eq!(census.len(), 8);
    let top: Vec<&str> = census[..3].iter().map(|e| e.patient_id.as_str()).collect();
    for id in ["P001", "P003", "P007"] {
        assert!(top.contains(&id), "{id} not in top three: {top:?}");
    }
}

#[test]
fn unknown_patient_surfaces_as_error() {
    let ward = IcuWard::demo(None, Ambient::at_epoch());
    assert!(matches!(ward.current_vitals("P404"), Err(WardError::UnknownPatient(id)) if id == "P404"));
    assert!(matches!(ward.explain("P404"), Err(WardError::UnknownPatient(_))));
}
