//! Alert engine
//!
//! Threshold and spike detection over the global risk path, confidence
//! gating, and the suppression workflow. Channel engines write their own
//! alerts through [`AlertEngine::raise`] so every alert lands in one log.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::core::ambient::Ambient;
use crate::db::AlertLog;
use crate::models::alert::{Alert, AlertCounts, AlertId, AlertKind, AlertSeverity};
use crate::models::patient::PatientRef;
use crate::models::vitals::VitalsReading;

pub const MIN_CONFIDENCE: f64 = 0.75;
pub const SPIKE_THRESHOLD: f64 = 20.0;

/// Global-path vital thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClinicalLimits {
    pub hr_high: f64,
    pub hr_low: f64,
    pub spo2_low: f64,
    pub rr_high: f64,
    pub temp_high: f64,
    pub sbp_low: f64,
}

impl Default for ClinicalLimits {
    fn default() -> Self {
        Self {
            hr_high: 130.0,
            hr_low: 40.0,
            spo2_low: 90.0,
            rr_high: 30.0,
            temp_high: 39.0,
            sbp_low: 85.0,
        }
    }
}

/// Last recorded global score for one patient.
#[derive(Debug, Clone, Copy)]
struct RiskMemory {
    last_score: f64,
}

pub struct AlertEngine {
    log: Arc<dyn AlertLog>,
    memory: DashMap<String, RiskMemory>,
    limits: ClinicalLimits,
    min_confidence: f64,
    spike_threshold: f64,
    ambient: Ambient,
}

impl AlertEngine {
    pub fn new(log: Arc<dyn AlertLog>, ambient: Ambient) -> Self {
        Self {
            log,
            memory: DashMap::new(),
            limits: ClinicalLimits::default(),
            min_confidence: MIN_CONFIDENCE,
            spike_threshold: SPIKE_THRESHOLD,
            ambient,
        }
    }

    pub fn with_limits(mut self, limits: ClinicalLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_gates(mut self, min_confidence: f64, spike_threshold: f64) -> Self {
        self.min_confidence = min_confidence;
        self.spike_threshold = spike_threshold;
        self
    }

    /// One alert per breached vital threshold. Nothing below the confidence gate.
    #[instrument(skip(self, patient, vitals), fields(patient_id = %patient.id))]
    pub fn check_thresholds(
        &self,
        patient: &PatientRef,
        vitals: &VitalsReading,
        risk_score: f64,
        confidence: f64,
    ) -> Vec<Alert> {
        if confidence < self.min_confidence {
            debug!(confidence, "Below confidence gate, skipping threshold check");
            return Vec::new();
        }

        let limits = &self.limits;
        let mut breaches = Vec::new();

        if vitals.hr > limits.hr_high {
            breaches.push(format!("Tachycardia: HR {} bpm > {}", vitals.hr, limits.hr_high));
        } else if vitals.hr < limits.hr_low {
            breaches.push(format!("Bradycardia: HR {} bpm < {}", vitals.hr, limits.hr_low));
        }
        if vitals.spo2 < limits.spo2_low {
            breaches.push(format!("Hypoxemia: SpO2 {}% < {}%", vitals.spo2, limits.spo2_low));
        }
        if vitals.rr > limits.rr_high {
            breaches.push(format!("Tachypnea: RR {} /min > {}", vitals.rr, limits.rr_high));
        }
        if vitals.temp > limits.temp_high {
            breaches.push(format!("Fever: Temp {}\u{b0}C > {}\u{b0}C", vitals.temp, limits.temp_high));
        }
        if vitals.sbp < limits.sbp_low {
            breaches.push(format!("Hypotension: SBP {} mmHg < {}", vitals.sbp, limits.sbp_low));
        }

        breaches
            .into_iter()
            .map(|message| {
                self.raise(Alert::new(
                    patient.clone(),
                    AlertKind::Threshold,
                    AlertSeverity::Warning,
                    message,
                    risk_score,
                    confidence,
                    self.ambient.now(),
                ))
            })
            .collect()
    }

    /// Spike alert when the score jumped by at least the spike threshold since
    /// the last call. The remembered score is updated on every call.
    #[instrument(skip(self, patient), fields(patient_id = %patient.id))]
    pub fn check_spike(
        &self,
        patient: &PatientRef,
        risk_score: f64,
        confidence: f64,
    ) -> Option<Alert> {
        let previous = self
            .memory
            .insert(patient.id.clone(), RiskMemory { last_score: risk_score })?;

        if confidence < self.min_confidence {
            return None;
        }
        let delta = risk_score - previous.last_score;
        if delta < self.spike_threshold {
            return None;
        }

        let message = format!(
            "Risk spike: {:.1} -> {:.1} (+{:.1}) in one reading",
            previous.last_score, risk_score, delta
        );
        Some(self.raise(Alert::new(
            patient.clone(),
            AlertKind::Spike,
            AlertSeverity::Critical,
            message,
            risk_score,
            confidence,
            self.ambient.now(),
        )))
    }

    /// Append an alert to the shared log and hand back a copy.
    pub fn raise(&self, alert: Alert) -> Alert {
        info!(
            alert_id = %alert.id,
            patient_id = %alert.patient.id,
            kind = %alert.kind,
            "Alert raised: {}",
            alert.message
        );
        self.log.append(alert.clone());
        alert
    }

    /// Suppress an alert; repeat calls overwrite the reason. `None` for an unknown id.
    #[instrument(skip(self, reason), fields(alert_id = %id))]
    pub fn suppress(&self, id: &AlertId, reason: &str) -> Option<Alert> {
        let updated = self.log.suppress(id, reason, self.ambient.now());
        match &updated {
            Some(alert) => info!(patient_id = %alert.patient.id, reason, "Alert suppressed"),
            None => warn!("Suppression requested for unknown alert"),
        }
        updated
    }

    /// Non-suppressed alerts, newest first.
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alert_log().into_iter().filter(|a| !a.suppressed).collect()
    }

    /// Every alert ever raised, newest first.
    pub fn alert_log(&self) -> Vec<Alert> {
        let mut alerts = self.log.all();
        alerts.reverse();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts
    }

    pub fn patient_alerts(&self, patient_id: &str) -> Vec<Alert> {
        self.alert_log()
            .into_iter()
            .filter(|a| a.patient.id == patient_id)
            .collect()
    }

    pub fn alert_counts(&self) -> AlertCounts {
        let alerts = self.log.all();
        AlertCounts {
            triggered: alerts.len(),
            suppressed: alerts.iter().filter(|a| a.suppressed).count(),
        }
    }

    pub fn last_score(&self, patient_id: &str) -> Option<f64> {
        self.memory.get(patient_id).map(|m| m.last_score)
    }

    /// Drop the remembered score so the next reading cannot spike.
    pub fn forget_patient(&self, patient_id: &str) {
        self.memory.remove(patient_id);
    }

    pub fn forget_all(&self) {
        self.memory.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryAlertLog;
    use chrono::{Duration, Utc};
    use test_case::test_case;

    fn engine() -> AlertEngine {
        AlertEngine::new(Arc::new(MemoryAlertLog::new()), Ambient::at_epoch())
    }

    fn patient() -> PatientRef {
        PatientRef::new("P001", "Arjun Mehta", "B01")
    }

    fn vitals(hr: f64, spo2: f64, rr: f64, temp: f64, sbp: f64) -> VitalsReading {
        VitalsReading::new(Utc::now(), hr, spo2, sbp, 70.0, rr, temp)
    }

    #[test_case(71.0, 0.9 => true; "jump of 21 fires")]
    #[test_case(69.9, 0.9 => false; "jump of 19.9 is quiet")]
    #[test_case(70.0, 0.9 => true; "jump of exactly 20 fires")]
    #[test_case(80.0, 0.7 => false; "low confidence is gated")]
    fn spike_after_prior_fifty(new_score: f64, confidence: f64) -> bool {
        let engine = engine();
        assert!(engine.check_spike(&patient(), 50.0, 0.9).is_none());
        engine.check_spike(&patient(), new_score, confidence).is_some()
    }

    #[test]
    fn first_score_never_spikes_but_is_remembered() {
        let engine = engine();
        assert!(engine.check_spike(&patient(), 95.0, 0.99).is_none());
        assert_eq!(engine.last_score("P001"), Some(95.0));
    }

    #[test]
    fn gated_call_still_updates_memory() {
        let engine = engine();
        engine.check_spike(&patient(), 10.0, 0.9);
        assert!(engine.check_spike(&patient(), 60.0, 0.5).is_none());
        assert_eq!(engine.last_score("P001"), Some(60.0));
        assert!(engine.check_spike(&patient(), 75.0, 0.9).is_none());
    }

    #[test]
    fn each_breach_becomes_one_alert() {
        let engine = engine();
        let alerts = engine.check_thresholds(&patient(), &vitals(140.0, 88.0, 32.0, 39.5, 80.0), 70.0, 0.9);
        assert_eq!(alerts.len(), 5);
        assert!(alerts.iter().all(|a| a.kind == AlertKind::Threshold));
        assert_eq!(engine.alert_counts().triggered, 5);
    }

    #[test]
    fn bradycardia_reported_when_no_tachycardia() {
        let engine = engine();
        let alerts = engine.check_thresholds(&patient(), &vitals(38.0, 97.0, 16.0, 37.0, 120.0), 20.0, 0.85);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].message.starts_with("Bradycardia"));
    }

    #[test]
    fn thresholds_respect_confidence_gate() {
        let engine = engine();
        let alerts = engine.check_thresholds(&patient(), &vitals(140.0, 88.0, 32.0, 39.5, 80.0), 70.0, 0.7);
        assert!(alerts.is_empty());
        assert_eq!(engine.alert_counts().triggered, 0);
    }

    #[test]
    fn suppression_is_idempotent_and_keeps_latest_reason() {
        let engine = engine();
        let alert = engine.check_thresholds(&patient(), &vitals(140.0, 97.0, 16.0, 37.0, 120.0), 50.0, 0.9)
            .remove(0);

        let first = engine.suppress(&alert.id, "sensor artefact").expect("known alert");
        assert!(first.suppressed);
        let second = engine.suppress(&alert.id, "reviewed by charge nurse").expect("known alert");
        assert_eq!(second.suppression_reason.as_deref(), Some("reviewed by charge nurse"));

        assert!(engine.active_alerts().is_empty());
        assert_eq!(engine.alert_log().len(), 1);
        assert_eq!(engine.alert_counts(), AlertCounts { triggered: 1, suppressed: 1 });
    }

    #[test]
    fn unknown_alert_is_not_found() {
        assert!(engine().suppress(&AlertId::new(), "noise").is_none());
    }

    #[test]
    fn log_is_newest_first() {
        let log = Arc::new(MemoryAlertLog::new());
        let engine = AlertEngine::new(log.clone(), Ambient::at_epoch());
        let at = Utc::now();
        for (i, minutes) in [0, 5, 2].into_iter().enumerate() {
            engine.raise(Alert::new(
                patient(),
                AlertKind::Threshold,
                AlertSeverity::Warning,
                format!("alert {i}"),
                10.0,
                0.9,
                at + Duration::minutes(minutes),
            ));
        }
        let messages: Vec<_> = engine.alert_log().into_iter().map(|a| a.message).collect();
        assert_eq!(messages, ["alert 1", "alert 2", "alert 0"]);
    }

    #[test]
    fn forgetting_resets_spike_tracking() {
        let engine = engine();
        engine.check_spike(&patient(), 10.0, 0.9);
        engine.forget_patient("P001");
        assert!(engine.check_spike(&patient(), 90.0, 0.9).is_none());
    }
}
