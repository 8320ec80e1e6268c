//! ICU ward orchestration
//!
//! [`IcuWard`] owns every process-scoped engine and exposes the operations a
//! monitoring front end calls: global risk prediction and explanation,
//! short-horizon forecasts, per-vital analysis, census and the crisis drill.
//! Work for one patient is serialized; different patients run in parallel.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::alerts::AlertEngine;
use crate::core::ambient::Ambient;
use crate::core::classifier::{rank_by_risk, CensusEntry, RiskTier};
use crate::core::features::{engineer_features, FeatureVector};
use crate::core::forecast::{forecast, RiskForecast, TrendBaseline};
use crate::core::model::RiskModel;
use crate::core::predictor::{FeatureContribution, Prediction, PredictionPath, RiskPredictor};
use crate::core::simulator::VitalsSimulator;
use crate::db::{AlertLog, MemoryAlertLog, MemorySeries, PatientDirectory, StaticDirectory};
use crate::engines::global::{ChannelEngines, GlobalReport};
use crate::engines::pipeline::ChannelReport;
use crate::error::{Result, WardError};
use crate::models::alert::{Alert, AlertCounts, AlertId};
use crate::models::patient::{PatientRecord, PatientRef, SeverityTier};
use crate::models::vitals::{Channel, VitalsReading};
use crate::utils::{mean, round1};

/// Patients driven to critical by the default crisis drill.
pub const CRISIS_PATIENTS: [&str; 3] = ["P001", "P003", "P007"];

/// Seconds between bedside polls, used to date forecast trends.
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 3.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub patient: PatientRef,
    pub timestamp: DateTime<Utc>,
    pub reading: VitalsReading,
    pub features: FeatureVector,
    pub risk_score: f64,
    pub tier: RiskTier,
    pub color: String,
    pub confidence: f64,
    pub path: PredictionPath,
    pub contributions: Vec<FeatureContribution>,
    /// Alerts raised by this prediction.
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub patient_id: String,
    pub features: FeatureVector,
    pub contributions: Vec<FeatureContribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientForecast {
    pub patient_id: String,
    pub generated_at: DateTime<Utc>,
    pub forecast: RiskForecast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisTarget {
    pub patient: PatientRef,
    pub severity: SeverityTier,
}

/// Ward-level aggregates over a census.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardSummary {
    pub total_patients: usize,
    pub critical_count: usize,
    pub moderate_count: usize,
    pub stable_count: usize,
    pub alerts: AlertCounts,
    pub average_risk: f64,
}

pub struct IcuWard {
    directory: Arc<dyn PatientDirectory>,
    simulator: VitalsSimulator,
    predictor: RiskPredictor,
    alerts: Arc<AlertEngine>,
    engines: ChannelEngines,
    locks: DashMap<String, Arc<Mutex<()>>>,
    poll_interval_secs: f64,
    ambient: Ambient,
}

impl IcuWard {
    pub fn new(
        directory: Arc<dyn PatientDirectory>,
        model: Option<Box<dyn RiskModel>>,
        alert_log: Arc<dyn AlertLog>,
        ambient: Ambient,
    ) -> Self {
        let alerts = Arc::new(AlertEngine::new(alert_log, ambient.clone()));
        Self {
            directory,
            simulator: VitalsSimulator::new(MemorySeries::<VitalsReading>::shared(), ambient.clone()),
            predictor: RiskPredictor::new(model, ambient.clone()),
            engines: ChannelEngines::new(alerts.clone(), ambient.clone()),
            alerts,
            locks: DashMap::new(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            ambient,
        }
    }

    /// Demo roster, in-memory stores, heuristic predictor unless a model is given.
    pub fn demo(model: Option<Box<dyn RiskModel>>, ambient: Ambient) -> Self {
        Self::new(
            Arc::new(StaticDirectory::demo()),
            model,
            Arc::new(MemoryAlertLog::new()),
            ambient,
        )
    }

    pub fn with_poll_interval(mut self, secs: f64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    pub fn simulator(&self) -> &VitalsSimulator {
        &self.simulator
    }

    pub fn patients(&self) -> Vec<PatientRecord> {
        self.directory.all()
    }

    fn patient(&self, patient_id: &str) -> Result<PatientRecord> {
        self.directory
            .get(patient_id)
            .ok_or_else(|| WardError::UnknownPatient(patient_id.to_string()))
    }

    fn lock_for(&self, patient_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(patient_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn guard(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
        lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn severity(&self, patient: &PatientRecord) -> SeverityTier {
        self.simulator.severity_for(&patient.id, patient.severity)
    }

    fn current_prediction(&self, patient: &PatientRecord) -> (FeatureVector, Prediction) {
        let history = self.simulator.history(&patient.id);
        let features = engineer_features(&history, &patient.baseline);
        let prediction = self.predictor.predict(&features);
        (features, prediction)
    }

    /// Simulate a reading, score it, and run the threshold and spike checks.
    #[instrument(skip(self), fields(patient_id = %patient_id))]
    pub fn predict(&self, patient_id: &str) -> Result<PredictionResult> {
        let patient = self.patient(patient_id)?;
        let lock = self.lock_for(patient_id);
        let _guard = Self::guard(&lock);

        let reading = self
            .simulator
            .simulate(&patient.id, &patient.baseline, self.severity(&patient));
        let (features, prediction) = self.current_prediction(&patient);
        let tier = RiskTier::from_score(prediction.risk_score);
        let reference = patient.reference();

        let mut alerts = self.alerts.check_thresholds(
            &reference,
            &reading,
            prediction.risk_score,
            prediction.confidence,
        );
        alerts.extend(self.alerts.check_spike(&reference, prediction.risk_score, prediction.confidence));

        info!(
            risk_score = prediction.risk_score,
            confidence = prediction.confidence,
            tier = ?tier,
            alerts = alerts.len(),
            "Risk prediction complete"
        );

        Ok(PredictionResult {
            patient: reference,
            timestamp: self.ambient.now(),
            reading,
            features,
            risk_score: prediction.risk_score,
            tier,
            color: tier.color().to_string(),
            confidence: prediction.confidence,
            path: prediction.path,
            contributions: self.predictor.contributions(),
            alerts,
        })
    }

    /// Feature contributions for the current history, without a new reading.
    pub fn explain(&self, patient_id: &str) -> Result<Explanation> {
        let patient = self.patient(patient_id)?;
        let history = self.simulator.history(&patient.id);
        Ok(Explanation {
            patient_id: patient.id,
            features: engineer_features(&history, &patient.baseline),
            contributions: self.predictor.contributions(),
        })
    }

    #[instrument(skip(self), fields(patient_id = %patient_id))]
    pub fn forecast(&self, patient_id: &str) -> Result<PatientForecast> {
        let patient = self.patient(patient_id)?;
        let history = self.simulator.history(&patient.id);

        let current = self
            .predictor
            .predict(&engineer_features(&history, &patient.baseline))
            .risk_score;
        let older = &history[..history.len() / 2];
        let historical = self
            .predictor
            .predict(&engineer_features(older, &patient.baseline))
            .risk_score;
        let baseline = TrendBaseline::from_history(history.len(), historical, self.poll_interval_secs);

        Ok(PatientForecast {
            patient_id: patient.id,
            generated_at: self.ambient.now(),
            forecast: forecast(current, baseline),
        })
    }

    fn reading_for_analysis(&self, patient: &PatientRecord) -> VitalsReading {
        match self.simulator.latest(&patient.id) {
            Some(reading) => reading,
            None => self
                .simulator
                .simulate(&patient.id, &patient.baseline, self.severity(patient)),
        }
    }

    /// All five channel pipelines on the latest reading.
    #[instrument(skip(self), fields(patient_id = %patient_id))]
    pub fn analyze(&self, patient_id: &str) -> Result<GlobalReport> {
        let patient = self.patient(patient_id)?;
        let lock = self.lock_for(patient_id);
        let _guard = Self::guard(&lock);

        let reading = self.reading_for_analysis(&patient);
        Ok(self.engines.analyze(&patient.reference(), &reading, &patient.context()))
    }

    pub fn analyze_channel(&self, patient_id: &str, channel: Channel) -> Result<ChannelReport> {
        let patient = self.patient(patient_id)?;
        let lock = self.lock_for(patient_id);
        let _guard = Self::guard(&lock);

        let reading = self.reading_for_analysis(&patient);
        Ok(self
            .engines
            .analyze_channel(channel, &patient.reference(), &reading, &patient.context()))
    }

    /// Fresh bedside reading appended to the history.
    pub fn current_vitals(&self, patient_id: &str) -> Result<VitalsReading> {
        let patient = self.patient(patient_id)?;
        let lock = self.lock_for(patient_id);
        let _guard = Self::guard(&lock);
        Ok(self
            .simulator
            .simulate(&patient.id, &patient.baseline, self.severity(&patient)))
    }

    pub fn vitals_history(&self, patient_id: &str) -> Result<Vec<VitalsReading>> {
        let patient = self.patient(patient_id)?;
        Ok(self.simulator.history(&patient.id))
    }

    /// Force the given patients to critical. Unknown ids are skipped.
    #[instrument(skip(self, patient_ids))]
    pub fn trigger_crisis(&self, patient_ids: &[&str]) -> Vec<CrisisTarget> {
        let mut affected = Vec::new();
        for id in patient_ids {
            let Some(patient) = self.directory.get(id) else {
                warn!(patient_id = %id, "Crisis target not in directory");
                continue;
            };
            let lock = self.lock_for(id);
            let _guard = Self::guard(&lock);

            self.simulator.set_severity(&patient.id, SeverityTier::Critical);
            self.simulator.clear_history(&patient.id);
            self.alerts.forget_patient(&patient.id);
            affected.push(CrisisTarget {
                patient: patient.reference(),
                severity: SeverityTier::Critical,
            });
        }
        info!(count = affected.len(), "Crisis simulation triggered");
        affected
    }

    /// Restore roster severities and clear histories, channel logs and spike trackers.
    /// The alert log is kept. Every roster patient's lock is held for the whole reset,
    /// taken in directory order.
    pub fn reset_simulation(&self) {
        let locks: Vec<Arc<Mutex<()>>> = self
            .directory
            .all()
            .iter()
            .map(|patient| self.lock_for(&patient.id))
            .collect();
        let _guards: Vec<MutexGuard<'_, ()>> = locks.iter().map(|lock| Self::guard(lock)).collect();

        self.simulator.clear_all_severities();
        self.simulator.clear_all_histories();
        self.engines.reset_all();
        self.alerts.forget_all();
        info!("Simulation reset to roster severities");
    }

    /// Every patient scored on its current history, highest risk first.
    pub fn census(&self) -> Vec<CensusEntry> {
        let mut entries: Vec<CensusEntry> = self
            .directory
            .all()
            .iter()
            .map(|patient| {
                let (_, prediction) = self.current_prediction(patient);
                CensusEntry {
                    patient_id: patient.id.clone(),
                    name: patient.name.clone(),
                    bed: patient.bed.clone(),
                    risk_score: prediction.risk_score,
                    tier: RiskTier::from_score(prediction.risk_score),
                }
            })
            .collect();
        rank_by_risk(&mut entries);
        entries
    }

    pub fn summary(&self) -> WardSummary {
        let census = self.census();
        let count = |tier: RiskTier| census.iter().filter(|e| e.tier == tier).count();
        let scores: Vec<f64> = census.iter().map(|e| e.risk_score).collect();
        WardSummary {
            total_patients: census.len(),
            critical_count: count(RiskTier::High),
            moderate_count: count(RiskTier::Medium),
            stable_count: count(RiskTier::Low),
            alerts: self.alerts.alert_counts(),
            average_risk: round1(mean(&scores)),
        }
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alerts.active_alerts()
    }

    pub fn alert_log(&self) -> Vec<Alert> {
        self.alerts.alert_log()
    }

    pub fn suppress_alert(&self, id: &AlertId, reason: &str) -> Result<Alert> {
        self.alerts
            .suppress(id, reason)
            .ok_or_else(|| WardError::AlertNotFound(id.to_string()))
    }
}
