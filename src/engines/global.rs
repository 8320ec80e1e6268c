//! Multi-vital correlation: runs every channel and folds the channel risks
//! into one stability score.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::alerts::AlertEngine;
use crate::core::ambient::Ambient;
use crate::engines::pipeline::{ChannelReport, VitalEngine};
use crate::engines::profile_for;
use crate::models::alert::Alert;
use crate::models::patient::{ClinicalContext, PatientRef};
use crate::models::vitals::{Channel, VitalsReading};
use crate::utils::{bounded, round1};

/// Contribution of each channel's risk percentage to the weighted risk.
pub const CHANNEL_WEIGHTS: [(Channel, f64); 5] = [
    (Channel::BloodPressure, 0.30),
    (Channel::HeartRate, 0.25),
    (Channel::OxygenSaturation, 0.20),
    (Channel::Respiration, 0.15),
    (Channel::Temperature, 0.10),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilityStatus {
    Stable,
    MonitorClosely,
    HighAlert,
    Critical,
}

impl StabilityStatus {
    pub fn from_score(stability: f64) -> Self {
        if stability >= 75.0 {
            StabilityStatus::Stable
        } else if stability >= 50.0 {
            StabilityStatus::MonitorClosely
        } else if stability >= 25.0 {
            StabilityStatus::HighAlert
        } else {
            StabilityStatus::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StabilityStatus::Stable => "Stable",
            StabilityStatus::MonitorClosely => "Monitor Closely",
            StabilityStatus::HighAlert => "High Alert",
            StabilityStatus::Critical => "Critical",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            StabilityStatus::Stable => "green",
            StabilityStatus::MonitorClosely => "yellow",
            StabilityStatus::HighAlert => "orange",
            StabilityStatus::Critical => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalPredictions {
    pub deterioration_24h: f64,
    pub icu_transfer: f64,
    pub medication_escalation: f64,
}

impl GlobalPredictions {
    pub fn from_weighted_risk(weighted: f64) -> Self {
        Self {
            deterioration_24h: bounded(round1(weighted * 0.9), 3.0, 95.0),
            icu_transfer: bounded(round1(weighted * 0.65), 2.0, 95.0),
            medication_escalation: bounded(round1(weighted * 0.5), 2.0, 95.0),
        }
    }
}

/// One primary item currently prescribed by a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTreatment {
    pub channel: Channel,
    pub name: String,
    pub dosage: String,
    pub stage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalReport {
    pub patient: PatientRef,
    pub timestamp: DateTime<Utc>,
    pub stability_score: f64,
    pub status: StabilityStatus,
    pub status_label: String,
    pub status_color: String,
    pub weighted_risk: f64,
    pub channel_risks: BTreeMap<Channel, f64>,
    pub predictions: GlobalPredictions,
    pub active_treatments: Vec<ActiveTreatment>,
    pub alerts: Vec<Alert>,
    pub channels: Vec<ChannelReport>,
}

impl GlobalReport {
    pub fn channel(&self, channel: Channel) -> Option<&ChannelReport> {
        self.channels.iter().find(|c| c.channel == channel)
    }
}

/// Weighted sum of channel risk percentages. Missing channels count as zero.
pub fn weighted_risk(channel_risks: &BTreeMap<Channel, f64>) -> f64 {
    CHANNEL_WEIGHTS
        .iter()
        .map(|(channel, weight)| channel_risks.get(channel).copied().unwrap_or(0.0) * weight)
        .sum()
}

pub fn stability_score(weighted: f64) -> f64 {
    bounded(round1(100.0 - weighted), 0.0, 100.0)
}

/// The five channel engines sharing one alert engine.
pub struct ChannelEngines {
    /// Indexed in [`Channel::ALL`] order.
    engines: [VitalEngine; 5],
    ambient: Ambient,
}

impl ChannelEngines {
    pub fn new(alerts: Arc<AlertEngine>, ambient: Ambient) -> Self {
        let engines =
            Channel::ALL.map(|channel| VitalEngine::new(profile_for(channel), alerts.clone(), ambient.clone()));
        Self { engines, ambient }
    }

    pub fn engine(&self, channel: Channel) -> &VitalEngine {
        &self.engines[channel as usize]
    }

    /// Run one channel only.
    pub fn analyze_channel(
        &self,
        channel: Channel,
        patient: &PatientRef,
        reading: &VitalsReading,
        context: &ClinicalContext,
    ) -> ChannelReport {
        self.engine(channel).analyze(patient, reading, context)
    }

    #[instrument(skip(self, patient, reading, context), fields(patient_id = %patient.id))]
    pub fn analyze(
        &self,
        patient: &PatientRef,
        reading: &VitalsReading,
        context: &ClinicalContext,
    ) -> GlobalReport {
        let channels: Vec<ChannelReport> = self
            .engines
            .iter()
            .map(|engine| engine.analyze(patient, reading, context))
            .collect();

        let channel_risks: BTreeMap<Channel, f64> = channels
            .iter()
            .map(|report| (report.channel, report.risk.percentage))
            .collect();
        let weighted = weighted_risk(&channel_risks);
        let stability = stability_score(weighted);
        let status = StabilityStatus::from_score(stability);

        let active_treatments = channels
            .iter()
            .flat_map(|report| {
                report.plan.primary.iter().map(move |item| ActiveTreatment {
                    channel: report.channel,
                    name: item.name.clone(),
                    dosage: item.dosage.clone(),
                    stage: report.plan.stage.clone(),
                })
            })
            .collect();
        let alerts: Vec<Alert> = channels.iter().flat_map(|r| r.alerts.iter().cloned()).collect();

        info!(
            stability,
            status = status.label(),
            alerts = alerts.len(),
            "Global vital analysis complete"
        );

        GlobalReport {
            patient: patient.clone(),
            timestamp: self.ambient.now(),
            stability_score: stability,
            status,
            status_label: status.label().to_string(),
            status_color: status.color().to_string(),
            weighted_risk: round1(weighted),
            channel_risks,
            predictions: GlobalPredictions::from_weighted_risk(weighted),
            active_treatments,
            alerts,
            channels,
        }
    }

    pub fn reset_patient(&self, patient_id: &str) {
        self.engines.iter().for_each(|e| e.reset_patient(patient_id));
    }

    pub fn reset_all(&self) {
        self.engines.iter().for_each(VitalEngine::reset_all);
    }
}
