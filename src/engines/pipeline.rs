//! Generic five-stage per-vital pipeline.
//!
//! A: sub-parameter extraction, B: weighted risk scoring, C: staged
//! intervention selection, D: logistic outcome projection, E: variance logging
//! and channel alerts. Channels differ only in their [`ChannelProfile`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::alerts::AlertEngine;
use crate::core::ambient::Ambient;
use crate::db::{MemorySeries, SeriesStore};
use crate::engines::profile::{ChannelProfile, InterventionKind, InterventionTemplate, Signal, SignalMap};
use crate::models::alert::{Alert, AlertKind, AlertSeverity};
use crate::models::patient::{ClinicalContext, PatientRef};
use crate::models::vitals::{Channel, VitalsReading};
use crate::utils::{bounded, round1, sigmoid};

pub const VARIANCE_CAPACITY: usize = 60;
pub const PLAN_HISTORY_CAPACITY: usize = 20;

/// Channel risk percentage above which a critical alert is raised.
pub const RISK_ALERT_PCT: f64 = 80.0;

const RISK_WEIGHT_BEFORE: f64 = 0.012;
const RISK_WEIGHT_AFTER: f64 = 0.005;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubParameters {
    pub values: SignalMap,
    pub flags: BTreeMap<String, bool>,
}

impl SubParameters {
    pub fn get(&self, signal: Signal) -> Option<f64> {
        self.values.get(&signal).copied()
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: String,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryEstimate {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub raw_score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub tier: String,
    pub color: String,
    pub breakdown: Vec<RiskFactor>,
    pub estimates: Vec<AuxiliaryEstimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
}

impl RiskAssessment {
    pub fn estimate(&self, name: &str) -> Option<f64> {
        self.estimates.iter().find(|e| e.name == name).map(|e| e.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalChange {
    pub signal: Signal,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionItem {
    pub name: String,
    pub kind: InterventionKind,
    pub dosage: String,
    pub frequency: String,
    pub timing: String,
    pub schedule: String,
    pub duration_days: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub drug_class: String,
    pub expected_effect: Vec<SignalChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionPlan {
    pub stage: String,
    pub primary: Vec<InterventionItem>,
    pub alternative: Option<Vec<InterventionItem>>,
    pub notes: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub prescribed_at: DateTime<Utc>,
    pub stage: String,
    pub items: Vec<InterventionItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedValue {
    pub signal: Signal,
    pub before: f64,
    pub after: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveIntervention {
    pub name: String,
    pub drug_class: String,
    pub dosage: String,
    pub effects: Vec<SignalChange>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub worsening: f64,
    pub stabilization: f64,
    pub improvement: f64,
}

impl OutcomeProbabilities {
    pub fn total(&self) -> f64 {
        self.worsening + self.stabilization + self.improvement
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Worsening,
    Stable,
    Improving,
}

impl Trend {
    pub fn from_worsening(prob_worsening: f64) -> Self {
        if prob_worsening >= 60.0 {
            Trend::Worsening
        } else if prob_worsening >= 40.0 {
            Trend::Stable
        } else {
            Trend::Improving
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Trend::Worsening => "red",
            Trend::Stable => "yellow",
            Trend::Improving => "green",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProjection {
    pub risk_before: f64,
    pub risk_after: f64,
    pub risk_reduction: f64,
    pub projected: Vec<ProjectedValue>,
    pub active_interventions: Vec<ActiveIntervention>,
    pub probabilities: OutcomeProbabilities,
    pub trend: Trend,
    pub trend_color: String,
    pub horizon_hours: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceLogEntry {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub risk_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelReport {
    pub patient: PatientRef,
    pub channel: Channel,
    pub timestamp: DateTime<Utc>,
    pub current_value: f64,
    pub sub_parameters: SubParameters,
    pub risk: RiskAssessment,
    pub plan: InterventionPlan,
    pub history: Vec<PlanRecord>,
    pub outcome: OutcomeProjection,
    pub variance_log: Vec<VarianceLogEntry>,
    pub alerts: Vec<Alert>,
}

/// Stage A.
pub fn derive_sub_parameters(
    profile: &ChannelProfile,
    reading: &VitalsReading,
    context: &ClinicalContext,
    ambient: &Ambient,
) -> SubParameters {
    let values = (profile.derive)(reading, context, ambient);
    let flags = profile
        .flags
        .iter()
        .map(|f| (f.name.to_string(), f.cutoff.breached(&values).is_some()))
        .collect();
    SubParameters { values, flags }
}

/// Band a channel percentage into a tier label and colour.
pub fn tier_for(percentage: f64, calm_label: &str) -> (String, &'static str) {
    if percentage >= 75.0 {
        ("Critical".to_string(), "red")
    } else if percentage >= 50.0 {
        ("High".to_string(), "orange")
    } else if percentage >= 25.0 {
        ("Moderate".to_string(), "yellow")
    } else {
        (calm_label.to_string(), "green")
    }
}

/// Stage B.
pub fn score_risk(profile: &ChannelProfile, sub: &SubParameters, ambient: &Ambient) -> RiskAssessment {
    let mut raw_score = 0.0;
    let mut breakdown = Vec::new();
    let mut scored_groups: Vec<&str> = Vec::new();

    for rule in profile.score_rules {
        if let Some(group) = rule.group {
            if scored_groups.contains(&group) {
                continue;
            }
        }
        if rule.cutoff.breached(&sub.values).is_none() {
            continue;
        }
        raw_score += rule.points;
        breakdown.push(RiskFactor {
            factor: rule.factor.to_string(),
            points: rule.points,
        });
        if let Some(group) = rule.group {
            scored_groups.push(group);
        }
    }

    let percentage = round1(raw_score / profile.max_score * 100.0).min(100.0);
    let (tier, color) = tier_for(percentage, profile.calm_label);

    let estimates = profile
        .estimates
        .iter()
        .map(|e| {
            let signal_part = e
                .signal_term
                .and_then(|(signal, weight)| sub.get(signal).map(|v| v * weight))
                .unwrap_or(0.0);
            let value = e.slope * percentage + signal_part + ambient.gauss(0.0, e.noise_sd);
            AuxiliaryEstimate {
                name: e.name.to_string(),
                value: round1(bounded(value, e.min, e.max)),
            }
        })
        .collect();

    RiskAssessment {
        raw_score,
        max_score: profile.max_score,
        percentage,
        tier,
        color: color.to_string(),
        breakdown,
        estimates,
        interpretation: profile.interpret.map(|interpret| interpret(percentage)),
    }
}

fn materialize(
    profile: &ChannelProfile,
    templates: &[InterventionTemplate],
    start: NaiveDate,
) -> Vec<InterventionItem> {
    templates
        .iter()
        .map(|t| {
            let effect = profile.effect(t.name);
            InterventionItem {
                name: t.name.to_string(),
                kind: t.kind,
                dosage: t.dosage.to_string(),
                frequency: t.frequency.to_string(),
                timing: t.timing.to_string(),
                schedule: t.schedule.to_string(),
                duration_days: t.duration_days,
                start_date: start,
                end_date: start + Duration::days(t.duration_days),
                drug_class: effect.map(|e| e.class).unwrap_or("Unknown").to_string(),
                expected_effect: effect
                    .map(|e| {
                        e.changes
                            .iter()
                            .map(|&(signal, delta)| SignalChange { signal, delta })
                            .collect()
                    })
                    .unwrap_or_default(),
            }
        })
        .collect()
}

/// Stage C: first stage whose trigger fires, most severe first.
pub fn select_intervention(
    profile: &ChannelProfile,
    sub: &SubParameters,
    risk_pct: f64,
    now: DateTime<Utc>,
) -> InterventionPlan {
    let today = now.date_naive();
    let stage = profile.stages.iter().find(|s| s.fires(&sub.values, risk_pct));

    match stage {
        Some(stage) => InterventionPlan {
            stage: stage.label.to_string(),
            primary: materialize(profile, stage.primary, today),
            alternative: if stage.alternative.is_empty() {
                None
            } else {
                Some(materialize(profile, stage.alternative, today))
            },
            notes: stage.notes.to_string(),
            generated_at: now,
        },
        None => InterventionPlan {
            stage: "NORMAL".to_string(),
            primary: Vec::new(),
            alternative: None,
            notes: String::new(),
            generated_at: now,
        },
    }
}

fn logistic_z(profile: &ChannelProfile, values: &SignalMap) -> f64 {
    profile.logistic.iter().map(|t| t.contribution(values)).sum()
}

/// Stage D.
pub fn project_outcome(
    profile: &ChannelProfile,
    sub: &SubParameters,
    risk_pct: f64,
    plan: &InterventionPlan,
    ambient: &Ambient,
) -> OutcomeProjection {
    let z_before = logistic_z(profile, &sub.values) + RISK_WEIGHT_BEFORE * (risk_pct / 100.0);
    let risk_before = bounded(round1(100.0 * sigmoid(z_before)), 3.0, 95.0);

    let mut net: BTreeMap<Signal, f64> = BTreeMap::new();
    for item in &plan.primary {
        for change in &item.expected_effect {
            *net.entry(change.signal).or_insert(0.0) += change.delta;
        }
    }

    let mut projected_values = sub.values.clone();
    for bound in profile.bounds {
        if let Some(before) = sub.get(bound.signal) {
            let delta = net.get(&bound.signal).copied().unwrap_or(0.0);
            let after = round1(bounded(before + delta, bound.min, bound.max));
            projected_values.insert(bound.signal, after);
        }
    }
    (profile.refresh)(&mut projected_values);

    let oscillation = (ambient.epoch_seconds() * 0.1).sin() * 0.03 + ambient.gauss(0.0, 0.02);
    let z_after = logistic_z(profile, &projected_values)
        + RISK_WEIGHT_AFTER * (risk_pct / 100.0)
        + oscillation;
    let sig_after = sigmoid(z_after);
    let risk_after = bounded(round1(100.0 * sig_after), 3.0, 95.0);

    let worsening = risk_after;
    let mut stabilization = bounded(round1((1.0 - sig_after) * 100.0 * 0.6), 3.0, 95.0);
    let improvement = round1((100.0 - worsening - stabilization).max(2.0));
    let total = worsening + stabilization + improvement;
    if (total - 100.0).abs() > 1e-9 {
        stabilization = round1(stabilization + 100.0 - total);
    }
    let probabilities = OutcomeProbabilities {
        worsening,
        stabilization,
        improvement,
    };
    let trend = Trend::from_worsening(worsening);

    let projected = sub
        .values
        .iter()
        .filter_map(|(signal, before)| {
            let after = projected_values.get(signal).copied().unwrap_or(*before);
            let bounded_signal = profile.bounds.iter().any(|b| b.signal == *signal);
            (bounded_signal || (after - before).abs() > f64::EPSILON).then(|| ProjectedValue {
                signal: *signal,
                before: *before,
                after,
            })
        })
        .collect();

    let active_interventions = plan
        .primary
        .iter()
        .map(|item| ActiveIntervention {
            name: item.name.clone(),
            drug_class: item.drug_class.clone(),
            dosage: item.dosage.clone(),
            effects: item.expected_effect.clone(),
            status: "Active".to_string(),
        })
        .collect();

    OutcomeProjection {
        risk_before,
        risk_after,
        risk_reduction: round1(risk_before - risk_after),
        projected,
        active_interventions,
        probabilities,
        trend,
        trend_color: trend.color().to_string(),
        horizon_hours: profile.horizon_hours,
    }
}

/// Stage E alert evaluation, without side effects.
pub fn evaluate_alerts(
    profile: &ChannelProfile,
    sub: &SubParameters,
    risk_pct: f64,
) -> Vec<(AlertSeverity, String)> {
    let mut fired = Vec::new();
    let mut alerted_groups: Vec<&str> = Vec::new();

    for rule in profile.alert_rules {
        if let Some(group) = rule.group {
            if alerted_groups.contains(&group) {
                continue;
            }
        }
        if let Some(observed) = rule.cutoff.breached(&sub.values) {
            fired.push((rule.severity, rule.message(observed)));
            if let Some(group) = rule.group {
                alerted_groups.push(group);
            }
        }
    }

    if risk_pct > RISK_ALERT_PCT {
        fired.push((
            AlertSeverity::Critical,
            format!(
                "{} Risk {}% >{}% - critical monitoring required",
                profile.channel.code(),
                risk_pct,
                RISK_ALERT_PCT
            ),
        ));
    }
    fired
}

/// One channel's pipeline bound to its stores and the shared alert engine.
pub struct VitalEngine {
    profile: ChannelProfile,
    variance: Arc<dyn SeriesStore<VarianceLogEntry>>,
    history: Arc<dyn SeriesStore<PlanRecord>>,
    alerts: Arc<AlertEngine>,
    ambient: Ambient,
}

impl VitalEngine {
    pub fn new(profile: ChannelProfile, alerts: Arc<AlertEngine>, ambient: Ambient) -> Self {
        Self::with_stores(
            profile,
            MemorySeries::<VarianceLogEntry>::shared(),
            MemorySeries::<PlanRecord>::shared(),
            alerts,
            ambient,
        )
    }

    pub fn with_stores(
        profile: ChannelProfile,
        variance: Arc<dyn SeriesStore<VarianceLogEntry>>,
        history: Arc<dyn SeriesStore<PlanRecord>>,
        alerts: Arc<AlertEngine>,
        ambient: Ambient,
    ) -> Self {
        Self {
            profile,
            variance,
            history,
            alerts,
            ambient,
        }
    }

    pub fn channel(&self) -> Channel {
        self.profile.channel
    }

    pub fn profile(&self) -> &ChannelProfile {
        &self.profile
    }

    /// Run all five stages for one reading.
    #[instrument(skip(self, patient, reading, context), fields(patient_id = %patient.id, channel = %self.profile.channel))]
    pub fn analyze(
        &self,
        patient: &PatientRef,
        reading: &VitalsReading,
        context: &ClinicalContext,
    ) -> ChannelReport {
        let profile = &self.profile;
        let now = self.ambient.now();

        let sub = derive_sub_parameters(profile, reading, context, &self.ambient);
        let current_value = sub.get(profile.primary).unwrap_or(0.0);

        let risk = score_risk(profile, &sub, &self.ambient);
        debug!(raw = risk.raw_score, pct = risk.percentage, tier = %risk.tier, "Channel risk scored");

        let plan = select_intervention(profile, &sub, risk.percentage, now);
        if !plan.primary.is_empty() {
            self.history.append(
                &patient.id,
                PlanRecord {
                    prescribed_at: plan.generated_at,
                    stage: plan.stage.clone(),
                    items: plan.primary.clone(),
                },
                PLAN_HISTORY_CAPACITY,
            );
            info!(stage = %plan.stage, items = plan.primary.len(), "Intervention plan recorded");
        }

        let outcome = project_outcome(profile, &sub, risk.percentage, &plan, &self.ambient);

        self.variance.append(
            &patient.id,
            VarianceLogEntry {
                timestamp: now,
                value: current_value,
                risk_pct: risk.percentage,
            },
            VARIANCE_CAPACITY,
        );

        let alerts = evaluate_alerts(profile, &sub, risk.percentage)
            .into_iter()
            .map(|(severity, message)| {
                self.alerts.raise(Alert::new(
                    patient.clone(),
                    AlertKind::Channel(profile.channel),
                    severity,
                    message,
                    risk.percentage,
                    1.0,
                    now,
                ))
            })
            .collect();

        ChannelReport {
            patient: patient.clone(),
            channel: profile.channel,
            timestamp: now,
            current_value,
            sub_parameters: sub,
            risk,
            plan,
            history: self.history.snapshot(&patient.id),
            outcome,
            variance_log: self.variance.snapshot(&patient.id),
            alerts,
        }
    }

    pub fn variance_log(&self, patient_id: &str) -> Vec<VarianceLogEntry> {
        self.variance.snapshot(patient_id)
    }

    pub fn intervention_history(&self, patient_id: &str) -> Vec<PlanRecord> {
        self.history.snapshot(patient_id)
    }

    pub fn reset_patient(&self, patient_id: &str) {
        self.variance.clear(patient_id);
        self.history.clear(patient_id);
    }

    pub fn reset_all(&self) {
        self.variance.clear_all();
        self.history.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryAlertLog;
    use crate::engines::{heart_rate, temperature};
    use chrono::TimeZone;
    use test_case::test_case;

    fn alert_engine() -> Arc<AlertEngine> {
        Arc::new(AlertEngine::new(Arc::new(MemoryAlertLog::new()), Ambient::at_epoch()))
    }

    fn reading(hr: f64, temp: f64) -> VitalsReading {
        VitalsReading::new(Utc::now(), hr, 97.0, 120.0, 80.0, 16.0, temp)
    }

    fn patient() -> PatientRef {
        PatientRef::new("P001", "Arjun Mehta", "B01")
    }

    #[test_case(80.0 => "Critical")]
    #[test_case(75.0 => "Critical")]
    #[test_case(50.0 => "High")]
    #[test_case(25.0 => "Moderate")]
    #[test_case(24.9 => "Normal")]
    fn tier_bands(pct: f64) -> String {
        tier_for(pct, "Normal").0
    }

    #[test]
    fn variance_log_keeps_sixty_most_recent() {
        let engine = VitalEngine::new(heart_rate::PROFILE, alert_engine(), Ambient::at_epoch());
        for i in 0..65 {
            engine.analyze(&patient(), &reading(70.0 + i as f64 * 0.1, 36.8), &ClinicalContext::default());
        }
        let log = engine.variance_log("P001");
        assert_eq!(log.len(), VARIANCE_CAPACITY);
        assert_eq!(log[0].value, 70.5);
    }

    #[test]
    fn plan_history_keeps_twenty_and_skips_empty_plans() {
        let engine = VitalEngine::new(heart_rate::PROFILE, alert_engine(), Ambient::at_epoch());
        let ctx = ClinicalContext::default();
        engine.analyze(&patient(), &reading(72.0, 36.8), &ctx);
        assert!(engine.intervention_history("P001").is_empty());

        for _ in 0..25 {
            engine.analyze(&patient(), &reading(130.0, 36.8), &ctx);
        }
        let history = engine.intervention_history("P001");
        assert_eq!(history.len(), PLAN_HISTORY_CAPACITY);
        assert!(history.iter().all(|r| r.stage == "SEVERE TACHYCARDIA"));
    }

    #[test]
    fn probability_triad_sums_to_hundred() {
        let engine = VitalEngine::new(temperature::PROFILE, alert_engine(), Ambient::seeded(11));
        for temp in [34.2, 36.8, 38.2, 38.9, 39.8, 41.5] {
            let report = engine.analyze(&patient(), &reading(110.0, temp), &ClinicalContext::default());
            let p = report.outcome.probabilities;
            assert!((p.total() - 100.0).abs() < 0.05, "{p:?}");
            assert!(report.outcome.risk_before >= 3.0 && report.outcome.risk_before <= 95.0);
            assert!(report.outcome.risk_after >= 3.0 && report.outcome.risk_after <= 95.0);
        }
    }

    #[test]
    fn plan_dates_follow_injected_clock() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).single().expect("valid date");
        let engine = VitalEngine::new(heart_rate::PROFILE, alert_engine(), Ambient::pinned(at));
        let report = engine.analyze(&patient(), &reading(130.0, 36.8), &ClinicalContext::default());
        let metoprolol = &report.plan.primary[0];
        assert_eq!(metoprolol.start_date, NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"));
        assert_eq!(metoprolol.end_date, NaiveDate::from_ymd_opt(2026, 3, 31).expect("valid date"));
    }

    #[test]
    fn channel_alerts_reach_shared_engine() {
        let alerts = alert_engine();
        let engine = VitalEngine::new(heart_rate::PROFILE, alerts.clone(), Ambient::at_epoch());
        let report = engine.analyze(&patient(), &reading(130.0, 36.8), &ClinicalContext::default());
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(alerts.alert_log().len(), 1);
        assert_eq!(alerts.alert_log()[0].kind, AlertKind::Channel(Channel::HeartRate));
    }
}
