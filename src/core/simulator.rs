//! Synthetic bedside monitor.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, instrument};

use crate::core::ambient::Ambient;
use crate::db::SeriesStore;
use crate::models::patient::{PatientBaseline, SeverityTier};
use crate::models::vitals::VitalsReading;

/// Rolling window kept per patient.
pub const HISTORY_CAPACITY: usize = 60;

/// Drift and noise per severity tier: `(drift, sigma)` indexed by tier.
struct ChannelDrift {
    drift: [f64; 3],
    sigma: [f64; 3],
}

const HR: ChannelDrift = ChannelDrift { drift: [0.0, 12.0, 28.0], sigma: [3.0, 6.0, 10.0] };
const SPO2: ChannelDrift = ChannelDrift { drift: [0.0, -4.0, -10.0], sigma: [0.5, 1.5, 3.0] };
const SBP: ChannelDrift = ChannelDrift { drift: [0.0, 15.0, -20.0], sigma: [4.0, 8.0, 15.0] };
const DBP: ChannelDrift = ChannelDrift { drift: [0.0, 8.0, -10.0], sigma: [3.0, 6.0, 10.0] };
const RR: ChannelDrift = ChannelDrift { drift: [0.0, 5.0, 12.0], sigma: [1.0, 2.0, 4.0] };
const TEMP: ChannelDrift = ChannelDrift { drift: [0.0, 0.8, 2.0], sigma: [0.1, 0.3, 0.6] };

pub struct VitalsSimulator {
    history: Arc<dyn SeriesStore<VitalsReading>>,
    overrides: DashMap<String, SeverityTier>,
    ambient: Ambient,
}

impl VitalsSimulator {
    pub fn new(history: Arc<dyn SeriesStore<VitalsReading>>, ambient: Ambient) -> Self {
        Self {
            history,
            overrides: DashMap::new(),
            ambient,
        }
    }

    /// Generate, record and return one reading.
    #[instrument(skip(self, baseline), fields(patient_id = %patient_id, severity = ?severity))]
    pub fn simulate(
        &self,
        patient_id: &str,
        baseline: &PatientBaseline,
        severity: SeverityTier,
    ) -> VitalsReading {
        let tier = severity.index();
        let sample = |base: f64, channel: &ChannelDrift| {
            base + channel.drift[tier] + self.ambient.gauss(0.0, channel.sigma[tier])
        };

        let reading = VitalsReading::new(
            self.ambient.now(),
            sample(baseline.hr, &HR),
            sample(baseline.spo2, &SPO2),
            sample(baseline.sbp, &SBP),
            sample(baseline.dbp, &DBP),
            sample(baseline.rr, &RR),
            sample(baseline.temp, &TEMP),
        );

        self.history.append(patient_id, reading, HISTORY_CAPACITY);
        debug!(hr = reading.hr, spo2 = reading.spo2, "Simulated reading");
        reading
    }

    /// Override the tier used by [`severity_for`](Self::severity_for).
    pub fn set_severity(&self, patient_id: &str, severity: SeverityTier) {
        self.overrides.insert(patient_id.to_string(), severity);
    }

    pub fn clear_severity(&self, patient_id: &str) {
        self.overrides.remove(patient_id);
    }

    pub fn clear_all_severities(&self) {
        self.overrides.clear();
    }

    pub fn severity_for(&self, patient_id: &str, default: SeverityTier) -> SeverityTier {
        self.overrides
            .get(patient_id)
            .map(|s| *s)
            .unwrap_or(default)
    }

    pub fn history(&self, patient_id: &str) -> Vec<VitalsReading> {
        self.history.snapshot(patient_id)
    }

    pub fn latest(&self, patient_id: &str) -> Option<VitalsReading> {
        self.history.snapshot(patient_id).last().copied()
    }

    pub fn clear_history(&self, patient_id: &str) {
        self.history.clear(patient_id);
    }

    pub fn clear_all_histories(&self) {
        self.history.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ambient::{FixedClock, NoiseSource};
    use crate::db::MemorySeries;
    use crate::models::vitals::{DBP_RANGE, HR_RANGE, RR_RANGE, SBP_RANGE, SPO2_RANGE, TEMP_RANGE};
    use crate::utils::mean;
    use chrono::Utc;

    fn simulator(ambient: Ambient) -> VitalsSimulator {
        VitalsSimulator::new(MemorySeries::<VitalsReading>::shared(), ambient)
    }

    #[test]
    fn critical_tier_drifts_hr_up_and_spo2_down() {
        let sim = simulator(Ambient::seeded(7));
        let baseline = PatientBaseline { hr: 72.0, spo2: 98.0, ..PatientBaseline::default() };

        let readings: Vec<_> = (0..200)
            .map(|_| sim.simulate("P001", &baseline, SeverityTier::Critical))
            .collect();

        let hr = mean(&readings.iter().map(|r| r.hr).collect::<Vec<_>>());
        let spo2 = mean(&readings.iter().map(|r| r.spo2).collect::<Vec<_>>());
        assert!(hr - 72.0 >= 20.0, "hr mean {hr}");
        assert!(spo2 - 98.0 <= -5.0, "spo2 mean {spo2}");
        readings.iter().for_each(assert_within_ranges);
    }

    fn assert_within_ranges(reading: &VitalsReading) {
        let checks = [
            ("hr", reading.hr, HR_RANGE),
            ("spo2", reading.spo2, SPO2_RANGE),
            ("sbp", reading.sbp, SBP_RANGE),
            ("dbp", reading.dbp, DBP_RANGE),
            ("rr", reading.rr, RR_RANGE),
            ("temp", reading.temp, TEMP_RANGE),
        ];
        for (name, value, (lo, hi)) in checks {
            assert!((lo..=hi).contains(&value), "{name} {value} outside [{lo}, {hi}]");
        }
    }

    /// Every draw lands `sigmas` standard deviations from the mean.
    struct ExtremeNoise {
        sigmas: f64,
    }

    impl NoiseSource for ExtremeNoise {
        fn gauss(&self, mean: f64, std_dev: f64) -> f64 {
            mean + self.sigmas * std_dev
        }
    }

    fn extreme_reading(sigmas: f64) -> VitalsReading {
        let ambient = Ambient::new(Arc::new(FixedClock(Utc::now())), Arc::new(ExtremeNoise { sigmas }));
        simulator(ambient).simulate("P007", &PatientBaseline::default(), SeverityTier::Critical)
    }

    #[test]
    fn extreme_noise_is_clamped_to_physiological_ranges() {
        let high = extreme_reading(1e4);
        assert_within_ranges(&high);
        assert_eq!(
            [high.hr, high.spo2, high.sbp, high.dbp, high.rr, high.temp],
            [HR_RANGE.1, SPO2_RANGE.1, SBP_RANGE.1, DBP_RANGE.1, RR_RANGE.1, TEMP_RANGE.1]
        );

        let low = extreme_reading(-1e4);
        assert_within_ranges(&low);
        assert_eq!(
            [low.hr, low.spo2, low.sbp, low.dbp, low.rr, low.temp],
            [HR_RANGE.0, SPO2_RANGE.0, SBP_RANGE.0, DBP_RANGE.0, RR_RANGE.0, TEMP_RANGE.0]
        );
    }

    #[test]
    fn history_is_capped() {
        let sim = simulator(Ambient::at_epoch());
        let baseline = PatientBaseline::default();
        for _ in 0..75 {
            sim.simulate("P002", &baseline, SeverityTier::Stable);
        }
        assert_eq!(sim.history("P002").len(), HISTORY_CAPACITY);
    }

    #[test]
    fn stable_tier_without_noise_returns_baseline() {
        let sim = simulator(Ambient::at_epoch());
        let baseline = PatientBaseline::default();
        let reading = sim.simulate("P004", &baseline, SeverityTier::Stable);
        assert_eq!(reading.hr, baseline.hr);
        assert_eq!(reading.temp, baseline.temp);
    }

    #[test]
    fn override_takes_precedence() {
        let sim = simulator(Ambient::at_epoch());
        assert_eq!(sim.severity_for("P004", SeverityTier::Stable), SeverityTier::Stable);
        sim.set_severity("P004", SeverityTier::Critical);
        assert_eq!(sim.severity_for("P004", SeverityTier::Stable), SeverityTier::Critical);
        sim.clear_severity("P004");
        assert_eq!(sim.severity_for("P004", SeverityTier::Stable), SeverityTier::Stable);
    }
}
