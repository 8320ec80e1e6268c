use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{bounded, round1};

pub const HR_RANGE: (f64, f64) = (30.0, 200.0);
pub const SPO2_RANGE: (f64, f64) = (60.0, 100.0);
pub const SBP_RANGE: (f64, f64) = (70.0, 220.0);
pub const DBP_RANGE: (f64, f64) = (40.0, 130.0);
pub const RR_RANGE: (f64, f64) = (6.0, 50.0);
pub const TEMP_RANGE: (f64, f64) = (34.0, 42.0);

/// The five monitored vital channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "BP")]
    BloodPressure,
    #[serde(rename = "HR")]
    HeartRate,
    #[serde(rename = "RR")]
    Respiration,
    #[serde(rename = "SPO2")]
    OxygenSaturation,
    #[serde(rename = "TEMP")]
    Temperature,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::BloodPressure,
        Channel::HeartRate,
        Channel::Respiration,
        Channel::OxygenSaturation,
        Channel::Temperature,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Channel::BloodPressure => "BP",
            Channel::HeartRate => "HR",
            Channel::Respiration => "RR",
            Channel::OxygenSaturation => "SPO2",
            Channel::Temperature => "TEMP",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Channel::BloodPressure => "Blood pressure",
            Channel::HeartRate => "Heart rate",
            Channel::Respiration => "Respiratory rate",
            Channel::OxygenSaturation => "Oxygen saturation",
            Channel::Temperature => "Temperature",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One bedside reading. Values are clamped to physiological ranges and
/// rounded to one decimal at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalsReading {
    pub timestamp: DateTime<Utc>,
    pub hr: f64,
    pub spo2: f64,
    pub sbp: f64,
    pub dbp: f64,
    pub rr: f64,
    pub temp: f64,
}

impl VitalsReading {
    pub fn new(
        timestamp: DateTime<Utc>,
        hr: f64,
        spo2: f64,
        sbp: f64,
        dbp: f64,
        rr: f64,
        temp: f64,
    ) -> Self {
        let fit = |v: f64, (lo, hi): (f64, f64)| round1(bounded(v, lo, hi));
        Self {
            timestamp,
            hr: fit(hr, HR_RANGE),
            spo2: fit(spo2, SPO2_RANGE),
            sbp: fit(sbp, SBP_RANGE),
            dbp: fit(dbp, DBP_RANGE),
            rr: fit(rr, RR_RANGE),
            temp: fit(temp, TEMP_RANGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_clamps_and_rounds() {
        let r = VitalsReading::new(Utc::now(), 250.0, 101.3, 60.0, 80.04, 3.0, 38.26);
        assert_eq!(r.hr, 200.0);
        assert_eq!(r.spo2, 100.0);
        assert_eq!(r.sbp, 70.0);
        assert_eq!(r.dbp, 80.0);
        assert_eq!(r.rr, 6.0);
        assert_eq!(r.temp, 38.3);
    }
}
